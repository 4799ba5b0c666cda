use crate::{
    AppState,
    auth::{AuthSession, Role, authorize, extract_token},
    error::ApiError,
    models::{
        ContactMessage, GalleryStats, LoginRequest, NewContactMessage, NewSubmission,
        PublicSubmission, SessionInfo, SessionResponse, Submission, SubmissionState,
        UpdateMessageRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// SubmissionFilter
///
/// Accepted query parameters for GET /submissions. The only value anonymous
/// callers may use is `state=approved`; moderators may filter by any state or
/// omit the filter entirely.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubmissionFilter {
    pub state: Option<SubmissionState>,
}

// --- Submission Handlers ---

/// create_submission
///
/// [Public Route] Accepts a new fan photo. The record always enters the queue
/// as `pending`; the response is the anonymous projection, since the caller
/// has no business seeing moderator fields on their own submission either.
#[utoipa::path(
    post,
    path = "/submissions",
    request_body = NewSubmission,
    responses(
        (status = 201, description = "Created", body = PublicSubmission),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_submission(
    State(state): State<AppState>,
    Json(payload): Json<NewSubmission>,
) -> Result<(StatusCode, Json<PublicSubmission>), ApiError> {
    let submission = state.repo.create_submission(payload).await?;
    Ok((StatusCode::CREATED, Json(submission.into())))
}

/// list_submissions
///
/// [Public or Moderator Route] One path, two views. A moderator session gets
/// the full records, optionally filtered by state. Everyone else gets the
/// approved-only projection; asking for any other state without moderator
/// rights is a hard 403, not an empty list.
#[utoipa::path(
    get,
    path = "/submissions",
    params(SubmissionFilter),
    responses(
        (status = 200, description = "Submissions", body = [PublicSubmission]),
        (status = 403, description = "Non-approved state requested anonymously")
    )
)]
pub async fn list_submissions(
    auth: Option<AuthSession>,
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Response, ApiError> {
    match auth {
        Some(auth) if auth.session.role == Role::Moderator => {
            let items = state.moderation.list(&auth.session, filter.state).await?;
            Ok(Json(items).into_response())
        }
        _ => match filter.state {
            None | Some(SubmissionState::Approved) => {
                let items = state.listing.list_approved().await?;
                Ok(Json(items).into_response())
            }
            Some(_) => Err(ApiError::Forbidden),
        },
    }
}

/// get_submission
///
/// [Public or Moderator Route] Detail view. Moderators see any record in full;
/// anonymous callers only see approved records, projected. A pending or
/// rejected record is a 404 for them, indistinguishable from a missing one.
#[utoipa::path(
    get,
    path = "/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Found", body = PublicSubmission),
        (status = 404, description = "Unknown or not visible")
    )
)]
pub async fn get_submission(
    auth: Option<AuthSession>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match auth {
        Some(auth) if auth.session.role == Role::Moderator => {
            let submission = state
                .moderation
                .get(&auth.session, id)
                .await?
                .ok_or(ApiError::NotFound(id))?;
            Ok(Json(submission).into_response())
        }
        _ => {
            let submission = state
                .listing
                .get_approved(id)
                .await?
                .ok_or(ApiError::NotFound(id))?;
            Ok(Json(submission).into_response())
        }
    }
}

/// approve_submission
///
/// [Moderator Route] `pending -> approved`. A 409 means another moderator (or
/// an earlier call) already decided this submission.
#[utoipa::path(
    patch,
    path = "/submissions/{id}/approve",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Approved", body = Submission),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn approve_submission(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError> {
    let submission = state.moderation.approve(&auth.session, id).await?;
    Ok(Json(submission))
}

/// reject_submission
///
/// [Moderator Route] `pending -> rejected`.
#[utoipa::path(
    patch,
    path = "/submissions/{id}/reject",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Rejected", body = Submission),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn reject_submission(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError> {
    let submission = state.moderation.reject(&auth.session, id).await?;
    Ok(Json(submission))
}

/// delete_submission
///
/// [Moderator Route] Removes a submission record in any state.
#[utoipa::path(
    delete,
    path = "/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_submission(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.moderation.remove(&auth.session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Session Handlers ---

/// login
///
/// [Public Route] Exchanges credentials for a session via the Identity Gate.
/// The token is returned in the body for API clients and set as an HttpOnly
/// cookie for browsers. Failures are a uniform 401.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let issued = state
        .gate
        .authenticate(&payload.identity, &payload.secret)
        .await?;

    let cookie = format!(
        "session={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        issued.token, state.config.session_ttl_secs
    );

    let body = SessionResponse {
        token: issued.token,
        subject_id: issued.session.subject_id,
        role: issued.session.role,
        expires_at: issued.session.expires_at,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    )
        .into_response())
}

/// logout
///
/// [Public Route] Destroys the caller's session if one was presented and
/// clears the cookie. Always 204: the common logout state is a stale token
/// (expired or already revoked), and the client must still get the clearing
/// cookie, so the token is taken straight from the headers rather than
/// through the resolving extractor and revocation is best-effort.
#[utoipa::path(
    delete,
    path = "/sessions",
    responses((status = 204, description = "Session destroyed"))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        if let Err(err) = state.gate.revoke(&token).await {
            tracing::warn!(kind = err.kind(), "session revocation failed during logout");
        }
    }

    let clear = "session=; HttpOnly; Path=/; Max-Age=0".to_string();
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear)]).into_response()
}

/// current_session
///
/// [Authenticated Route] Returns the caller's own resolved session.
#[utoipa::path(
    get,
    path = "/sessions/current",
    responses(
        (status = 200, description = "Session", body = SessionInfo),
        (status = 401, description = "No valid session")
    )
)]
pub async fn current_session(auth: AuthSession) -> Json<SessionInfo> {
    Json(SessionInfo {
        subject_id: auth.session.subject_id,
        role: auth.session.role,
        issued_at: auth.session.issued_at,
        expires_at: auth.session.expires_at,
    })
}

// --- Contact Message Handlers ---

/// create_message
///
/// [Public Route] Accepts a contact form message; it lands in the moderator
/// inbox as `unread`.
#[utoipa::path(
    post,
    path = "/messages",
    request_body = NewContactMessage,
    responses(
        (status = 201, description = "Created", body = ContactMessage),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(payload): Json<NewContactMessage>,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    let message = state.repo.create_message(payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// list_messages
///
/// [Moderator Route] The full inbox, newest first.
#[utoipa::path(
    get,
    path = "/messages",
    responses((status = 200, description = "Inbox", body = [ContactMessage]))
)]
pub async fn list_messages(
    auth: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    authorize(Some(&auth.session), Role::Moderator)?;
    Ok(Json(state.repo.list_messages().await?))
}

/// update_message
///
/// [Moderator Route] Partial update of a message's workflow status and/or the
/// recorded admin response.
#[utoipa::path(
    patch,
    path = "/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Updated", body = ContactMessage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_message(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateMessageRequest>,
) -> Result<Json<ContactMessage>, ApiError> {
    authorize(Some(&auth.session), Role::Moderator)?;
    Ok(Json(state.repo.update_message(id, patch).await?))
}

// --- Dashboard ---

/// get_stats
///
/// [Moderator Route] Queue and inbox counters for the dashboard.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Stats", body = GalleryStats))
)]
pub async fn get_stats(
    auth: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<GalleryStats>, ApiError> {
    authorize(Some(&auth.session), Role::Moderator)?;
    Ok(Json(state.repo.stats().await?))
}
