use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// ApiError
///
/// The single error taxonomy shared by every layer of the service. The repository,
/// the identity gate, and the moderation workflow all return this type directly,
/// so the HTTP boundary can map error kind to status code deterministically and
/// no layer ever has to translate (and thereby hide) the underlying cause.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or oversized input. Never retried automatically.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown identity, wrong secret, or an unresolvable session token.
    /// Deliberately carries no detail about *which* part was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but the session's role does not permit the operation.
    #[error("forbidden")]
    Forbidden,

    /// The operation requires an existing record and none was found.
    /// Optional lookups return `Option` instead of this variant.
    #[error("no record with id {0}")]
    NotFound(Uuid),

    /// State machine violation: the submission has already left `pending`.
    /// Surfaced verbatim so a moderator UI can show "already decided".
    #[error("submission {0} is already decided")]
    InvalidTransition(Uuid),

    /// A repository call exceeded its deadline. Transient; safe to retry.
    #[error("storage operation timed out")]
    Timeout,

    /// The database rejected or dropped the connection. Transient; safe to retry.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ApiError {
    /// Stable machine-readable tag used in response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidTransition(_) => "invalid_transition",
            ApiError::Timeout => "timeout",
            ApiError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    /// True for transient failures a client may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::StorageUnavailable(_))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Wire shape for error responses.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if self.is_retryable() {
            tracing::warn!(kind = self.kind(), "transient storage failure: {}", self);
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

/// Maps driver-level failures onto the transient error kinds. Pool exhaustion is
/// reported as a timeout (the caller waited out the acquire deadline), everything
/// else as the storage being unavailable.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => ApiError::Timeout,
            other => ApiError::StorageUnavailable(other.to_string()),
        }
    }
}
