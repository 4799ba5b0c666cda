use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::ApiError;

// --- Validation bounds ---

/// Longest accepted submitter name / message subject (matches the original
/// site's VARCHAR(255) columns).
pub const MAX_NAME_LEN: usize = 255;
/// Longest accepted photo caption.
pub const MAX_CAPTION_LEN: usize = 2000;
/// Longest accepted contact message body.
pub const MAX_BODY_LEN: usize = 5000;
/// Maximum decoded payload size: 10 MiB before any transformation.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

// --- Core Application Schemas (Mapped to Database) ---

/// SubmissionState
///
/// The moderation state machine. `pending` is the only non-terminal state:
/// the legal transitions are `pending -> approved` and `pending -> rejected`,
/// and nothing ever leaves `approved` or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "submission_state", rename_all = "lowercase")]
#[ts(export)]
pub enum SubmissionState {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionState {
    /// True for states that permit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Approved | SubmissionState::Rejected)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionState::Pending => "pending",
            SubmissionState::Approved => "approved",
            SubmissionState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Submission
///
/// A fan-contributed photo record from the `submissions` table. This is the
/// moderator-facing shape; anonymous callers only ever see [`PublicSubmission`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Submission {
    pub id: Uuid,
    pub submitter_name: String,
    pub caption: String,
    /// Base64-encoded image data, stored inline.
    pub payload: String,
    pub state: SubmissionState,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    /// Set exactly once, together with `decided_by`, on the transition out of
    /// `pending`. Null while pending.
    pub decided_at: Option<DateTime<Utc>>,
    /// Identity of the moderator who made the decision. Null while pending.
    pub decided_by: Option<String>,
}

/// PublicSubmission
///
/// The anonymous-caller projection of a [`Submission`]: identical except that
/// the moderator identity (`decided_by`) is stripped. This is an explicit
/// projection type so the omission survives refactoring, rather than a field
/// skipped at one call site.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublicSubmission {
    pub id: Uuid,
    pub submitter_name: String,
    pub caption: String,
    pub payload: String,
    pub state: SubmissionState,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<Submission> for PublicSubmission {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            submitter_name: s.submitter_name,
            caption: s.caption,
            payload: s.payload,
            state: s.state,
            created_at: s.created_at,
            decided_at: s.decided_at,
        }
    }
}

/// MessageStatus
///
/// Inbox workflow for contact messages. Unlike submissions this is not a
/// one-way machine: moderators may flip between `read` and `responded` freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[ts(export)]
pub enum MessageStatus {
    Unread,
    Read,
    Responded,
}

/// ContactMessage
///
/// A message sent through the public contact form, from the `contact_messages`
/// table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: MessageStatus,
    pub admin_response: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// NewSubmission
///
/// Input payload for POST /submissions. Validated at the boundary before any
/// repository work happens.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSubmission {
    pub submitter_name: String,
    pub caption: String,
    /// Base64-encoded image data.
    pub payload: String,
}

impl NewSubmission {
    /// Rejects empty-after-trim text fields, overlong text, and payloads whose
    /// decoded size would exceed [`MAX_PAYLOAD_BYTES`].
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.submitter_name.trim().is_empty() {
            return Err(ApiError::Validation(
                "submitterName must not be empty".into(),
            ));
        }
        if self.submitter_name.len() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "submitterName exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if self.caption.trim().is_empty() {
            return Err(ApiError::Validation("caption must not be empty".into()));
        }
        if self.caption.len() > MAX_CAPTION_LEN {
            return Err(ApiError::Validation(format!(
                "caption exceeds {MAX_CAPTION_LEN} characters"
            )));
        }
        if self.payload.is_empty() {
            return Err(ApiError::Validation("payload must not be empty".into()));
        }
        // Base64 expands by 4/3, so the decoded size is recoverable from the
        // encoded length without actually decoding 10 MiB of image data.
        let decoded_estimate = self.payload.len() / 4 * 3;
        if decoded_estimate > MAX_PAYLOAD_BYTES {
            return Err(ApiError::Validation(format!(
                "payload exceeds the {MAX_PAYLOAD_BYTES} byte limit"
            )));
        }
        Ok(())
    }
}

/// NewContactMessage
///
/// Input payload for POST /messages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}

impl NewContactMessage {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if !email_address::EmailAddress::is_valid(&self.email) {
            return Err(ApiError::Validation("email is not a valid address".into()));
        }
        if self.subject.trim().is_empty() {
            return Err(ApiError::Validation("subject must not be empty".into()));
        }
        if self.subject.len() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "subject exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if self.body.trim().is_empty() {
            return Err(ApiError::Validation(
                "message body must not be empty".into(),
            ));
        }
        if self.body.len() > MAX_BODY_LEN {
            return Err(ApiError::Validation(format!(
                "message body exceeds {MAX_BODY_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// UpdateMessageRequest
///
/// Partial update payload for PATCH /messages/{id}. Uses `Option<T>` fields so
/// only the provided columns are touched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_response: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /sessions. The secret is compared against configured
/// accounts and never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    pub identity: String,
    pub secret: String,
}

// --- Session Schemas (Output) ---

/// SessionResponse
///
/// Output of a successful POST /sessions. The same token is also set as an
/// HttpOnly cookie for browser clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionResponse {
    pub token: String,
    pub subject_id: String,
    pub role: Role,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// SessionInfo
///
/// Output of GET /sessions/current: the caller's own resolved session, token
/// excluded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionInfo {
    pub subject_id: String,
    pub role: Role,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

// --- Dashboard Schemas (Output) ---

/// GalleryStats
///
/// Output schema for the moderator dashboard (GET /stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GalleryStats {
    pub total_submissions: i64,
    pub pending_submissions: i64,
    pub approved_submissions: i64,
    pub rejected_submissions: i64,
    pub unread_messages: i64,
}
