use crate::error::ApiError;
use crate::models::{
    ContactMessage, GalleryStats, MessageStatus, NewContactMessage, NewSubmission, Submission,
    SubmissionState, UpdateMessageRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers and services to interact with the data layer without knowing the
/// concrete implementation (Postgres in production, in-memory in tests).
///
/// The repository exclusively owns submission and contact-message records; the
/// `state`, `decided_at`, and `decided_by` columns are only ever written through
/// `update_submission_state`, which enforces the moderation state machine.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Submissions ---

    /// Persists a new submission. Assigns `id` and `created_at`, forces
    /// `state = pending`, and fails with `Validation` on malformed input.
    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, ApiError>;

    /// Optional lookup: an unknown id is `None`, not an error.
    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, ApiError>;

    /// `None` lists everything (moderator view); `Some(state)` filters.
    async fn list_submissions(
        &self,
        state: Option<SubmissionState>,
    ) -> Result<Vec<Submission>, ApiError>;

    /// The only write path for `state`/`decided_at`/`decided_by`. Atomic
    /// conditional write: succeeds only if the record is still `pending`, so of
    /// two racing moderators exactly one wins and the other sees
    /// `InvalidTransition`.
    async fn update_submission_state(
        &self,
        id: Uuid,
        new_state: SubmissionState,
        decided_by: &str,
    ) -> Result<Submission, ApiError>;

    async fn delete_submission(&self, id: Uuid) -> Result<(), ApiError>;

    // --- Contact messages ---

    async fn create_message(&self, new: NewContactMessage) -> Result<ContactMessage, ApiError>;
    async fn list_messages(&self) -> Result<Vec<ContactMessage>, ApiError>;
    /// Partial update of status and/or admin response.
    async fn update_message(
        &self,
        id: Uuid,
        patch: UpdateMessageRequest,
    ) -> Result<ContactMessage, ApiError>;

    // --- Dashboard ---

    async fn stats(&self) -> Result<GalleryStats, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const SUBMISSION_COLUMNS: &str =
    "id, submitter_name, caption, payload, state, created_at, decided_at, decided_by";
const MESSAGE_COLUMNS: &str =
    "id, name, email, subject, body, status, admin_response, created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Every query runs under a deadline: a slow or wedged database surfaces as a
/// retryable `Timeout` rather than an indefinitely blocked request.
pub struct PostgresRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, ApiError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::from)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, ApiError> {
        new.validate()?;

        let query = format!(
            "INSERT INTO submissions (id, submitter_name, caption, payload, state, created_at)
             VALUES ($1, $2, $3, $4, 'pending', NOW())
             RETURNING {SUBMISSION_COLUMNS}"
        );

        self.deadline(
            sqlx::query_as::<_, Submission>(&query)
                .bind(Uuid::new_v4())
                .bind(new.submitter_name.trim())
                .bind(new.caption.trim())
                .bind(&new.payload)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, ApiError> {
        let query = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1");

        self.deadline(
            sqlx::query_as::<_, Submission>(&query)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_submissions(
        &self,
        state: Option<SubmissionState>,
    ) -> Result<Vec<Submission>, ApiError> {
        match state {
            // Approved items are presented in decision order, newest decision
            // first, matching the original gallery's ordering.
            Some(SubmissionState::Approved) => {
                let query = format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions
                     WHERE state = 'approved' ORDER BY decided_at DESC"
                );
                self.deadline(sqlx::query_as::<_, Submission>(&query).fetch_all(&self.pool))
                    .await
            }
            Some(s) => {
                let query = format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions
                     WHERE state = $1 ORDER BY created_at DESC"
                );
                self.deadline(
                    sqlx::query_as::<_, Submission>(&query)
                        .bind(s)
                        .fetch_all(&self.pool),
                )
                .await
            }
            // Moderator view: pending first, then by age.
            None => {
                let query = format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions
                     ORDER BY (state = 'pending') DESC, created_at DESC"
                );
                self.deadline(sqlx::query_as::<_, Submission>(&query).fetch_all(&self.pool))
                    .await
            }
        }
    }

    /// The compare-and-swap at the heart of the moderation workflow: the
    /// `WHERE state = 'pending'` predicate makes the decision columns writable
    /// exactly once, no matter how many moderators race on the same row.
    async fn update_submission_state(
        &self,
        id: Uuid,
        new_state: SubmissionState,
        decided_by: &str,
    ) -> Result<Submission, ApiError> {
        if !new_state.is_terminal() {
            return Err(ApiError::Validation(
                "target state must be approved or rejected".into(),
            ));
        }

        let query = format!(
            "UPDATE submissions
             SET state = $2, decided_at = NOW(), decided_by = $3
             WHERE id = $1 AND state = 'pending'
             RETURNING {SUBMISSION_COLUMNS}"
        );

        let updated = self
            .deadline(
                sqlx::query_as::<_, Submission>(&query)
                    .bind(id)
                    .bind(new_state)
                    .bind(decided_by)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match updated {
            Some(submission) => Ok(submission),
            // Zero rows means either the id is unknown or the record already
            // left `pending`; a second lookup tells the caller which.
            None => match self.get_submission(id).await? {
                Some(_) => Err(ApiError::InvalidTransition(id)),
                None => Err(ApiError::NotFound(id)),
            },
        }
    }

    async fn delete_submission(&self, id: Uuid) -> Result<(), ApiError> {
        let result = self
            .deadline(
                sqlx::query("DELETE FROM submissions WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(id));
        }
        Ok(())
    }

    async fn create_message(&self, new: NewContactMessage) -> Result<ContactMessage, ApiError> {
        new.validate()?;

        let query = format!(
            "INSERT INTO contact_messages (id, name, email, subject, body, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'unread', NOW(), NOW())
             RETURNING {MESSAGE_COLUMNS}"
        );

        self.deadline(
            sqlx::query_as::<_, ContactMessage>(&query)
                .bind(Uuid::new_v4())
                .bind(new.name.trim())
                .bind(&new.email)
                .bind(new.subject.trim())
                .bind(new.body.trim())
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, ApiError> {
        let query =
            format!("SELECT {MESSAGE_COLUMNS} FROM contact_messages ORDER BY created_at DESC");

        self.deadline(sqlx::query_as::<_, ContactMessage>(&query).fetch_all(&self.pool))
            .await
    }

    /// Uses COALESCE so only the fields present in the patch touch their
    /// columns; absent fields keep their stored values.
    async fn update_message(
        &self,
        id: Uuid,
        patch: UpdateMessageRequest,
    ) -> Result<ContactMessage, ApiError> {
        let query = format!(
            "UPDATE contact_messages
             SET status = COALESCE($2, status),
                 admin_response = COALESCE($3, admin_response),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {MESSAGE_COLUMNS}"
        );

        self.deadline(
            sqlx::query_as::<_, ContactMessage>(&query)
                .bind(id)
                .bind(patch.status)
                .bind(patch.admin_response)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(ApiError::NotFound(id))
    }

    async fn stats(&self) -> Result<GalleryStats, ApiError> {
        let (total, pending, approved, rejected) = self
            .deadline(
                sqlx::query_as::<_, (i64, i64, i64, i64)>(
                    "SELECT COUNT(*),
                            COUNT(*) FILTER (WHERE state = 'pending'),
                            COUNT(*) FILTER (WHERE state = 'approved'),
                            COUNT(*) FILTER (WHERE state = 'rejected')
                     FROM submissions",
                )
                .fetch_one(&self.pool),
            )
            .await?;

        let unread = self
            .deadline(
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM contact_messages WHERE status = 'unread'",
                )
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(GalleryStats {
            total_submissions: total,
            pending_submissions: pending,
            approved_submissions: approved,
            rejected_submissions: rejected,
            unread_messages: unread,
        })
    }
}

/// MemoryRepository
///
/// In-memory implementation of the `Repository` trait used by the test suite
/// (and handy for local experiments without a database). The state-machine
/// write happens under a single write lock, which gives the same
/// first-writer-wins guarantee as the Postgres conditional update.
#[derive(Default)]
pub struct MemoryRepository {
    submissions: RwLock<HashMap<Uuid, Submission>>,
    messages: RwLock<HashMap<Uuid, ContactMessage>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, ApiError> {
        new.validate()?;

        let submission = Submission {
            id: Uuid::new_v4(),
            submitter_name: new.submitter_name.trim().to_string(),
            caption: new.caption.trim().to_string(),
            payload: new.payload,
            state: SubmissionState::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };

        self.submissions
            .write()
            .await
            .insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, ApiError> {
        Ok(self.submissions.read().await.get(&id).cloned())
    }

    async fn list_submissions(
        &self,
        state: Option<SubmissionState>,
    ) -> Result<Vec<Submission>, ApiError> {
        let mut items: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| state.is_none_or(|wanted| s.state == wanted))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update_submission_state(
        &self,
        id: Uuid,
        new_state: SubmissionState,
        decided_by: &str,
    ) -> Result<Submission, ApiError> {
        if !new_state.is_terminal() {
            return Err(ApiError::Validation(
                "target state must be approved or rejected".into(),
            ));
        }

        // Check-and-mutate under one write lock; racing callers serialize here.
        let mut submissions = self.submissions.write().await;
        let submission = submissions.get_mut(&id).ok_or(ApiError::NotFound(id))?;

        if submission.state != SubmissionState::Pending {
            return Err(ApiError::InvalidTransition(id));
        }

        submission.state = new_state;
        submission.decided_at = Some(Utc::now());
        submission.decided_by = Some(decided_by.to_string());
        Ok(submission.clone())
    }

    async fn delete_submission(&self, id: Uuid) -> Result<(), ApiError> {
        self.submissions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::NotFound(id))
    }

    async fn create_message(&self, new: NewContactMessage) -> Result<ContactMessage, ApiError> {
        new.validate()?;

        let now = Utc::now();
        let message = ContactMessage {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            email: new.email,
            subject: new.subject.trim().to_string(),
            body: new.body.trim().to_string(),
            status: MessageStatus::Unread,
            admin_response: None,
            created_at: now,
            updated_at: now,
        };

        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, ApiError> {
        let mut items: Vec<ContactMessage> =
            self.messages.read().await.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update_message(
        &self,
        id: Uuid,
        patch: UpdateMessageRequest,
    ) -> Result<ContactMessage, ApiError> {
        let mut messages = self.messages.write().await;
        let message = messages.get_mut(&id).ok_or(ApiError::NotFound(id))?;

        if let Some(status) = patch.status {
            message.status = status;
        }
        if let Some(response) = patch.admin_response {
            message.admin_response = Some(response);
        }
        message.updated_at = Utc::now();
        Ok(message.clone())
    }

    async fn stats(&self) -> Result<GalleryStats, ApiError> {
        let submissions = self.submissions.read().await;
        let messages = self.messages.read().await;

        let count_state = |wanted: SubmissionState| {
            submissions.values().filter(|s| s.state == wanted).count() as i64
        };

        Ok(GalleryStats {
            total_submissions: submissions.len() as i64,
            pending_submissions: count_state(SubmissionState::Pending),
            approved_submissions: count_state(SubmissionState::Approved),
            rejected_submissions: count_state(SubmissionState::Rejected),
            unread_messages: messages
                .values()
                .filter(|m| m.status == MessageStatus::Unread)
                .count() as i64,
        })
    }
}
