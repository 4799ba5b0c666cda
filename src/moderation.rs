use uuid::Uuid;

use crate::{
    auth::{Role, Session, authorize},
    error::ApiError,
    models::{Submission, SubmissionState},
    repository::RepositoryState,
};

/// ModerationService
///
/// Glue between the Identity Gate and the Submission Repository: the only
/// component allowed to move submissions through the state machine or remove
/// them. Every operation authorizes the caller as a moderator first, then
/// delegates to the repository and propagates its error kinds unchanged, so
/// the HTTP layer sees `NotFound`/`InvalidTransition` exactly as the
/// repository raised them.
#[derive(Clone)]
pub struct ModerationService {
    repo: RepositoryState,
}

impl ModerationService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// `pending -> approved`. The deciding moderator is recorded on the row.
    pub async fn approve(&self, session: &Session, id: Uuid) -> Result<Submission, ApiError> {
        authorize(Some(session), Role::Moderator)?;

        let submission = self
            .repo
            .update_submission_state(id, SubmissionState::Approved, &session.subject_id)
            .await?;

        tracing::info!(%id, moderator = %session.subject_id, "submission approved");
        Ok(submission)
    }

    /// `pending -> rejected`.
    pub async fn reject(&self, session: &Session, id: Uuid) -> Result<Submission, ApiError> {
        authorize(Some(session), Role::Moderator)?;

        let submission = self
            .repo
            .update_submission_state(id, SubmissionState::Rejected, &session.subject_id)
            .await?;

        tracing::info!(%id, moderator = %session.subject_id, "submission rejected");
        Ok(submission)
    }

    /// Removes a submission outright, in any state. This is deletion of the
    /// record, not a state transition, so it is legal on decided submissions.
    pub async fn remove(&self, session: &Session, id: Uuid) -> Result<(), ApiError> {
        authorize(Some(session), Role::Moderator)?;

        self.repo.delete_submission(id).await?;

        tracing::info!(%id, moderator = %session.subject_id, "submission deleted");
        Ok(())
    }

    /// Moderator listing: unrestricted by state (`None`) or filtered.
    pub async fn list(
        &self,
        session: &Session,
        state: Option<SubmissionState>,
    ) -> Result<Vec<Submission>, ApiError> {
        authorize(Some(session), Role::Moderator)?;
        self.repo.list_submissions(state).await
    }

    /// Moderator detail lookup, visible regardless of state.
    pub async fn get(&self, session: &Session, id: Uuid) -> Result<Option<Submission>, ApiError> {
        authorize(Some(session), Role::Moderator)?;
        self.repo.get_submission(id).await
    }
}
