use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{PublicSubmission, SubmissionState},
    repository::RepositoryState,
};

/// ListingService
///
/// The public, unauthenticated view of the gallery. Only approved submissions
/// are ever fetched, and the result is projected into [`PublicSubmission`] so
/// the deciding moderator's identity never reaches anonymous callers. The
/// projection is a distinct type rather than a skipped field, making the
/// omission structural.
#[derive(Clone)]
pub struct ListingService {
    repo: RepositoryState,
}

impl ListingService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn list_approved(&self) -> Result<Vec<PublicSubmission>, ApiError> {
        let approved = self
            .repo
            .list_submissions(Some(SubmissionState::Approved))
            .await?;

        Ok(approved.into_iter().map(PublicSubmission::from).collect())
    }

    /// Detail view for anonymous callers: anything not approved does not
    /// exist from their perspective.
    pub async fn get_approved(&self, id: Uuid) -> Result<Option<PublicSubmission>, ApiError> {
        let submission = self.repo.get_submission(id).await?;

        Ok(submission
            .filter(|s| s.state == SubmissionState::Approved)
            .map(PublicSubmission::from))
    }
}
