use async_trait::async_trait;

use super::error::GatewayError;
use crate::{Problem, Submission, SubmissionStatus};

/// Typed access to the key-value store holding problems and submissions.
///
/// Every write is keyed by id and overwrites, so repeating a write is harmless.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Fetch a problem by id.
    async fn get_problem(&self, id: &str) -> Result<Problem, GatewayError>;

    /// Store a submission, replacing any record with the same id.
    async fn save_submission(&self, submission: &Submission) -> Result<(), GatewayError>;

    /// Fetch a submission by id. Returns `Ok(None)` if it does not exist.
    async fn get_submission(&self, id: &str) -> Result<Option<Submission>, GatewayError>;

    /// Set the status of an existing submission and refresh `updated_at`.
    ///
    /// When `result` is present it is written in the same atomic update.
    /// Fails with `NotFound` if the submission does not exist, and with
    /// `TransitionRefused` when the stored status does not accept `status`
    /// (see [`SubmissionStatus::accepts_write`]). The check and the write
    /// happen atomically.
    async fn update_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        result: Option<&str>,
    ) -> Result<(), GatewayError>;
}
