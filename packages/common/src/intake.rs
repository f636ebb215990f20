//! Submission intake: validates a request, persists it as pending and hands
//! it to the judge through the language's topic.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::gateway::{DataGateway, GatewayError};
use crate::{Language, Submission, SubmissionKind, SubmissionStatus};

/// Maximum accepted source size in bytes.
pub const DEFAULT_MAX_CODE_SIZE: usize = 64 * 1024;

/// An inbound submission request.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmitRequest {
    pub problem_id: String,
    pub language: String,
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: SubmissionKind,
}

/// Returned to the caller once the submission is queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub submission_id: String,
    pub status: SubmissionStatus,
}

/// A verified caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
}

/// Maps a bearer credential to a caller identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns `None` when the credential is not valid.
    async fn verify(&self, credential: &str) -> Option<Identity>;
}

#[derive(Debug, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// Hands a persisted submission to the judge.
#[async_trait]
pub trait SubmissionPublisher: Send + Sync {
    async fn publish(&self, submission: &Submission) -> Result<(), PublishError>;
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("missing or invalid credential")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnsupportedLanguage(#[from] crate::language::ParseLanguageError),

    #[error("problem not found: {0}")]
    ProblemNotFound(String),

    #[error(transparent)]
    Gateway(GatewayError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<GatewayError> for IntakeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { kind: "problem", id } => Self::ProblemNotFound(id),
            other => Self::Gateway(other),
        }
    }
}

pub struct Intake {
    gateway: Arc<dyn DataGateway>,
    verifier: Arc<dyn IdentityVerifier>,
    publisher: Arc<dyn SubmissionPublisher>,
    max_code_size: usize,
}

impl Intake {
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        verifier: Arc<dyn IdentityVerifier>,
        publisher: Arc<dyn SubmissionPublisher>,
    ) -> Self {
        Self {
            gateway,
            verifier,
            publisher,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
        }
    }

    pub fn with_max_code_size(mut self, max_code_size: usize) -> Self {
        self.max_code_size = max_code_size;
        self
    }

    /// Accept a submission on behalf of the holder of `credential`.
    ///
    /// On success the submission is stored as `pending` and published to its
    /// language topic. A publish failure leaves the stored record pending.
    #[instrument(skip_all, fields(problem_id = %request.problem_id, language = %request.language))]
    pub async fn submit(
        &self,
        credential: Option<&str>,
        request: SubmitRequest,
    ) -> Result<SubmitReceipt, IntakeError> {
        let credential = credential
            .map(|c| c.strip_prefix("Bearer ").unwrap_or(c).trim())
            .filter(|c| !c.is_empty())
            .ok_or(IntakeError::Unauthorized)?;
        let identity = self
            .verifier
            .verify(credential)
            .await
            .ok_or(IntakeError::Unauthorized)?;

        let language = validate_request(&request, self.max_code_size)?;

        // Confirms the problem exists before anything is stored.
        self.gateway.get_problem(&request.problem_id).await?;

        let submission = Submission::new(
            identity.user_id,
            request.problem_id,
            language,
            request.code,
            request.kind,
        );
        self.gateway.save_submission(&submission).await?;

        if let Err(e) = self.publisher.publish(&submission).await {
            warn!(submission_id = %submission.id, error = %e, "Submission stored but not queued");
            return Err(e.into());
        }

        info!(
            submission_id = %submission.id,
            kind = submission.kind.as_str(),
            "Submission queued"
        );

        Ok(SubmitReceipt {
            submission_id: submission.id,
            status: SubmissionStatus::Pending,
        })
    }
}

/// Validate a submission request and resolve its language.
pub fn validate_request(request: &SubmitRequest, max_code_size: usize) -> Result<Language, IntakeError> {
    if request.problem_id.trim().is_empty() {
        return Err(IntakeError::Validation("Problem id is required".into()));
    }

    let language = request.language.trim().parse::<Language>()?;

    if request.code.trim().is_empty() {
        return Err(IntakeError::Validation("Code cannot be empty".into()));
    }
    if request.code.len() > max_code_size {
        return Err(IntakeError::Validation(format!(
            "Code size ({} bytes) exceeds maximum ({} bytes)",
            request.code.len(),
            max_code_size
        )));
    }

    Ok(language)
}
