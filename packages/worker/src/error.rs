use common::GatewayError;
use thiserror::Error;

/// Failure of one judging attempt.
///
/// Faults of the submitted code are verdicts, not errors; only platform
/// failures end up here.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The platform failed to run the submission. The `error` verdict has
    /// already been persisted.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl JudgeError {
    /// Whether re-running the attempt may succeed.
    ///
    /// A write refused by the state machine will be refused again.
    pub fn is_retryable(&self) -> bool {
        match self {
            JudgeError::Gateway(e) => e.refused_from().is_none(),
            JudgeError::Infrastructure(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("MQ error: {0}")]
    Mq(String),
}

impl From<mq::error::MqError> for WorkerError {
    fn from(e: mq::error::MqError) -> Self {
        WorkerError::Mq(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
