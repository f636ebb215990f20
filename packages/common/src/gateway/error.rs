use thiserror::Error;

use crate::SubmissionStatus;

/// Errors returned by a data gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested problem or submission does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The backing store failed or is unreachable.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The stored status does not accept the requested one.
    #[error("submission {id}: cannot move from {from} to {to}")]
    TransitionRefused {
        id: String,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GatewayError {
    pub fn problem_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "problem",
            id: id.into(),
        }
    }

    pub fn submission_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "submission",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The stored status when a write was refused by the state machine.
    pub fn refused_from(&self) -> Option<SubmissionStatus> {
        match self {
            Self::TransitionRefused { from, .. } => Some(*from),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
