use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission during the judging lifecycle.
///
/// Statuses only move forward: `Pending -> Running -> {Completed, WrongAnswer, Error}`.
/// Final statuses are sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Persisted by intake, waiting for a worker.
    Pending,
    /// A worker has picked the submission up.
    Running,
    /// Program output matched the expected output.
    Completed,
    /// Program ran to completion but its output did not match.
    WrongAnswer,
    /// Compile error, runtime error, timeout or judge failure.
    Error,
}

impl SubmissionStatus {
    /// Returns true if this is a final status (judging is complete).
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Running -> Running` is allowed so a redelivered event can take over
    /// an attempt that never reached a final status.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Running, Self::Running) => true,
            (Self::Running, next) => next.is_final(),
            _ => false,
        }
    }

    /// Whether a stored `self` may be overwritten with `next`.
    ///
    /// Lifecycle moves, plus final over final so a redelivered attempt can
    /// rewrite the same verdict. A final status never goes back to
    /// `Pending` or `Running`.
    pub fn accepts_write(&self, next: SubmissionStatus) -> bool {
        self.can_transition_to(next) || (self.is_final() && next.is_final())
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::WrongAnswer,
        Self::Error,
    ];

    /// All final statuses.
    pub const FINAL: &'static [SubmissionStatus] =
        &[Self::Completed, Self::WrongAnswer, Self::Error];

    /// Returns the string representation (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::WrongAnswer => "wrong_answer",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "wrong_answer" => Ok(Self::WrongAnswer),
            "error" => Ok(Self::Error),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
