use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Language, SubmissionStatus};

/// Whether a submission is a sample run or a scored attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionKind {
    /// Judged against the problem's sample test.
    Run,
    /// Judged against the problem's scored test.
    #[default]
    Submit,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "RUN",
            Self::Submit => "SUBMIT",
        }
    }
}

/// A submission record. This is also the payload of a judge event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub problem_id: String,
    pub language: Language,
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: SubmissionKind,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub created_at: i64,
    /// Unix timestamp (seconds), refreshed on every status change.
    #[serde(default)]
    pub updated_at: i64,
}

impl Submission {
    /// Create a pending submission with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        problem_id: impl Into<String>,
        language: Language,
        code: impl Into<String>,
        kind: SubmissionKind,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            problem_id: problem_id.into(),
            language,
            code: code.into(),
            kind,
            status: SubmissionStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}
