use serde::{Deserialize, Serialize};

use crate::submission::SubmissionKind;

/// A problem definition. Read-only to the judge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    /// Stdin payload for scored runs.
    pub input: String,
    /// Expected stdout for scored runs.
    pub output: String,
    /// Sample stdin shown to users and used for `RUN` submissions.
    #[serde(default)]
    pub example_input: String,
    #[serde(default)]
    pub example_output: String,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// The stdin/expected-output pair a submission is judged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestCase<'a> {
    pub input: &'a str,
    pub expected_output: &'a str,
}

impl Problem {
    /// Minimal problem with only the scored test filled in.
    pub fn new(id: impl Into<String>, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            difficulty: String::new(),
            input: input.into(),
            output: output.into(),
            example_input: String::new(),
            example_output: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Select the test for a submission kind.
    ///
    /// `Run` uses the sample test when the problem has one; everything else
    /// uses the scored test.
    pub fn test_case(&self, kind: SubmissionKind) -> TestCase<'_> {
        match kind {
            SubmissionKind::Run if !self.example_input.is_empty() => TestCase {
                input: &self.example_input,
                expected_output: &self.example_output,
            },
            _ => TestCase {
                input: &self.input,
                expected_output: &self.output,
            },
        }
    }
}
