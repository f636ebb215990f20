use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default prefix for per-language submission topics.
pub const DEFAULT_TOPIC_PREFIX: &str = "learncode";

/// Runtimes a submission may target.
///
/// The set is closed: adding a language means adding a variant here and a
/// runner for it in the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Nodejs,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: &'static [Language] = &[Self::Python, Self::Nodejs, Self::Cpp, Self::Java];

    /// Wire tag used in payloads, config and topic names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Nodejs => "nodejs",
            Self::Cpp => "cpp",
            Self::Java => "java",
        }
    }

    /// Topic the intake publishes this language's submissions to.
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing a language tag that is not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLanguageError {
    invalid: String,
}

impl ParseLanguageError {
    pub fn tag(&self) -> &str {
        &self.invalid
    }
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported language '{}'. Supported languages: {}",
            self.invalid,
            Language::ALL
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Self::Python),
            "nodejs" => Ok(Self::Nodejs),
            "cpp" => Ok(Self::Cpp),
            "java" => Ok(Self::Java),
            _ => Err(ParseLanguageError {
                invalid: s.to_string(),
            }),
        }
    }
}
