pub mod config;
pub mod gateway;
pub mod intake;
pub mod language;
pub mod problem;
pub mod retry;
pub mod submission;
pub mod submission_status;

pub use gateway::{DataGateway, GatewayError};
pub use language::Language;
pub use problem::{Problem, TestCase};
pub use submission::{Submission, SubmissionKind};
pub use submission_status::SubmissionStatus;
