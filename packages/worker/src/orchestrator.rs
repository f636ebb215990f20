use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{DataGateway, Problem, Submission, SubmissionStatus};
use tracing::{error, info, instrument, warn};

use crate::comparator::{Comparison, compare};
use crate::error::JudgeError;
use crate::registry::RunnerRegistry;
use crate::runner::ExecutionOutcome;

/// Stored result of a run that exceeded its deadline.
pub const TIMEOUT_MESSAGE: &str = "execution timed out";
/// Prefix marking results caused by the platform rather than the submission.
pub const INTERNAL_ERROR_PREFIX: &str = "internal error: ";
/// Stored result of a program that printed nothing.
pub const NO_OUTPUT: &str = "(no output)";

/// What a judging attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeDisposition {
    /// The submission was judged and this final status was persisted.
    Judged(SubmissionStatus),
    /// The submission was already final; nothing was run or written.
    AlreadyFinal(SubmissionStatus),
}

/// Drives submissions through `pending -> running -> final`.
pub struct Orchestrator {
    gateway: Arc<dyn DataGateway>,
    registry: Arc<RunnerRegistry>,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        registry: Arc<RunnerRegistry>,
        deadline: Duration,
    ) -> Self {
        Self {
            gateway,
            registry,
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Judge a delivered submission event, loading its problem first.
    #[instrument(skip_all, fields(submission_id = %submission.id, language = %submission.language))]
    pub async fn handle(&self, submission: &Submission) -> Result<JudgeDisposition, JudgeError> {
        if let Some(status) = self.begin(submission).await? {
            return Ok(JudgeDisposition::AlreadyFinal(status));
        }

        let problem = match self.gateway.get_problem(&submission.problem_id).await {
            Ok(problem) => problem,
            Err(e) if e.is_not_found() => {
                warn!(problem_id = %submission.problem_id, "Problem not found");
                let message = format!("problem not found: {}", submission.problem_id);
                self.finish(&submission.id, SubmissionStatus::Error, &message)
                    .await?;
                return Ok(JudgeDisposition::Judged(SubmissionStatus::Error));
            }
            Err(e) => return Err(e.into()),
        };

        self.run_and_record(submission, &problem).await
    }

    /// Judge `submission` against `problem`.
    ///
    /// Persists `running` before anything executes, then exactly one final
    /// status. A submission that is already final is left untouched.
    #[instrument(skip_all, fields(submission_id = %submission.id, language = %submission.language))]
    pub async fn judge(
        &self,
        submission: &Submission,
        problem: &Problem,
    ) -> Result<JudgeDisposition, JudgeError> {
        if let Some(status) = self.begin(submission).await? {
            return Ok(JudgeDisposition::AlreadyFinal(status));
        }
        self.run_and_record(submission, problem).await
    }

    /// Mark a submission that cannot be judged as `error`.
    ///
    /// Missing and already final submissions are left alone.
    pub async fn reject(&self, id: &str, reason: &str) -> Result<(), JudgeError> {
        let Some(stored) = self.gateway.get_submission(id).await? else {
            warn!(submission_id = %id, reason, "Rejected event for unknown submission");
            return Ok(());
        };
        if stored.status.is_final() {
            info!(submission_id = %id, status = %stored.status, "Submission already final, skipping");
            return Ok(());
        }
        match self
            .gateway
            .update_submission_status(id, SubmissionStatus::Running, None)
            .await
        {
            Ok(()) => {}
            Err(e) if e.refused_from().is_some() => {
                info!(submission_id = %id, error = %e, "Submission finished concurrently, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        self.finish(id, SubmissionStatus::Error, reason).await?;
        warn!(submission_id = %id, reason, "Submission rejected");
        Ok(())
    }

    /// Skip check and the durable `running` write.
    ///
    /// Returns the stored status when the submission is already final,
    /// including when it became final between the read and the write.
    async fn begin(&self, submission: &Submission) -> Result<Option<SubmissionStatus>, JudgeError> {
        match self.gateway.get_submission(&submission.id).await? {
            Some(stored) if !stored.status.can_transition_to(SubmissionStatus::Running) => {
                info!(status = %stored.status, "Submission already final, skipping");
                return Ok(Some(stored.status));
            }
            Some(_) => {}
            None => {
                warn!("Submission record missing, storing it from the event");
                let mut record = submission.clone();
                record.status = SubmissionStatus::Pending;
                record.result = None;
                if record.created_at == 0 {
                    record.created_at = Utc::now().timestamp();
                    record.updated_at = record.created_at;
                }
                self.gateway.save_submission(&record).await?;
            }
        }

        if let Err(e) = self
            .gateway
            .update_submission_status(&submission.id, SubmissionStatus::Running, None)
            .await
        {
            // Another attempt reached a final status after our read.
            if let Some(status) = e.refused_from() {
                info!(%status, "Submission finished concurrently, skipping");
                return Ok(Some(status));
            }
            return Err(e.into());
        }
        info!(status = %SubmissionStatus::Running, "Submission running");
        Ok(None)
    }

    async fn run_and_record(
        &self,
        submission: &Submission,
        problem: &Problem,
    ) -> Result<JudgeDisposition, JudgeError> {
        let outcome = match self.registry.get(submission.language) {
            Ok(runner) => {
                let case = problem.test_case(submission.kind);
                let started = Instant::now();
                let outcome = runner
                    .execute(&submission.code, case.input, self.deadline)
                    .await;
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    outcome = outcome_label(&outcome),
                    "Execution finished"
                );
                outcome
            }
            Err(e) => ExecutionOutcome::InfrastructureError(e.to_string()),
        };

        let expected = problem.test_case(submission.kind).expected_output;
        let (status, result) = verdict_for(&outcome, expected);
        self.finish(&submission.id, status, &result).await?;

        if let ExecutionOutcome::InfrastructureError(message) = outcome {
            error!(error = %message, "Judging failed on the platform side");
            return Err(JudgeError::Infrastructure(message));
        }
        Ok(JudgeDisposition::Judged(status))
    }

    async fn finish(
        &self,
        id: &str,
        status: SubmissionStatus,
        result: &str,
    ) -> Result<(), JudgeError> {
        if let Err(e) = self
            .gateway
            .update_submission_status(id, status, Some(result))
            .await
        {
            error!(submission_id = %id, %status, error = %e, "Failed to persist verdict");
            return Err(e.into());
        }
        info!(submission_id = %id, %status, "Submission judged");
        Ok(())
    }
}

/// Final status and stored result for an execution outcome.
pub fn verdict_for(outcome: &ExecutionOutcome, expected: &str) -> (SubmissionStatus, String) {
    match outcome {
        ExecutionOutcome::Success(run) => {
            let status = match compare(&run.stdout, expected) {
                Comparison::Match => SubmissionStatus::Completed,
                Comparison::Mismatch => SubmissionStatus::WrongAnswer,
            };
            (status, displayed_output(&run.stdout))
        }
        ExecutionOutcome::CompileError(diagnostics) => (
            SubmissionStatus::Error,
            format!("compilation error: {diagnostics}"),
        ),
        ExecutionOutcome::RuntimeError(diagnostics) => (
            SubmissionStatus::Error,
            format!("runtime error: {diagnostics}"),
        ),
        ExecutionOutcome::Timeout => (SubmissionStatus::Error, TIMEOUT_MESSAGE.to_string()),
        ExecutionOutcome::InfrastructureError(message) => (
            SubmissionStatus::Error,
            format!("{INTERNAL_ERROR_PREFIX}{message}"),
        ),
    }
}

fn displayed_output(stdout: &str) -> String {
    match stdout.trim() {
        "" => NO_OUTPUT.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn outcome_label(outcome: &ExecutionOutcome) -> &'static str {
    match outcome {
        ExecutionOutcome::Success(_) => "success",
        ExecutionOutcome::CompileError(_) => "compile_error",
        ExecutionOutcome::RuntimeError(_) => "runtime_error",
        ExecutionOutcome::Timeout => "timeout",
        ExecutionOutcome::InfrastructureError(_) => "infrastructure_error",
    }
}
