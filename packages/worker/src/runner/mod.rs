//! Language runners: build and run untrusted code under a deadline.

pub mod cpp;
pub mod java;
pub mod nodejs;
pub mod process;
pub mod python;
pub mod workspace;

use std::os::unix::process::ExitStatusExt;
use std::time::Duration;

use async_trait::async_trait;
use common::Language;
use tokio::process::Command;
use tracing::{debug, warn};

pub use cpp::CppRunner;
pub use java::JavaRunner;
pub use nodejs::NodeRunner;
pub use python::PythonRunner;
pub use workspace::Workspace;

use process::{ProcessResult, run_with_deadline};

/// Raw result of one execution, before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The program ran to completion. A non-zero exit code still lands here.
    Success(RunOutput),
    /// The build step failed; the program was never started.
    CompileError(String),
    /// The program was terminated by a signal.
    RuntimeError(String),
    /// The program exceeded its deadline and was killed.
    Timeout,
    /// The judge could not prepare or launch the execution.
    InfrastructureError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Per-language execution strategy.
#[async_trait]
pub trait Runner: Send + Sync {
    fn language(&self) -> Language;

    /// Build (if needed) and run `code` with `stdin`, enforcing `deadline` on
    /// the run step only.
    async fn execute(&self, code: &str, stdin: &str, deadline: Duration) -> ExecutionOutcome;
}

/// Bounds shared by every runner.
#[derive(Debug, Clone)]
pub struct RunnerLimits {
    /// Wall-clock limit for the build step.
    pub compile_timeout: Duration,
    /// Bytes kept per captured stream.
    pub max_output_bytes: usize,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(30),
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// The language-specific parts of the build/run pipeline.
pub(crate) trait Pipeline: Send + Sync {
    fn language(&self) -> Language;
    fn limits(&self) -> &RunnerLimits;
    /// File name the submitted code is written to.
    fn source_file(&self, code: &str) -> String;
    /// Build command, or `None` when the source runs directly.
    fn build_command(&self, workspace: &Workspace, source: &str) -> Option<Command>;
    fn run_command(&self, workspace: &Workspace, source: &str) -> Command;
}

/// Run the full pipeline for one execution in a fresh workspace.
pub(crate) async fn execute_pipeline<P: Pipeline>(
    pipeline: &P,
    code: &str,
    stdin: &str,
    deadline: Duration,
) -> ExecutionOutcome {
    let language = pipeline.language();
    let limits = pipeline.limits();

    let workspace = match Workspace::create(language) {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%language, error = %e, "Failed to create workspace");
            return ExecutionOutcome::InfrastructureError(format!(
                "could not create workspace ({})",
                e.kind()
            ));
        }
    };

    let source = pipeline.source_file(code);
    if let Err(e) = workspace.write_file(&source, code).await {
        warn!(%language, error = %e, "Failed to write source file");
        return ExecutionOutcome::InfrastructureError(format!(
            "could not write source file ({})",
            e.kind()
        ));
    }

    if let Some(build) = pipeline.build_command(&workspace, &source) {
        match run_with_deadline(build, "", limits.compile_timeout, limits.max_output_bytes).await {
            Err(e) => {
                warn!(%language, error = %e, "Failed to launch compiler");
                return ExecutionOutcome::InfrastructureError(format!(
                    "could not launch {language} compiler: {e}"
                ));
            }
            Ok(ProcessResult::TimedOut { .. }) => {
                return ExecutionOutcome::CompileError(format!(
                    "compilation timed out after {}s",
                    limits.compile_timeout.as_secs()
                ));
            }
            Ok(ProcessResult::Exited(out)) if !out.status.success() => {
                let mut diagnostics = out.stderr;
                diagnostics.push_str(&out.stdout);
                let diagnostics = workspace.scrub(diagnostics.trim_end());
                return ExecutionOutcome::CompileError(if diagnostics.is_empty() {
                    format!("compiler exited with {}", describe_status(&out.status))
                } else {
                    diagnostics
                });
            }
            Ok(ProcessResult::Exited(out)) => {
                debug!(%language, elapsed_ms = out.elapsed.as_millis() as u64, "Build finished");
            }
        }
    }

    let run = pipeline.run_command(&workspace, &source);
    match run_with_deadline(run, stdin, deadline, limits.max_output_bytes).await {
        Err(e) => {
            warn!(%language, error = %e, "Failed to launch program");
            ExecutionOutcome::InfrastructureError(format!("could not launch {language} runtime: {e}"))
        }
        Ok(ProcessResult::TimedOut { .. }) => ExecutionOutcome::Timeout,
        Ok(ProcessResult::Exited(out)) => match out.status.signal() {
            Some(_) => {
                let stderr = workspace.scrub(out.stderr.trim_end());
                ExecutionOutcome::RuntimeError(if stderr.is_empty() {
                    format!("program {}", describe_status(&out.status))
                } else {
                    stderr
                })
            }
            None => ExecutionOutcome::Success(RunOutput {
                stdout: out.stdout,
                stderr: workspace.scrub(&out.stderr),
                exit_code: out.status.code(),
            }),
        },
    }
}

fn describe_status(status: &std::process::ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => match nix::sys::signal::Signal::try_from(signal) {
            Ok(sig) => format!("terminated by signal {signal} ({})", sig.as_str()),
            Err(_) => format!("terminated by signal {signal}"),
        },
        (None, None) => "unknown status".to_string(),
    }
}
