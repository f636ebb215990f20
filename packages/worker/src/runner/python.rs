use std::time::Duration;

use async_trait::async_trait;
use common::Language;
use tokio::process::Command;

use super::{ExecutionOutcome, Pipeline, Runner, RunnerLimits, Workspace, execute_pipeline};

/// Runs `solution.py` with the configured interpreter.
pub struct PythonRunner {
    interpreter: String,
    limits: RunnerLimits,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>, limits: RunnerLimits) -> Self {
        Self {
            interpreter: interpreter.into(),
            limits,
        }
    }
}

impl Pipeline for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn limits(&self) -> &RunnerLimits {
        &self.limits
    }

    fn source_file(&self, _code: &str) -> String {
        "solution.py".into()
    }

    fn build_command(&self, _workspace: &Workspace, _source: &str) -> Option<Command> {
        None
    }

    fn run_command(&self, workspace: &Workspace, source: &str) -> Command {
        let mut command = workspace.command(&self.interpreter);
        command.arg(source);
        command
    }
}

#[async_trait]
impl Runner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    async fn execute(&self, code: &str, stdin: &str, deadline: Duration) -> ExecutionOutcome {
        execute_pipeline(self, code, stdin, deadline).await
    }
}
