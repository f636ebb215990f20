use std::time::Duration;

use async_trait::async_trait;
use common::Language;
use tokio::process::Command;

use super::{ExecutionOutcome, Pipeline, Runner, RunnerLimits, Workspace, execute_pipeline};

const BINARY: &str = "solution";

/// Compiles `solution.cpp` to a native binary, then runs it.
pub struct CppRunner {
    compiler: String,
    flags: Vec<String>,
    limits: RunnerLimits,
}

impl CppRunner {
    pub fn new(compiler: impl Into<String>, flags: Vec<String>, limits: RunnerLimits) -> Self {
        Self {
            compiler: compiler.into(),
            flags,
            limits,
        }
    }
}

impl Pipeline for CppRunner {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn limits(&self) -> &RunnerLimits {
        &self.limits
    }

    fn source_file(&self, _code: &str) -> String {
        "solution.cpp".into()
    }

    fn build_command(&self, workspace: &Workspace, source: &str) -> Option<Command> {
        let mut command = workspace.command(&self.compiler);
        command.args(&self.flags).arg("-o").arg(BINARY).arg(source);
        Some(command)
    }

    fn run_command(&self, workspace: &Workspace, _source: &str) -> Command {
        workspace.command(workspace.file(BINARY))
    }
}

#[async_trait]
impl Runner for CppRunner {
    fn language(&self) -> Language {
        Language::Cpp
    }

    async fn execute(&self, code: &str, stdin: &str, deadline: Duration) -> ExecutionOutcome {
        execute_pipeline(self, code, stdin, deadline).await
    }
}
