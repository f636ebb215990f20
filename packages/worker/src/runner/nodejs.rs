use std::time::Duration;

use async_trait::async_trait;
use common::Language;
use tokio::process::Command;

use super::{ExecutionOutcome, Pipeline, Runner, RunnerLimits, Workspace, execute_pipeline};

/// Runs `solution.js` with Node.js.
pub struct NodeRunner {
    node: String,
    limits: RunnerLimits,
}

impl NodeRunner {
    pub fn new(node: impl Into<String>, limits: RunnerLimits) -> Self {
        Self {
            node: node.into(),
            limits,
        }
    }
}

impl Pipeline for NodeRunner {
    fn language(&self) -> Language {
        Language::Nodejs
    }

    fn limits(&self) -> &RunnerLimits {
        &self.limits
    }

    fn source_file(&self, _code: &str) -> String {
        "solution.js".into()
    }

    fn build_command(&self, _workspace: &Workspace, _source: &str) -> Option<Command> {
        None
    }

    fn run_command(&self, workspace: &Workspace, source: &str) -> Command {
        let mut command = workspace.command(&self.node);
        command.arg(source);
        command
    }
}

#[async_trait]
impl Runner for NodeRunner {
    fn language(&self) -> Language {
        Language::Nodejs
    }

    async fn execute(&self, code: &str, stdin: &str, deadline: Duration) -> ExecutionOutcome {
        execute_pipeline(self, code, stdin, deadline).await
    }
}
