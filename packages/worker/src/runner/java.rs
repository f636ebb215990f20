use std::time::Duration;

use async_trait::async_trait;
use common::Language;
use tokio::process::Command;

use super::{ExecutionOutcome, Pipeline, Runner, RunnerLimits, Workspace, execute_pipeline};

/// Class name used when the source declares no public class.
pub const DEFAULT_CLASS: &str = "Solution";

/// Compiles the submission with `javac` and runs its public class.
pub struct JavaRunner {
    javac: String,
    java: String,
    limits: RunnerLimits,
}

impl JavaRunner {
    pub fn new(javac: impl Into<String>, java: impl Into<String>, limits: RunnerLimits) -> Self {
        Self {
            javac: javac.into(),
            java: java.into(),
            limits,
        }
    }
}

/// Name of the first `public class` declared in `code`.
pub fn detect_class_name(code: &str) -> Option<&str> {
    code.lines().find_map(|line| {
        let rest = line.trim_start();
        let rest = rest.strip_prefix("public")?;
        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix("final")
            .map(str::trim_start)
            .unwrap_or(rest);
        let rest = rest.strip_prefix("class")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        (!name.is_empty()).then_some(name)
    })
}

fn class_name(code: &str) -> &str {
    detect_class_name(code).unwrap_or(DEFAULT_CLASS)
}

impl Pipeline for JavaRunner {
    fn language(&self) -> Language {
        Language::Java
    }

    fn limits(&self) -> &RunnerLimits {
        &self.limits
    }

    fn source_file(&self, code: &str) -> String {
        format!("{}.java", class_name(code))
    }

    fn build_command(&self, workspace: &Workspace, source: &str) -> Option<Command> {
        let mut command = workspace.command(&self.javac);
        command.args(["-encoding", "UTF-8", "-d", "."]).arg(source);
        Some(command)
    }

    fn run_command(&self, workspace: &Workspace, source: &str) -> Command {
        let class = source.strip_suffix(".java").unwrap_or(DEFAULT_CLASS);
        let mut command = workspace.command(&self.java);
        command.args(["-cp", "."]).arg(class);
        command
    }
}

#[async_trait]
impl Runner for JavaRunner {
    fn language(&self) -> Language {
        Language::Java
    }

    async fn execute(&self, code: &str, stdin: &str, deadline: Duration) -> ExecutionOutcome {
        execute_pipeline(self, code, stdin, deadline).await
    }
}
