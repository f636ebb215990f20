//! Runner tests against the real toolchains. A test returns early when its
//! toolchain is not installed.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::gateway::InMemoryGateway;
use common::{DataGateway, Language, Submission, SubmissionKind, SubmissionStatus};
use serial_test::serial;
use worker::runner::{CppRunner, JavaRunner, NodeRunner, PythonRunner};
use worker::{ExecutionOutcome, Orchestrator, Runner, RunnerLimits, RunnerRegistry};

use crate::support::sum_problem;

const DEADLINE: Duration = Duration::from_secs(5);

fn installed(program: &str, version_flag: &str) -> bool {
    let found = Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok();
    if !found {
        eprintln!("skipping: {program} is not installed");
    }
    found
}

fn limits() -> RunnerLimits {
    RunnerLimits {
        compile_timeout: Duration::from_secs(60),
        max_output_bytes: 64 * 1024,
    }
}

fn python() -> PythonRunner {
    PythonRunner::new("python3", limits())
}

fn stdout_of(outcome: ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Success(run) => run.stdout,
        other => panic!("expected success, got {other:?}"),
    }
}

mod python {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_judges_sum_end_to_end() {
        if !installed("python3", "--version") {
            return;
        }
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.put_problem(sum_problem()).await;
        let mut registry = RunnerRegistry::new();
        registry.register(Arc::new(python()));
        let orchestrator = Orchestrator::new(gateway.clone(), Arc::new(registry), DEADLINE);

        let correct = Submission::new(
            "u",
            "sum",
            Language::Python,
            "print(sum(map(int, input().split())))",
            SubmissionKind::Submit,
        );
        let wrong = Submission::new("u", "sum", Language::Python, "print(8)", SubmissionKind::Submit);
        for submission in [&correct, &wrong] {
            gateway.save_submission(submission).await.unwrap();
            orchestrator.handle(submission).await.unwrap();
        }

        let correct = gateway.get_submission(&correct.id).await.unwrap().unwrap();
        assert_eq!(correct.status, SubmissionStatus::Completed);
        assert_eq!(correct.result.as_deref(), Some("7"));
        let wrong = gateway.get_submission(&wrong.id).await.unwrap().unwrap();
        assert_eq!(wrong.status, SubmissionStatus::WrongAnswer);
        assert_eq!(wrong.result.as_deref(), Some("8"));
    }

    #[tokio::test]
    #[serial]
    async fn test_non_zero_exit_is_still_a_completed_run() {
        if !installed("python3", "--version") {
            return;
        }
        let outcome = python()
            .execute("import sys\nprint(1)\nsys.exit(3)", "", DEADLINE)
            .await;
        let ExecutionOutcome::Success(run) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(run.stdout, "1\n");
        assert_eq!(run.exit_code, Some(3));
    }

    #[tokio::test]
    #[serial]
    async fn test_infinite_loop_times_out_promptly() {
        if !installed("python3", "--version") {
            return;
        }
        let deadline = Duration::from_secs(1);
        let started = Instant::now();
        let outcome = python().execute("while True:\n    pass\n", "", deadline).await;
        assert_eq!(outcome, ExecutionOutcome::Timeout);
        assert!(started.elapsed() < deadline + Duration::from_secs(3));
    }

    #[tokio::test]
    #[serial]
    async fn test_killed_by_signal_is_a_runtime_error() {
        if !installed("python3", "--version") {
            return;
        }
        let code = "import os, signal\nos.kill(os.getpid(), signal.SIGABRT)\n";
        let outcome = python().execute(code, "", DEADLINE).await;
        assert!(
            matches!(outcome, ExecutionOutcome::RuntimeError(_)),
            "got {outcome:?}"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_interpreter_is_an_infrastructure_error() {
        let runner = PythonRunner::new("/nonexistent/bin/python3", limits());
        let outcome = runner.execute("print(1)", "", DEADLINE).await;
        let ExecutionOutcome::InfrastructureError(message) = outcome else {
            panic!("expected infrastructure error, got {outcome:?}");
        };
        assert!(!message.contains("/nonexistent"));
    }
}

mod nodejs {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_reads_stdin_and_prints() {
        if !installed("node", "--version") {
            return;
        }
        let code = "const d = require('fs').readFileSync(0, 'utf8').trim().split(/\\s+/).map(Number);\n\
                    console.log(d[0] + d[1]);\n";
        let outcome = NodeRunner::new("node", limits()).execute(code, "3 4\n", DEADLINE).await;
        assert_eq!(stdout_of(outcome).trim(), "7");
    }
}

mod cpp {
    use super::*;

    fn gpp() -> CppRunner {
        CppRunner::new("g++", vec!["-std=c++17".into(), "-O2".into()], limits())
    }

    #[tokio::test]
    #[serial]
    async fn test_compiles_and_runs() {
        if !installed("g++", "--version") {
            return;
        }
        let code = "#include <iostream>\nint main() { int a, b; std::cin >> a >> b; std::cout << a + b << std::endl; }\n";
        let outcome = gpp().execute(code, "3 4\n", DEADLINE).await;
        assert_eq!(stdout_of(outcome), "7\n");
    }

    #[tokio::test]
    #[serial]
    async fn test_compile_error_never_runs() {
        if !installed("g++", "--version") {
            return;
        }
        let outcome = gpp().execute("int main( {", "", DEADLINE).await;
        let ExecutionOutcome::CompileError(diagnostics) = outcome else {
            panic!("expected compile error, got {outcome:?}");
        };
        assert!(diagnostics.contains("solution.cpp"));
        assert!(!diagnostics.contains("/tmp"));
    }

    #[tokio::test]
    #[serial]
    async fn test_crash_is_a_runtime_error() {
        if !installed("g++", "--version") {
            return;
        }
        let code = "#include <csignal>\nint main() { std::raise(SIGSEGV); }\n";
        let outcome = gpp().execute(code, "", DEADLINE).await;
        assert!(
            matches!(outcome, ExecutionOutcome::RuntimeError(_)),
            "got {outcome:?}"
        );
    }
}

mod java {
    use super::*;

    #[tokio::test]
    #[serial]
    async fn test_runs_the_declared_public_class() {
        if !installed("javac", "-version") || !installed("java", "-version") {
            return;
        }
        let code = "import java.util.Scanner;\n\
                    public class Main {\n\
                        public static void main(String[] args) {\n\
                            Scanner in = new Scanner(System.in);\n\
                            System.out.println(in.nextInt() + in.nextInt());\n\
                        }\n\
                    }\n";
        let outcome = JavaRunner::new("javac", "java", limits())
            .execute(code, "3 4\n", Duration::from_secs(10))
            .await;
        assert_eq!(stdout_of(outcome).trim(), "7");
    }
}
