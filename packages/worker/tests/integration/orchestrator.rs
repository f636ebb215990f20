use common::retry::RetryPolicy;
use common::{DataGateway, Language, Submission, SubmissionKind, SubmissionStatus};
use worker::consumer::{Event, process_event};
use worker::orchestrator::{INTERNAL_ERROR_PREFIX, JudgeDisposition};
use worker::runner::ExecutionOutcome;
use worker::JudgeError;

use crate::support::{FakeRunner, Harness, sum_problem};

use SubmissionStatus::{Completed, Error, Pending, Running, WrongAnswer};

fn fast_retries(max_retries: u8) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

mod state_machine {
    use super::*;

    #[tokio::test]
    async fn test_matching_output_completes() {
        let runner = FakeRunner::printing(Language::Python, "7\n");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;

        let disposition = h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(disposition, JudgeDisposition::Judged(Completed));
        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, Completed);
        assert_eq!(stored.result.as_deref(), Some("7"));
        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Completed]
        );
        assert_eq!(runner.stdins(), vec!["3 4\n".to_string()]);
    }

    #[tokio::test]
    async fn test_mismatch_is_wrong_answer_with_actual_output() {
        let runner = FakeRunner::printing(Language::Python, "8\n");
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;

        h.orchestrator.handle(&submission).await.unwrap();

        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, WrongAnswer);
        assert_eq!(stored.result.as_deref(), Some("8"));
    }

    #[tokio::test]
    async fn test_run_kind_uses_sample_case() {
        let runner = FakeRunner::printing(Language::Python, "2");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Run).await;

        h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(h.stored(&submission.id).await.status, Completed);
        assert_eq!(runner.stdins(), vec!["1 1\n".to_string()]);
    }

    #[tokio::test]
    async fn test_judge_with_given_problem() {
        let runner = FakeRunner::printing(Language::Cpp, "7");
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Cpp, SubmissionKind::Submit).await;

        let disposition = h
            .orchestrator
            .judge(&submission, &sum_problem())
            .await
            .unwrap();
        assert_eq!(disposition, JudgeDisposition::Judged(Completed));
    }

    #[tokio::test]
    async fn test_compile_error_is_error_with_diagnostics() {
        let runner = FakeRunner::new(
            Language::Cpp,
            ExecutionOutcome::CompileError("solution.cpp:1:1: error: expected ';'".into()),
        );
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Cpp, SubmissionKind::Submit).await;

        let disposition = h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(disposition, JudgeDisposition::Judged(Error));
        let stored = h.stored(&submission.id).await;
        assert_eq!(
            stored.result.as_deref(),
            Some("compilation error: solution.cpp:1:1: error: expected ';'")
        );
    }

    #[tokio::test]
    async fn test_timeout_is_error_with_fixed_message() {
        let runner = FakeRunner::new(Language::Nodejs, ExecutionOutcome::Timeout);
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Nodejs, SubmissionKind::Submit).await;

        h.orchestrator.handle(&submission).await.unwrap();

        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, Error);
        assert_eq!(stored.result.as_deref(), Some("execution timed out"));
    }

    #[tokio::test]
    async fn test_infrastructure_error_is_prefixed_and_surfaced() {
        let runner = FakeRunner::new(
            Language::Java,
            ExecutionOutcome::InfrastructureError("could not launch java compiler".into()),
        );
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Java, SubmissionKind::Submit).await;

        let err = h.orchestrator.handle(&submission).await.unwrap_err();

        assert!(matches!(err, JudgeError::Infrastructure(_)));
        assert!(!err.is_retryable());
        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, Error);
        assert!(stored.result.unwrap().starts_with(INTERNAL_ERROR_PREFIX));
    }

    #[tokio::test]
    async fn test_unregistered_language_never_runs() {
        let python = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[python.clone()]).await;
        let submission = h.pending(Language::Java, SubmissionKind::Submit).await;

        let err = h.orchestrator.handle(&submission).await.unwrap_err();

        assert!(matches!(err, JudgeError::Infrastructure(_)));
        assert_eq!(python.call_count(), 0);
        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, Error);
        assert_eq!(
            stored.result.as_deref(),
            Some("internal error: unsupported language: java")
        );
        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Error]
        );
    }

    #[tokio::test]
    async fn test_unknown_problem_is_error() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = Submission::new("u", "missing", Language::Python, "x", SubmissionKind::Submit);
        h.gateway.save_submission(&submission).await.unwrap();

        let disposition = h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(disposition, JudgeDisposition::Judged(Error));
        assert_eq!(runner.call_count(), 0);
        assert_eq!(
            h.stored(&submission.id).await.result.as_deref(),
            Some("problem not found: missing")
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_stored_from_event() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner]).await;
        let submission = Submission::new("u", "sum", Language::Python, "x", SubmissionKind::Submit);

        h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Completed]
        );
    }
}

mod redelivery {
    use super::*;

    #[tokio::test]
    async fn test_final_submission_is_left_untouched() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;

        h.orchestrator.handle(&submission).await.unwrap();
        let first = h.stored(&submission.id).await;
        let second = h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(second, JudgeDisposition::AlreadyFinal(Completed));
        assert_eq!(runner.call_count(), 1);
        assert_eq!(h.stored(&submission.id).await, first);
        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Completed]
        );
    }

    #[tokio::test]
    async fn test_running_submission_is_judged_again() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;
        h.gateway
            .update_submission_status(&submission.id, Running, None)
            .await
            .unwrap();

        h.orchestrator.handle(&submission).await.unwrap();

        assert_eq!(runner.call_count(), 1);
        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Running, Completed]
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_retried() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;
        h.gateway.fail_next_updates(1);

        process_event(&h.orchestrator, &fast_retries(3), Event::Judge(submission.clone()))
            .await
            .unwrap();

        assert_eq!(h.stored(&submission.id).await.status, Completed);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_the_failure() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner.clone()]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;
        h.gateway.fail_next_updates(100);

        let err = process_event(&h.orchestrator, &fast_retries(2), Event::Judge(submission.clone()))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(runner.call_count(), 0);
        assert_eq!(h.stored(&submission.id).await.status, Pending);
    }
}

mod concurrency {
    use std::sync::Arc;
    use std::time::Duration;

    use common::gateway::InMemoryGateway;
    use worker::{Orchestrator, RunnerRegistry};

    use super::*;
    use crate::support::{DEADLINE, SlowReadGateway};

    #[tokio::test]
    async fn test_late_duplicate_cannot_regress_final_status() {
        let runner = FakeRunner::slow(Language::Python, "7", Duration::from_millis(150));
        let memory = Arc::new(InMemoryGateway::new());
        memory.put_problem(sum_problem()).await;
        // The duplicate's read sees `running`, then stalls until the first
        // attempt has stored its verdict.
        let gateway = Arc::new(SlowReadGateway::new(
            memory.clone(),
            2,
            Duration::from_millis(300),
        ));
        let mut registry = RunnerRegistry::new();
        registry.register(runner.clone());
        let orchestrator = Orchestrator::new(gateway, Arc::new(registry), DEADLINE);

        let submission = Submission::new("user-1", "sum", Language::Python, "code", SubmissionKind::Submit);
        memory.save_submission(&submission).await.unwrap();

        let (first, second) = tokio::join!(orchestrator.handle(&submission), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            orchestrator.handle(&submission).await
        });

        assert_eq!(first.unwrap(), JudgeDisposition::Judged(Completed));
        assert_eq!(second.unwrap(), JudgeDisposition::AlreadyFinal(Completed));
        assert_eq!(runner.call_count(), 1);
        assert_eq!(
            memory.status_history(&submission.id).await,
            vec![Pending, Running, Completed]
        );
        let stored = memory.get_submission(&submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Completed);
        assert_eq!(stored.result.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_late_rejection_leaves_verdict_alone() {
        let runner = FakeRunner::slow(Language::Python, "7", Duration::from_millis(150));
        let memory = Arc::new(InMemoryGateway::new());
        memory.put_problem(sum_problem()).await;
        let gateway = Arc::new(SlowReadGateway::new(
            memory.clone(),
            2,
            Duration::from_millis(300),
        ));
        let mut registry = RunnerRegistry::new();
        registry.register(runner.clone());
        let orchestrator = Orchestrator::new(gateway, Arc::new(registry), DEADLINE);

        let submission = Submission::new("user-1", "sum", Language::Python, "code", SubmissionKind::Submit);
        memory.save_submission(&submission).await.unwrap();

        let (first, second) = tokio::join!(orchestrator.handle(&submission), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            orchestrator.reject(&submission.id, "invalid submission event").await
        });

        assert_eq!(first.unwrap(), JudgeDisposition::Judged(Completed));
        second.unwrap();
        assert_eq!(
            memory.status_history(&submission.id).await,
            vec![Pending, Running, Completed]
        );
    }
}

mod rejection {
    use super::*;

    #[tokio::test]
    async fn test_pending_submission_is_marked_error() {
        let h = Harness::new(&[]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;

        process_event(
            &h.orchestrator,
            &fast_retries(0),
            Event::Reject {
                id: submission.id.clone(),
                reason: "unsupported language: ruby".into(),
            },
        )
        .await
        .unwrap();

        let stored = h.stored(&submission.id).await;
        assert_eq!(stored.status, Error);
        assert_eq!(stored.result.as_deref(), Some("unsupported language: ruby"));
        assert_eq!(
            h.gateway.status_history(&submission.id).await,
            vec![Pending, Running, Error]
        );
    }

    #[tokio::test]
    async fn test_final_submission_is_not_rejected() {
        let runner = FakeRunner::printing(Language::Python, "7");
        let h = Harness::new(&[runner]).await;
        let submission = h.pending(Language::Python, SubmissionKind::Submit).await;
        h.orchestrator.handle(&submission).await.unwrap();

        h.orchestrator.reject(&submission.id, "late").await.unwrap();

        assert_eq!(h.stored(&submission.id).await.status, Completed);
    }

    #[tokio::test]
    async fn test_unknown_submission_is_ignored() {
        let h = Harness::new(&[]).await;
        h.orchestrator.reject("nope", "bad event").await.unwrap();
        assert!(h.gateway.get_submission("nope").await.unwrap().is_none());
    }
}
