use std::future::Future;
use std::sync::Arc;

use common::retry::{RetryDecision, RetryPolicy};
use common::{Language, Submission};
use mq::{BroccoliError, BrokerMessage, Mq};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::JudgeError;
use crate::orchestrator::{JudgeDisposition, Orchestrator};

/// A delivered message, classified before judging.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Judge(Submission),
    /// The payload names a submission but cannot be judged.
    Reject { id: String, reason: String },
    /// Nothing to act on.
    Discard(String),
}

/// Classify a raw message payload.
pub fn decode_event(payload: Value) -> Event {
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let language = payload
        .get("language")
        .and_then(Value::as_str)
        .map(str::to_string);

    match serde_json::from_value::<Submission>(payload) {
        Ok(submission) if submission.id.is_empty() => {
            Event::Discard("submission event without id".into())
        }
        Ok(submission) => Event::Judge(submission),
        Err(e) => {
            let Some(id) = id else {
                return Event::Discard(format!("undecodable event: {e}"));
            };
            let reason = match language.map(|tag| tag.parse::<Language>()) {
                Some(Err(unsupported)) => format!("unsupported language: {}", unsupported.tag()),
                _ => format!("invalid submission event: {e}"),
            };
            Event::Reject { id, reason }
        }
    }
}

/// Handle one event, retrying retryable failures under `policy`.
///
/// An `Err` means the event was not handled and the broker should treat the
/// delivery as failed.
pub async fn process_event(
    orchestrator: &Orchestrator,
    policy: &RetryPolicy,
    event: Event,
) -> Result<(), JudgeError> {
    match event {
        Event::Judge(submission) => {
            let disposition =
                with_retry(policy, &submission.id, || orchestrator.handle(&submission)).await?;
            match disposition {
                JudgeDisposition::Judged(status) => {
                    info!(submission_id = %submission.id, %status, "Event handled");
                }
                JudgeDisposition::AlreadyFinal(status) => {
                    info!(submission_id = %submission.id, %status, "Duplicate delivery ignored");
                }
            }
            Ok(())
        }
        Event::Reject { id, reason } => {
            with_retry(policy, &id, || orchestrator.reject(&id, &reason)).await
        }
        Event::Discard(reason) => {
            warn!(reason = %reason, "Discarding event");
            Ok(())
        }
    }
}

async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    submission_id: &str,
    mut attempt_fn: F,
) -> Result<T, JudgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JudgeError>>,
{
    let mut attempt: u8 = 0;
    loop {
        let e = match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => e,
        };
        attempt = attempt.saturating_add(1);
        match policy.decide(attempt) {
            RetryDecision::Retry { attempt, delay } => {
                warn!(
                    submission_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying judging attempt"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Exhausted { attempts } => {
                error!(
                    submission_id,
                    attempts,
                    error = %e,
                    "Max retries exhausted"
                );
                return Err(e);
            }
        }
    }
}

/// Consume one language topic until the broker stops.
pub async fn consume_topic(
    mq: Arc<Mq>,
    topic: String,
    concurrency: usize,
    orchestrator: Arc<Orchestrator>,
    policy: RetryPolicy,
) {
    info!(topic = %topic, concurrency, "Starting submission consumer");

    let result = mq
        .process_messages(
            &topic,
            Some(concurrency),
            None,
            move |message: BrokerMessage<Value>| {
                let orchestrator = Arc::clone(&orchestrator);
                let policy = policy.clone();
                async move {
                    let event = decode_event(message.payload);
                    process_event(&orchestrator, &policy, event)
                        .await
                        .map_err(|e| BroccoliError::Job(e.to_string()))
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(topic = %topic, error = %e, "Submission consumer stopped unexpectedly");
    }
}
