use std::sync::Arc;

use async_trait::async_trait;
use common::Submission;
use common::intake::{PublishError, SubmissionPublisher};
use tracing::debug;

use crate::Mq;

/// Publishes submissions to their language's topic.
///
/// This is the broker side of [`common::intake::Intake`]: whatever front end
/// accepts submissions builds an `Intake` with an `MqPublisher`, using the same
/// `topic_prefix` the worker consumes from.
pub struct MqPublisher {
    mq: Arc<Mq>,
    topic_prefix: String,
}

impl MqPublisher {
    pub fn new(mq: Arc<Mq>, topic_prefix: impl Into<String>) -> Self {
        Self {
            mq,
            topic_prefix: topic_prefix.into(),
        }
    }

    pub fn topic_for(&self, submission: &Submission) -> String {
        topic_for(&self.topic_prefix, submission)
    }
}

/// Topic a submission is published to under `prefix`.
fn topic_for(prefix: &str, submission: &Submission) -> String {
    submission.language.topic(prefix)
}

#[async_trait]
impl SubmissionPublisher for MqPublisher {
    async fn publish(&self, submission: &Submission) -> Result<(), PublishError> {
        let topic = self.topic_for(submission);
        self.mq
            .publish(&topic, None, submission, None)
            .await
            .map_err(|e| PublishError(format!("topic {topic}: {e}")))?;
        debug!(submission_id = %submission.id, topic = %topic, "Published submission");
        Ok(())
    }
}
