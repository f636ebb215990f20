use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::error::GatewayError;
use super::traits::DataGateway;
use crate::{Problem, Submission, SubmissionStatus};

#[derive(Default)]
struct State {
    problems: HashMap<String, Problem>,
    submissions: HashMap<String, Submission>,
    /// Every status each submission has been written with, in order.
    history: HashMap<String, Vec<SubmissionStatus>>,
}

/// In-process gateway backed by hash maps.
///
/// Used for local runs and as the test double for the judge. It records the
/// status history of each submission and can be told to fail upcoming status
/// updates to exercise redelivery.
#[derive(Default)]
pub struct InMemoryGateway {
    state: RwLock<State>,
    failing_updates: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a problem.
    pub async fn put_problem(&self, problem: Problem) {
        self.state
            .write()
            .await
            .problems
            .insert(problem.id.clone(), problem);
    }

    /// Statuses written for a submission, oldest first.
    pub async fn status_history(&self, id: &str) -> Vec<SubmissionStatus> {
        self.state
            .read()
            .await
            .history
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next `count` status updates fail with a backend error.
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DataGateway for InMemoryGateway {
    async fn get_problem(&self, id: &str) -> Result<Problem, GatewayError> {
        self.state
            .read()
            .await
            .problems
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::problem_not_found(id))
    }

    async fn save_submission(&self, submission: &Submission) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state
            .history
            .insert(submission.id.clone(), vec![submission.status]);
        state
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> Result<Option<Submission>, GatewayError> {
        Ok(self.state.read().await.submissions.get(id).cloned())
    }

    async fn update_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        result: Option<&str>,
    ) -> Result<(), GatewayError> {
        if self.take_injected_failure() {
            return Err(GatewayError::Backend("injected update failure".into()));
        }

        let mut state = self.state.write().await;
        let submission = state
            .submissions
            .get_mut(id)
            .ok_or_else(|| GatewayError::submission_not_found(id))?;

        if !submission.status.accepts_write(status) {
            return Err(GatewayError::TransitionRefused {
                id: id.to_string(),
                from: submission.status,
                to: status,
            });
        }

        submission.status = status;
        submission.updated_at = submission.updated_at.max(Utc::now().timestamp());
        if let Some(result) = result {
            submission.result = Some(result.to_string());
        }

        state.history.entry(id.to_string()).or_default().push(status);
        Ok(())
    }
}
