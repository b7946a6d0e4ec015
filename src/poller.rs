//! Progress polling for a submitted job.
//!
//! [`ProgressPoller::run`] checks the job's progress on a fixed cadence until
//! the job completes, the service reports it failed, or the cancellation
//! token fires. A failed check is logged and the loop keeps going: there is
//! no backoff and no attempt limit.
//!
//! [`TaskHandle`] owns a spawned task together with its token. Disposing or
//! dropping the handle cancels the task, and nothing the task reports after
//! that point reaches the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::AnalysisService;
use crate::error::PollError;
use crate::models::{JobStatus, ProgressReport};

/// Poller lifecycle: `Idle → Polling → {Completed, Failed, Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::Failed | PollState::Cancelled
        )
    }
}

/// How a poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl From<PollOutcome> for PollState {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Completed => PollState::Completed,
            PollOutcome::Failed => PollState::Failed,
            PollOutcome::Cancelled => PollState::Cancelled,
        }
    }
}

pub struct ProgressPoller {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
}

impl ProgressPoller {
    pub fn new(service: Arc<dyn AnalysisService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Poll `job_id` until a terminal state.
    ///
    /// `on_progress` sees every successful response in arrival order, and
    /// is never called once `cancel` has fired.
    pub async fn run<F>(&self, job_id: &str, cancel: CancellationToken, mut on_progress: F) -> PollOutcome
    where
        F: FnMut(&ProgressReport),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately; the first check waits one period
        ticker.tick().await;

        info!("⏱️  Polling job {} every {}ms", job_id, self.interval.as_millis());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 Polling cancelled for job {}", job_id);
                    return PollOutcome::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("🛑 Polling cancelled for job {}", job_id);
                    return PollOutcome::Cancelled;
                }
                response = self.service.progress(job_id) => response,
            };

            match response {
                Ok(report) => {
                    debug!("📊 Job {} progress: {}%", job_id, report.progress);
                    on_progress(&report);

                    if report.status == Some(JobStatus::Failed) {
                        warn!("❌ Job {} reported failure", job_id);
                        return PollOutcome::Failed;
                    }
                    if report.progress >= 100 {
                        info!("✅ Job {} complete", job_id);
                        return PollOutcome::Completed;
                    }
                }
                Err(e) => {
                    warn!("{}", PollError(e));
                }
            }
        }
    }
}

/// A spawned task that can be disposed exactly once.
///
/// Dropping the handle disposes it as well.
pub struct TaskHandle<T> {
    cancel: CancellationToken,
    join: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    pub fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(task(cancel.clone()));
        Self {
            cancel,
            join: Some(join),
        }
    }

    /// Signal the task to stop
    pub fn dispose(self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the task to end on its own.
    ///
    /// Returns `None` if the task panicked.
    pub async fn join(mut self) -> Option<T> {
        let join = self.join.take()?;
        match join.await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Background task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl<T> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
