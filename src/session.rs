//! The analysis view: owns the poll task and drives the store.
//!
//! Flow of one run: submission → job id → poll loop → (on completion)
//! result fetch → edit buffer. Starting another run or dropping the
//! session disposes the running poll task. A fetch that is already in
//! flight is not cancelled; its result is applied when it lands, and the
//! reducer discards it if a newer job has replaced it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::AnalysisService;
use crate::buffer::RowField;
use crate::config::Config;
use crate::error::SubmissionError;
use crate::fetcher::fetch_results;
use crate::poller::{PollOutcome, PollState, ProgressPoller, TaskHandle};
use crate::state::{AppState, Event, Page};
use crate::store::Store;
use crate::submission::{build_request, submit};
use crate::upload::UploadFile;

pub struct AnalysisSession {
    service: Arc<dyn AnalysisService>,
    store: Arc<Store>,
    poll_interval: Duration,
    confirm_popup: Duration,
    video: Option<UploadFile>,
    reference_file: Option<UploadFile>,
    tracker: Option<TaskHandle<PollOutcome>>,
    popup: Option<TaskHandle<()>>,
}

impl AnalysisSession {
    pub fn new(service: Arc<dyn AnalysisService>, config: &Config) -> Self {
        let store = Arc::new(Store::new(AppState::new(config.analysis.clone())));
        Self {
            service,
            store,
            poll_interval: config.polling.interval(),
            confirm_popup: config.polling.confirm_popup(),
            video: None,
            reference_file: None,
            tracker: None,
            popup: None,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn state(&self) -> Arc<AppState> {
        self.store.snapshot()
    }

    pub fn dispatch(&self, event: Event) -> Arc<AppState> {
        self.store.dispatch(event)
    }

    pub fn navigate(&self, page: Page) {
        self.store.dispatch(Event::Navigate(page));
    }

    pub fn select_reference_file(&mut self, file: UploadFile) {
        self.store
            .dispatch(Event::ReferenceSelected(file.file_name.clone()));
        self.reference_file = Some(file);
    }

    pub fn drag_over(&self) {
        self.store.dispatch(Event::DragOver);
    }

    pub fn drag_leave(&self) {
        self.store.dispatch(Event::DragLeave);
    }

    /// Handle dropped files: the first one starts an analysis.
    ///
    /// Returns `Ok(false)` when nothing was dropped.
    pub async fn drop_files(&mut self, paths: &[PathBuf]) -> Result<bool, SubmissionError> {
        self.store.dispatch(Event::DragLeave);
        match paths.first() {
            Some(path) => {
                self.open_video(path).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// File-picker selection
    pub async fn open_video(&mut self, path: &Path) -> Result<(), SubmissionError> {
        let video = UploadFile::from_path(path).await?;
        self.start_analysis(video).await
    }

    /// Submit `video` with the current settings and begin polling.
    ///
    /// Any previous run is disposed and its results discarded. On failure
    /// no job is stored and the view returns to idle.
    pub async fn start_analysis(&mut self, video: UploadFile) -> Result<(), SubmissionError> {
        self.dispose_tracker();

        self.video = Some(video.clone());
        let state = self.store.dispatch(Event::AnalysisStarted {
            video: video.file_name.clone(),
        });

        let request = match build_request(
            Some(video),
            self.reference_file.clone(),
            &state.settings,
        ) {
            Ok(request) => request,
            Err(e) => {
                self.store.dispatch(Event::SubmissionFailed(e.to_string()));
                return Err(e);
            }
        };

        let job = match submit(self.service.as_ref(), request).await {
            Ok(job) => job,
            Err(e) => {
                self.store.dispatch(Event::SubmissionFailed(e.to_string()));
                return Err(e);
            }
        };

        self.store.dispatch(Event::JobCreated(job.clone()));
        self.tracker = Some(self.spawn_tracker(job.id));
        Ok(())
    }

    /// Re-submit the current video with the current settings
    pub async fn rerun(&mut self) -> Result<(), SubmissionError> {
        let video = self.video.clone().ok_or(SubmissionError::MissingVideo)?;
        self.start_analysis(video).await
    }

    fn spawn_tracker(&self, job_id: String) -> TaskHandle<PollOutcome> {
        let service = self.service.clone();
        let store = self.store.clone();
        let poller = ProgressPoller::new(service.clone(), self.poll_interval);

        TaskHandle::spawn(move |cancel| async move {
            let outcome = poller
                .run(&job_id, cancel, |report| {
                    store.dispatch(Event::ProgressReceived {
                        job_id: job_id.clone(),
                        report: report.clone(),
                    });
                })
                .await;

            if outcome == PollOutcome::Completed {
                match fetch_results(service.as_ref(), &job_id).await {
                    Ok(results) => {
                        store.dispatch(Event::ResultsLoaded { job_id, results });
                    }
                    Err(e) => {
                        store.dispatch(Event::FetchFailed {
                            job_id,
                            message: e.to_string(),
                        });
                    }
                }
            }

            outcome
        })
    }

    /// Wait for the current run to finish polling and fetching.
    ///
    /// Returns `None` when no run is active.
    pub async fn wait_for_completion(&mut self) -> Option<PollOutcome> {
        let tracker = self.tracker.take()?;
        tracker.join().await
    }

    pub fn select_plan(&self, index: usize) {
        let state = self.store.snapshot();
        if index >= state.results.plan_count() {
            debug!(
                "Plan {} selected with {} plan(s) loaded",
                index,
                state.results.plan_count()
            );
        }
        self.store.dispatch(Event::SelectPlan(index));
    }

    pub fn toggle_editing(&self) {
        self.store.dispatch(Event::ToggleEditing);
    }

    pub fn edit_field(&self, plan: usize, row: usize, field: RowField, value: impl Into<String>) {
        self.store.dispatch(Event::EditField {
            plan,
            row,
            field,
            value: value.into(),
        });
    }

    pub fn remove_tag(&self, plan: usize, row: usize, tag: usize) {
        self.store.dispatch(Event::RemoveTag { plan, row, tag });
    }

    /// Leave editing mode and show a transient acknowledgement.
    ///
    /// Nothing is sent to the service; the buffer stays client-side.
    pub fn confirm(&mut self) {
        self.store.dispatch(Event::Confirm);
        info!("✅ Results confirmed");

        if let Some(previous) = self.popup.take() {
            previous.dispose();
        }
        let store = self.store.clone();
        let delay = self.confirm_popup;
        self.popup = Some(TaskHandle::spawn(move |cancel| async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    store.dispatch(Event::DismissConfirm);
                }
            }
        }));
    }

    fn dispose_tracker(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            if !tracker.is_finished() {
                debug!("Disposing previous poll task");
            }
            tracker.dispose();
        }
    }

    /// Tear the view down: stop polling and pending timers
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let polling = self.store.snapshot().poll_state == PollState::Polling;
        self.dispose_tracker();
        if let Some(popup) = self.popup.take() {
            popup.dispose();
        }

        if polling {
            if let Some(job) = self.store.snapshot().job.as_ref() {
                warn!("⏹️  Stopped tracking job {}", job.id);
                self.store.dispatch(Event::PollCancelled {
                    job_id: job.id.clone(),
                });
            }
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
