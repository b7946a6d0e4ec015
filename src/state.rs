//! Explicit application state and its transitions.
//!
//! [`reduce`] is a pure function: it takes the current state and one
//! [`Event`] and returns the next state. Nothing else mutates [`AppState`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buffer::{EditBuffer, RowField};
use crate::models::{
    clamp_plan_count, snap_threshold, AnalysisConfiguration, Job, JobStatus, ProgressReport,
};
use crate::poller::PollState;

/// Top-level pages reachable from the sidebar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Home,
    Analysis,
    History,
    Settings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub page: Page,
    pub sidebar_collapsed: bool,

    /// Settings panel values; snapshotted on submission
    pub settings: AnalysisConfiguration,
    pub prompt_editing: bool,

    /// Name of the video being analysed
    pub selected_video: Option<String>,
    pub reference_file: Option<String>,
    pub drag_over: bool,

    pub job: Option<Job>,
    pub poll_state: PollState,
    pub is_analyzing: bool,
    pub progress: u8,

    pub results: EditBuffer,
    pub active_plan: usize,
    pub is_editing: bool,
    pub confirm_visible: bool,

    /// Message of the last failed operation, cleared by the next start
    pub last_error: Option<String>,
}

impl AppState {
    pub fn new(settings: AnalysisConfiguration) -> Self {
        Self {
            page: Page::default(),
            sidebar_collapsed: false,
            settings,
            prompt_editing: false,
            selected_video: None,
            reference_file: None,
            drag_over: false,
            job: None,
            poll_state: PollState::Idle,
            is_analyzing: false,
            progress: 0,
            results: EditBuffer::default(),
            active_plan: 0,
            is_editing: false,
            confirm_visible: false,
            last_error: None,
        }
    }

    /// A video is selected, nothing is running and no results arrived
    pub fn is_waiting_for_results(&self) -> bool {
        self.selected_video.is_some() && !self.is_analyzing && self.results.is_empty()
    }

    fn is_current_job(&self, job_id: &str) -> bool {
        self.job.as_ref().is_some_and(|job| job.id == job_id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AnalysisConfiguration::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Navigate(Page),
    ToggleSidebar,

    SetPlanCount(i64),
    SetUseReferenceFile(bool),
    SetConfidenceThreshold(f32),
    SetPromptEditing(bool),
    EditSystemPrompt(String),

    ReferenceSelected(String),
    DragOver,
    DragLeave,

    /// A new run begins; previous results are discarded
    AnalysisStarted { video: String },
    SubmissionFailed(String),
    JobCreated(Job),
    ProgressReceived { job_id: String, report: ProgressReport },
    PollCancelled { job_id: String },
    ResultsLoaded { job_id: String, results: EditBuffer },
    FetchFailed { job_id: String, message: String },

    /// Precondition: `index < results.plan_count()`; the index is stored as is
    SelectPlan(usize),
    ToggleEditing,
    EditField {
        plan: usize,
        row: usize,
        field: RowField,
        value: String,
    },
    RemoveTag {
        plan: usize,
        row: usize,
        tag: usize,
    },
    Confirm,
    DismissConfirm,
}

pub fn reduce(state: &AppState, event: Event) -> AppState {
    let mut next = state.clone();

    match event {
        Event::Navigate(page) => next.page = page,
        Event::ToggleSidebar => next.sidebar_collapsed = !next.sidebar_collapsed,

        Event::SetPlanCount(value) => next.settings.plan_count = clamp_plan_count(value),
        Event::SetUseReferenceFile(enabled) => next.settings.use_reference_file = enabled,
        Event::SetConfidenceThreshold(value) => {
            next.settings.confidence_threshold = snap_threshold(value)
        }
        Event::SetPromptEditing(editing) => next.prompt_editing = editing,
        Event::EditSystemPrompt(prompt) => {
            if next.prompt_editing {
                next.settings.system_prompt = prompt;
            }
        }

        Event::ReferenceSelected(name) => next.reference_file = Some(name),
        Event::DragOver => next.drag_over = true,
        Event::DragLeave => next.drag_over = false,

        Event::AnalysisStarted { video } => {
            next.selected_video = Some(video);
            next.drag_over = false;
            next.job = None;
            next.poll_state = PollState::Idle;
            next.is_analyzing = true;
            next.progress = 0;
            next.results = EditBuffer::default();
            next.active_plan = 0;
            next.is_editing = false;
            next.confirm_visible = false;
            next.last_error = None;
        }
        Event::SubmissionFailed(message) => {
            next.job = None;
            next.poll_state = PollState::Idle;
            next.is_analyzing = false;
            next.last_error = Some(message);
        }
        Event::JobCreated(job) => {
            next.job = Some(job);
            next.poll_state = PollState::Polling;
        }
        Event::ProgressReceived { job_id, report } => {
            if !state.is_current_job(&job_id) || state.poll_state != PollState::Polling {
                return next;
            }
            if let Some(job) = next.job.as_mut() {
                if report.status == Some(JobStatus::Failed) {
                    job.mark_failed();
                    next.poll_state = PollState::Failed;
                    next.is_analyzing = false;
                    next.last_error = Some(format!("Analysis job {} failed", job.id));
                } else {
                    job.apply_progress(report.progress);
                    next.progress = job.progress_percent;
                    if job.status == JobStatus::Complete {
                        next.poll_state = PollState::Completed;
                    }
                }
            }
        }
        Event::PollCancelled { job_id } => {
            if state.is_current_job(&job_id) && state.poll_state == PollState::Polling {
                next.poll_state = PollState::Cancelled;
                next.is_analyzing = false;
            }
        }
        Event::ResultsLoaded { job_id, results } => {
            if state.is_current_job(&job_id) {
                next.results = results;
                next.active_plan = 0;
                next.is_analyzing = false;
            }
        }
        Event::FetchFailed { job_id, message } => {
            if state.is_current_job(&job_id) {
                next.results = EditBuffer::default();
                next.is_analyzing = false;
                next.last_error = Some(message);
            }
        }

        Event::SelectPlan(index) => next.active_plan = index,
        Event::ToggleEditing => next.is_editing = !next.is_editing,
        // results are read-only outside editing mode
        Event::EditField { .. } | Event::RemoveTag { .. } if !state.is_editing => {
            debug!("Ignoring result edit outside editing mode");
        }
        Event::EditField {
            plan,
            row,
            field,
            value,
        } => match state.results.with_field(plan, row, field, value) {
            Ok(results) => next.results = results,
            Err(e) => warn!("Ignoring edit: {}", e),
        },
        Event::RemoveTag { plan, row, tag } => match state.results.without_tag(plan, row, tag) {
            Ok(results) => next.results = results,
            Err(e) => warn!("Ignoring tag removal: {}", e),
        },
        Event::Confirm => {
            next.is_editing = false;
            next.confirm_visible = true;
        }
        Event::DismissConfirm => next.confirm_visible = false,
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::tests::sample_plans;

    fn polling_state(job_id: &str) -> AppState {
        let state = reduce(
            &AppState::default(),
            Event::AnalysisStarted {
                video: "clip.mp4".to_string(),
            },
        );
        reduce(&state, Event::JobCreated(Job::pending(job_id)))
    }

    fn progress(job_id: &str, value: u8) -> Event {
        Event::ProgressReceived {
            job_id: job_id.to_string(),
            report: ProgressReport::percent(value),
        }
    }

    #[test]
    fn test_navigation_and_sidebar() {
        let state = reduce(&AppState::default(), Event::Navigate(Page::Analysis));
        assert_eq!(state.page, Page::Analysis);

        let state = reduce(&state, Event::ToggleSidebar);
        assert!(state.sidebar_collapsed);
        let state = reduce(&state, Event::ToggleSidebar);
        assert!(!state.sidebar_collapsed);
    }

    #[test]
    fn test_settings_are_clamped() {
        let state = reduce(&AppState::default(), Event::SetPlanCount(12));
        assert_eq!(state.settings.plan_count, 5);

        let state = reduce(&state, Event::SetConfidenceThreshold(0.33));
        assert!((state.settings.confidence_threshold - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_prompt_only_editable_in_edit_mode() {
        let state = reduce(&AppState::default(), Event::EditSystemPrompt("ignored".into()));
        assert_ne!(state.settings.system_prompt, "ignored");

        let state = reduce(&state, Event::SetPromptEditing(true));
        let state = reduce(&state, Event::EditSystemPrompt("focus on passes".into()));
        assert_eq!(state.settings.system_prompt, "focus on passes");
    }

    #[test]
    fn test_start_discards_previous_results() {
        let mut state = polling_state("old");
        state.results = EditBuffer::new(sample_plans(2, 2));
        state.active_plan = 1;
        state.last_error = Some("boom".into());

        let state = reduce(
            &state,
            Event::AnalysisStarted {
                video: "next.mp4".into(),
            },
        );
        assert!(state.results.is_empty());
        assert_eq!(state.active_plan, 0);
        assert!(state.is_analyzing);
        assert!(state.job.is_none());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_submission_failure_returns_to_idle() {
        let state = reduce(
            &AppState::default(),
            Event::AnalysisStarted {
                video: "clip.mp4".into(),
            },
        );
        let state = reduce(&state, Event::SubmissionFailed("API error: 500".into()));

        assert!(!state.is_analyzing);
        assert!(state.job.is_none());
        assert_eq!(state.poll_state, PollState::Idle);
        assert!(state.is_waiting_for_results());
    }

    #[test]
    fn test_progress_until_completed() {
        let state = polling_state("job");
        let state = reduce(&state, progress("job", 50));
        assert_eq!(state.progress, 50);
        assert_eq!(state.poll_state, PollState::Polling);

        let state = reduce(&state, progress("job", 100));
        assert_eq!(state.poll_state, PollState::Completed);
        assert_eq!(state.job.as_ref().unwrap().status, JobStatus::Complete);
        // still analysing until the results arrive
        assert!(state.is_analyzing);

        let late = reduce(&state, progress("job", 40));
        assert_eq!(late.progress, 100);
    }

    #[test]
    fn test_events_for_other_jobs_are_ignored() {
        let state = polling_state("current");
        let after = reduce(&state, progress("stale", 80));
        assert_eq!(after, state);

        let after = reduce(
            &state,
            Event::ResultsLoaded {
                job_id: "stale".into(),
                results: EditBuffer::new(sample_plans(1, 1)),
            },
        );
        assert!(after.results.is_empty());
    }

    #[test]
    fn test_failed_report() {
        let state = polling_state("job");
        let state = reduce(
            &state,
            Event::ProgressReceived {
                job_id: "job".into(),
                report: ProgressReport::failed(),
            },
        );
        assert_eq!(state.poll_state, PollState::Failed);
        assert!(!state.is_analyzing);
        assert!(state.last_error.is_some());
    }

    #[test]
    fn test_fetch_outcomes() {
        let state = reduce(&polling_state("job"), progress("job", 100));

        let loaded = reduce(
            &state,
            Event::ResultsLoaded {
                job_id: "job".into(),
                results: EditBuffer::new(sample_plans(2, 3)),
            },
        );
        assert!(!loaded.is_analyzing);
        assert_eq!(loaded.results.plan_count(), 2);

        let failed = reduce(
            &state,
            Event::FetchFailed {
                job_id: "job".into(),
                message: "API error: 404".into(),
            },
        );
        assert!(!failed.is_analyzing);
        assert!(failed.results.is_empty());
        assert_eq!(failed.last_error.as_deref(), Some("API error: 404"));
    }

    #[test]
    fn test_edits_go_through_buffer() {
        let mut state = AppState::default();
        state.results = EditBuffer::new(sample_plans(2, 3));
        let state = reduce(&state, Event::ToggleEditing);

        let edited = reduce(
            &state,
            Event::EditField {
                plan: 1,
                row: 0,
                field: RowField::Chapter,
                value: "Opening".into(),
            },
        );
        assert_eq!(edited.results.plan(1).unwrap().rows[0].chapter_label, "Opening");
        assert_eq!(state.results.plan(1).unwrap().rows[0].chapter_label, "Chapter 1");
        assert!(edited.results.shares_plan_with(&state.results, 0));

        let edited = reduce(&edited, Event::RemoveTag { plan: 1, row: 0, tag: 0 });
        assert_eq!(edited.results.plan(1).unwrap().rows[0].tags.len(), 2);

        // out-of-range edits leave the state unchanged
        let same = reduce(&edited, Event::RemoveTag { plan: 7, row: 0, tag: 0 });
        assert_eq!(same, edited);
    }

    #[test]
    fn test_results_read_only_outside_editing() {
        let mut state = AppState::default();
        state.results = EditBuffer::new(sample_plans(1, 2));
        assert!(!state.is_editing);

        let after = reduce(
            &state,
            Event::EditField {
                plan: 0,
                row: 0,
                field: RowField::Content,
                value: "rewritten".into(),
            },
        );
        let after = reduce(&after, Event::RemoveTag { plan: 0, row: 0, tag: 0 });
        assert_eq!(after, state);
        assert_eq!(after.results.plan(0).unwrap().rows[0].content, "Plan 1: row 1");
        assert_eq!(after.results.plan(0).unwrap().rows[0].tags.len(), 3);

        // leaving editing mode through confirm locks the results again
        let editing = reduce(&state, Event::ToggleEditing);
        let confirmed = reduce(&editing, Event::Confirm);
        let after = reduce(&confirmed, Event::RemoveTag { plan: 0, row: 0, tag: 0 });
        assert_eq!(after.results, confirmed.results);
    }

    #[test]
    fn test_select_plan_is_not_clamped() {
        let mut state = AppState::default();
        state.results = EditBuffer::new(sample_plans(2, 1));

        let state = reduce(&state, Event::SelectPlan(5));
        assert_eq!(state.active_plan, 5);
        assert!(state.results.plan(state.active_plan).is_none());

        let state = reduce(&state, Event::SelectPlan(1));
        assert_eq!(state.active_plan, 1);
        assert!(state.results.plan(state.active_plan).is_some());
    }

    #[test]
    fn test_confirm_flow() {
        let state = reduce(&AppState::default(), Event::ToggleEditing);
        assert!(state.is_editing);

        let state = reduce(&state, Event::Confirm);
        assert!(!state.is_editing);
        assert!(state.confirm_visible);

        let state = reduce(&state, Event::DismissConfirm);
        assert!(!state.confirm_visible);
    }

    #[test]
    fn test_drag_highlight() {
        let state = reduce(&AppState::default(), Event::DragOver);
        assert!(state.drag_over);
        let state = reduce(&state, Event::DragLeave);
        assert!(!state.drag_over);
    }
}
