use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a server-side analysis job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// A submitted analysis job as tracked by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Opaque id assigned by the analysis service
    pub id: String,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Last progress value received (0..=100)
    pub progress_percent: u8,

    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// A freshly submitted job in `pending` state
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress_percent: 0,
            submitted_at: Utc::now(),
        }
    }

    /// Apply one poll response.
    ///
    /// Values are taken as delivered, lower values included. Reaching 100
    /// completes the job. Terminal jobs are left untouched.
    pub fn apply_progress(&mut self, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress_percent = progress.min(100);
        self.status = if self.progress_percent >= 100 {
            JobStatus::Complete
        } else {
            JobStatus::Running
        };
    }

    pub fn mark_failed(&mut self) {
        self.status = JobStatus::Failed;
    }
}

/// A labeled, confidence-scored annotation on a row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisTag {
    pub name: String,

    /// Confidence in [0, 1]; values from the wire are clamped on decode
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f32,
}

impl AnalysisTag {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence: clamp_unit(confidence),
        }
    }

    /// Inclusive threshold check used for tag rendering
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// One chapter row of an analysis plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRow {
    /// Sequence number, unique and stable within its plan
    #[serde(rename = "number")]
    pub sequence_number: u32,

    #[serde(rename = "chapter")]
    pub chapter_label: String,

    #[serde(rename = "startTime")]
    pub start_time: String,

    #[serde(rename = "endTime")]
    pub end_time: String,

    pub content: String,

    #[serde(default)]
    pub tags: Vec<AnalysisTag>,
}

impl AnalysisRow {
    /// Tags at or above `threshold`, in their original order
    pub fn visible_tags(&self, threshold: f32) -> impl Iterator<Item = &AnalysisTag> {
        self.tags.iter().filter(move |tag| tag.is_visible(threshold))
    }
}

/// One candidate breakdown of a video, in row order.
///
/// Serialises transparently as the plain row array the service uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct AnalysisPlan {
    pub rows: Vec<AnalysisRow>,
}

impl AnalysisPlan {
    pub fn new(rows: Vec<AnalysisRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when no two rows share a sequence number
    pub fn has_unique_sequence_numbers(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.rows.iter().all(|row| seen.insert(row.sequence_number))
    }
}

/// Lower and upper bound of the plan-count slider
pub const MIN_PLAN_COUNT: u8 = 1;
pub const MAX_PLAN_COUNT: u8 = 5;

/// Step of the confidence-threshold slider
pub const THRESHOLD_STEP: f32 = 0.05;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Default system prompt for video analysis. Edit it freely to steer the analysis.";

/// Analysis parameters owned by the settings panel.
///
/// A snapshot is cloned into each submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfiguration {
    /// Number of plans to request (1..=5)
    pub plan_count: u8,

    /// Attach the reference document to submissions
    pub use_reference_file: bool,

    /// Minimum confidence for a tag to be displayed
    pub confidence_threshold: f32,

    /// Prompt forwarded to the analysis engine
    pub system_prompt: String,
}

impl Default for AnalysisConfiguration {
    fn default() -> Self {
        Self {
            plan_count: MIN_PLAN_COUNT,
            use_reference_file: false,
            confidence_threshold: 0.5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AnalysisConfiguration {
    /// Returns a description of the first violated constraint, if any
    pub fn check(&self) -> Result<(), String> {
        if !(MIN_PLAN_COUNT..=MAX_PLAN_COUNT).contains(&self.plan_count) {
            return Err(format!(
                "plan_count must be between {} and {}, got {}",
                MIN_PLAN_COUNT, MAX_PLAN_COUNT, self.plan_count
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        Ok(())
    }
}

/// Clamp a slider value into the allowed plan range
pub fn clamp_plan_count(value: i64) -> u8 {
    value.clamp(MIN_PLAN_COUNT as i64, MAX_PLAN_COUNT as i64) as u8
}

/// Clamp into [0, 1] and snap to the slider step
pub fn snap_threshold(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    let steps = (clamp_unit(value) / THRESHOLD_STEP).round();
    clamp_unit(steps * THRESHOLD_STEP)
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f32::deserialize(deserializer)?;
    Ok(clamp_unit(raw))
}

// Wire shapes of the analysis service

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub job_id: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a progress check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressReport {
    #[serde(default)]
    pub progress: u8,

    /// Optional status hint; only `failed` changes poller behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

impl ProgressReport {
    pub fn percent(progress: u8) -> Self {
        Self {
            progress,
            status: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            progress: 0,
            status: Some(JobStatus::Failed),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ResultsResponse {
    pub results: Vec<AnalysisPlan>,
}
