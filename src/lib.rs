//! Video Analyser client
//!
//! Submits videos to the analysis service, tracks job progress, fetches the
//! resulting chapter plans and keeps an editable copy of them.

pub mod api;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod poller;
pub mod render;
pub mod session;
pub mod state;
pub mod store;
pub mod submission;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for easy access
pub use crate::api::{AnalysisRequest, AnalysisService, HttpAnalysisService};
pub use crate::buffer::{EditBuffer, RowField};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{ApiError, BufferError, FetchError, PollError, SubmissionError};
pub use crate::models::{
    AnalysisConfiguration, AnalysisPlan, AnalysisRow, AnalysisTag, Job, JobStatus, ProgressReport,
};
pub use crate::poller::{PollOutcome, PollState, ProgressPoller, TaskHandle};
pub use crate::session::AnalysisSession;
pub use crate::state::{AppState, Event, Page};
pub use crate::store::Store;
pub use crate::upload::UploadFile;
