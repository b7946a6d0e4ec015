//! Error taxonomy for the job-tracking client.
//!
//! Every error is terminal for the one operation that raised it and never
//! for the process. The session maps each kind onto a visible UI state.

use thiserror::Error;

/// Failure talking to the analysis service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response
    #[error("API error: {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Job creation failed; no job exists and the view returns to idle
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("a video file is required to start an analysis")]
    MissingVideo,

    #[error("invalid analysis configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to read upload {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One progress check failed; the poll loop keeps going
#[derive(Debug, Error)]
#[error("progress check failed: {0}")]
pub struct PollError(#[from] pub ApiError);

/// Final results could not be retrieved; the view shows "no results"
#[derive(Debug, Error)]
#[error("result fetch failed: {0}")]
pub struct FetchError(#[from] pub ApiError);

/// An edit addressed a plan, row or tag that does not exist
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("plan index {index} out of range ({len} plans)")]
    PlanOutOfRange { index: usize, len: usize },

    #[error("row index {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("tag index {index} out of range ({len} tags)")]
    TagOutOfRange { index: usize, len: usize },
}
