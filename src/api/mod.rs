//! Boundary to the external analysis service.
//!
//! [`AnalysisService`] is the seam every component talks through;
//! [`HttpAnalysisService`] is the production implementation over HTTP.

pub mod client;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{AnalysisPlan, ProgressReport};
use crate::upload::UploadFile;

pub use client::HttpAnalysisService;

/// Everything a job submission sends to the service
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub video: UploadFile,
    pub reference_file: Option<UploadFile>,
    pub plan_count: u8,
    pub system_prompt: String,
    pub confidence_threshold: f32,
}

/// Calls exposed by the analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// `POST /api/analyze`, returns the new job id
    async fn submit(&self, request: AnalysisRequest) -> Result<String, ApiError>;

    /// `GET /api/progress/{job_id}`
    async fn progress(&self, job_id: &str) -> Result<ProgressReport, ApiError>;

    /// `GET /api/results/{job_id}`
    async fn results(&self, job_id: &str) -> Result<Vec<AnalysisPlan>, ApiError>;

    /// `DELETE /api/results/{job_id}`
    async fn delete_results(&self, job_id: &str) -> Result<(), ApiError>;
}
