use tracing::{error, info};

use crate::api::{AnalysisRequest, AnalysisService};
use crate::error::SubmissionError;
use crate::models::{AnalysisConfiguration, Job};
use crate::upload::UploadFile;

/// Package the selected files and a settings snapshot into a request.
///
/// Runs before any network call: a missing video or an out-of-range
/// configuration is rejected here. The reference file is only attached
/// when the configuration enables it.
pub fn build_request(
    video: Option<UploadFile>,
    reference_file: Option<UploadFile>,
    configuration: &AnalysisConfiguration,
) -> Result<AnalysisRequest, SubmissionError> {
    let video = video.ok_or(SubmissionError::MissingVideo)?;
    configuration
        .check()
        .map_err(SubmissionError::InvalidConfiguration)?;

    let reference_file = if configuration.use_reference_file {
        reference_file
    } else {
        None
    };

    Ok(AnalysisRequest {
        video,
        reference_file,
        plan_count: configuration.plan_count,
        system_prompt: configuration.system_prompt.clone(),
        confidence_threshold: configuration.confidence_threshold,
    })
}

/// Submit a prepared request and return the new job in `pending` state
pub async fn submit(
    service: &dyn AnalysisService,
    request: AnalysisRequest,
) -> Result<Job, SubmissionError> {
    let video_name = request.video.file_name.clone();
    let with_reference = request.reference_file.is_some();

    match service.submit(request).await {
        Ok(job_id) => {
            info!(
                "🚀 Submitted {} (reference: {}) as job {}",
                video_name, with_reference, job_id
            );
            Ok(Job::pending(job_id))
        }
        Err(e) => {
            error!("❌ Failed to submit {}: {}", video_name, e);
            Err(e.into())
        }
    }
}
