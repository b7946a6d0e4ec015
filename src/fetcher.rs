use tracing::{error, info, warn};

use crate::api::AnalysisService;
use crate::buffer::EditBuffer;
use crate::error::FetchError;

/// Retrieve the final plans of a completed job as a fresh edit buffer.
///
/// No retry: a failure ends this fetch and the caller shows "no results".
pub async fn fetch_results(
    service: &dyn AnalysisService,
    job_id: &str,
) -> Result<EditBuffer, FetchError> {
    match service.results(job_id).await {
        Ok(plans) => {
            for (index, plan) in plans.iter().enumerate() {
                if !plan.has_unique_sequence_numbers() {
                    warn!("Plan {} of job {} repeats a row number", index + 1, job_id);
                }
            }
            info!("📥 Fetched {} plan(s) for job {}", plans.len(), job_id);
            Ok(EditBuffer::new(plans))
        }
        Err(e) => {
            let err = FetchError(e);
            error!("❌ {} (job {})", err, job_id);
            Err(err)
        }
    }
}
