use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AnalysisRequest, AnalysisService};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{AnalysisPlan, ProgressReport, ResultsResponse, SubmitResponse};
use crate::upload::UploadFile;

/// reqwest-backed client for the analysis service
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpAnalysisService {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // keep any path prefix when endpoints are joined onto it
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn job_endpoint(&self, prefix: &str, job_id: &str) -> Result<Url, ApiError> {
        self.endpoint(&format!("{}/{}", prefix, urlencoding::encode(job_id)))
    }

    fn file_part(file: &UploadFile) -> Result<Part, ApiError> {
        Ok(Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?)
    }
}

/// Reject non-2xx responses, otherwise decode the JSON body
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn submit(&self, request: AnalysisRequest) -> Result<String, ApiError> {
        let url = self.endpoint("api/analyze")?;

        let mut form = Form::new().part("video", Self::file_part(&request.video)?);
        if let Some(reference) = &request.reference_file {
            form = form.part("reference_file", Self::file_part(reference)?);
        }
        let form = form
            .text("plans", request.plan_count.to_string())
            .text("system_prompt", request.system_prompt)
            .text("confidence_threshold", request.confidence_threshold.to_string());

        debug!("Submitting {} to {}", request.video.file_name, url);

        let response = self.client.post(url).multipart(form).send().await?;
        let body: SubmitResponse = decode(response).await?;
        Ok(body.job_id)
    }

    async fn progress(&self, job_id: &str) -> Result<ProgressReport, ApiError> {
        let url = self.job_endpoint("api/progress", job_id)?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn results(&self, job_id: &str) -> Result<Vec<AnalysisPlan>, ApiError> {
        let url = self.job_endpoint("api/results", job_id)?;
        let response = self.client.get(url).send().await?;
        let body: ResultsResponse = decode(response).await?;
        Ok(body.results)
    }

    async fn delete_results(&self, job_id: &str) -> Result<(), ApiError> {
        let url = self.job_endpoint("api/results", job_id)?;
        let response = self.client.delete(url).send().await?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: &str) -> HttpAnalysisService {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        HttpAnalysisService::new(&config).unwrap()
    }

    #[test]
    fn test_job_endpoint_encodes_id() {
        let service = service("http://localhost:8000");
        let url = service.job_endpoint("api/progress", "a b/c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/progress/a%20b%2Fc");
    }

    #[test]
    fn test_base_url_path_prefix_is_kept() {
        for base in ["http://host/svc", "http://host/svc/"] {
            let service = service(base);
            assert_eq!(
                service.endpoint("api/analyze").unwrap().as_str(),
                "http://host/svc/api/analyze"
            );
            assert_eq!(
                service.job_endpoint("api/progress", "j1").unwrap().as_str(),
                "http://host/svc/api/progress/j1"
            );
        }

        let root = service("http://localhost:8000");
        assert_eq!(
            root.endpoint("api/analyze").unwrap().as_str(),
            "http://localhost:8000/api/analyze"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpAnalysisService::new(&config),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
