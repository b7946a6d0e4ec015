//! Scripted in-memory analysis service for unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{AnalysisRequest, AnalysisService};
use crate::error::ApiError;
use crate::models::{AnalysisPlan, ProgressReport};

pub(crate) struct ScriptedService {
    job_id: String,
    submit_failure: Option<u16>,
    progress: Mutex<VecDeque<Result<ProgressReport, u16>>>,
    results: Result<Vec<AnalysisPlan>, u16>,
    results_delay: Option<Duration>,
    last_request: Mutex<Option<AnalysisRequest>>,
    submit_calls: AtomicUsize,
    progress_calls: AtomicUsize,
    results_calls: AtomicUsize,
}

impl ScriptedService {
    pub(crate) fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            submit_failure: None,
            progress: Mutex::new(VecDeque::from(vec![Ok(ProgressReport::percent(100))])),
            results: Ok(Vec::new()),
            results_delay: None,
            last_request: Mutex::new(None),
            submit_calls: AtomicUsize::new(0),
            progress_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_submit(mut self, status: u16) -> Self {
        self.submit_failure = Some(status);
        self
    }

    /// Progress responses in order; the last one repeats once the script runs out
    pub(crate) fn with_progress(self, script: Vec<Result<u8, u16>>) -> Self {
        let reports = script
            .into_iter()
            .map(|step| step.map(ProgressReport::percent))
            .collect();
        self.with_progress_reports(reports)
    }

    pub(crate) fn with_progress_reports(self, script: Vec<Result<ProgressReport, u16>>) -> Self {
        *self.progress.lock().unwrap() = script.into();
        self
    }

    pub(crate) fn with_results(mut self, plans: Vec<AnalysisPlan>) -> Self {
        self.results = Ok(plans);
        self
    }

    pub(crate) fn fail_results(mut self, status: u16) -> Self {
        self.results = Err(status);
        self
    }

    pub(crate) fn with_results_delay(mut self, delay: Duration) -> Self {
        self.results_delay = Some(delay);
        self
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn submit(&self, request: AnalysisRequest) -> Result<String, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        match self.submit_failure {
            Some(status) => Err(ApiError::Status(status)),
            None => Ok(self.job_id.clone()),
        }
    }

    async fn progress(&self, _job_id: &str) -> Result<ProgressReport, ApiError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.progress.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match step {
            Some(Ok(report)) => Ok(report),
            Some(Err(status)) => Err(ApiError::Status(status)),
            None => Ok(ProgressReport::percent(0)),
        }
    }

    async fn results(&self, _job_id: &str) -> Result<Vec<AnalysisPlan>, ApiError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.results_delay {
            tokio::time::sleep(delay).await;
        }
        self.results.clone().map_err(ApiError::Status)
    }

    async fn delete_results(&self, _job_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}
