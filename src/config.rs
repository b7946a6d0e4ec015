use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::models::AnalysisConfiguration;

/// Configuration for the video analyser client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Analysis service connection settings
    pub api: ApiConfig,

    /// Progress polling and transient UI timings
    pub polling: PollingConfig,

    /// Settings panel defaults
    pub analysis: AnalysisConfiguration,

    /// Logging and export settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the analysis service
    pub base_url: String,

    /// Timeout for a single request (seconds)
    pub request_timeout_seconds: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Cadence of progress checks (milliseconds)
    pub interval_ms: u64,

    /// How long the confirm acknowledgement stays visible (milliseconds)
    pub confirm_popup_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log level for the crate
    pub log_level: String,

    /// Directory for JSON exports of confirmed results
    pub export_dir: Option<PathBuf>,
}

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            confirm_popup_ms: 3000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            export_dir: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn confirm_popup(&self) -> Duration {
        Duration::from_millis(self.confirm_popup_ms)
    }
}

impl Config {
    /// Load configuration from the first config file found, falling back to
    /// the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["video-analyser.toml", "config/video-analyser.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("VIDEO_ANALYSER_API_URL") {
            config.api.base_url = url;
        }

        if let Ok(timeout) = std::env::var("VIDEO_ANALYSER_TIMEOUT") {
            config.api.request_timeout_seconds = parse_or_default(
                "VIDEO_ANALYSER_TIMEOUT",
                &timeout,
                config.api.request_timeout_seconds,
            );
        }

        if let Ok(interval) = std::env::var("VIDEO_ANALYSER_POLL_INTERVAL_MS") {
            config.polling.interval_ms = parse_or_default(
                "VIDEO_ANALYSER_POLL_INTERVAL_MS",
                &interval,
                config.polling.interval_ms,
            );
        }

        if let Ok(log_level) = std::env::var("VIDEO_ANALYSER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| anyhow!("api.base_url is not a valid URL: {}", e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("api.base_url must use http or https"));
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        if self.polling.interval_ms == 0 {
            return Err(anyhow!("polling.interval_ms must be greater than 0"));
        }

        self.analysis.check().map_err(|e| anyhow!(e))?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Analyser Configuration:\n\
            - API: {}\n\
            - Request Timeout: {}s\n\
            - Poll Interval: {}ms\n\
            - Plans: {}\n\
            - Reference File: {}\n\
            - Confidence Threshold: {:.2}",
            self.api.base_url,
            self.api.request_timeout_seconds,
            self.polling.interval_ms,
            self.analysis.plan_count,
            if self.analysis.use_reference_file { "on" } else { "off" },
            self.analysis.confidence_threshold,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.polling.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_plan_count(mut self, plans: u8) -> Self {
        self.config.analysis.plan_count = plans;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.analysis.confidence_threshold = threshold;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis.system_prompt = prompt.into();
        self
    }

    pub fn use_reference_file(mut self, enable: bool) -> Self {
        self.config.analysis.use_reference_file = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a numeric environment override, keeping the default on bad input
fn parse_or_default<T>(name: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "⚠️  Ignoring {}={:?} ({}), using {}",
                name,
                raw,
                e,
                default
            );
            default
        }
    }
}
