//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use crate::core::retry::{PollPolicy, MAX_POLL_ATTEMPTS, POLL_INTERVAL};

/// Default Onshape API host
pub const DEFAULT_BASE_URL: &str = "https://cad.onshape.com";

/// Runtime settings for the exporter
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// API host, without trailing slash
    pub base_url: String,
    /// JSON file holding the API keys
    pub credentials_path: PathBuf,
    /// Status checks before a translation times out
    pub poll_max_attempts: u32,
    /// Delay before the first status check
    pub poll_interval_ms: u64,
    /// Multiplier applied to the poll interval after each status check
    pub poll_backoff_factor: u32,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Default number of parallel export jobs
    pub max_concurrent: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials_path: default_credentials_path(),
            poll_max_attempts: MAX_POLL_ATTEMPTS,
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            poll_backoff_factor: 1,
            timeout_ms: 60000,
            max_concurrent: 1,
        }
    }
}

/// `~/.config/onshape-exporter.json`
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("onshape-exporter.json")
}

impl ExporterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let base_url = std::env::var("ONSHAPE_BASE_URL").unwrap_or(defaults.base_url);

        let credentials_path = std::env::var("ONSHAPE_EXPORTER_CREDENTIALS")
            .map(PathBuf::from)
            .unwrap_or(defaults.credentials_path);

        let poll_max_attempts = std::env::var("ONSHAPE_POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| defaults.poll_max_attempts.to_string())
            .parse::<u32>()?;

        let poll_interval_ms = std::env::var("ONSHAPE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| defaults.poll_interval_ms.to_string())
            .parse::<u64>()?;

        let poll_backoff_factor = std::env::var("ONSHAPE_POLL_BACKOFF")
            .unwrap_or_else(|_| defaults.poll_backoff_factor.to_string())
            .parse::<u32>()?;

        let timeout_ms = std::env::var("ONSHAPE_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| defaults.timeout_ms.to_string())
            .parse::<u64>()?;

        let max_concurrent = std::env::var("ONSHAPE_MAX_CONCURRENT")
            .unwrap_or_else(|_| defaults.max_concurrent.to_string())
            .parse::<usize>()?;

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials_path,
            poll_max_attempts,
            poll_interval_ms,
            poll_backoff_factor,
            timeout_ms,
            max_concurrent,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("API base URL is required"));
        }

        if self.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!("poll_max_attempts must be greater than 0"));
        }

        if self.poll_backoff_factor == 0 {
            return Err(anyhow::anyhow!("poll_backoff_factor must be at least 1"));
        }

        if self.max_concurrent == 0 {
            return Err(anyhow::anyhow!("max_concurrent must be greater than 0"));
        }

        Ok(())
    }

    /// Poll policy for translation status checks
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.poll_max_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
        .with_backoff(self.poll_backoff_factor)
    }

    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
