//! Application configuration and environment variable parsing.
//!
//! Configuration is loaded from the environment (optionally via a .env file)
//! with `envy`. Every tunable has a default so the service runs with nothing
//! but an optional `GITHUB_TOKEN` set.

use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Optional GitHub personal access token for higher rate limits.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Base URL of the hosting API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Base URL of the forecasting service.
    #[serde(default = "default_forecast_api_url")]
    pub forecast_api_url: String,

    /// Number of one-month search windows to walk backward from today.
    #[serde(default = "default_window_months")]
    pub window_months: u32,

    /// Ceiling on throttle retries for a single request before the whole
    /// call fails with a rate-limit error.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Fixed delay between throttle retries, in seconds.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_forecast_api_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_window_months() -> u32 {
    24
}

fn default_retry_max_attempts() -> u32 {
    6
}

fn default_retry_backoff_secs() -> u64 {
    10
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: default_github_api_url(),
            forecast_api_url: default_forecast_api_url(),
            window_months: default_window_months(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// Bounded retry policy applied to throttled hosting-API calls.
///
/// Injected into the client so tests can simulate throttling with a zero
/// backoff instead of real delays.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}
