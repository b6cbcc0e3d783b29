//! Client configuration

use crate::{Error, Result};
use pass_core::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://pass-api.proton.me/api";
/// Environment variable overriding the base URL
pub const API_URL_ENV: &str = "PASS_API_URL";

/// Retry configuration for network operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, including the first
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, without the `/pass/v1` suffix
    pub base_url: String,
    /// Sent as `x-pm-appversion`
    pub app_version: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Items per page when listing
    pub page_size: u32,
    /// Items per batch transition request
    pub batch_size: usize,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            app_version: format!("rust-pass@{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 60,
            page_size: 100,
            batch_size: MAX_BATCH_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with `PASS_API_URL` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(Error::Config(format!("Unsupported base URL: {}", self.base_url)));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be positive".to_string()));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "batch_size must be between 1 and {}",
                MAX_BATCH_SIZE
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be positive".to_string()));
        }
        Ok(())
    }

    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Versioned API root
    pub fn pass_url(&self, path: &str) -> String {
        format!("{}/pass/v1{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ClientConfig::from_json(r#"{"base_url":"http://localhost:8080","page_size":25}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(ClientConfig::from_json(r#"{"batch_size":500}"#).is_err());
        assert!(ClientConfig::from_json(r#"{"base_url":"ftp://x"}"#).is_err());
        assert!(ClientConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_pass_url() {
        let config = ClientConfig {
            base_url: "https://example.com/api/".into(),
            ..Default::default()
        };
        assert_eq!(config.pass_url("/share"), "https://example.com/api/pass/v1/share");
    }
}
