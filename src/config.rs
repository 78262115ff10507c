//! Client configuration.
//!
//! Only the backend base URL comes from the environment. Everything else is a
//! typed default that callers override explicitly before building the client.

use std::time::Duration;

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "PDFCHAT_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;
pub const DEFAULT_PROGRESS_STEP: u8 = 5;
pub const DEFAULT_PROGRESS_CAP: u8 = 95;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Cadence of the simulated upload progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressConfig {
    pub step: u8,
    /// Highest value reachable before the backend acknowledges. Clamped to 99.
    pub cap: u8,
    pub interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_PROGRESS_STEP,
            cap: DEFAULT_PROGRESS_CAP,
            interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    pub max_upload_bytes: u64,
    pub progress: ProgressConfig,
    /// Time spent in `finalizing` before an upload reports success.
    pub finalize_hold: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            progress: ProgressConfig::default(),
            finalize_hold: Duration::ZERO,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Build config with the base URL taken from `PDFCHAT_API_URL`.
    ///
    /// Unset or blank falls back to [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] if the variable is not an
    /// absolute http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(API_URL_ENV).unwrap_or_default();
        Self::with_api_url(&raw)
    }

    /// Build config for an explicit base URL. Blank input uses the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] for anything that is not an
    /// absolute http(s) URL.
    pub fn with_api_url(raw: &str) -> Result<Self, ConfigError> {
        let api_url = normalize_api_url(raw)?;
        Ok(Self { api_url, ..Self::default() })
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.is_empty() { DEFAULT_API_URL } else { trimmed };
    let parsed = reqwest::Url::parse(candidate).map_err(|e| ConfigError::InvalidApiUrl {
        url: candidate.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl {
            url: candidate.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
