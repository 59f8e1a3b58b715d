//! Cart client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `AGRIVERSE_API_URL` - Base origin of the marketplace API (default: `http://localhost:5000`)
//! - `AGRIVERSE_SESSION_FILE` - Path of the persisted session record
//!   (default: `agriverse/session.json` under the platform local data dir)
//! - `AGRIVERSE_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `AGRIVERSE_ROLLBACK` - What to do with local state when a sync fails:
//!   `keep` or `revert` (default: `keep`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::store::RollbackPolicy;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart client configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Base origin of the marketplace API
    pub api_url: Url,
    /// Session record location override
    pub session_file: Option<PathBuf>,
    /// Timeout applied to every cart API request
    pub request_timeout: Duration,
    /// Local state handling for failed syncs
    pub rollback: RollbackPolicy,
}

impl CartConfig {
    /// Configuration for `api_url` with every other setting at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            session_file: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            rollback: RollbackPolicy::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(
            "AGRIVERSE_API_URL",
            &get_env_or_default("AGRIVERSE_API_URL", DEFAULT_API_URL),
        )?;
        let session_file = get_optional_env("AGRIVERSE_SESSION_FILE").map(PathBuf::from);
        let request_timeout = get_env_or_default(
            "AGRIVERSE_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("AGRIVERSE_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let rollback = get_env_or_default("AGRIVERSE_ROLLBACK", "keep")
            .parse::<RollbackPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("AGRIVERSE_ROLLBACK".to_string(), e))?;

        Ok(Self {
            api_url,
            session_file,
            request_timeout,
            rollback,
        })
    }

    /// Replace the API base URL, validating it the same way as the env var.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `raw` is not an http(s) URL.
    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url("--api-url", raw)?;
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate an API base URL.
fn parse_api_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_defaults() {
        let config = CartConfig::new(Url::parse(DEFAULT_API_URL).unwrap());
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.rollback, RollbackPolicy::Keep);
        assert!(config.session_file.is_none());
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let err = parse_api_url("TEST_VAR", "ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        assert!(parse_api_url("TEST_VAR", "not a url").is_err());
    }

    #[test]
    fn test_with_api_url_override() {
        let config = CartConfig::new(Url::parse(DEFAULT_API_URL).unwrap())
            .with_api_url("https://api.agriverse.example/")
            .unwrap();
        assert_eq!(config.api_url.host_str(), Some("api.agriverse.example"));
    }
}
