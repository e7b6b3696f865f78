//! Client configuration from environment variables.

use std::env;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:9000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every relative request path is joined onto.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `BIOBANK_URL`: Backend base URL (default: http://localhost:9000/api)
    /// - `BIOBANK_TOKEN`: Bearer token
    /// - `BIOBANK_TIMEOUT_SECS`: Request timeout in seconds (default: 30)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("BIOBANK_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url,
            Some(url) => {
                return Err(ConfigError::InvalidValue {
                    name: "BIOBANK_URL".to_string(),
                    reason: format!("not an http(s) url: {url}"),
                });
            }
            None => defaults.base_url,
        };

        let token = lookup("BIOBANK_TOKEN").filter(|t| !t.is_empty());

        let timeout = match lookup("BIOBANK_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "BIOBANK_TIMEOUT_SECS".to_string(),
                        reason: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
            None => defaults.timeout,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            base_url,
            token,
            timeout,
            log_level,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}
