//! Client construction errors.

use crate::config::ConfigError;

/// Result type alias for client setup.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bearer token contains characters not allowed in a header.
    #[error("invalid token value: {0}")]
    InvalidToken(String),

    /// The base URL cannot be used to build request URLs.
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
