//! Biobank Client - HTTP access to the biobank backend
//!
//! Provides [`HttpRestClient`], the `reqwest` implementation of the
//! [`biobank_core::RestClient`] seam, and [`ClientConfig`] for reading
//! connection settings from the environment.

pub mod config;
pub mod error;
pub mod http;

pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ClientResult};
pub use http::HttpRestClient;
