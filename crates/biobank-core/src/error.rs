//! Error types for the domain model.
//!
//! Two failure channels exist:
//! - [`DomainError`] is raised synchronously when an invariant or a
//!   precondition is violated (bad wire data, illegal state transition).
//! - [`RestError`] is produced by the REST collaborator and passed through
//!   unchanged.
//!
//! Operations that both validate and talk to the server return [`Error`].

use thiserror::Error;

/// Message fragment the backend uses when an `expectedVersion` is stale.
pub const VERSION_CONFLICT_PATTERN: &str = "expected version doesn't match current version";

/// Result type alias for domain operations.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// Result type alias for operations that reach the server.
pub type Result<T> = std::result::Result<T, Error>;

/// Invariant and precondition violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A raw record failed schema validation.
    #[error("invalid object: {0}")]
    Validation(String),

    /// Neither the annotation type nor the caller said whether a value is required.
    #[error("required not assigned")]
    RequiredNotAssigned,

    /// The annotation has not been bound to an annotation type yet.
    #[error("annotation type not assigned")]
    AnnotationTypeNotAssigned,

    /// An annotation type definition is inconsistent.
    #[error("invalid annotation type: {0}")]
    InvalidAnnotationType(String),

    /// A wire annotation refers to a type the parent is not configured with.
    #[error("annotation type not found: {0}")]
    UnknownAnnotationType(String),

    /// A multiple-select operation was used on another kind of annotation.
    #[error("annotation is not a multiple select")]
    NotMultipleSelect,

    /// A field value could not be interpreted.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The entity's current state does not allow the requested action.
    #[error("{0}")]
    InvalidState(String),
}

/// Failures reported by the REST collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestError {
    /// The request never produced a response (connection, timeout, decoding).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl RestError {
    /// True when the server rejected an update because the submitted
    /// `expectedVersion` no longer matches the stored record.
    pub fn is_version_conflict(&self) -> bool {
        match self {
            Self::Server { message, .. } => message.contains(VERSION_CONFLICT_PATTERN),
            Self::Transport(_) => false,
        }
    }
}

/// Error returned by entity operations that call the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Rest(#[from] RestError),
}

impl Error {
    /// See [`RestError::is_version_conflict`].
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::Rest(e) if e.is_version_conflict())
    }
}
