//! Error types for the Repose core.

use thiserror::Error;

/// A shared error type for the session-continuity core.
///
/// The variants follow the error taxonomy the core guarantees to its
/// callers:
///
/// - [`ReposeError::Validation`]: bad input, rejected before any mutation
/// - [`ReposeError::TransientStore`]: the underlying store is unreachable;
///   safe to retry, in-memory state is untouched
/// - [`ReposeError::Conflict`]: an optimistic-concurrency update lost the
///   race after bounded retries; the caller may retry later
/// - [`ReposeError::Parse`]: stored data could not be decoded
#[derive(Error, Debug, Clone)]
pub enum ReposeError {
    /// Input was rejected before any mutation took place.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The underlying store could not be reached; the operation may be
    /// retried without risk of partial effects.
    #[error("Store unavailable: {0}")]
    TransientStore(String),

    /// An optimistic-concurrency update kept losing to concurrent writers.
    #[error("Concurrent update conflict after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// Stored data could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Entity not found error with type information.
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations).
    #[error("IO error: {0}")]
    Io(String),

    /// Internal error (should not happen in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReposeError {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a TransientStore error.
    pub fn transient_store(message: impl Into<String>) -> Self {
        Self::TransientStore(message.into())
    }

    /// Creates a Parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates a NotFound error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a TransientStore error.
    pub fn is_transient_store(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    /// Check if this is a Conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

impl From<std::io::Error> for ReposeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ReposeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result type alias using [`ReposeError`].
pub type Result<T> = std::result::Result<T, ReposeError>;
