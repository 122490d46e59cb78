//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The substrate rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// The substrate is full
    #[error("Storage quota exceeded ({limit_bytes} bytes)")]
    QuotaExceeded { limit_bytes: usize },

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether the failure came from the substrate rather than the caller
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::QuotaExceeded { .. })
    }
}

impl From<serde_json::Error> for ApplicationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
