//! Error types for repository operations

use nuvault_core::{CoreError, Version};
use thiserror::Error;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Push Errors ============
    #[error("Not authorized to push {id}: {reason}")]
    Authorization { id: String, reason: String },

    #[error("Package already indexed: {id} {version}")]
    Conflict { id: String, version: Version },

    #[error("Invalid package: {0}")]
    InvalidPackage(#[source] CoreError),

    // ============ Lookup Errors ============
    #[error("Package not found: {id} {version}")]
    NotFound { id: String, version: Version },

    // ============ Storage Errors ============
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ============ Configuration Errors ============
    #[error("Invalid repository configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Other ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(CoreError),
}

impl RepoError {
    /// Storage failure wrapping an I/O error
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        RepoError::Storage {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Storage failure without an underlying I/O error
    pub fn storage_msg(message: impl Into<String>) -> Self {
        RepoError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepoError::Storage { .. } | RepoError::Io(_))
    }
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<CoreError> for RepoError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidId { .. } => RepoError::InvalidPackage(e),
            CoreError::Io(io) => RepoError::Io(io),
            other => RepoError::Core(other),
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<glob::PatternError> for RepoError {
    fn from(e: glob::PatternError) -> Self {
        RepoError::InvalidConfig {
            message: format!("Invalid package pattern: {}", e),
        }
    }
}
