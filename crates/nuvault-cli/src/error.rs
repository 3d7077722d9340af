//! CLI error types with exit code handling
//!
//! Repository errors are mapped onto a small set of diagnostics, each with
//! its own exit code.

use miette::Diagnostic;
use nuvault_repo::RepoError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nuvault::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// User provided invalid input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(nuvault::cli::input))]
    Input { message: String },

    /// API key missing or not valid for the package
    #[error("Unauthorized: {message}")]
    #[diagnostic(
        code(nuvault::cli::unauthorized),
        help("Check the --api-key value against the apiKeys section of the settings")
    )]
    Unauthorized { message: String },

    /// The push policy refused the package
    #[error("Push of {id} {version} rejected by the {policy} policy")]
    #[diagnostic(code(nuvault::cli::rejected))]
    Rejected {
        id: String,
        version: String,
        policy: String,
    },

    /// Nothing matches the requested id or version
    #[error("Not found: {message}")]
    #[diagnostic(code(nuvault::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (storage, file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(nuvault::cli::io))]
    Io { message: String },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(nuvault::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Unauthorized { .. } => exit_codes::UNAUTHORIZED,
            CliError::Rejected { .. } => exit_codes::ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a not-found error with help text
    pub fn not_found(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::Authorization { .. } => CliError::Unauthorized { message },
            RepoError::NotFound { .. } => CliError::NotFound {
                message,
                help: None,
            },
            RepoError::InvalidPackage(_) | RepoError::Conflict { .. } => {
                CliError::Input { message }
            }
            RepoError::InvalidConfig { .. } | RepoError::Serialization(_) => CliError::Config {
                message,
                help: Some("Pass --config or set NUVAULT_CONFIG to a valid settings file".into()),
            },
            RepoError::Storage { .. } | RepoError::Io(_) => CliError::Io { message },
            RepoError::Core(_) => CliError::Internal { message },
        }
    }
}

impl From<nuvault_core::CoreError> for CliError {
    fn from(err: nuvault_core::CoreError) -> Self {
        CliError::Input {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
