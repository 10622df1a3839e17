//! Error types for PulseAPI setup.
//!
//! [`PulseError`] covers what can go wrong before the data layer runs:
//! reading and validating configuration, and preparing log directories.
//! Data-layer failures have their own types in `pulse-data`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`PulseError`].
pub type Result<T> = std::result::Result<T, PulseError>;

/// Configuration and setup failures.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Config file could not be parsed
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Config parsed but a value is out of range
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// A value the config points at (e.g. an env var) is absent
    #[error("Missing required config value: {field}")]
    ConfigMissingField { field: String },

    /// Reading a file failed
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log or data directory could not be created
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PulseError {
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failure came from the configuration file or its values.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. } | Self::ConfigValidation { .. } | Self::ConfigMissingField { .. }
        )
    }

    /// A hint the CLI prints under the error, when one applies.
    pub fn guidance(&self) -> Option<String> {
        match self {
            Self::ConfigInvalid { path, .. } => {
                Some(format!("Fix the YAML in {} or pass --config <path>", path.display()))
            }
            Self::ConfigValidation { .. } => {
                Some("See the backend/demo/store sections of ~/.pulse/config.yaml".to_string())
            }
            Self::ConfigMissingField { field } => Some(format!("Export {field} before running pulse")),
            Self::DirectoryCreation { .. } => Some("Check permissions or pass --log-dir".to_string()),
            Self::Io { .. } | Self::Internal { .. } => None,
        }
    }
}
