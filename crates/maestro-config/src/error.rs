//! Error types for settings loading.

use std::path::PathBuf;
use thiserror::Error;

/// Settings errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Settings file is not valid JSON for the settings schema.
    #[error("invalid settings file {path}: {message}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A single value could not be interpreted.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// Offending value.
        value: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The combined settings are inconsistent.
    #[error("invalid settings: {0}")]
    Validation(String),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a JSON error with context.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &sonic_rs::Error) -> Self {
        Self::Json {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
