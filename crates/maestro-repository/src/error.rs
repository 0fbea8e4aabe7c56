//! Repository-specific error types.

use thiserror::Error;

/// Repository-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Metadata could not be retrieved.
    #[error("failed to retrieve metadata {key} from {repository}: {message}")]
    MetadataRetrieval {
        /// Requested envelope.
        key: String,
        /// Repository id.
        repository: String,
        /// Error message.
        message: String,
    },

    /// A remote repository was needed while offline.
    #[error("repository {repository} is not reachable in offline mode")]
    Offline {
        /// Repository id.
        repository: String,
    },

    /// Stored metadata is malformed.
    #[error("malformed metadata {key} in {repository}: {message}")]
    Parse {
        /// Requested envelope.
        key: String,
        /// Repository id.
        repository: String,
        /// Error message.
        message: String,
    },

    /// Repository definition is unusable.
    #[error("invalid repository '{id}': {message}")]
    InvalidRepository {
        /// Repository id.
        id: String,
        /// Error message.
        message: String,
    },
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
