//! Error types for dependency resolution.
//!
//! Failures come in two tiers. [`NodeError`] belongs to one node and is
//! accumulated in the result while traversal continues. [`ResolveError`]
//! aborts the whole request.

use crate::transform::VersionTransform;
use maestro_core::{ArtifactKey, ConstraintError, DependencyTrail};
use maestro_repository::RepositoryError;
use std::time::Duration;
use thiserror::Error;

/// Result type for resolution requests.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors produced while turning a symbolic version into a concrete one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Repository metadata does not record the requested version.
    #[error("unable to determine the {kind} version of {coordinate}")]
    VersionNotFound {
        /// Artifact being transformed.
        coordinate: String,
        /// Which transform gave up.
        kind: VersionTransform,
    },

    /// The artifact carries no version at all.
    #[error("{coordinate} has no version to transform")]
    MissingVersion {
        /// Artifact being transformed.
        coordinate: String,
    },

    /// Deployment was asked for a version that is not a snapshot.
    #[error("{coordinate}:{version} is not a snapshot version")]
    NotSnapshot {
        /// Artifact being deployed.
        coordinate: String,
        /// Its version.
        version: String,
    },

    /// Metadata could not be read.
    #[error(transparent)]
    Retrieval(#[from] RepositoryError),
}

/// Errors reported by a [`MetadataSource`](crate::MetadataSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// I/O or parse failure.
    #[error("failed to retrieve metadata for {coordinate}: {message}")]
    Retrieval {
        /// Artifact being read.
        coordinate: String,
        /// Underlying failure.
        message: String,
    },

    /// No descriptor exists for this version.
    #[error("no descriptor for {coordinate}:{version}")]
    NotFound {
        /// Artifact being read.
        coordinate: String,
        /// Requested version.
        version: String,
    },

    /// The source cannot turn the declared version into a concrete one.
    #[error("cannot resolve version {version} of {coordinate}")]
    Unresolvable {
        /// Artifact being read.
        coordinate: String,
        /// Declared version.
        version: String,
    },

    /// Version transformation failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The fetch did not finish in time.
    #[error("fetching {coordinate} timed out after {timeout:?}")]
    Timeout {
        /// Artifact being read.
        coordinate: String,
        /// Configured limit.
        timeout: Duration,
    },
}

/// Failure attached to a single node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Range arithmetic failed.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// Metadata could not be obtained.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Request-aborting resolution errors.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A required artifact could not be resolved.
    #[error("failed to resolve {artifact} (path: {trail}): {source}")]
    RequiredArtifact {
        /// The artifact, as `coordinate:version:scope`.
        artifact: String,
        /// Path from the root.
        trail: DependencyTrail,
        /// What went wrong.
        #[source]
        source: NodeError,
    },

    /// The conflict resolver did not pick a candidate.
    #[error("conflict resolution for {key} produced no winner (path: {trail}): {reason}")]
    NoWinner {
        /// Contested identity.
        key: ArtifactKey,
        /// Path of the first candidate.
        trail: DependencyTrail,
        /// Resolver explanation.
        reason: String,
    },

    /// The whole request exceeded its time limit.
    #[error("resolution timed out after {elapsed:?}")]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
    },
}

impl ResolveError {
    /// Path of the failing node, when the error concerns one.
    #[must_use]
    pub const fn trail(&self) -> Option<&DependencyTrail> {
        match self {
            Self::RequiredArtifact { trail, .. } | Self::NoWinner { trail, .. } => Some(trail),
            Self::Timeout { .. } => None,
        }
    }
}
