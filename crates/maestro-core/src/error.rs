//! Error types for core artifact parsing and version constraints.

use thiserror::Error;

/// Errors raised while parsing coordinates, scopes and exclusions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Coordinate did not have the `group:artifact[:type[:classifier]]` shape.
    #[error("invalid coordinate '{0}': expected groupId:artifactId[:type[:classifier]]")]
    InvalidCoordinate(String),

    /// Unknown dependency scope.
    #[error("unknown scope '{0}'")]
    UnknownScope(String),

    /// Exclusion pattern did not have the `group:artifact` shape.
    #[error("invalid exclusion '{0}': expected groupId:artifactId")]
    InvalidExclusion(String),

    /// Version constraint error.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

/// Errors produced by version range parsing and range arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// Range specification could not be parsed.
    #[error("invalid version range '{spec}': {reason}")]
    InvalidRange {
        /// Offending specification.
        spec: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Two constraints share no version.
    #[error("version constraints {left} and {right} do not overlap")]
    NoOverlap {
        /// First constraint.
        left: String,
        /// Second constraint.
        right: String,
    },

    /// None of the available versions satisfies the constraint.
    #[error("no version satisfies {constraint} (available: {available})")]
    NoVersionInRange {
        /// The unsatisfied constraint.
        constraint: String,
        /// Versions that were considered, comma separated.
        available: String,
    },
}

impl ConstraintError {
    /// Create an invalid range error.
    #[must_use]
    pub fn invalid(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
