//! Core types for the Maestro dependency resolver.
//!
//! # Features
//!
//! - **Coordinates**: `groupId:artifactId[:type[:classifier]]` with a
//!   `groupId:artifactId` conflict identity ([`ArtifactKey`])
//! - **Versions**: Maven ordering of free-form version strings, including
//!   qualifiers and timestamped snapshots
//! - **Constraints**: soft recommendations, hard ranges and range unions with
//!   intersection
//! - **Scopes**: transitive scope inheritance and classpath filters
//!
//! # Example
//!
//! ```
//! use maestro_core::{ArtifactVersion, VersionConstraint};
//!
//! let range = VersionConstraint::parse("[1.0,2.0)").unwrap();
//! let available = ["0.9", "1.4", "1.9", "2.0"].map(ArtifactVersion::parse);
//! assert_eq!(range.select_version(&available).unwrap().as_str(), "1.9");
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod coordinate;
pub mod error;
pub mod range;
pub mod scope;
pub mod version;

pub use artifact::{Artifact, DependencyTrail};
pub use coordinate::{ArtifactKey, Coordinate, DEFAULT_TYPE, Exclusion};
pub use error::{ConstraintError, Error, Result};
pub use range::{Restriction, VersionConstraint};
pub use scope::{Scope, ScopeFilter};
pub use version::{ArtifactVersion, LATEST, RELEASE, SNAPSHOT};
