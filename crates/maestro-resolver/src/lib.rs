//! Transitive dependency collection for Maven-style artifacts.
//!
//! Given a root artifact and its direct dependencies, this crate computes
//! the full set of artifacts to put on a classpath: one version per
//! `groupId:artifactId`, with effective scopes, chosen the way Maven 2
//! chooses them.
//!
//! # Features
//!
//! - **Level-parallel traversal**: metadata for each depth level is fetched
//!   concurrently while every decision is made in discovery order, so
//!   results do not depend on network timing
//! - **Conflict resolution**: nearest-wins by default, newest/oldest-wins or
//!   any custom [`ConflictResolver`]
//! - **Version ranges**: soft and hard constraints narrowed by intersection
//!   as more declarations of the same artifact are discovered
//! - **Scopes, exclusions and optional dependencies**: inherited along each
//!   path from the root
//! - **Dependency management**: root and descriptor pins for transitive
//!   versions and scopes
//! - **Symbolic versions**: `RELEASE`, `LATEST` and `-SNAPSHOT` concretized
//!   through repository metadata ([`TransformingSource`])
//! - **Listeners**: every decision is observable through
//!   [`ResolutionListener`]
//!
//! # Example
//!
//! ```no_run
//! use maestro_resolver::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = MemorySource::new();
//! source.add_version("org.acme:a", "1.0", &[("org.acme:c", "1.0")])?;
//! source.add_version("org.acme:b", "1.0", &[("org.acme:c", "2.0")])?;
//! source.add_version("org.acme:c", "1.0", &[])?;
//! source.add_version("org.acme:c", "2.0", &[])?;
//!
//! let request = ResolutionRequest::anonymous(vec![
//!     DeclaredDependency::parse("org.acme:a", "1.0")?,
//!     DeclaredDependency::parse("org.acme:b", "1.0")?,
//! ]);
//! let result = ArtifactCollector::new(source).collect(&request).await?;
//!
//! for artifact in &result.included {
//!     println!("{artifact}");
//! }
//! println!("{}", result.stats.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`collector`]: the traversal and every resolution decision
//! - [`graph`]: the node arena the collector builds
//! - [`source`]: the metadata boundary and an in-memory implementation
//! - [`transform`]: symbolic and snapshot version concretization
//! - [`conflict`]: conflict resolution policies
//! - [`listener`]: resolution events
//! - [`types`]: requests, results and statistics

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod collector;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod listener;
pub mod management;
pub mod source;
pub mod transform;
pub mod tree;
pub mod types;

pub use collector::{ArtifactCollector, CollectorConfig};
pub use conflict::{ConflictPolicy, ConflictResolver, NoWinner};
pub use error::{MetadataError, NodeError, ResolveError, Result, TransformError};
pub use graph::{DependencyGraph, DependencyNode, NodeId, NodeState};
pub use listener::{
    EventKind, RecordingListener, ResolutionEvent, ResolutionListener, TracingListener,
};
pub use management::{ManagedDependency, ManagementMap};
pub use source::{
    ArtifactDescriptor, DeclaredDependency, MemorySource, MetadataSource, SourceFuture,
};
pub use transform::{
    DeploymentPlan, SnapshotDeployment, TransformPipeline, TransformingSource, VersionTransform,
};
pub use types::{
    ANONYMOUS_ROOT, ResolutionProblem, ResolutionRequest, ResolutionResult, ResolutionStats,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        ArtifactCollector, ArtifactDescriptor, CollectorConfig, ConflictPolicy,
        DeclaredDependency, ManagedDependency, ManagementMap, MemorySource, MetadataSource,
        ResolutionRequest, ResolutionResult, ResolveError,
    };
    pub use maestro_core::{ArtifactKey, ArtifactVersion, Coordinate, Scope, VersionConstraint};
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;
    use maestro_core::ArtifactKey;
    use proptest::prelude::*;

    /// Random layered graph: artifact `n` may depend on any artifact with a
    /// higher index, at one of two versions.
    fn layered(edges: &[(usize, usize, bool)], size: usize) -> MemorySource {
        let source = MemorySource::new();
        for node in 0..size {
            for version in ["1.0", "2.0"] {
                let mut descriptor = ArtifactDescriptor::new();
                for &(from, to, newer) in edges {
                    if from == node && to > from {
                        let spec = if newer { "2.0" } else { "1.0" };
                        descriptor = descriptor.with_dependency(
                            DeclaredDependency::parse(&format!("g:n{to}"), spec).unwrap(),
                        );
                    }
                }
                source.add(&format!("g:n{node}"), version, descriptor).unwrap();
            }
        }
        source
    }

    fn run(source: MemorySource, policy: ConflictPolicy) -> ResolutionResult {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let collector = ArtifactCollector::with_config(
            source,
            CollectorConfig {
                conflict_policy: policy,
                ..CollectorConfig::default()
            },
        );
        let request = ResolutionRequest::anonymous(vec![
            DeclaredDependency::parse("g:n0", "1.0").unwrap(),
        ]);
        runtime.block_on(collector.collect(&request)).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn one_version_per_identity(
            edges in prop::collection::vec((0usize..8, 0usize..8, any::<bool>()), 0..24),
            policy in prop_oneof![
                Just(ConflictPolicy::NearestWins),
                Just(ConflictPolicy::NewestWins),
                Just(ConflictPolicy::OldestWins),
            ],
        ) {
            let result = run(layered(&edges, 8), policy);

            let mut seen = AHashSet::new();
            for artifact in &result.included {
                prop_assert!(seen.insert(artifact.key()), "duplicate {}", artifact.key());
                prop_assert!(artifact.version.is_some());
            }
            prop_assert!(result.find(&ArtifactKey::new("g", "n0")).is_some());
            prop_assert!(result.is_clean());

            let again = run(layered(&edges, 8), policy);
            prop_assert_eq!(&result.included, &again.included);
        }
    }
}
