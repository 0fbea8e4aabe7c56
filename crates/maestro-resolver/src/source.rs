//! Metadata source boundary.
//!
//! The collector never parses descriptors or talks to repositories itself.
//! It asks a [`MetadataSource`] for an artifact's direct dependencies, the
//! versions available for a range, and the concrete form of a symbolic
//! version.

use crate::error::{MetadataError, TransformError};
use crate::management::{ManagedDependency, ManagementMap};
use crate::transform::VersionTransform;
use dashmap::DashMap;
use maestro_core::{
    Artifact, ArtifactKey, ArtifactVersion, Coordinate, Exclusion, LATEST, RELEASE, Scope,
    VersionConstraint,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Boxed future returned by [`MetadataSource`].
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for reading artifact descriptors.
///
/// Implementations must be deterministic for a fixed repository state; the
/// collector relies on that for reproducible results.
pub trait MetadataSource: Send + Sync + 'static {
    /// Direct dependencies and dependency management of a versioned artifact.
    fn retrieve<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactDescriptor, MetadataError>>;

    /// All versions known for `coordinate`, in any order.
    fn available_versions<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> SourceFuture<'a, Result<Vec<ArtifactVersion>, MetadataError>>;

    /// Concrete version for the artifact's declared version.
    ///
    /// The default accepts any non-symbolic version unchanged.
    fn concretize<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactVersion, MetadataError>> {
        Box::pin(async move {
            match artifact.effective_version() {
                Some(version) if !version.is_symbolic() => Ok(version.clone()),
                Some(version) => Err(MetadataError::Unresolvable {
                    coordinate: artifact.coordinate.to_string(),
                    version: version.to_string(),
                }),
                None => Err(TransformError::MissingVersion {
                    coordinate: artifact.coordinate.to_string(),
                }
                .into()),
            }
        })
    }
}

impl<T: MetadataSource> MetadataSource for Arc<T> {
    fn retrieve<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactDescriptor, MetadataError>> {
        (**self).retrieve(artifact)
    }

    fn available_versions<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> SourceFuture<'a, Result<Vec<ArtifactVersion>, MetadataError>> {
        (**self).available_versions(coordinate)
    }

    fn concretize<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactVersion, MetadataError>> {
        (**self).concretize(artifact)
    }
}

/// A dependency as written in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    /// Target coordinate.
    pub coordinate: Coordinate,
    /// Declared version or range.
    pub constraint: VersionConstraint,
    /// Declared scope.
    pub scope: Scope,
    /// Declared optional.
    pub optional: bool,
    /// Identities excluded below this dependency.
    pub exclusions: Vec<Exclusion>,
}

impl DeclaredDependency {
    /// A compile-scope dependency.
    #[must_use]
    pub const fn new(coordinate: Coordinate, constraint: VersionConstraint) -> Self {
        Self {
            coordinate,
            constraint,
            scope: Scope::Compile,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    /// Parse `groupId:artifactId[:type[:classifier]]` and a version spec.
    pub fn parse(coordinate: &str, version: &str) -> maestro_core::Result<Self> {
        Ok(Self::new(
            Coordinate::parse(coordinate)?,
            VersionConstraint::parse(version)?,
        ))
    }

    /// Set the scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Add an exclusion.
    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }
}

/// What a descriptor says about an artifact's dependencies.
#[derive(Debug, Clone, Default)]
pub struct ArtifactDescriptor {
    /// Direct dependencies in declaration order.
    pub dependencies: Vec<DeclaredDependency>,
    /// Pins applied to transitive dependencies below this artifact.
    pub management: ManagementMap,
}

impl ArtifactDescriptor {
    /// Descriptor without dependencies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: DeclaredDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a management entry.
    #[must_use]
    pub fn with_managed(mut self, key: ArtifactKey, managed: ManagedDependency) -> Self {
        self.management.insert(key, managed);
        self
    }
}

/// In-memory metadata source for tests and benchmarks.
///
/// Descriptors are keyed by identity and version; the artifact type and
/// classifier are ignored.
#[derive(Debug, Default)]
pub struct MemorySource {
    descriptors: DashMap<(ArtifactKey, ArtifactVersion), ArtifactDescriptor, ahash::RandomState>,
    versions: DashMap<ArtifactKey, Vec<ArtifactVersion>, ahash::RandomState>,
    failures: DashMap<ArtifactKey, String, ahash::RandomState>,
    latency: Option<Duration>,
    retrievals: AtomicU64,
    listings: AtomicU64,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register a version with its descriptor.
    pub fn add(
        &self,
        coordinate: &str,
        version: &str,
        descriptor: ArtifactDescriptor,
    ) -> maestro_core::Result<()> {
        let key = Coordinate::parse(coordinate)?.key();
        let version = ArtifactVersion::parse(version);
        {
            let mut known = self.versions.entry(key.clone()).or_default();
            if !known.contains(&version) {
                known.push(version.clone());
            }
        }
        self.descriptors.insert((key, version), descriptor);
        Ok(())
    }

    /// Register a version whose dependencies are `(coordinate, version)`
    /// pairs in compile scope.
    pub fn add_version(
        &self,
        coordinate: &str,
        version: &str,
        dependencies: &[(&str, &str)],
    ) -> maestro_core::Result<()> {
        let mut descriptor = ArtifactDescriptor::new();
        for (dep, spec) in dependencies {
            descriptor = descriptor.with_dependency(DeclaredDependency::parse(dep, spec)?);
        }
        self.add(coordinate, version, descriptor)
    }

    /// Make every request for `key` fail.
    pub fn fail(&self, key: ArtifactKey, message: impl Into<String>) {
        self.failures.insert(key, message.into());
    }

    /// Number of descriptor retrievals served.
    #[must_use]
    pub fn retrieval_count(&self) -> u64 {
        self.retrievals.load(Ordering::Relaxed)
    }

    /// Number of version listings and concretizations served.
    #[must_use]
    pub fn listing_count(&self) -> u64 {
        self.listings.load(Ordering::Relaxed)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check(&self, coordinate: &Coordinate) -> Result<(), MetadataError> {
        match self.failures.get(&coordinate.key()) {
            Some(message) => Err(MetadataError::Retrieval {
                coordinate: coordinate.to_string(),
                message: message.value().clone(),
            }),
            None => Ok(()),
        }
    }

    fn known_versions(&self, key: &ArtifactKey) -> Vec<ArtifactVersion> {
        self.versions
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl MetadataSource for MemorySource {
    fn retrieve<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactDescriptor, MetadataError>> {
        Box::pin(async move {
            self.pause().await;
            self.retrievals.fetch_add(1, Ordering::Relaxed);
            self.check(&artifact.coordinate)?;
            let not_found = || MetadataError::NotFound {
                coordinate: artifact.coordinate.to_string(),
                version: artifact
                    .effective_version()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            };
            let version = artifact.version.clone().ok_or_else(not_found)?;
            trace!(artifact = %artifact.coordinate, %version, "reading descriptor");
            self.descriptors
                .get(&(artifact.key(), version))
                .map(|entry| entry.value().clone())
                .ok_or_else(not_found)
        })
    }

    fn available_versions<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> SourceFuture<'a, Result<Vec<ArtifactVersion>, MetadataError>> {
        Box::pin(async move {
            self.pause().await;
            self.listings.fetch_add(1, Ordering::Relaxed);
            self.check(coordinate)?;
            Ok(self.known_versions(&coordinate.key()))
        })
    }

    fn concretize<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactVersion, MetadataError>> {
        Box::pin(async move {
            self.listings.fetch_add(1, Ordering::Relaxed);
            self.check(&artifact.coordinate)?;
            let Some(declared) = artifact.effective_version() else {
                return Err(MetadataError::from(TransformError::MissingVersion {
                    coordinate: artifact.coordinate.to_string(),
                }));
            };
            let known = self.known_versions(&artifact.key());
            let (kind, found) = match declared.as_str() {
                RELEASE => (
                    VersionTransform::Release,
                    known.into_iter().filter(|v| !v.is_snapshot()).max(),
                ),
                LATEST => (VersionTransform::Latest, known.into_iter().max()),
                _ => return Ok(declared.clone()),
            };
            found.ok_or_else(|| {
                MetadataError::from(TransformError::VersionNotFound {
                    coordinate: artifact.coordinate.to_string(),
                    kind,
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::DependencyTrail;

    fn artifact(coordinate: &str, version: &str) -> Artifact {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        let mut artifact = Artifact::new(
            coordinate.clone(),
            Scope::Compile,
            DependencyTrail::root(coordinate),
        );
        artifact.select_version(ArtifactVersion::parse(version));
        artifact
    }

    fn source() -> MemorySource {
        let source = MemorySource::new();
        source
            .add_version("org.acme:lib", "1.0", &[("org.acme:util", "[1.0,2.0)")])
            .unwrap();
        source.add_version("org.acme:lib", "1.1", &[]).unwrap();
        source.add_version("org.acme:lib", "2.0-SNAPSHOT", &[]).unwrap();
        source
    }

    #[tokio::test]
    async fn retrieves_registered_descriptor() {
        let source = source();
        let descriptor = source.retrieve(&artifact("org.acme:lib", "1.0")).await.unwrap();
        assert_eq!(descriptor.dependencies.len(), 1);
        assert_eq!(descriptor.dependencies[0].coordinate.artifact_id, "util");
        assert!(descriptor.dependencies[0].constraint.is_range());
        assert_eq!(source.retrieval_count(), 1);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let err = source()
            .retrieve(&artifact("org.acme:lib", "9.9"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::NotFound { ref version, .. } if version == "9.9"));
    }

    #[tokio::test]
    async fn configured_failure() {
        let source = source();
        source.fail(ArtifactKey::new("org.acme", "lib"), "connection refused");
        let err = source
            .available_versions(&Coordinate::new("org.acme", "lib"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn concretizes_symbolic_versions() {
        let source = source();
        let release = source.concretize(&artifact("org.acme:lib", RELEASE)).await.unwrap();
        assert_eq!(release.as_str(), "1.1");
        let latest = source.concretize(&artifact("org.acme:lib", LATEST)).await.unwrap();
        assert_eq!(latest.as_str(), "2.0-SNAPSHOT");
        let plain = source.concretize(&artifact("org.acme:lib", "1.0")).await.unwrap();
        assert_eq!(plain.as_str(), "1.0");
    }

    #[tokio::test]
    async fn release_without_versions_fails() {
        let err = MemorySource::new()
            .concretize(&artifact("org.acme:ghost", RELEASE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Transform(TransformError::VersionNotFound {
                kind: VersionTransform::Release,
                ..
            })
        ));
    }

    #[test]
    fn declared_dependency_builders() {
        let dep = DeclaredDependency::parse("org.acme:lib:test-jar", "[1.0]")
            .unwrap()
            .with_scope(Scope::Test)
            .optional()
            .with_exclusion(Exclusion::new("*", "*"));
        assert_eq!(dep.coordinate.artifact_type, "test-jar");
        assert_eq!(dep.scope, Scope::Test);
        assert!(dep.optional);
        assert_eq!(dep.exclusions.len(), 1);
        assert!(DeclaredDependency::parse("broken", "1.0").is_err());
        assert!(DeclaredDependency::parse("g:a", "[1.0").is_err());
    }
}
