//! Version transformation pipeline.
//!
//! Symbolic versions are rewritten into concrete, repository-backed ones
//! before dependency metadata is read:
//!
//! - **Release**: `RELEASE` becomes the recorded release version
//! - **Latest**: `LATEST` becomes the newest recorded version
//! - **Snapshot**: `1.0-SNAPSHOT` becomes the last deployed timestamped
//!   build, or stays as is when only a local copy exists
//!
//! Each transform leaves versions it does not own untouched, so running the
//! pipeline on a concrete version is a no-op.

use crate::error::{MetadataError, TransformError};
use crate::source::{ArtifactDescriptor, MetadataSource, SourceFuture};
use chrono::{DateTime, Utc};
use maestro_core::{Artifact, ArtifactVersion, Coordinate, LATEST, RELEASE, SNAPSHOT};
use maestro_repository::{
    MetadataKey, MetadataManager, Repository, RepositoryAccess, RepositoryMetadata,
    SnapshotVersion,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// UTC timestamp format of deployed snapshots.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionTransform {
    /// `RELEASE` to the recorded release.
    Release,
    /// `LATEST` to the newest recorded version.
    Latest,
    /// `x-SNAPSHOT` to its timestamped build.
    Snapshot,
}

impl VersionTransform {
    /// Check whether this transform rewrites `version`.
    #[must_use]
    pub fn applies_to(self, version: &ArtifactVersion) -> bool {
        match self {
            Self::Release => version.as_str() == RELEASE,
            Self::Latest => version.as_str() == LATEST,
            Self::Snapshot => version.is_unresolved_snapshot(),
        }
    }

    /// Metadata envelope consulted for `version` of `artifact`.
    #[must_use]
    pub fn metadata_key(self, artifact: &Artifact, version: &ArtifactVersion) -> MetadataKey {
        match self {
            Self::Release | Self::Latest => MetadataKey::artifact(&artifact.key()),
            Self::Snapshot => MetadataKey::version(&artifact.key(), version.as_str()),
        }
    }

    /// Concrete version recorded in `metadata`.
    pub fn construct_version(
        self,
        coordinate: &Coordinate,
        version: &ArtifactVersion,
        metadata: &RepositoryMetadata,
    ) -> Result<ArtifactVersion, TransformError> {
        let versioning = &metadata.versioning;
        let not_found = || TransformError::VersionNotFound {
            coordinate: coordinate.to_string(),
            kind: self,
        };
        match self {
            Self::Release => versioning
                .release
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(ArtifactVersion::parse)
                .ok_or_else(not_found),
            Self::Latest => versioning
                .latest
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(ArtifactVersion::parse)
                .or_else(|| metadata.highest_version())
                .ok_or_else(not_found),
            Self::Snapshot => Ok(match &versioning.snapshot {
                Some(SnapshotVersion {
                    timestamp: Some(timestamp),
                    build_number,
                    local_copy: false,
                }) if *build_number > 0 => timestamped(version, timestamp, *build_number),
                _ => version.clone(),
            }),
        }
    }
}

impl fmt::Display for VersionTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Release => RELEASE,
            Self::Latest => LATEST,
            Self::Snapshot => SNAPSHOT,
        })
    }
}

/// Replace the `SNAPSHOT` suffix of `base` with `timestamp-build`.
fn timestamped(base: &ArtifactVersion, timestamp: &str, build_number: u32) -> ArtifactVersion {
    if !base.is_unresolved_snapshot() {
        return base.clone();
    }
    let raw = base.as_str();
    let prefix = &raw[..raw.len() - SNAPSHOT.len()];
    ArtifactVersion::parse(format!("{prefix}{timestamp}-{build_number}"))
}

/// Format a deployment time the way snapshot metadata records it.
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string()
}

/// Transforms applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPipeline {
    transforms: Vec<VersionTransform>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransformPipeline {
    /// Release, then latest, then snapshot.
    ///
    /// `LATEST` may name a snapshot, which the snapshot step then resolves.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            VersionTransform::Release,
            VersionTransform::Latest,
            VersionTransform::Snapshot,
        ])
    }

    /// A custom sequence.
    #[must_use]
    pub const fn new(transforms: Vec<VersionTransform>) -> Self {
        Self { transforms }
    }

    /// The sequence.
    #[must_use]
    pub fn transforms(&self) -> &[VersionTransform] {
        &self.transforms
    }

    /// Concrete version of `artifact`, reading metadata from `repositories`
    /// (local first, then remotes in order).
    pub async fn transform<A: RepositoryAccess>(
        &self,
        artifact: &Artifact,
        manager: &MetadataManager<A>,
        repositories: &[Repository],
    ) -> Result<ArtifactVersion, TransformError> {
        let mut version = artifact
            .effective_version()
            .cloned()
            .ok_or_else(|| TransformError::MissingVersion {
                coordinate: artifact.coordinate.to_string(),
            })?;

        for transform in &self.transforms {
            if !transform.applies_to(&version) {
                continue;
            }
            let key = transform.metadata_key(artifact, &version);
            let metadata = manager.resolve(&key, repositories).await?;
            let resolved = transform.construct_version(&artifact.coordinate, &version, &metadata)?;
            debug!(
                artifact = %artifact.coordinate,
                transform = %transform,
                from = %version,
                to = %resolved,
                "version transformed"
            );
            version = resolved;
        }
        Ok(version)
    }
}

/// What to publish when deploying a snapshot build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Build number of this deployment.
    pub build_number: u32,
    /// Deployment timestamp, `yyyyMMdd.HHmmss`.
    pub timestamp: String,
    /// Timestamped version of the deployed files.
    pub version: ArtifactVersion,
    /// Version-level metadata to publish.
    pub metadata: RepositoryMetadata,
}

/// Deployment side of the snapshot transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDeployment;

impl SnapshotDeployment {
    /// Plan the deployment of `artifact` to `remote` at `now`.
    ///
    /// The remote is read without consulting its update policy. A remote
    /// without metadata counts as build 0.
    pub async fn prepare<A: RepositoryAccess>(
        artifact: &Artifact,
        manager: &MetadataManager<A>,
        remote: &Repository,
        now: DateTime<Utc>,
    ) -> Result<DeploymentPlan, TransformError> {
        let base = artifact
            .effective_version()
            .map(ArtifactVersion::base_version)
            .ok_or_else(|| TransformError::MissingVersion {
                coordinate: artifact.coordinate.to_string(),
            })?;
        if !base.is_unresolved_snapshot() {
            return Err(TransformError::NotSnapshot {
                coordinate: artifact.coordinate.to_string(),
                version: base.to_string(),
            });
        }

        let key = MetadataKey::version(&artifact.key(), base.as_str());
        let existing = manager.resolve_fresh(&key, remote).await?;
        let previous = existing
            .as_deref()
            .and_then(|md| md.versioning.snapshot.as_ref())
            .map_or(0, |snapshot| snapshot.build_number);

        let build_number = previous + 1;
        let timestamp = format_timestamp(now);
        let version = timestamped(&base, &timestamp, build_number);

        let mut metadata = existing
            .as_deref()
            .cloned()
            .unwrap_or_else(|| RepositoryMetadata::for_key(&key));
        metadata.versioning.snapshot = Some(SnapshotVersion {
            timestamp: Some(timestamp.clone()),
            build_number,
            local_copy: false,
        });
        metadata.versioning.touch(now);

        debug!(
            artifact = %artifact.coordinate,
            repository = remote.id(),
            previous,
            build_number,
            "snapshot deployment prepared"
        );
        Ok(DeploymentPlan {
            build_number,
            timestamp,
            version,
            metadata,
        })
    }
}

/// A [`MetadataSource`] that concretizes versions through a
/// [`TransformPipeline`] and delegates everything else.
#[derive(Debug)]
pub struct TransformingSource<S, A> {
    inner: S,
    manager: Arc<MetadataManager<A>>,
    repositories: Vec<Repository>,
    pipeline: TransformPipeline,
}

impl<S: MetadataSource, A: RepositoryAccess> TransformingSource<S, A> {
    /// Wrap `inner`, reading metadata from `repositories` through `manager`.
    #[must_use]
    pub fn new(inner: S, manager: Arc<MetadataManager<A>>, repositories: Vec<Repository>) -> Self {
        Self {
            inner,
            manager,
            repositories,
            pipeline: TransformPipeline::standard(),
        }
    }

    /// Use a custom pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Wrapped source.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: MetadataSource, A: RepositoryAccess> MetadataSource for TransformingSource<S, A> {
    fn retrieve<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactDescriptor, MetadataError>> {
        self.inner.retrieve(artifact)
    }

    fn available_versions<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> SourceFuture<'a, Result<Vec<ArtifactVersion>, MetadataError>> {
        self.inner.available_versions(coordinate)
    }

    fn concretize<'a>(
        &'a self,
        artifact: &'a Artifact,
    ) -> SourceFuture<'a, Result<ArtifactVersion, MetadataError>> {
        Box::pin(async move {
            trace!(artifact = %artifact.coordinate, "concretizing version");
            let version = self
                .pipeline
                .transform(artifact, &self.manager, &self.repositories)
                .await?;
            Ok(version)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use maestro_config::UpdatePolicy;
    use maestro_core::{DependencyTrail, Scope};
    use maestro_repository::MemoryRepository;
    use url::Url;

    fn artifact(version: &str) -> Artifact {
        let coordinate = Coordinate::new("org.acme", "widget");
        let mut artifact = Artifact::new(
            coordinate.clone(),
            Scope::Compile,
            DependencyTrail::root(coordinate),
        );
        artifact.base_version = Some(ArtifactVersion::parse(version));
        artifact
    }

    fn remote() -> Repository {
        Repository::remote("central", Url::parse("https://repo.example.com").unwrap())
            .with_update_policy(UpdatePolicy::Always)
    }

    fn artifact_metadata(release: Option<&str>, latest: Option<&str>) -> RepositoryMetadata {
        let mut md =
            RepositoryMetadata::for_key(&MetadataKey::artifact(&artifact("1.0").key()));
        md.versioning.versions = vec!["1.0".into(), "1.1".into(), "2.0-SNAPSHOT".into()];
        md.versioning.release = release.map(Into::into);
        md.versioning.latest = latest.map(Into::into);
        md
    }

    fn snapshot_metadata(timestamp: &str, build_number: u32, local_copy: bool) -> RepositoryMetadata {
        let key = MetadataKey::version(&artifact("1.0").key(), "2.0-SNAPSHOT");
        let mut md = RepositoryMetadata::for_key(&key);
        md.versioning.snapshot = Some(SnapshotVersion {
            timestamp: Some(timestamp.into()),
            build_number,
            local_copy,
        });
        md
    }

    fn manager(store: &Arc<MemoryRepository>) -> MetadataManager<Arc<MemoryRepository>> {
        MetadataManager::new(Arc::clone(store))
    }

    #[test]
    fn transforms_only_touch_their_versions() {
        let release = ArtifactVersion::parse(RELEASE);
        let snapshot = ArtifactVersion::parse("1.0-SNAPSHOT");
        let concrete = ArtifactVersion::parse("1.0");
        assert!(VersionTransform::Release.applies_to(&release));
        assert!(!VersionTransform::Latest.applies_to(&release));
        assert!(VersionTransform::Snapshot.applies_to(&snapshot));
        assert!(!VersionTransform::Snapshot.applies_to(&concrete));
        assert!(!VersionTransform::Snapshot
            .applies_to(&ArtifactVersion::parse("1.0-20240101.101010-2")));
    }

    #[test]
    fn latest_falls_back_to_highest_version() {
        let md = artifact_metadata(None, None);
        let coordinate = Coordinate::new("org.acme", "widget");
        let latest = VersionTransform::Latest
            .construct_version(&coordinate, &ArtifactVersion::parse(LATEST), &md)
            .unwrap();
        assert_eq!(latest.as_str(), "2.0-SNAPSHOT");

        let err = VersionTransform::Release
            .construct_version(&coordinate, &ArtifactVersion::parse(RELEASE), &md)
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::VersionNotFound {
                kind: VersionTransform::Release,
                ..
            }
        ));
    }

    #[test]
    fn local_copy_keeps_base_version() {
        let coordinate = Coordinate::new("org.acme", "widget");
        let base = ArtifactVersion::parse("2.0-SNAPSHOT");
        let local = snapshot_metadata("20240101.101010", 4, true);
        assert_eq!(
            VersionTransform::Snapshot
                .construct_version(&coordinate, &base, &local)
                .unwrap(),
            base
        );
        let deployed = snapshot_metadata("20240101.101010", 4, false);
        assert_eq!(
            VersionTransform::Snapshot
                .construct_version(&coordinate, &base, &deployed)
                .unwrap()
                .as_str(),
            "2.0-20240101.101010-4"
        );
    }

    #[tokio::test]
    async fn pipeline_resolves_release_and_leaves_concrete() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", artifact_metadata(Some("1.1"), Some("2.0-SNAPSHOT")));
        let manager = manager(&store);
        let pipeline = TransformPipeline::standard();

        let release = pipeline
            .transform(&artifact(RELEASE), &manager, &[remote()])
            .await
            .unwrap();
        assert_eq!(release.as_str(), "1.1");

        let fetches = store.fetch_count();
        let concrete = pipeline
            .transform(&artifact("1.0"), &manager, &[remote()])
            .await
            .unwrap();
        assert_eq!(concrete.as_str(), "1.0");
        assert_eq!(store.fetch_count(), fetches);
    }

    #[tokio::test]
    async fn latest_snapshot_is_timestamped() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", artifact_metadata(Some("1.1"), Some("2.0-SNAPSHOT")));
        store.put("central", snapshot_metadata("20240301.120000", 7, false));

        let version = TransformPipeline::standard()
            .transform(&artifact(LATEST), &manager(&store), &[remote()])
            .await
            .unwrap();
        assert_eq!(version.as_str(), "2.0-20240301.120000-7");
    }

    #[tokio::test]
    async fn snapshot_without_remote_data_stays_unresolved() {
        let store = Arc::new(MemoryRepository::new());
        let version = TransformPipeline::standard()
            .transform(&artifact("2.0-SNAPSHOT"), &manager(&store), &[remote()])
            .await
            .unwrap();
        assert_eq!(version.as_str(), "2.0-SNAPSHOT");
    }

    #[tokio::test]
    async fn retrieval_failure_propagates() {
        let store = Arc::new(MemoryRepository::new());
        store.fail(
            "central",
            MetadataKey::artifact(&artifact("1.0").key()),
            "502 Bad Gateway",
        );
        let err = TransformPipeline::standard()
            .transform(&artifact(RELEASE), &manager(&store), &[remote()])
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Retrieval(_)));
    }

    #[tokio::test]
    async fn deployment_round_trip() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", snapshot_metadata("20240101.000000", 3, false));
        let manager = manager(&store);
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        let plan = SnapshotDeployment::prepare(&artifact("2.0-SNAPSHOT"), &manager, &remote(), now)
            .await
            .unwrap();
        assert_eq!(plan.build_number, 4);
        assert_eq!(plan.timestamp, "20240506.070809");
        assert_eq!(plan.version.as_str(), "2.0-20240506.070809-4");
        assert_eq!(
            plan.metadata.versioning.last_updated.as_deref(),
            Some("20240506070809")
        );

        store.put("central", plan.metadata.clone());
        let resolved = TransformPipeline::standard()
            .transform(&artifact("2.0-SNAPSHOT"), &manager, &[remote()])
            .await
            .unwrap();
        assert_eq!(resolved, plan.version);
        assert_eq!(resolved.as_str(), plan.version.as_str());
    }

    #[tokio::test]
    async fn first_deployment_is_build_one() {
        let store = Arc::new(MemoryRepository::new());
        let plan = SnapshotDeployment::prepare(
            &artifact("2.0-SNAPSHOT"),
            &manager(&store),
            &remote(),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(plan.build_number, 1);
    }

    #[tokio::test]
    async fn deploying_a_release_is_rejected() {
        let store = Arc::new(MemoryRepository::new());
        let err = SnapshotDeployment::prepare(&artifact("2.0"), &manager(&store), &remote(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::NotSnapshot { .. }));
    }

    #[tokio::test]
    async fn transforming_source_concretizes() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", artifact_metadata(Some("1.1"), None));
        let source = TransformingSource::new(
            crate::source::MemorySource::new(),
            Arc::new(manager(&store)),
            vec![remote()],
        );
        let version = source.concretize(&artifact(RELEASE)).await.unwrap();
        assert_eq!(version.as_str(), "1.1");
    }

    #[tokio::test]
    async fn collector_reads_timestamped_snapshot_descriptor() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", snapshot_metadata("20240301.120000", 7, false));
        let descriptors = crate::source::MemorySource::new();
        descriptors
            .add_version("org.acme:widget", "2.0-20240301.120000-7", &[("org.acme:gear", "1.0")])
            .unwrap();
        descriptors.add_version("org.acme:gear", "1.0", &[]).unwrap();
        let source = TransformingSource::new(descriptors, Arc::new(manager(&store)), vec![remote()]);

        let result = crate::collector::ArtifactCollector::new(source)
            .collect(&crate::types::ResolutionRequest::anonymous(vec![
                crate::source::DeclaredDependency::parse("org.acme:widget", "2.0-SNAPSHOT").unwrap(),
            ]))
            .await
            .unwrap();

        let widget = &result.included[0];
        assert_eq!(widget.version.as_ref().unwrap().as_str(), "2.0-20240301.120000-7");
        assert_eq!(widget.base_version.as_ref().unwrap().as_str(), "2.0-SNAPSHOT");
        assert!(widget.is_snapshot());
        assert_eq!(result.included.len(), 2);
    }
}
