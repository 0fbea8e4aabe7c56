//! Repository access: where metadata envelopes are read from.

use crate::error::{RepositoryError, Result};
use crate::metadata::{MetadataKey, RepositoryMetadata};
use crate::repository::{Repository, RepositoryLocation};
use dashmap::DashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::trace;

/// Boxed future returned by [`RepositoryAccess`].
pub type AccessFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for reading metadata envelopes from repositories.
///
/// `Ok(None)` means the repository has no envelope for the key, which is
/// not an error.
pub trait RepositoryAccess: Send + Sync + 'static {
    /// Read the envelope for `key` from `repository`.
    fn fetch_metadata<'a>(
        &'a self,
        key: &'a MetadataKey,
        repository: &'a Repository,
    ) -> AccessFuture<'a, Result<Option<RepositoryMetadata>>>;

    /// Whether remote repositories may be contacted.
    fn is_online(&self) -> bool;
}

impl<T: RepositoryAccess> RepositoryAccess for Arc<T> {
    fn fetch_metadata<'a>(
        &'a self,
        key: &'a MetadataKey,
        repository: &'a Repository,
    ) -> AccessFuture<'a, Result<Option<RepositoryMetadata>>> {
        (**self).fetch_metadata(key, repository)
    }

    fn is_online(&self) -> bool {
        (**self).is_online()
    }
}

/// In-memory repositories, keyed by repository id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: DashMap<(String, MetadataKey), RepositoryMetadata, ahash::RandomState>,
    failures: DashMap<(String, MetadataKey), String, ahash::RandomState>,
    offline: AtomicBool,
    fetches: AtomicU64,
}

impl MemoryRepository {
    /// Create an empty, online store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an envelope in repository `repository_id`, replacing any
    /// previous one.
    pub fn put(&self, repository_id: &str, metadata: RepositoryMetadata) {
        let key = metadata.key();
        self.entries
            .insert((repository_id.to_string(), key), metadata);
    }

    /// Make fetches of `key` from `repository_id` fail.
    pub fn fail(&self, repository_id: &str, key: MetadataKey, message: impl Into<String>) {
        self.failures
            .insert((repository_id.to_string(), key), message.into());
    }

    /// Current envelope, if stored.
    #[must_use]
    pub fn get(&self, repository_id: &str, key: &MetadataKey) -> Option<RepositoryMetadata> {
        self.entries
            .get(&(repository_id.to_string(), key.clone()))
            .map(|e| e.value().clone())
    }

    /// Switch offline mode.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    /// Number of fetches served.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl RepositoryAccess for MemoryRepository {
    fn fetch_metadata<'a>(
        &'a self,
        key: &'a MetadataKey,
        repository: &'a Repository,
    ) -> AccessFuture<'a, Result<Option<RepositoryMetadata>>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            let entry = (repository.id().to_string(), key.clone());
            if let Some(message) = self.failures.get(&entry) {
                return Err(RepositoryError::MetadataRetrieval {
                    key: key.to_string(),
                    repository: repository.id().to_string(),
                    message: message.value().clone(),
                });
            }
            Ok(self.entries.get(&entry).map(|e| e.value().clone()))
        })
    }

    fn is_online(&self) -> bool {
        !self.offline.load(Ordering::Acquire)
    }
}

/// Repositories laid out on disk, one JSON envelope per directory.
///
/// Serves local repositories and remotes with `file://` URLs. Other URL
/// schemes need a network-capable [`RepositoryAccess`].
#[derive(Debug, Clone, Default)]
pub struct FileSystemAccess {
    offline: bool,
}

impl FileSystemAccess {
    /// Create an online accessor.
    #[must_use]
    pub const fn new() -> Self {
        Self { offline: false }
    }

    /// Create an accessor that skips remote repositories.
    #[must_use]
    pub const fn offline() -> Self {
        Self { offline: true }
    }

    fn root(key: &MetadataKey, repository: &Repository) -> Result<PathBuf> {
        match repository.location() {
            RepositoryLocation::Local(path) => Ok(path.clone()),
            RepositoryLocation::Remote(url) => {
                url.to_file_path()
                    .map_err(|()| RepositoryError::MetadataRetrieval {
                        key: key.to_string(),
                        repository: repository.id().to_string(),
                        message: format!("no transport for scheme '{}'", url.scheme()),
                    })
            }
        }
    }

    /// Write an envelope into a repository directory.
    pub async fn store(
        &self,
        repository: &Repository,
        metadata: &RepositoryMetadata,
    ) -> Result<PathBuf> {
        let key = metadata.key();
        let path = Self::root(&key, repository)?.join(key.relative_path());
        let retrieval_error = |message: String| RepositoryError::MetadataRetrieval {
            key: key.to_string(),
            repository: repository.id().to_string(),
            message,
        };

        let json = metadata
            .to_json()
            .map_err(|e| retrieval_error(e.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| retrieval_error(e.to_string()))?;
        }
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| retrieval_error(e.to_string()))?;
        Ok(path)
    }

    async fn read(
        key: &MetadataKey,
        repository: &Repository,
        root: &Path,
    ) -> Result<Option<RepositoryMetadata>> {
        let path = root.join(key.relative_path());
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "no metadata");
                return Ok(None);
            }
            Err(e) => {
                return Err(RepositoryError::MetadataRetrieval {
                    key: key.to_string(),
                    repository: repository.id().to_string(),
                    message: e.to_string(),
                });
            }
        };
        RepositoryMetadata::from_json(&json)
            .map(Some)
            .map_err(|e| RepositoryError::Parse {
                key: key.to_string(),
                repository: repository.id().to_string(),
                message: e.to_string(),
            })
    }
}

impl RepositoryAccess for FileSystemAccess {
    fn fetch_metadata<'a>(
        &'a self,
        key: &'a MetadataKey,
        repository: &'a Repository,
    ) -> AccessFuture<'a, Result<Option<RepositoryMetadata>>> {
        Box::pin(async move {
            let root = Self::root(key, repository)?;
            Self::read(key, repository, &root).await
        })
    }

    fn is_online(&self) -> bool {
        !self.offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::ArtifactKey;
    use url::Url;

    fn key() -> MetadataKey {
        MetadataKey::artifact(&ArtifactKey::new("org.acme", "widget"))
    }

    fn envelope() -> RepositoryMetadata {
        let mut md = RepositoryMetadata::for_key(&key());
        md.versioning.versions = vec!["1.0".into(), "1.1".into()];
        md.versioning.release = Some("1.1".into());
        md
    }

    #[tokio::test]
    async fn memory_repository_round_trip() {
        let store = MemoryRepository::new();
        let repo = Repository::local("/unused");
        store.put(repo.id(), envelope());

        let fetched = store.fetch_metadata(&key(), &repo).await.unwrap();
        assert_eq!(fetched, Some(envelope()));
        assert_eq!(store.fetch_count(), 1);

        let other = MetadataKey::artifact(&ArtifactKey::new("org.acme", "other"));
        assert_eq!(store.fetch_metadata(&other, &repo).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_repository_failure() {
        let store = MemoryRepository::new();
        let repo = Repository::remote("central", Url::parse("https://repo.example.com").unwrap());
        store.fail("central", key(), "connection reset");
        let err = store.fetch_metadata(&key(), &repo).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn filesystem_store_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::local(dir.path());
        let access = FileSystemAccess::new();

        assert_eq!(access.fetch_metadata(&key(), &repo).await.unwrap(), None);

        let path = access.store(&repo, &envelope()).await.unwrap();
        assert!(path.ends_with("org/acme/widget/maestro-metadata.json"));
        assert_eq!(
            access.fetch_metadata(&key(), &repo).await.unwrap(),
            Some(envelope())
        );
    }

    #[tokio::test]
    async fn filesystem_reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let access = FileSystemAccess::new();
        access.store(&Repository::local(dir.path()), &envelope()).await.unwrap();

        let remote = Repository::remote("mirror", Url::from_directory_path(dir.path()).unwrap());
        assert!(access.fetch_metadata(&key(), &remote).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn filesystem_rejects_http() {
        let access = FileSystemAccess::new();
        let remote = Repository::remote("central", Url::parse("https://repo.example.com").unwrap());
        let err = access.fetch_metadata(&key(), &remote).await.unwrap_err();
        assert!(err.to_string().contains("no transport for scheme 'https'"));
    }

    #[tokio::test]
    async fn filesystem_reports_malformed_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(key().relative_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ broken").unwrap();

        let err = FileSystemAccess::new()
            .fetch_metadata(&key(), &Repository::local(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Parse { .. }));
    }
}
