//! Metadata resolution across repositories.

use crate::access::RepositoryAccess;
use crate::cache::MetadataCache;
use crate::error::Result;
use crate::metadata::{MetadataKey, RepositoryMetadata};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, trace};

/// Reads, merges and caches metadata envelopes.
///
/// The local repository is read first, then each remote in order. Remote
/// answers are cached per repository and reused until their update policy
/// says they are stale.
#[derive(Debug)]
pub struct MetadataManager<A> {
    access: A,
    cache: Arc<MetadataCache>,
}

impl<A: RepositoryAccess> MetadataManager<A> {
    /// Create a manager with a private cache.
    #[must_use]
    pub fn new(access: A) -> Self {
        Self::with_cache(access, Arc::new(MetadataCache::new()))
    }

    /// Create a manager sharing `cache`.
    #[must_use]
    pub const fn with_cache(access: A, cache: Arc<MetadataCache>) -> Self {
        Self { access, cache }
    }

    /// Underlying repository access.
    #[must_use]
    pub const fn access(&self) -> &A {
        &self.access
    }

    /// Shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Resolve the merged envelope for `key` at the current time.
    pub async fn resolve(
        &self,
        key: &MetadataKey,
        repositories: &[Repository],
    ) -> Result<Arc<RepositoryMetadata>> {
        self.resolve_at(key, repositories, Utc::now()).await
    }

    /// Resolve the merged envelope for `key` as of `now`.
    ///
    /// Repositories without data contribute nothing; a key unknown
    /// everywhere yields an empty envelope.
    pub async fn resolve_at(
        &self,
        key: &MetadataKey,
        repositories: &[Repository],
        now: DateTime<Utc>,
    ) -> Result<Arc<RepositoryMetadata>> {
        let online = self.access.is_online();
        let ordered = repositories
            .iter()
            .filter(|r| r.is_local())
            .chain(repositories.iter().filter(|r| !r.is_local()));

        let mut merged = RepositoryMetadata::for_key(key);
        for repository in ordered {
            if !repository.is_local() && !online {
                trace!(repository = repository.id(), %key, "offline, skipping remote");
                continue;
            }
            let Some(found) = self.fetch(key, repository, now).await? else {
                continue;
            };
            let (next, changed) = merged.merge(&found);
            if changed {
                trace!(repository = repository.id(), %key, "merged metadata");
            }
            merged = next;
        }

        debug!(%key, versions = merged.versioning.versions.len(), "metadata resolved");
        Ok(self.cache.replace_merged(key.clone(), merged))
    }

    /// Read `key` from one repository, ignoring its update policy.
    pub async fn resolve_fresh(
        &self,
        key: &MetadataKey,
        repository: &Repository,
    ) -> Result<Option<Arc<RepositoryMetadata>>> {
        let found = self
            .access
            .fetch_metadata(key, repository)
            .await?
            .map(Arc::new);
        self.cache
            .record(repository.id(), key.clone(), found.clone(), Utc::now());
        Ok(found)
    }

    async fn fetch(
        &self,
        key: &MetadataKey,
        repository: &Repository,
        now: DateTime<Utc>,
    ) -> Result<Option<Arc<RepositoryMetadata>>> {
        if !repository.is_local() {
            if let Some(cached) = self.cache.lookup(repository.id(), key) {
                if !repository
                    .update_policy()
                    .is_update_required(cached.checked_at, now)
                {
                    self.cache.hit();
                    return Ok(cached.metadata);
                }
            }
        }

        self.cache.miss();
        let found = self
            .access
            .fetch_metadata(key, repository)
            .await?
            .map(Arc::new);
        if !repository.is_local() {
            self.cache.record(repository.id(), key.clone(), found.clone(), now);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MemoryRepository;
    use crate::error::RepositoryError;
    use chrono::TimeDelta;
    use maestro_config::UpdatePolicy;
    use maestro_core::ArtifactKey;
    use url::Url;

    fn key() -> MetadataKey {
        MetadataKey::artifact(&ArtifactKey::new("org.acme", "widget"))
    }

    fn envelope(versions: &[&str], release: &str, updated: &str) -> RepositoryMetadata {
        let mut md = RepositoryMetadata::for_key(&key());
        md.versioning.versions = versions.iter().map(ToString::to_string).collect();
        md.versioning.release = Some(release.to_string());
        md.versioning.last_updated = Some(updated.to_string());
        md
    }

    fn remote(id: &str) -> Repository {
        Repository::remote(id, Url::parse(&format!("https://{id}.example.com")).unwrap())
    }

    fn repositories() -> Vec<Repository> {
        vec![remote("central"), Repository::local("/tmp/m2"), remote("mirror")]
    }

    #[tokio::test]
    async fn merges_local_then_remotes() {
        let store = Arc::new(MemoryRepository::new());
        store.put("local", envelope(&["1.0-SNAPSHOT"], "0.9", "20240101000000"));
        store.put("central", envelope(&["0.9", "1.0"], "1.0", "20240201000000"));
        store.put("mirror", envelope(&["1.1"], "1.1", "20240301000000"));

        let manager = MetadataManager::new(Arc::clone(&store));
        let merged = manager.resolve(&key(), &repositories()).await.unwrap();
        assert_eq!(
            merged.versioning.versions,
            vec!["1.0-SNAPSHOT", "0.9", "1.0", "1.1"]
        );
        assert_eq!(merged.versioning.release.as_deref(), Some("1.1"));
        assert!(Arc::ptr_eq(&manager.cache().merged(&key()).unwrap(), &merged));
    }

    #[tokio::test]
    async fn offline_reads_local_only() {
        let store = Arc::new(MemoryRepository::new());
        store.put("local", envelope(&["1.0"], "1.0", "20240101000000"));
        store.put("central", envelope(&["2.0"], "2.0", "20240201000000"));
        store.set_offline(true);

        let manager = MetadataManager::new(Arc::clone(&store));
        let merged = manager.resolve(&key(), &repositories()).await.unwrap();
        assert_eq!(merged.versioning.versions, vec!["1.0"]);
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unknown_key_yields_empty_envelope() {
        let manager = MetadataManager::new(MemoryRepository::new());
        let merged = manager.resolve(&key(), &repositories()).await.unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.group_id, "org.acme");
    }

    #[tokio::test]
    async fn retrieval_failure_propagates() {
        let store = MemoryRepository::new();
        store.fail("mirror", key(), "503 Service Unavailable");
        let manager = MetadataManager::new(store);
        let err = manager.resolve(&key(), &repositories()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::MetadataRetrieval { ref repository, .. } if repository == "mirror"));
    }

    #[tokio::test]
    async fn update_policy_controls_refetch() {
        let store = Arc::new(MemoryRepository::new());
        store.put("central", envelope(&["1.0"], "1.0", "20240101000000"));
        let repos = vec![remote("central").with_update_policy(UpdatePolicy::Interval(60))];
        let manager = MetadataManager::new(Arc::clone(&store));

        let start = Utc::now();
        manager.resolve_at(&key(), &repos, start).await.unwrap();
        store.put("central", envelope(&["1.0", "1.1"], "1.1", "20240102000000"));

        let cached = manager
            .resolve_at(&key(), &repos, start + TimeDelta::minutes(30))
            .await
            .unwrap();
        assert_eq!(cached.versioning.versions, vec!["1.0"]);
        assert_eq!(store.fetch_count(), 1);

        let refreshed = manager
            .resolve_at(&key(), &repos, start + TimeDelta::minutes(61))
            .await
            .unwrap();
        assert_eq!(refreshed.versioning.versions, vec!["1.0", "1.1"]);
        assert_eq!(store.fetch_count(), 2);
        assert_eq!(manager.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn resolve_fresh_bypasses_policy() {
        let store = Arc::new(MemoryRepository::new());
        let repo = remote("central").with_update_policy(UpdatePolicy::Never);
        let manager = MetadataManager::new(Arc::clone(&store));

        manager.resolve(&key(), std::slice::from_ref(&repo)).await.unwrap();
        store.put("central", envelope(&["3.0"], "3.0", "20240101000000"));

        let fresh = manager.resolve_fresh(&key(), &repo).await.unwrap().unwrap();
        assert_eq!(fresh.versioning.versions, vec!["3.0"]);
    }
}
