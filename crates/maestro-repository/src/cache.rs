//! Shared metadata cache.
//!
//! Entries are immutable `Arc` envelopes. Updates build a new envelope and
//! swap it in, so readers never observe a partially merged value.

use crate::metadata::{MetadataKey, RepositoryMetadata};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What one repository returned for a key, and when.
#[derive(Debug, Clone)]
pub struct CachedMetadata {
    /// Envelope, or `None` if the repository had none.
    pub metadata: Option<Arc<RepositoryMetadata>>,
    /// When the repository was last asked.
    pub checked_at: DateTime<Utc>,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Per-repository entries.
    pub repository_entries: usize,
    /// Merged envelopes.
    pub merged_entries: usize,
    /// Lookups served from cache.
    pub hits: u64,
    /// Lookups that needed a fetch.
    pub misses: u64,
}

/// Per-repository and merged metadata, shared across resolutions.
#[derive(Debug)]
pub struct MetadataCache {
    repositories: DashMap<(String, MetadataKey), CachedMetadata, ahash::RandomState>,
    merged: DashMap<MetadataKey, Arc<RepositoryMetadata>, ahash::RandomState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            repositories: DashMap::with_hasher(ahash::RandomState::new()),
            merged: DashMap::with_hasher(ahash::RandomState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached answer of `repository_id` for `key`.
    #[must_use]
    pub fn lookup(&self, repository_id: &str, key: &MetadataKey) -> Option<CachedMetadata> {
        self.repositories
            .get(&(repository_id.to_string(), key.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Record a repository answer.
    pub fn record(
        &self,
        repository_id: &str,
        key: MetadataKey,
        metadata: Option<Arc<RepositoryMetadata>>,
        checked_at: DateTime<Utc>,
    ) {
        self.repositories.insert(
            (repository_id.to_string(), key),
            CachedMetadata {
                metadata,
                checked_at,
            },
        );
    }

    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Last merged envelope for `key`.
    #[must_use]
    pub fn merged(&self, key: &MetadataKey) -> Option<Arc<RepositoryMetadata>> {
        self.merged.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Swap in a new merged envelope.
    pub fn replace_merged(
        &self,
        key: MetadataKey,
        metadata: RepositoryMetadata,
    ) -> Arc<RepositoryMetadata> {
        let metadata = Arc::new(metadata);
        self.merged.insert(key, Arc::clone(&metadata));
        metadata
    }

    /// Drop everything cached for `key`.
    pub fn invalidate(&self, key: &MetadataKey) {
        self.merged.remove(key);
        self.repositories.retain(|(_, k), _| k != key);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.merged.clear();
        self.repositories.clear();
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            repository_entries: self.repositories.len(),
            merged_entries: self.merged.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
