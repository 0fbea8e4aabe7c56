//! Repository metadata for the Maestro dependency resolver.
//!
//! This crate answers "which versions of this artifact exist, which is the
//! latest release, and what is the newest build of this snapshot":
//!
//! - **Metadata envelopes**: [`RepositoryMetadata`] with Maven merge rules
//! - **Repositories**: a local directory plus remotes in configured order,
//!   each with an [`UpdatePolicy`](maestro_config::UpdatePolicy)
//! - **Access**: the [`RepositoryAccess`] trait, with an in-memory store and
//!   an on-disk layout reader
//! - **Caching**: a shared [`MetadataCache`] whose entries are swapped
//!   atomically
//!
//! ## Example
//!
//! ```no_run
//! use maestro_core::ArtifactKey;
//! use maestro_repository::{FileSystemAccess, MetadataKey, MetadataManager, Repository};
//!
//! # async fn example() -> maestro_repository::Result<()> {
//! let manager = MetadataManager::new(FileSystemAccess::offline());
//! let repositories = vec![Repository::local("/home/me/.maestro/repository")];
//! let key = MetadataKey::artifact(&ArtifactKey::new("org.slf4j", "slf4j-api"));
//!
//! let metadata = manager.resolve(&key, &repositories).await?;
//! println!("release: {:?}", metadata.versioning.release);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod access;
pub mod cache;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod repository;

pub use access::{AccessFuture, FileSystemAccess, MemoryRepository, RepositoryAccess};
pub use cache::{CacheStats, CachedMetadata, MetadataCache};
pub use error::{RepositoryError, Result};
pub use manager::MetadataManager;
pub use metadata::{
    LAST_UPDATED_FORMAT, METADATA_FILE, MetadataKey, RepositoryMetadata, SnapshotVersion,
    Versioning,
};
pub use repository::{LOCAL_ID, Repository, RepositoryLocation};
