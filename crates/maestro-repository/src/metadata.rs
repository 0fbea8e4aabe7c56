//! Repository metadata envelopes.
//!
//! An envelope describes either an artifact (`groupId:artifactId`: known
//! versions, latest, release) or one snapshot version
//! (`groupId:artifactId:version`: the last deployed timestamp and build).

use chrono::{DateTime, Utc};
use maestro_core::{ArtifactKey, ArtifactVersion};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// File name of a metadata envelope inside a repository directory.
pub const METADATA_FILE: &str = "maestro-metadata.json";

/// `yyyyMMddHHmmss`, the format of `last_updated`.
pub const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";

/// Which envelope to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataKey {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Version for snapshot-level metadata.
    pub version: Option<String>,
}

impl MetadataKey {
    /// Artifact-level key.
    #[must_use]
    pub fn artifact(key: &ArtifactKey) -> Self {
        Self {
            group_id: key.group_id.clone(),
            artifact_id: key.artifact_id.clone(),
            version: None,
        }
    }

    /// Version-level key.
    #[must_use]
    pub fn version(key: &ArtifactKey, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::artifact(key)
        }
    }

    /// Path of the envelope relative to a repository root:
    /// `org/acme/widget[/1.0-SNAPSHOT]/maestro-metadata.json`.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group_id.split('.').collect();
        path.push(&self.artifact_id);
        if let Some(version) = &self.version {
            path.push(version);
        }
        path.push(METADATA_FILE);
        path
    }

    /// Same path with `/` separators, for URLs.
    #[must_use]
    pub fn url_path(&self) -> String {
        let mut path = format!("{}/{}", self.group_id.replace('.', "/"), self.artifact_id);
        if let Some(version) = &self.version {
            path.push('/');
            path.push_str(version);
        }
        path.push('/');
        path.push_str(METADATA_FILE);
        path
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

/// The last deployment of a snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotVersion {
    /// Deployment timestamp, `yyyyMMdd.HHmmss` in UTC.
    pub timestamp: Option<String>,
    /// Build number, starting at 1.
    pub build_number: u32,
    /// Installed locally rather than deployed, so no timestamped file exists.
    pub local_copy: bool,
}

/// Version bookkeeping of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Versioning {
    /// Newest version, snapshots included.
    pub latest: Option<String>,
    /// Newest release version.
    pub release: Option<String>,
    /// Known versions, first-seen order, no duplicates.
    pub versions: Vec<String>,
    /// Last update, `yyyyMMddHHmmss` in UTC.
    pub last_updated: Option<String>,
    /// Snapshot deployment record.
    pub snapshot: Option<SnapshotVersion>,
}

impl Versioning {
    /// Stamp `last_updated` with `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(now.format(LAST_UPDATED_FORMAT).to_string());
    }
}

/// A metadata envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Version, for snapshot-level envelopes.
    #[serde(default)]
    pub version: Option<String>,
    /// Version bookkeeping.
    #[serde(default)]
    pub versioning: Versioning,
}

impl RepositoryMetadata {
    /// Empty envelope for `key`.
    #[must_use]
    pub fn for_key(key: &MetadataKey) -> Self {
        Self {
            group_id: key.group_id.clone(),
            artifact_id: key.artifact_id.clone(),
            version: key.version.clone(),
            versioning: Versioning::default(),
        }
    }

    /// The key this envelope is stored under.
    #[must_use]
    pub fn key(&self) -> MetadataKey {
        MetadataKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
        }
    }

    /// Parse an envelope from JSON.
    pub fn from_json(json: &str) -> sonic_rs::Result<Self> {
        sonic_rs::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> sonic_rs::Result<String> {
        sonic_rs::to_string_pretty(self)
    }

    /// Whether the envelope carries no version information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versioning == Versioning::default()
    }

    /// Known versions, parsed.
    #[must_use]
    pub fn versions(&self) -> Vec<ArtifactVersion> {
        self.versioning
            .versions
            .iter()
            .map(|v| ArtifactVersion::parse(v.as_str()))
            .collect()
    }

    /// Highest known version.
    #[must_use]
    pub fn highest_version(&self) -> Option<ArtifactVersion> {
        self.versions().into_iter().max()
    }

    /// Combine with `source`, returning a new envelope and whether anything
    /// changed.
    ///
    /// Versions are unioned. `latest`, `release` and `snapshot` are taken
    /// from `source` when its `last_updated` is not older than ours; a
    /// source without `last_updated` counts as current.
    #[must_use]
    pub fn merge(&self, source: &Self) -> (Self, bool) {
        let mut merged = self.clone();
        if merged.group_id.is_empty() {
            merged.group_id.clone_from(&source.group_id);
        }
        if merged.artifact_id.is_empty() {
            merged.artifact_id.clone_from(&source.artifact_id);
        }
        if merged.version.is_none() {
            merged.version.clone_from(&source.version);
        }

        let target = &mut merged.versioning;
        let incoming = &source.versioning;

        for version in &incoming.versions {
            if !target.versions.contains(version) {
                target.versions.push(version.clone());
            }
        }

        let current = target.last_updated.clone().filter(|s| !s.is_empty());
        let incoming_updated = incoming
            .last_updated
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| current.clone());

        let newer = match (&current, &incoming_updated) {
            (Some(current), Some(incoming)) => incoming >= current,
            _ => true,
        };

        if newer {
            target.last_updated = incoming_updated;
            if incoming.release.is_some() {
                target.release.clone_from(&incoming.release);
            }
            if incoming.latest.is_some() {
                target.latest.clone_from(&incoming.latest);
            }
            if incoming.snapshot.is_some() {
                target.snapshot.clone_from(&incoming.snapshot);
            }
        }

        let changed = merged != *self;
        (merged, changed)
    }
}
