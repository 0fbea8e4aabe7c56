//! Dependency management: version and scope pins declared by an ancestor.

use indexmap::IndexMap;
use maestro_core::{ArtifactKey, Scope, VersionConstraint};

/// A pin for one artifact identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedDependency {
    /// Forced version constraint.
    pub version: Option<VersionConstraint>,
    /// Forced scope.
    pub scope: Option<Scope>,
}

impl ManagedDependency {
    /// Pin the version only.
    #[must_use]
    pub const fn version(constraint: VersionConstraint) -> Self {
        Self {
            version: Some(constraint),
            scope: None,
        }
    }

    /// Pin the scope only.
    #[must_use]
    pub const fn scope(scope: Scope) -> Self {
        Self {
            version: None,
            scope: Some(scope),
        }
    }

    /// Also pin the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Managed dependencies keyed by identity, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ManagementMap {
    entries: IndexMap<ArtifactKey, ManagedDependency, ahash::RandomState>,
}

impl ManagementMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the pin for `key`.
    pub fn insert(&mut self, key: ArtifactKey, managed: ManagedDependency) {
        self.entries.insert(key, managed);
    }

    /// Pin for `key`.
    #[must_use]
    pub fn get(&self, key: &ArtifactKey) -> Option<&ManagedDependency> {
        self.entries.get(key)
    }

    /// Number of pins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is managed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pins in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactKey, &ManagedDependency)> {
        self.entries.iter()
    }
}

impl FromIterator<(ArtifactKey, ManagedDependency)> for ManagementMap {
    fn from_iter<I: IntoIterator<Item = (ArtifactKey, ManagedDependency)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, managed) in iter {
            map.insert(key, managed);
        }
        map
    }
}
