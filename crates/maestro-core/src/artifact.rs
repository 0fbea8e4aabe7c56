//! Artifacts participating in a resolution.

use crate::coordinate::{ArtifactKey, Coordinate};
use crate::scope::Scope;
use crate::version::ArtifactVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered coordinates from the resolution root to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyTrail(Vec<Coordinate>);

impl DependencyTrail {
    /// A trail holding only the root.
    #[must_use]
    pub fn root(coordinate: Coordinate) -> Self {
        Self(vec![coordinate])
    }

    /// This trail extended by one coordinate.
    #[must_use]
    pub fn child(&self, coordinate: Coordinate) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.extend(self.0.iter().cloned());
        path.push(coordinate);
        Self(path)
    }

    /// Check whether a coordinate already appears on this trail.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.0.contains(coordinate)
    }

    /// Coordinates in root-first order.
    #[must_use]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.0
    }

    /// Number of coordinates on the trail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the trail is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DependencyTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coordinate) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{coordinate}")?;
        }
        Ok(())
    }
}

/// A coordinate placed in a dependency graph.
///
/// `base_version` is the version as declared, which may be symbolic or an
/// unresolved snapshot. `version` is the concrete version once selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What this artifact is.
    pub coordinate: Coordinate,
    /// Declared version, if the declaration carried one.
    pub base_version: Option<ArtifactVersion>,
    /// Selected concrete version.
    pub version: Option<ArtifactVersion>,
    /// Effective scope after inheritance and management.
    pub scope: Scope,
    /// Declared optional.
    pub optional: bool,
    /// Path from the root.
    pub trail: DependencyTrail,
    /// Set once the artifact's metadata has been retrieved.
    pub resolved: bool,
}

impl Artifact {
    /// Create an unresolved artifact.
    #[must_use]
    pub fn new(coordinate: Coordinate, scope: Scope, trail: DependencyTrail) -> Self {
        Self {
            coordinate,
            base_version: None,
            version: None,
            scope,
            optional: false,
            trail,
            resolved: false,
        }
    }

    /// Root artifact with a known version.
    #[must_use]
    pub fn root(coordinate: Coordinate, version: ArtifactVersion) -> Self {
        let trail = DependencyTrail::root(coordinate.clone());
        Self {
            coordinate,
            base_version: Some(version.clone()),
            version: Some(version),
            scope: Scope::Compile,
            optional: false,
            trail,
            resolved: true,
        }
    }

    /// Conflict identity.
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        self.coordinate.key()
    }

    /// Selected version, falling back to the declared one.
    #[must_use]
    pub fn effective_version(&self) -> Option<&ArtifactVersion> {
        self.version.as_ref().or(self.base_version.as_ref())
    }

    /// Record the selected version.
    pub fn select_version(&mut self, version: ArtifactVersion) {
        if self.base_version.is_none() {
            self.base_version = Some(version.base_version());
        }
        self.version = Some(version);
    }

    /// Check whether the artifact is a snapshot.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.effective_version().is_some_and(ArtifactVersion::is_snapshot)
    }

    /// Check whether the declared version is `LATEST` or `RELEASE`.
    #[must_use]
    pub fn is_symbolic(&self) -> bool {
        self.base_version
            .as_ref()
            .is_some_and(ArtifactVersion::is_symbolic)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate)?;
        if let Some(version) = self.effective_version() {
            write!(f, ":{version}")?;
        }
        write!(f, ":{}", self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(s: &str) -> Coordinate {
        Coordinate::parse(s).unwrap()
    }

    #[test]
    fn trail_display_and_contains() {
        let trail = DependencyTrail::root(coord("org.acme:app"))
            .child(coord("org.acme:lib"))
            .child(coord("org.other:util"));
        assert_eq!(
            trail.to_string(),
            "org.acme:app:jar -> org.acme:lib:jar -> org.other:util:jar"
        );
        assert_eq!(trail.len(), 3);
        assert!(trail.contains(&coord("org.acme:lib")));
        assert!(!trail.contains(&coord("org.acme:lib:pom")));
    }

    #[test]
    fn select_version_keeps_declared_base() {
        let mut artifact = Artifact::new(
            coord("g:a"),
            Scope::Compile,
            DependencyTrail::root(coord("g:a")),
        );
        artifact.base_version = Some(ArtifactVersion::parse("1.0-SNAPSHOT"));
        artifact.select_version(ArtifactVersion::parse("1.0-20240101.101010-2"));
        assert_eq!(artifact.base_version.as_ref().unwrap().as_str(), "1.0-SNAPSHOT");
        assert!(artifact.is_snapshot());
        assert_eq!(artifact.to_string(), "g:a:jar:1.0-20240101.101010-2:compile");
    }

    #[test]
    fn select_version_derives_base() {
        let mut artifact = Artifact::new(coord("g:a"), Scope::Runtime, DependencyTrail::default());
        artifact.select_version(ArtifactVersion::parse("2.0-20240101.101010-1"));
        assert_eq!(artifact.base_version.as_ref().unwrap().as_str(), "2.0-SNAPSHOT");
    }

    #[test]
    fn symbolic_declared_version() {
        let mut artifact = Artifact::new(coord("g:a"), Scope::Compile, DependencyTrail::default());
        artifact.base_version = Some(ArtifactVersion::parse("RELEASE"));
        assert!(artifact.is_symbolic());
        assert!(!artifact.is_snapshot());
    }
}
