//! Artifact coordinates, conflict identities and exclusion patterns.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packaging type assumed when a coordinate omits one.
pub const DEFAULT_TYPE: &str = "jar";

/// `groupId:artifactId`, the identity used for conflict resolution.
///
/// Type and classifier do not take part in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKey {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
}

impl ArtifactKey {
    /// Create a key.
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Parse `group:artifact`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split(':').collect::<Vec<_>>().as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Ok(Self::new(*g, *a)),
            _ => Err(Error::InvalidCoordinate(s.to_string())),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for ArtifactKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtifactKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<ArtifactKey> for String {
    fn from(key: ArtifactKey) -> Self {
        key.to_string()
    }
}

/// Identifies an artifact independent of its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Packaging type, `jar` unless stated.
    pub artifact_type: String,
    /// Optional classifier such as `sources` or `tests`.
    pub classifier: Option<String>,
}

impl Coordinate {
    /// Create a `jar` coordinate without a classifier.
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            artifact_type: DEFAULT_TYPE.to_string(),
            classifier: None,
        }
    }

    /// Set the packaging type.
    #[must_use]
    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self
    }

    /// Set the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Parse `group:artifact[:type[:classifier]]`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() < 2 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidCoordinate(s.to_string()));
        }
        let mut coordinate = Self::new(parts[0], parts[1]);
        if let Some(t) = parts.get(2) {
            coordinate.artifact_type = (*t).to_string();
        }
        if let Some(c) = parts.get(3) {
            coordinate.classifier = Some((*c).to_string());
        }
        Ok(coordinate)
    }

    /// The conflict identity of this coordinate.
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }

    /// Check whether this coordinate has the given identity.
    #[must_use]
    pub fn has_key(&self, key: &ArtifactKey) -> bool {
        self.group_id == key.group_id && self.artifact_id == key.artifact_id
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id, self.artifact_id, self.artifact_type
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Coordinate> for String {
    fn from(c: Coordinate) -> Self {
        c.to_string()
    }
}

/// Pattern removing matching artifacts from a subtree. `*` matches any
/// group or artifact id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Exclusion {
    /// Group id or `*`.
    pub group_id: String,
    /// Artifact id or `*`.
    pub artifact_id: String,
}

impl Exclusion {
    /// Create an exclusion.
    #[must_use]
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Parse `group:artifact`, either side possibly `*`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split(':').collect::<Vec<_>>().as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Ok(Self::new(*g, *a)),
            _ => Err(Error::InvalidExclusion(s.to_string())),
        }
    }

    /// Check whether an identity is excluded.
    #[must_use]
    pub fn matches(&self, key: &ArtifactKey) -> bool {
        (self.group_id == "*" || self.group_id == key.group_id)
            && (self.artifact_id == "*" || self.artifact_id == key.artifact_id)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl TryFrom<String> for Exclusion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Exclusion> for String {
    fn from(e: Exclusion) -> Self {
        e.to_string()
    }
}
