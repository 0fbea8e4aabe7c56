//! Repository definitions.

use crate::error::{RepositoryError, Result};
use maestro_config::{RepositoryDefinition, UpdatePolicy};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Id given to the local repository.
pub const LOCAL_ID: &str = "local";

/// Where a repository lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepositoryLocation {
    /// A directory on this machine.
    Local(PathBuf),
    /// A remote base URL.
    Remote(Url),
}

/// A metadata repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    id: String,
    location: RepositoryLocation,
    update_policy: UpdatePolicy,
}

impl Repository {
    /// The local repository at `path`. Local data is always read fresh.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            id: LOCAL_ID.to_string(),
            location: RepositoryLocation::Local(path.into()),
            update_policy: UpdatePolicy::Always,
        }
    }

    /// A remote repository with the daily policy.
    #[must_use]
    pub fn remote(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            location: RepositoryLocation::Remote(url),
            update_policy: UpdatePolicy::Daily,
        }
    }

    /// Build a remote repository from settings.
    pub fn from_definition(definition: &RepositoryDefinition) -> Result<Self> {
        if definition.id.trim().is_empty() {
            return Err(RepositoryError::InvalidRepository {
                id: definition.id.clone(),
                message: "empty id".into(),
            });
        }
        if definition.id == LOCAL_ID {
            return Err(RepositoryError::InvalidRepository {
                id: definition.id.clone(),
                message: format!("'{LOCAL_ID}' is reserved for the local repository"),
            });
        }
        Ok(Self::remote(&definition.id, definition.url.clone())
            .with_update_policy(definition.update_policy))
    }

    /// Set the update policy.
    #[must_use]
    pub const fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Repository id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location.
    #[must_use]
    pub const fn location(&self) -> &RepositoryLocation {
        &self.location
    }

    /// Update policy.
    #[must_use]
    pub const fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    /// Whether this is a directory on this machine.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.location, RepositoryLocation::Local(_))
    }

    /// Local directory, if any.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match &self.location {
            RepositoryLocation::Local(path) => Some(path),
            RepositoryLocation::Remote(_) => None,
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            RepositoryLocation::Local(path) => write!(f, "{} ({})", self.id, path.display()),
            RepositoryLocation::Remote(url) => write!(f, "{} ({url})", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn repositories_dedupe_by_policy_and_location() {
        let url = Url::parse("https://repo.example.com/maven").unwrap();
        let daily = Repository::remote("internal", url.clone());
        let hourly = Repository::from_definition(
            &RepositoryDefinition::new("internal", url).with_update_policy(UpdatePolicy::Interval(60)),
        )
        .unwrap();

        let set: AHashSet<Repository> = [daily.clone(), daily, hourly, Repository::local("/tmp/repo")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn from_definition_copies_policy() {
        let definition = RepositoryDefinition::new(
            "internal",
            Url::parse("https://repo.example.com/maven").unwrap(),
        )
        .with_update_policy(UpdatePolicy::Interval(15));
        let repo = Repository::from_definition(&definition).unwrap();
        assert_eq!(repo.id(), "internal");
        assert!(!repo.is_local());
        assert_eq!(repo.update_policy(), UpdatePolicy::Interval(15));
    }

    #[test]
    fn local_id_is_reserved() {
        let definition =
            RepositoryDefinition::new(LOCAL_ID, Url::parse("https://example.com").unwrap());
        assert!(matches!(
            Repository::from_definition(&definition),
            Err(RepositoryError::InvalidRepository { .. })
        ));
    }

    #[test]
    fn local_repository() {
        let repo = Repository::local("/tmp/repo");
        assert!(repo.is_local());
        assert_eq!(repo.local_path(), Some(Path::new("/tmp/repo")));
        assert_eq!(repo.to_string(), "local (/tmp/repo)");
    }
}
