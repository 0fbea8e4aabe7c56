//! Resolver settings.

use crate::error::{ConfigError, Result};
use ahash::AHashSet;
use chrono::{DateTime, TimeDelta, Utc};
use maestro_core::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Id of the repository configured when none is given.
pub const CENTRAL_ID: &str = "central";

/// Location of the repository configured when none is given.
pub const CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// How to pick among competing versions of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Shallowest occurrence wins.
    #[default]
    Nearest,
    /// Highest version wins.
    Newest,
    /// Lowest version wins.
    Oldest,
}

impl FromStr for ConflictStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            _ => Err(ConfigError::invalid_value(
                "conflict-policy",
                s,
                "expected nearest, newest or oldest",
            )),
        }
    }
}

/// When cached remote metadata must be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UpdatePolicy {
    /// Refresh on every request.
    Always,
    /// Refresh once per calendar day (UTC).
    #[default]
    Daily,
    /// Never refresh once cached.
    Never,
    /// Refresh after the given number of minutes.
    Interval(u32),
}

impl UpdatePolicy {
    /// Check whether metadata last checked at `last_checked` is stale at `now`.
    #[must_use]
    pub fn is_update_required(self, last_checked: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Daily => last_checked.date_naive() < now.date_naive(),
            Self::Interval(minutes) => {
                now.signed_duration_since(last_checked) >= TimeDelta::minutes(i64::from(minutes))
            }
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::Daily => f.write_str("daily"),
            Self::Never => f.write_str("never"),
            Self::Interval(minutes) => write!(f, "interval:{minutes}"),
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "always" => Ok(Self::Always),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            _ => lower
                .strip_prefix("interval:")
                .and_then(|m| m.parse().ok())
                .map(Self::Interval)
                .ok_or_else(|| {
                    ConfigError::invalid_value(
                        "update-policy",
                        s,
                        "expected always, daily, never or interval:<minutes>",
                    )
                }),
        }
    }
}

impl TryFrom<String> for UpdatePolicy {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<UpdatePolicy> for String {
    fn from(policy: UpdatePolicy) -> Self {
        policy.to_string()
    }
}

/// A remote repository entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryDefinition {
    /// Unique repository id.
    pub id: String,
    /// Base URL.
    pub url: Url,
    /// Metadata refresh policy.
    #[serde(default)]
    pub update_policy: UpdatePolicy,
}

impl RepositoryDefinition {
    /// Create a definition with the daily policy.
    #[must_use]
    pub fn new(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: id.into(),
            url,
            update_policy: UpdatePolicy::default(),
        }
    }

    /// Set the update policy.
    #[must_use]
    pub const fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Maven Central.
    #[must_use]
    pub fn central() -> Option<Self> {
        Url::parse(CENTRAL_URL)
            .ok()
            .map(|url| Self::new(CENTRAL_ID, url))
    }
}

/// Settings controlling a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverSettings {
    /// Conflict policy.
    pub conflict_policy: ConflictStrategy,
    /// Skip remote repositories.
    pub offline: bool,
    /// Treat any failed non-optional artifact as fatal.
    pub strict: bool,
    /// Maximum metadata fetches in flight.
    pub max_concurrent_fetches: usize,
    /// Per-fetch timeout in seconds, 0 to disable.
    pub fetch_timeout_secs: u64,
    /// Whole-request timeout in seconds, 0 to disable.
    pub resolution_timeout_secs: u64,
    /// Restrict the result to one classpath.
    pub scope_filter: Option<Scope>,
    /// Local repository directory.
    pub local_repository: Option<PathBuf>,
    /// Remote repositories, consulted in order.
    pub repositories: Vec<RepositoryDefinition>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictStrategy::Nearest,
            offline: false,
            strict: false,
            max_concurrent_fetches: 16,
            fetch_timeout_secs: 30,
            resolution_timeout_secs: 300,
            scope_filter: None,
            local_repository: None,
            repositories: RepositoryDefinition::central().into_iter().collect(),
        }
    }
}

impl ResolverSettings {
    /// Parse settings from JSON text.
    pub fn from_json(path: &Path, json: &str) -> Result<Self> {
        sonic_rs::from_str(json).map_err(|e| ConfigError::json(path, &e))
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
        Self::from_json(path, &json)
    }

    /// Per-fetch timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Option<Duration> {
        match self.fetch_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Whole-request timeout.
    #[must_use]
    pub const fn resolution_timeout(&self) -> Option<Duration> {
        match self.resolution_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Local repository directory, defaulting to `~/.maestro/repository`.
    #[must_use]
    pub fn local_repository_path(&self) -> Option<PathBuf> {
        self.local_repository.clone().or_else(default_local_repository)
    }

    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Validation(
                "max-concurrent-fetches must be at least 1".into(),
            ));
        }
        let mut seen = AHashSet::new();
        for repository in &self.repositories {
            if repository.id.trim().is_empty() {
                return Err(ConfigError::Validation("repository id must not be empty".into()));
            }
            if !seen.insert(repository.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate repository id '{}'",
                    repository.id
                )));
            }
        }
        Ok(())
    }
}

/// `~/.maestro/repository`.
#[must_use]
pub fn default_local_repository() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".maestro").join("repository"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn defaults() {
        let settings = ResolverSettings::default();
        assert_eq!(settings.conflict_policy, ConflictStrategy::Nearest);
        assert_eq!(settings.max_concurrent_fetches, 16);
        assert_eq!(settings.fetch_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.repositories.len(), 1);
        assert_eq!(settings.repositories[0].id, CENTRAL_ID);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_timeout_disables() {
        let settings = ResolverSettings {
            resolution_timeout_secs: 0,
            ..ResolverSettings::default()
        };
        assert_eq!(settings.resolution_timeout(), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "conflict-policy": "newest",
            "offline": true,
            "repositories": [
                { "id": "internal", "url": "https://repo.example.com/maven", "update-policy": "interval:30" }
            ]
        }"#;
        let settings = ResolverSettings::from_json(Path::new("maestro.json"), json).unwrap();
        assert_eq!(settings.conflict_policy, ConflictStrategy::Newest);
        assert!(settings.offline);
        assert_eq!(settings.max_concurrent_fetches, 16);
        assert_eq!(settings.repositories[0].update_policy, UpdatePolicy::Interval(30));
    }

    #[test]
    fn invalid_json_reports_path() {
        let err = ResolverSettings::from_json(Path::new("bad.json"), "{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json { ref path, .. } if path == Path::new("bad.json")));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let settings = ResolverSettings {
            max_concurrent_fetches: 0,
            ..ResolverSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_repository_ids() {
        let mut settings = ResolverSettings::default();
        settings.repositories.push(RepositoryDefinition::central().unwrap());
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate repository id 'central'"));
    }

    #[test_case("always", UpdatePolicy::Always)]
    #[test_case("Daily", UpdatePolicy::Daily)]
    #[test_case("never", UpdatePolicy::Never)]
    #[test_case("interval:90", UpdatePolicy::Interval(90))]
    fn parse_update_policy(s: &str, expected: UpdatePolicy) {
        assert_eq!(s.parse::<UpdatePolicy>().unwrap(), expected);
    }

    #[test]
    fn parse_update_policy_rejects_garbage() {
        assert!("hourly".parse::<UpdatePolicy>().is_err());
        assert!("interval:soon".parse::<UpdatePolicy>().is_err());
    }

    #[test]
    fn update_policy_staleness() {
        assert!(UpdatePolicy::Always.is_update_required(at(1, 10, 0), at(1, 10, 0)));
        assert!(!UpdatePolicy::Never.is_update_required(at(1, 0, 0), at(20, 0, 0)));
        assert!(!UpdatePolicy::Daily.is_update_required(at(1, 1, 0), at(1, 23, 0)));
        assert!(UpdatePolicy::Daily.is_update_required(at(1, 23, 0), at(2, 0, 30)));
        assert!(!UpdatePolicy::Interval(60).is_update_required(at(1, 10, 0), at(1, 10, 59)));
        assert!(UpdatePolicy::Interval(60).is_update_required(at(1, 10, 0), at(1, 11, 0)));
    }
}
