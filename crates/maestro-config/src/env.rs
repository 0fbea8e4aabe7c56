//! Environment variable overrides.

use crate::error::{ConfigError, Result};
use crate::settings::{ConflictStrategy, ResolverSettings};
use maestro_core::Scope;
use std::path::PathBuf;

/// Environment variables understood by the settings loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaestroEnvVar {
    /// Skip remote repositories.
    Offline,
    /// Fail on any failed non-optional artifact.
    Strict,
    /// `nearest`, `newest` or `oldest`.
    ConflictPolicy,
    /// Maximum metadata fetches in flight.
    MaxConcurrentFetches,
    /// Per-fetch timeout in seconds.
    FetchTimeout,
    /// Whole-request timeout in seconds.
    ResolutionTimeout,
    /// Classpath filter.
    Scope,
    /// Local repository directory.
    LocalRepository,
    /// Tracing filter directives.
    Log,
}

impl MaestroEnvVar {
    /// Variables that map onto [`ResolverSettings`] fields.
    pub const SETTINGS: [Self; 8] = [
        Self::Offline,
        Self::Strict,
        Self::ConflictPolicy,
        Self::MaxConcurrentFetches,
        Self::FetchTimeout,
        Self::ResolutionTimeout,
        Self::Scope,
        Self::LocalRepository,
    ];

    /// Variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "MAESTRO_OFFLINE",
            Self::Strict => "MAESTRO_STRICT",
            Self::ConflictPolicy => "MAESTRO_CONFLICT_POLICY",
            Self::MaxConcurrentFetches => "MAESTRO_MAX_CONCURRENT_FETCHES",
            Self::FetchTimeout => "MAESTRO_FETCH_TIMEOUT",
            Self::ResolutionTimeout => "MAESTRO_RESOLUTION_TIMEOUT",
            Self::Scope => "MAESTRO_SCOPE",
            Self::LocalRepository => "MAESTRO_LOCAL_REPOSITORY",
            Self::Log => "MAESTRO_LOG",
        }
    }
}

/// Settings values taken from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `MAESTRO_OFFLINE`.
    pub offline: Option<bool>,
    /// `MAESTRO_STRICT`.
    pub strict: Option<bool>,
    /// `MAESTRO_CONFLICT_POLICY`.
    pub conflict_policy: Option<ConflictStrategy>,
    /// `MAESTRO_MAX_CONCURRENT_FETCHES`.
    pub max_concurrent_fetches: Option<usize>,
    /// `MAESTRO_FETCH_TIMEOUT`.
    pub fetch_timeout_secs: Option<u64>,
    /// `MAESTRO_RESOLUTION_TIMEOUT`.
    pub resolution_timeout_secs: Option<u64>,
    /// `MAESTRO_SCOPE`.
    pub scope_filter: Option<Scope>,
    /// `MAESTRO_LOCAL_REPOSITORY`.
    pub local_repository: Option<PathBuf>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::collect(|name| std::env::var(name).ok())
    }

    /// Read overrides through a lookup function.
    pub fn collect<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = Self::default();
        for var in MaestroEnvVar::SETTINGS {
            let name = var.as_str();
            let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match var {
                MaestroEnvVar::Offline => overrides.offline = Some(parse_bool(name, &value)?),
                MaestroEnvVar::Strict => overrides.strict = Some(parse_bool(name, &value)?),
                MaestroEnvVar::ConflictPolicy => {
                    overrides.conflict_policy = Some(value.parse().map_err(|_| {
                        ConfigError::invalid_value(name, &value, "expected nearest, newest or oldest")
                    })?);
                }
                MaestroEnvVar::MaxConcurrentFetches => {
                    overrides.max_concurrent_fetches = Some(value.trim().parse().map_err(|_| {
                        ConfigError::invalid_value(name, &value, "expected a positive integer")
                    })?);
                }
                MaestroEnvVar::FetchTimeout => {
                    overrides.fetch_timeout_secs = Some(parse_duration_secs(name, &value)?);
                }
                MaestroEnvVar::ResolutionTimeout => {
                    overrides.resolution_timeout_secs = Some(parse_duration_secs(name, &value)?);
                }
                MaestroEnvVar::Scope => {
                    overrides.scope_filter = Some(value.parse().map_err(|_| {
                        ConfigError::invalid_value(name, &value, "unknown scope")
                    })?);
                }
                MaestroEnvVar::LocalRepository => {
                    overrides.local_repository = Some(PathBuf::from(value.trim()));
                }
                MaestroEnvVar::Log => {}
            }
        }
        Ok(overrides)
    }

    /// Apply the overrides on top of `settings`.
    pub fn apply(&self, settings: &mut ResolverSettings) {
        if let Some(offline) = self.offline {
            settings.offline = offline;
        }
        if let Some(strict) = self.strict {
            settings.strict = strict;
        }
        if let Some(policy) = self.conflict_policy {
            settings.conflict_policy = policy;
        }
        if let Some(max) = self.max_concurrent_fetches {
            settings.max_concurrent_fetches = max;
        }
        if let Some(secs) = self.fetch_timeout_secs {
            settings.fetch_timeout_secs = secs;
        }
        if let Some(secs) = self.resolution_timeout_secs {
            settings.resolution_timeout_secs = secs;
        }
        if let Some(scope) = self.scope_filter {
            settings.scope_filter = Some(scope);
        }
        if let Some(path) = &self.local_repository {
            settings.local_repository = Some(path.clone());
        }
    }
}

/// Parse `1/0`, `true/false`, `yes/no` or `on/off`.
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(key, value, "expected a boolean")),
    }
}

/// Parse a duration in seconds, accepting an optional `s`, `m` or `h` suffix.
pub fn parse_duration_secs(key: &str, value: &str) -> Result<u64> {
    let trimmed = value.trim().to_ascii_lowercase();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('s') => (&trimmed[..trimmed.len() - 1], 1),
        Some('m') => (&trimmed[..trimmed.len() - 1], 60),
        Some('h') => (&trimmed[..trimmed.len() - 1], 3600),
        _ => (trimmed.as_str(), 1),
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ConfigError::invalid_value(key, value, "expected a duration in seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn env_var_names() {
        assert_eq!(MaestroEnvVar::Offline.as_str(), "MAESTRO_OFFLINE");
        assert_eq!(MaestroEnvVar::Log.as_str(), "MAESTRO_LOG");
    }

    #[test]
    fn collects_and_applies() {
        let overrides = EnvOverrides::collect(lookup(&[
            ("MAESTRO_OFFLINE", "true"),
            ("MAESTRO_CONFLICT_POLICY", "oldest"),
            ("MAESTRO_MAX_CONCURRENT_FETCHES", "4"),
            ("MAESTRO_FETCH_TIMEOUT", "2m"),
            ("MAESTRO_SCOPE", "runtime"),
        ]))
        .unwrap();

        let mut settings = ResolverSettings::default();
        overrides.apply(&mut settings);
        assert!(settings.offline);
        assert!(!settings.strict);
        assert_eq!(settings.conflict_policy, ConflictStrategy::Oldest);
        assert_eq!(settings.max_concurrent_fetches, 4);
        assert_eq!(settings.fetch_timeout_secs, 120);
        assert_eq!(settings.scope_filter, Some(Scope::Runtime));
        assert_eq!(settings.resolution_timeout_secs, 300);
    }

    #[test]
    fn empty_values_are_ignored() {
        let overrides = EnvOverrides::collect(lookup(&[("MAESTRO_STRICT", "  ")])).unwrap();
        assert_eq!(overrides, EnvOverrides::default());
    }

    #[test]
    fn invalid_value_names_variable() {
        let err = EnvOverrides::collect(lookup(&[("MAESTRO_OFFLINE", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("MAESTRO_OFFLINE"));
    }

    #[test_case("30", 30)]
    #[test_case("30s", 30)]
    #[test_case("5m", 300)]
    #[test_case("1h", 3600)]
    #[test_case(" 0 ", 0)]
    fn durations(value: &str, expected: u64) {
        assert_eq!(parse_duration_secs("T", value).unwrap(), expected);
    }

    #[test]
    fn bad_duration() {
        assert!(parse_duration_secs("T", "soon").is_err());
        assert!(parse_duration_secs("T", "").is_err());
    }
}
