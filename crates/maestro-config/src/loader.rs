//! Layered settings loading.
//!
//! Layers are applied in priority order:
//!
//! 1. Built-in defaults
//! 2. Settings file (`maestro.json`), if present
//! 3. Environment variables (`MAESTRO_*`)
//! 4. Explicit overrides

use crate::env::EnvOverrides;
use crate::error::Result;
use crate::settings::{ConflictStrategy, RepositoryDefinition, ResolverSettings};
use maestro_core::Scope;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default settings file name.
pub const SETTINGS_FILE: &str = "maestro.json";

/// Highest-priority values, typically from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    /// Force offline mode.
    pub offline: Option<bool>,
    /// Force strict failure handling.
    pub strict: Option<bool>,
    /// Conflict policy.
    pub conflict_policy: Option<ConflictStrategy>,
    /// Classpath filter.
    pub scope_filter: Option<Scope>,
    /// Repositories appended after configured ones.
    pub extra_repositories: Vec<RepositoryDefinition>,
}

impl SettingsOverrides {
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
        if let Some(scope) = self.scope_filter {
            settings.scope_filter = Some(scope);
        }
        settings
            .repositories
            .extend(self.extra_repositories.iter().cloned());
    }
}

/// Builds [`ResolverSettings`] from defaults, a file, the environment and
/// explicit overrides.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    read_env: bool,
    overrides: SettingsOverrides,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Loader using defaults and the environment only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file: None,
            read_env: true,
            overrides: SettingsOverrides::default(),
        }
    }

    /// Loader reading `maestro.json` from `project_dir`.
    #[must_use]
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        Self::new().with_file(project_dir.as_ref().join(SETTINGS_FILE))
    }

    /// Read settings from `path` when it exists.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Ignore `MAESTRO_*` variables.
    #[must_use]
    pub const fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Apply explicit overrides last.
    #[must_use]
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Settings file path, if configured.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Load using the process environment.
    pub fn load(&self) -> Result<ResolverSettings> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_with<F>(&self, lookup: F) -> Result<ResolverSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match &self.file {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading settings file");
                ResolverSettings::from_file(path)?
            }
            Some(path) => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                ResolverSettings::default()
            }
            None => ResolverSettings::default(),
        };

        if self.read_env {
            EnvOverrides::collect(lookup)?.apply(&mut settings);
        }
        self.overrides.apply(&mut settings);
        settings.validate()?;

        debug!(
            policy = ?settings.conflict_policy,
            offline = settings.offline,
            repositories = settings.repositories.len(),
            "settings loaded"
        );
        Ok(settings)
    }
}
