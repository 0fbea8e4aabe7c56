//! Settings and logging for the Maestro dependency resolver.
//!
//! Settings are merged from several layers in priority order:
//!
//! 1. Built-in defaults
//! 2. `maestro.json`
//! 3. Environment variables (`MAESTRO_*`)
//! 4. Explicit overrides
//!
//! # Quick Start
//!
//! ```no_run
//! use maestro_config::SettingsLoader;
//!
//! let settings = SettingsLoader::for_project(".").load().expect("invalid settings");
//! println!("policy: {:?}", settings.conflict_policy);
//! ```
//!
//! # Environment Variables
//!
//! - `MAESTRO_OFFLINE` - Skip remote repositories
//! - `MAESTRO_STRICT` - Fail on any failed non-optional artifact
//! - `MAESTRO_CONFLICT_POLICY` - `nearest`, `newest` or `oldest`
//! - `MAESTRO_MAX_CONCURRENT_FETCHES` - Metadata fetches in flight
//! - `MAESTRO_FETCH_TIMEOUT`, `MAESTRO_RESOLUTION_TIMEOUT` - Seconds, 0 disables
//! - `MAESTRO_SCOPE` - Classpath filter
//! - `MAESTRO_LOCAL_REPOSITORY` - Local repository directory
//! - `MAESTRO_LOG` - Tracing filter directives

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod loader;
pub mod logging;
pub mod settings;

pub use env::{EnvOverrides, MaestroEnvVar, parse_bool, parse_duration_secs};
pub use error::{ConfigError, Result};
pub use loader::{SETTINGS_FILE, SettingsLoader, SettingsOverrides};
pub use settings::{
    CENTRAL_ID, CENTRAL_URL, ConflictStrategy, RepositoryDefinition, ResolverSettings,
    UpdatePolicy, default_local_repository,
};
