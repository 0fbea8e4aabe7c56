//! Tracing subscriber setup.
//!
//! Filter directives come from `MAESTRO_LOG` (same syntax as `RUST_LOG`),
//! falling back to the given default level.

use crate::env::MaestroEnvVar;
use crate::error::{ConfigError, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Build the filter used by [`init`].
#[must_use]
pub fn env_filter(default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(MaestroEnvVar::Log.as_str())
        .from_env_lossy()
}

/// Install a compact stderr subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init(default_level: LevelFilter) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

/// Install a JSON subscriber for machine-readable logs.
pub fn init_json(default_level: LevelFilter) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
