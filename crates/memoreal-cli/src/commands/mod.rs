//! CLI command implementations.

pub mod config;
pub mod secret;
pub mod serve;
pub mod status;

pub use config::run_config;
pub use secret::{run_hash_password, run_secret};
pub use serve::run_serve;
pub use status::run_status;

use std::path::Path;

use anyhow::{Context, Result};
use memoreal_core::Config;

/// Load configuration from an explicit path or the default location,
/// then apply environment overrides.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_default().context("Failed to load default config")?,
    };
    config
        .with_env_overrides()
        .context("Invalid environment override")
}
