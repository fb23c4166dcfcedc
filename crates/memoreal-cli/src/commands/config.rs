//! Config command - inspect configuration.

use std::path::PathBuf;

use anyhow::Result;
use memoreal_core::Config;

use super::load_config;
use crate::ui;

/// Config actions.
#[derive(Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted.
    Show,
    /// Validate the effective configuration.
    Validate,
    /// Print the default file location.
    Path,
}

/// Run the config command.
pub fn run_config(path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", Config::default_path().display());
        }
        ConfigAction::Show => {
            let config = load_config(path.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::Validate => {
            let source = path.clone().unwrap_or_else(Config::default_path);
            match load_config(path.as_deref()).and_then(|c| c.validate().map_err(Into::into)) {
                Ok(()) => ui::success(&format!("Configuration is valid ({})", source.display())),
                Err(e) => {
                    ui::error(&format!("{e:#}"));
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
