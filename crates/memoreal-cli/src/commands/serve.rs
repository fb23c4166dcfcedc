//! Serve command - start the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use memoreal_gateway::{Gateway, MemoryCredentialStore};

use super::load_config;
use crate::ui;

/// Serve command arguments.
#[derive(Debug, Clone, Default)]
pub struct ServeArgs {
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Port override.
    pub port: Option<u16>,
    /// Bind address override.
    pub bind: Option<String>,
    /// Use the in-memory credential store.
    pub in_memory: bool,
}

/// Run the serve command.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    config.validate().context("Invalid configuration")?;

    ui::banner();
    ui::header("Starting Memoreal");
    ui::kv(
        "Address",
        &format!("{}:{}", config.server.bind_address, config.server.port),
    );
    ui::kv("Public URL", &config.server.public_url());
    ui::kv("Uploads", &config.server.uploads_dir.display().to_string());
    ui::flag("Sessions", config.auth.sessions_enabled);
    ui::flag("CORS", config.server.cors);
    if config.auth.jwt_secret.is_none() {
        ui::warning("No JWT secret configured; tokens will not survive a restart");
    }

    if args.in_memory {
        ui::warning("Using in-memory credential store; accounts are lost on exit");
        ui::kv("Store", "memory");
        println!();
        let gateway = Gateway::builder()
            .with_config(config)
            .with_store(Arc::new(MemoryCredentialStore::new()))
            .build()?;
        gateway.run().await?;
    } else {
        ui::kv(
            "Store",
            &format!(
                "postgres://{}:{}/{}",
                config.database.host, config.database.port, config.database.database
            ),
        );
        println!();
        memoreal_gateway::start(config).await?;
    }

    ui::info("Server stopped");
    Ok(())
}
