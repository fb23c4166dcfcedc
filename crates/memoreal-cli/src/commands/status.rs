//! Status command - check a running server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::load_config;
use crate::ui;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Run the status command.
pub async fn run_status(config: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let port = port.unwrap_or(config.server.port);
    let url = format!("http://127.0.0.1:{port}/health");

    ui::header("Memoreal Status");
    ui::kv("Endpoint", &url);

    let client = reqwest::Client::builder().timeout(CHECK_TIMEOUT).build()?;
    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            let body = response.text().await.unwrap_or_default();
            ui::success("Server is running");
            ui::kv("Health", body.trim());
            let ready_url = format!("http://127.0.0.1:{port}/ready");
            match client.get(&ready_url).send().await {
                Ok(ready) if ready.status().is_success() => ui::kv("Store", "ready"),
                Ok(ready) => ui::warning(&format!("Store not ready ({})", ready.status())),
                Err(e) => ui::warning(&format!("Readiness check failed: {e}")),
            }
        }
        Ok(response) => {
            ui::warning(&format!("Server answered with {}", response.status()));
        }
        Err(e) => {
            tracing::debug!("Health check failed: {e}");
            ui::error(&format!("Server is not reachable on port {port}"));
        }
    }

    Ok(())
}
