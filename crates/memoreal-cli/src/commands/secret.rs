//! Secret and password helpers.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use memoreal_gateway::{PasswordHasher, TokenManager};

use super::load_config;
use crate::ui;

/// Print a fresh hex-encoded JWT signing secret.
pub fn run_secret() {
    if std::io::stdout().is_terminal() {
        ui::info("Set this as JWT_SECRET or auth.jwtSecret");
    }
    println!("{}", TokenManager::generate_hex_secret());
}

/// Hash a password with the configured Argon2 parameters.
pub async fn run_hash_password(config: Option<PathBuf>, password: Option<String>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let hasher = PasswordHasher::from_config(&config.auth)?;

    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.trim().is_empty() {
        bail!("Password must not be empty");
    }

    let digest = hasher.hash_async(password).await?;
    println!("{digest}");
    Ok(())
}
