//! Memoreal CLI - run and manage the Memoreal backend.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "memoreal")]
#[command(about = "Memoreal - memorial site backend")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to ~/.memoreal/memoreal.json)
    #[arg(short, long, global = true, env = "MEMOREAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,

        /// Use a volatile in-memory credential store instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },

    /// Check whether a server is answering
    Status {
        /// Port to check (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a random JWT signing secret
    Secret,

    /// Hash a password the way registration does
    HashPassword {
        /// Password to hash (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration with secrets redacted
    Show,

    /// Validate configuration
    Validate,

    /// Print the default configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` can supply `env = ...` arguments
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let fmt_layer = if cli.json_logs {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env: {e}"),
    }

    let config_path = cli.config;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            in_memory,
        } => {
            let args = commands::serve::ServeArgs {
                config: config_path,
                port,
                bind,
                in_memory,
            };
            commands::run_serve(args).await?;
        }

        Commands::Status { port } => {
            commands::run_status(config_path, port).await?;
        }

        Commands::Secret => {
            commands::run_secret();
        }

        Commands::HashPassword { password } => {
            commands::run_hash_password(config_path, password).await?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Validate) => commands::config::ConfigAction::Validate,
                Some(ConfigCommands::Path) => commands::config::ConfigAction::Path,
                Some(ConfigCommands::Show) | None => commands::config::ConfigAction::Show,
            };
            commands::run_config(config_path, action)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from(["memoreal", "serve", "--port", "9000", "--in-memory"])
            .unwrap();
        match cli.command {
            Commands::Serve {
                port, in_memory, ..
            } => {
                assert_eq!(port, Some(9000));
                assert!(in_memory);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_env_file_supplies_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        let config = dir.path().join("memoreal.json");
        std::fs::write(&env_file, format!("MEMOREAL_CONFIG={}\n", config.display())).unwrap();

        dotenvy::from_path_override(&env_file).unwrap();
        let cli = Cli::try_parse_from(["memoreal", "config", "path"]).unwrap();
        assert_eq!(cli.config, Some(config));
    }

    #[test]
    fn test_config_defaults_to_show() {
        let cli = Cli::try_parse_from(["memoreal", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { action: None }));
    }
}
