//! # Memoreal Core
//!
//! Core types, configuration, and secrets for the Memoreal backend.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 file + environment overrides)
//! - Secret wrappers that keep credentials out of logs
//! - Shared identifier types
//! - Input validation and sanitization for account fields

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;
pub mod types;
pub mod validation;

pub use config::{AuthConfig, Config, ConfigError, DatabaseConfig, MediaConfig, ServerConfig};
pub use secrets::{ApiKey, scrub_secrets};
pub use types::UserId;
pub use validation::{ValidationError, sanitize_field};

