//! Configuration loading and validation.
//!
//! Config is read from a JSON5 file, then overridden from the environment
//! using the variable names of the legacy deployment (`PORT`, `DB_SERVER`,
//! `JWT_SECRET`, ...).
//! Config location: `~/.memoreal/memoreal.json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Placeholder written in place of secret values when displaying config.
pub const REDACTED: &str = "[REDACTED]";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Environment variable could not be parsed.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential store connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Third-party media services.
    #[serde(default)]
    pub media: MediaConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("memoreal.json")
    }

    /// Get the Memoreal state directory.
    ///
    /// Uses `MEMOREAL_STATE_DIR` env var if set, otherwise `~/.memoreal`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("MEMOREAL_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".memoreal")
        } else {
            PathBuf::from(".memoreal")
        }
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable cannot be parsed.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable cannot be parsed.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_env(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(url) = lookup("MEMOREAL_PUBLIC_URL") {
            self.server.public_url = Some(url);
        }
        if let Some(dir) = lookup("MEMOREAL_UPLOADS_DIR") {
            self.server.uploads_dir = PathBuf::from(dir);
        }

        if let Some(host) = lookup("DB_SERVER") {
            self.database.host = host;
        }
        if let Some(port) = parse_env(&lookup, "DB_PORT")? {
            self.database.port = port;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(database) = lookup("DB_DATABASE") {
            self.database.database = database;
        }

        if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }

        if let Some(client_id) = lookup("IMGUR_CLIENT_ID").filter(|s| !s.is_empty()) {
            self.media.imgur_client_id = Some(client_id);
        }
        if let Some(key) = lookup("DID_API_KEY").filter(|s| !s.is_empty()) {
            self.media.did_api_key = Some(key);
        }

        Ok(self)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.auth.token_expiry_secs == 0 {
            return Err(ConfigError::Validation(
                "Token expiry must be positive".to_string(),
            ));
        }

        if self.auth.token_expiry_secs > MAX_TOKEN_EXPIRY_SECS {
            return Err(ConfigError::Validation(format!(
                "Token expiry cannot exceed {MAX_TOKEN_EXPIRY_SECS} seconds"
            )));
        }

        if self.auth.hash_cost == 0 || self.auth.hash_parallelism == 0 {
            return Err(ConfigError::Validation(
                "Hash cost and parallelism must be at least 1".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        if let Some(secret) = &self.auth.jwt_secret {
            if secret.len() < 32 {
                tracing::warn!("JWT secret is shorter than 32 bytes");
            }
        }

        Ok(())
    }

    /// Copy of this config with every secret value replaced.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        redact(&mut config.database.password);
        redact(&mut config.auth.jwt_secret);
        redact(&mut config.media.imgur_client_id);
        redact(&mut config.media.did_api_key);
        config
    }
}

fn redact(value: &mut Option<String>) {
    if value.is_some() {
        *value = Some(REDACTED.to_string());
    }
}

fn parse_env<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidEnv { name, value }),
        },
        _ => Ok(None),
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Externally visible base URL used to build upload links.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Directory for uploaded images.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,

    /// Enable permissive CORS.
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            public_url: None,
            uploads_dir: default_uploads_dir(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload(),
            cors: true,
        }
    }
}

impl ServerConfig {
    /// Base URL for links returned to clients, without trailing slash.
    #[must_use]
    pub fn public_url(&self) -> String {
        self.public_url.as_deref().map_or_else(
            || format!("http://localhost:{}", self.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }

    /// Get request timeout as Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_port() -> u16 {
    4848
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_upload() -> usize {
    10 * 1024 * 1024
}

const fn default_true() -> bool {
    true
}

/// Credential store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database user.
    #[serde(default = "default_db_name")]
    pub user: String,

    /// Database password (prefer `DB_PASSWORD`).
    #[serde(default)]
    pub password: Option<String>,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub database: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connect/acquire timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_name(),
            password: None,
            database: default_db_name(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Get connect timeout as Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_db_host() -> String {
    "localhost".to_string()
}

const fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "memoreal".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout() -> u64 {
    5
}

/// Default token expiry in seconds.
const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 3600;

/// Longest accepted token expiry (one year).
pub const MAX_TOKEN_EXPIRY_SECS: u64 = 365 * 24 * 3600;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Token signing secret. Auto-generated at startup if not set.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Access token validity in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// Password hash time cost (iterations).
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,

    /// Password hash memory cost in KiB.
    #[serde(default = "default_hash_memory")]
    pub hash_memory_kib: u32,

    /// Password hash parallelism.
    #[serde(default = "default_hash_parallelism")]
    pub hash_parallelism: u32,

    /// Answer unknown usernames like wrong passwords on login.
    #[serde(default)]
    pub unify_login_errors: bool,

    /// Record the logged-in user in a cookie session.
    #[serde(default = "default_true")]
    pub sessions_enabled: bool,

    /// Mark session cookies `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,

    /// Login attempts allowed per username per minute.
    #[serde(default = "default_login_attempts")]
    pub login_attempts_per_minute: u32,
}

const fn default_token_expiry() -> u64 {
    DEFAULT_TOKEN_EXPIRY_SECS
}

const fn default_hash_cost() -> u32 {
    2
}

const fn default_hash_memory() -> u32 {
    19 * 1024
}

const fn default_hash_parallelism() -> u32 {
    1
}

const fn default_login_attempts() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry_secs: default_token_expiry(),
            hash_cost: default_hash_cost(),
            hash_memory_kib: default_hash_memory(),
            hash_parallelism: default_hash_parallelism(),
            unify_login_errors: false,
            sessions_enabled: true,
            secure_cookies: false,
            login_attempts_per_minute: default_login_attempts(),
        }
    }
}

impl AuthConfig {
    /// Create a new auth config builder.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Get token expiry as Duration.
    #[must_use]
    pub const fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_secs)
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the token signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Set token expiry in seconds.
    #[must_use]
    pub const fn token_expiry_secs(mut self, secs: u64) -> Self {
        self.config.token_expiry_secs = secs;
        self
    }

    /// Set the password hash cost parameters.
    #[must_use]
    pub const fn hash_params(mut self, cost: u32, memory_kib: u32, parallelism: u32) -> Self {
        self.config.hash_cost = cost;
        self.config.hash_memory_kib = memory_kib;
        self.config.hash_parallelism = parallelism;
        self
    }

    /// Set whether login hides unknown usernames.
    #[must_use]
    pub const fn unify_login_errors(mut self, unify: bool) -> Self {
        self.config.unify_login_errors = unify;
        self
    }

    /// Set whether logins are recorded in the cookie session.
    #[must_use]
    pub const fn sessions_enabled(mut self, enabled: bool) -> Self {
        self.config.sessions_enabled = enabled;
        self
    }

    /// Set login attempts per username per minute.
    #[must_use]
    pub const fn login_attempts_per_minute(mut self, attempts: u32) -> Self {
        self.config.login_attempts_per_minute = attempts;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}

/// Third-party media service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    /// Image host client id (prefer `IMGUR_CLIENT_ID`).
    #[serde(default)]
    pub imgur_client_id: Option<String>,

    /// Image host API base URL.
    #[serde(default = "default_imgur_url")]
    pub imgur_base_url: String,

    /// Video generation API key (prefer `DID_API_KEY`).
    #[serde(default)]
    pub did_api_key: Option<String>,

    /// Video generation API base URL.
    #[serde(default = "default_did_url")]
    pub did_base_url: String,

    /// Timeout for outbound API calls in seconds.
    #[serde(default = "default_request_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            imgur_client_id: None,
            imgur_base_url: default_imgur_url(),
            did_api_key: None,
            did_base_url: default_did_url(),
            http_timeout_secs: default_request_timeout(),
        }
    }
}

impl MediaConfig {
    /// Get outbound HTTP timeout as Duration.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_imgur_url() -> String {
    "https://api.imgur.com/3".to_string()
}

fn default_did_url() -> String {
    "https://api.d-id.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 4848);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.auth.token_expiry(), Duration::from_secs(3600));
        assert!(config.auth.jwt_secret.is_none());
        assert!(config.auth.sessions_enabled);
        assert!(!config.auth.unify_login_errors);
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // comments are allowed
            server: {
                port: 8080,
                publicUrl: "https://memoreal.example/",
            },
            auth: {
                tokenExpirySecs: 600,
                unifyLoginErrors: true,
            },
        }"#;

        let config: Config = json5::from_str(json5_content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_url(), "https://memoreal.example");
        assert_eq!(config.auth.token_expiry_secs, 600);
        assert!(config.auth.unify_login_errors);
        assert_eq!(config.database.host, "localhost");
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("memoreal.json");
        std::fs::write(&path, "{ database: { host: 'db.internal', port: 6543 } }").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_env(env(&[
                ("PORT", "9000"),
                ("DB_SERVER", "sql.local"),
                ("DB_PORT", "1433"),
                ("DB_USER", "memo"),
                ("DB_PASSWORD", "hunter2"),
                ("DB_DATABASE", "memorial"),
                ("JWT_SECRET", "a-very-long-secret-used-for-signing"),
                ("IMGUR_CLIENT_ID", "imgur-id"),
                ("DID_API_KEY", "did-key"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.public_url(), "http://localhost:9000");
        assert_eq!(config.database.host, "sql.local");
        assert_eq!(config.database.port, 1433);
        assert_eq!(config.database.user, "memo");
        assert_eq!(config.database.password.as_deref(), Some("hunter2"));
        assert_eq!(config.database.database, "memorial");
        assert_eq!(
            config.auth.jwt_secret.as_deref(),
            Some("a-very-long-secret-used-for-signing")
        );
        assert_eq!(config.media.imgur_client_id.as_deref(), Some("imgur-id"));
        assert_eq!(config.media.did_api_key.as_deref(), Some("did-key"));
    }

    #[test]
    fn test_invalid_env_port() {
        let result = Config::default().apply_env(env(&[("PORT", "not-a-port")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { name: "PORT", .. })
        ));
    }

    #[test]
    fn test_empty_secret_env_is_ignored() {
        let config = Config::default()
            .apply_env(env(&[("JWT_SECRET", "")]))
            .unwrap();
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.token_expiry_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.token_expiry_secs = MAX_TOKEN_EXPIRY_SECS + 1;
        assert!(config.validate().is_err());
        config.auth.token_expiry_secs = MAX_TOKEN_EXPIRY_SECS;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.auth.hash_cost = 0;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_redacted() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("top-secret".to_string());
        config.database.password = Some("hunter2".to_string());

        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("top-secret"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains(REDACTED));
        assert!(config.redacted().media.did_api_key.is_none());
    }

    #[test]
    fn test_auth_builder() {
        let config = AuthConfig::builder()
            .jwt_secret("s")
            .token_expiry_secs(60)
            .hash_params(1, 1024, 1)
            .unify_login_errors(true)
            .sessions_enabled(false)
            .login_attempts_per_minute(3)
            .build();

        assert_eq!(config.jwt_secret.as_deref(), Some("s"));
        assert_eq!(config.token_expiry(), Duration::from_secs(60));
        assert_eq!(config.hash_cost, 1);
        assert_eq!(config.hash_memory_kib, 1024);
        assert!(config.unify_login_errors);
        assert!(!config.sessions_enabled);
        assert_eq!(config.login_attempts_per_minute, 3);
    }

    #[test]
    fn test_state_dir() {
        let dir = Config::state_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
