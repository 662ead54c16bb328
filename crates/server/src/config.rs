//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `MA_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`,
//!   default: `sqlite://mafurniture.db?mode=rwc`)
//! - `MA_HOST` - Bind address (default: 127.0.0.1)
//! - `MA_PORT` - Listen port (default: 3001)
//! - `MA_UPLOAD_DIR` - Directory for uploaded images (default: `uploads`)
//! - `MA_CORS_ORIGINS` - Comma-separated allowed origins
//!   (default: localhost and 127.0.0.1 on ports 3000 and 5500)
//! - `MA_MAX_BODY_BYTES` - Request body limit (default: 50 MiB)
//! - `MA_SECURE_COOKIES` - Mark the session cookie `Secure` (default: false)
//! - `MA_LOG_JSON` - Emit JSON logs instead of text (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Default `SQLite` database, created on first start.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://mafurniture.db?mode=rwc";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default request body limit (50 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Origins of the static shop pages during local development.
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SQLite` connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Root directory for uploaded files, served under `/uploads`
    pub upload_dir: PathBuf,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
    /// Whether the session cookie requires HTTPS
    pub secure_cookies: bool,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
    /// Configuration with every optional setting at its default.
    #[must_use]
    pub fn new(database_url: &str, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: SecretString::from(database_url),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            upload_dir: upload_dir.into(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            secure_cookies: false,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MA_DATABASE_URL");
        let host = get_env_or_default("MA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MA_PORT", &DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MA_PORT".to_string(), e.to_string()))?;
        let upload_dir = PathBuf::from(get_env_or_default("MA_UPLOAD_DIR", "uploads"));
        let cors_origins = get_optional_env("MA_CORS_ORIGINS").map_or_else(
            || DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
            |raw| parse_origins(&raw),
        );
        let max_body_bytes =
            get_env_or_default("MA_MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string())
                .parse::<usize>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("MA_MAX_BODY_BYTES".to_string(), e.to_string())
                })?;
        let secure_cookies = get_flag("MA_SECURE_COOKIES")?;
        let log_json = get_flag("MA_LOG_JSON")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            upload_dir,
            cors_origins,
            max_body_bytes,
            secure_cookies,
            log_json,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`, then the default file.
pub fn get_database_url(primary_key: &str) -> SecretString {
    if let Some(value) = get_optional_env(primary_key) {
        return SecretString::from(value);
    }
    if let Some(value) = get_optional_env("DATABASE_URL") {
        return SecretString::from(value);
    }
    SecretString::from(DEFAULT_DATABASE_URL)
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a boolean flag. Unset means false.
fn get_flag(key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{v}'"),
            )),
        },
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect()
}
