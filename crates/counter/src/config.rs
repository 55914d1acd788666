//! Counter configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CATALOG_API_URL` - Base URL of the catalog service (default: `http://localhost:5000`)
//! - `COUNTER_HOST` - Bind address (default: 127.0.0.1)
//! - `COUNTER_PORT` - Listen port (default: 3000)
//! - `CATALOG_HTTP_TIMEOUT_SECS` - Per-request timeout for catalog calls (default: 30)
//! - `PAYMENT_RELOAD_DELAY_MS` - Delay before the session is discarded after a
//!   successful payment (default: 2000)
//! - `COUNTER_REFRESH_POLICY` - `reserve` or `overwrite` (default: reserve)
//! - `SCANNER_DEVICE` - Path of a line-oriented barcode decoder device
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use apotek_core::RefreshPolicy;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Counter service configuration.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Catalog service base URL
    pub catalog_api_url: Url,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Per-request timeout for catalog calls
    pub http_timeout: Duration,
    /// Delay between a successful payment and the session discard
    pub payment_reload_delay: Duration,
    /// What a catalog load does with held cart quantities
    pub refresh_policy: RefreshPolicy,
    /// Barcode decoder device, if one is attached
    pub scanner_device: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl CounterConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_source(source: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let catalog_api_url: Url = parse_env(
            &source,
            "CATALOG_API_URL",
            "http://localhost:5000",
        )?;
        if catalog_api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_API_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let host = parse_env(&source, "COUNTER_HOST", "127.0.0.1")?;
        let port = parse_env(&source, "COUNTER_PORT", "3000")?;
        let http_timeout = Duration::from_secs(parse_env(&source, "CATALOG_HTTP_TIMEOUT_SECS", "30")?);
        let payment_reload_delay =
            Duration::from_millis(parse_env(&source, "PAYMENT_RELOAD_DELAY_MS", "2000")?);
        let refresh_policy = parse_env(&source, "COUNTER_REFRESH_POLICY", "reserve")?;

        Ok(Self {
            catalog_api_url,
            host,
            port,
            http_timeout,
            payment_reload_delay,
            refresh_policy,
            scanner_device: get_optional_env(&source, "SCANNER_DEVICE").map(PathBuf::from),
            sentry_dsn: get_optional_env(&source, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&source, "SENTRY_ENVIRONMENT"),
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

/// Get an optional variable, treating blank values as unset.
fn get_optional_env(source: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    source(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(source: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(source, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_env<T>(
    source: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(source, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
