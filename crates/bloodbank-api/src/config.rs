//! # Service Configuration
//!
//! Read once at startup from the process environment.
//!
//! | Variable                   | Default   | Meaning                               |
//! |----------------------------|-----------|---------------------------------------|
//! | `PORT`                     | `8080`    | Listen port                           |
//! | `BIND_ADDR`                | `0.0.0.0` | Listen address                        |
//! | `DATABASE_URL`             | unset     | Postgres URL; unset means in-memory   |
//! | `DATABASE_MAX_CONNECTIONS` | `10`      | Pool size                             |
//! | `STORAGE_TIMEOUT_MS`       | `5000`    | Per storage call limit                |
//! | `LOG_FORMAT`               | `text`    | `text` or `json`                      |
//!
//! A variable that is set but unparseable is an error, never a silent
//! fallback to the default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

/// Default storage call limit.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that does not parse.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// The environment variable.
        var: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Service configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Listen address.
    pub bind_addr: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Postgres URL. `None` runs against the in-memory store.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub database_max_connections: u32,
    /// Limit applied to every storage call.
    pub storage_timeout: Duration,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Custom Debug that redacts the database URL, which may embed credentials.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_max_connections", &self.database_max_connections)
            .field("storage_timeout", &self.storage_timeout)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            database_url: None,
            database_max_connections: 10,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let storage_timeout_ms: u64 = parse_var(&lookup, "STORAGE_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_STORAGE_TIMEOUT.as_millis() as u64);
        if storage_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "STORAGE_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let database_max_connections: u32 = parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
            .unwrap_or(defaults.database_max_connections);
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse_var(&lookup, "BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            database_url,
            database_max_connections,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            log_format: parse_var(&lookup, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
        })
    }

    /// The address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
