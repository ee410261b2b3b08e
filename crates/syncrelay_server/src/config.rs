//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;
use syncrelay_store::StoreConfig;
use thiserror::Error;

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Upper bound for every store-touching request.
    pub request_timeout: Duration,
    /// Maximum records per replace-sync (0 means unlimited).
    pub max_records_per_sync: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            request_timeout: Duration::from_secs(30),
            max_records_per_sync: 0,
        }
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum replace-sync batch size.
    pub fn with_max_records_per_sync(mut self, max: usize) -> Self {
        self.max_records_per_sync = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 3000)))
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Why parsing failed.
        reason: String,
    },
}

/// Server and store settings read from the process environment.
///
/// | Variable | Default |
/// |---|---|
/// | `PORT` | `3000` |
/// | `REQUEST_TIMEOUT_MS` | `30000` |
/// | `MAX_RECORDS_PER_SYNC` | `0` (unlimited) |
/// | `PG_HOST` | `localhost` |
/// | `PG_PORT` | `5432` |
/// | `PG_DATABASE` | `postgres` |
/// | `PG_USER`, `PG_PASSWORD` | unset |
/// | `PG_SSL` | TLS only when `"true"` |
///
/// Empty variables count as unset.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// HTTP side.
    pub server: ServerConfig,
    /// Store side.
    pub store: StoreConfig,
}

impl EnvConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port: u16 = parse_or(&get, "PORT", 3000)?;
        let timeout_ms: u64 = parse_or(&get, "REQUEST_TIMEOUT_MS", 30_000)?;
        let max_records: usize = parse_or(&get, "MAX_RECORDS_PER_SYNC", 0)?;

        let server = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], port)))
            .with_request_timeout(Duration::from_millis(timeout_ms))
            .with_max_records_per_sync(max_records);

        let mut store = StoreConfig::new(
            get("PG_HOST").unwrap_or_else(|| "localhost".to_string()),
            get("PG_DATABASE").unwrap_or_else(|| "postgres".to_string()),
        )
        .with_port(parse_or(&get, "PG_PORT", 5432)?)
        .with_ssl(get("PG_SSL").as_deref() == Some("true"));
        store.user = get("PG_USER");
        store.password = get("PG_PASSWORD");

        Ok(Self { server, store })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}
