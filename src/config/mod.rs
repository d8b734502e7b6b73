use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration error raised while reading plugin settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Persistence plugin configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub retry: RetryPolicy,
}

impl PersistConfig {
    pub const DATABASE_URL: &'static str = "DATABASE_URL";
    pub const DATABASE_MAX_CONNECTIONS: &'static str = "DATABASE_MAX_CONNECTIONS";
    pub const DATABASE_RETRY_LIMIT: &'static str = "DATABASE_RETRY_LIMIT";
    pub const DATABASE_RETRY_DELAY_MS: &'static str = "DATABASE_RETRY_DELAY_MS";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse the configuration from an arbitrary key lookup.
    ///
    /// The connection string and the pool size are required. Retry settings
    /// fall back to [`RetryPolicy::default`] when absent, but a present value
    /// that fails to parse is still an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(Self::DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(Self::DATABASE_URL))?;

        let raw_size = lookup(Self::DATABASE_MAX_CONNECTIONS)
            .ok_or(ConfigError::Missing(Self::DATABASE_MAX_CONNECTIONS))?;
        let database_max_connections: u32 = parse_key(Self::DATABASE_MAX_CONNECTIONS, &raw_size)?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: Self::DATABASE_MAX_CONNECTIONS,
                value: raw_size,
                reason: "pool size must be at least 1".to_string(),
            });
        }

        let defaults = RetryPolicy::default();
        let max_retries = match lookup(Self::DATABASE_RETRY_LIMIT) {
            Some(raw) => parse_key(Self::DATABASE_RETRY_LIMIT, &raw)?,
            None => defaults.max_retries,
        };
        let delay = match lookup(Self::DATABASE_RETRY_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_key(Self::DATABASE_RETRY_DELAY_MS, &raw)?),
            None => defaults.delay,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            retry: RetryPolicy::new(max_retries, delay),
        })
    }
}

/// Settings for the reference HTTP service binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BACKEND_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            data_dir: env::var("PERSIST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("resources/persist")),
        }
    }
}

fn parse_key<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
