use std::{env, fmt, net::SocketAddr, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use thiserror::Error;
use tracing::info;

use crate::polls::validation::DURATION_HOURS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when STORAGE_BACKEND=mongo")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Mongo => write!(f, "mongo"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub cors_origin: String,
    pub environment: Environment,
    pub storage: StorageBackend,
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub default_poll_duration_hours: u32,
    pub sweep_interval: Duration,
    pub broadcast_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origin: "http://localhost:5173".to_string(),
            environment: Environment::Development,
            storage: StorageBackend::Mongo,
            mongo_uri: None,
            db_name: "poll-verse".to_string(),
            default_poll_duration_hours: 24,
            sweep_interval: Duration::from_secs(60),
            broadcast_buffer: 64,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment, falling back to
    /// [`Config::default`] for anything unset.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let storage = try_load("STORAGE_BACKEND", defaults.storage)?;
        let mongo_uri = env::var("MONGO_URI")
            .ok()
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty());
        if storage == StorageBackend::Mongo && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        let cors_origin: String = try_load("CORS_ORIGIN", defaults.cors_origin)?;
        let cors_origin = cors_origin.trim_end_matches('/').to_string();
        if let Err(e) = cors_origin.parse::<HeaderValue>() {
            return Err(ConfigError::Invalid {
                key: "CORS_ORIGIN",
                value: cors_origin,
                reason: e.to_string(),
            });
        }

        let default_poll_duration_hours = duration_in_bounds(try_load(
            "DEFAULT_POLL_DURATION_HOURS",
            defaults.default_poll_duration_hours,
        )?)?;
        let sweep_secs = at_least_one(
            "SWEEP_INTERVAL_SECS",
            try_load("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs())?,
        )?;
        let broadcast_buffer = at_least_one(
            "BROADCAST_BUFFER",
            try_load("BROADCAST_BUFFER", defaults.broadcast_buffer)?,
        )?;

        Ok(Self {
            server_addr: try_load("SERVER_ADDR", defaults.server_addr)?,
            cors_origin,
            environment: try_load("APP_ENV", defaults.environment)?,
            storage,
            mongo_uri,
            db_name: try_load("DB_NAME", defaults.db_name)?,
            default_poll_duration_hours,
            sweep_interval: Duration::from_secs(sweep_secs),
            broadcast_buffer,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn at_least_one<T>(key: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + From<u8> + fmt::Display,
{
    if value < T::from(1) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

/// The default window obeys the same bounds as a requested one.
fn duration_in_bounds(hours: u32) -> Result<u32, ConfigError> {
    let (min, max) = DURATION_HOURS;
    if i64::from(hours) < min || i64::from(hours) > max {
        return Err(ConfigError::Invalid {
            key: "DEFAULT_POLL_DURATION_HOURS",
            value: hours.to_string(),
            reason: format!("must be between {min} and {max} hours"),
        });
    }
    Ok(hours)
}
