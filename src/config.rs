//! Configuration Module
//!
//! Selects a backend and builds its store options from environment
//! variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;
use crate::models::Options;

// == Backend ==
/// Which storage engine backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Memory,
    Redis,
    MySql,
}

impl FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "redis" => Ok(Backend::Redis),
            "mysql" => Ok(Backend::MySql),
            other => Err(StoreError::InvalidConfig(format!(
                "unknown backend {other:?}, expected memory, redis or mysql"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Memory => "memory",
            Backend::Redis => "redis",
            Backend::MySql => "mysql",
        };
        f.write_str(name)
    }
}

/// Store configuration parameters.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub backend: Backend,
    pub options: Options,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KVSTORE_BACKEND` - `memory`, `redis` or `mysql` (default: memory)
    /// - `KVSTORE_ADDRESSES` - comma-separated connection strings
    /// - `KVSTORE_DATABASE` - default database
    /// - `KVSTORE_TABLE` - default table
    /// - `KVSTORE_PASSWORD` - enables auth with this password
    /// - `KVSTORE_SWEEP_INTERVAL` - memory backend sweep in seconds (default: off)
    pub fn from_env() -> Result<Self, StoreError> {
        let backend = match env::var("KVSTORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => Backend::default(),
        };

        let mut options = Options::default();
        if let Ok(raw) = env::var("KVSTORE_ADDRESSES") {
            options.addresses = raw
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
        }
        options.database = non_empty_var("KVSTORE_DATABASE");
        options.table = non_empty_var("KVSTORE_TABLE");
        if let Some(password) = non_empty_var("KVSTORE_PASSWORD") {
            options = options.with_auth(password);
        }
        if let Some(interval) = non_empty_var("KVSTORE_SWEEP_INTERVAL") {
            options = options.with_context("sweep_interval_secs", interval);
        }

        Ok(Self { backend, options })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
