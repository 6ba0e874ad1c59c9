//! Option Models
//!
//! Store-level configuration and the per-operation option sets. Every field
//! is optional; an unset field defers to the next level of precedence.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Store Options ==
/// Connection and namespace configuration for a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Connection strings; the first entry is authoritative
    pub addresses: Vec<String>,
    /// Default database for operations that do not name one
    pub database: Option<String>,
    /// Default table for operations that do not name one
    pub table: Option<String>,
    /// Whether `password` is sent on connect
    pub auth: bool,
    pub password: Option<String>,
    /// Backend specific settings, e.g. `max_connections`
    pub context: BTreeMap<String, String>,
}

impl Options {
    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.table = Some(table.into());
        self
    }

    pub fn with_auth(mut self, password: impl Into<String>) -> Self {
        self.auth = true;
        self.password = Some(password.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    // == Merge ==
    /// Folds `other` into `self`. Fields set in `other` win; unset fields
    /// keep their current value. Context entries are merged key by key.
    pub fn merge(&mut self, other: Options) {
        if !other.addresses.is_empty() {
            self.addresses = other.addresses;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.table.is_some() {
            self.table = other.table;
        }
        if other.auth {
            self.auth = true;
            self.password = other.password;
        }
        self.context.extend(other.context);
    }

    /// Returns the authoritative address, if any was configured.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }

    /// Parses a context value, falling back to `default` when absent.
    pub(crate) fn context_value<T: std::str::FromStr>(
        &self,
        key: &str,
        default: T,
    ) -> std::result::Result<T, String> {
        match self.context.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("context value {key}={raw} is not valid")),
            None => Ok(default),
        }
    }
}

// == Write Options ==
/// Options for a single write. When both `ttl` and `expiry` are set, `ttl`
/// takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Reserved; backends connect to a single address today
    pub address: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub ttl: Option<Duration>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.table = Some(table.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Read Options ==
/// Options for a single read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub address: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    /// Match every key starting with the read key
    pub prefix: bool,
    /// Match every key ending with the read key
    pub suffix: bool,
    /// Maximum number of records, 0 = unlimited
    pub limit: usize,
    /// Page index, counted in multiples of `limit`
    pub offset: usize,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.table = Some(table.into());
        self
    }

    pub fn with_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    pub fn with_suffix(mut self) -> Self {
        self.suffix = true;
        self
    }

    pub fn with_limit(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

// == Delete Options ==
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub database: Option<String>,
    pub table: Option<String>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.table = Some(table.into());
        self
    }
}

// == List Options ==
/// Options for listing keys. With neither `prefix` nor `suffix` every key in
/// the namespace is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub database: Option<String>,
    pub table: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Maximum number of keys, 0 = unlimited
    pub limit: usize,
    /// Page index, counted in multiples of `limit`
    pub offset: usize,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_namespace(mut self, database: impl Into<String>, table: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.table = Some(table.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}
