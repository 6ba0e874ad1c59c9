//! Record Model
//!
//! The unit of stored data shared by every backend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Record ==
/// A single key/value record with optional expiration.
///
/// On write, `ttl` and `expiry` compete according to
/// [`resolve_expiry`](crate::resolve::resolve_expiry). On read, both are
/// filled in whenever the record expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Key inside its namespace
    pub key: String,
    /// Opaque value bytes
    pub value: Vec<u8>,
    /// Time until the record expires, None = never
    #[serde(default)]
    pub ttl: Option<Duration>,
    /// Absolute expiry instant, None = never
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Record {
    // == Constructor ==
    /// Creates a record that never expires.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl: None,
            expiry: None,
        }
    }

    /// Sets a relative time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets an absolute expiry instant.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Builds a record as read back from storage, deriving the remaining
    /// TTL from the resolved expiry.
    pub(crate) fn stored(
        key: String,
        value: Vec<u8>,
        expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = expiry.map(|at| (at - now).to_std().unwrap_or(Duration::ZERO));
        Self {
            key,
            value,
            ttl,
            expiry,
        }
    }
}
