//! Memory Entry Module
//!
//! A stored value together with its insertion order and resolved expiry.

use chrono::{DateTime, Utc};

use crate::models::Record;
use crate::resolve::is_expired;

// == Memory Entry ==
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// Insertion sequence, kept across updates so listing order is stable
    pub seq: u64,
    pub value: Vec<u8>,
    /// Resolved expiry, None = never
    pub expiry: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    pub fn new(seq: u64, value: Vec<u8>, expiry: Option<DateTime<Utc>>) -> Self {
        Self { seq, value, expiry }
    }

    // == Is Expired ==
    /// Expired once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expiry, now)
    }

    pub fn to_record(&self, key: &str, now: DateTime<Utc>) -> Record {
        Record::stored(key.to_string(), self.value.clone(), self.expiry, now)
    }
}
