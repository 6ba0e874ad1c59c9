//! Memory Tables Module
//!
//! The in-process engine behind [`MemoryStore`](super::MemoryStore): one
//! sorted map per namespace, sharded by namespace through `DashMap`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::entry::MemoryEntry;
use crate::resolve::{KeyMatch, Namespace};

// == Scan Result ==
/// Outcome of a scan: live matches in insertion order, plus the matching
/// keys found expired.
#[derive(Debug, Default)]
pub struct Scan {
    pub live: Vec<(String, MemoryEntry)>,
    pub expired: Vec<String>,
}

// == Memory Tables ==
#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: DashMap<Namespace, BTreeMap<String, MemoryEntry>>,
    seq: AtomicU64,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    // == Upsert ==
    /// Inserts or replaces the value. An update keeps the original
    /// insertion sequence.
    pub fn upsert(
        &self,
        namespace: &Namespace,
        key: &str,
        value: Vec<u8>,
        expiry: Option<DateTime<Utc>>,
    ) {
        let mut table = self.tables.entry(namespace.clone()).or_default();
        match table.get_mut(key) {
            Some(entry) => {
                entry.value = value;
                entry.expiry = expiry;
            }
            None => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                table.insert(key.to_string(), MemoryEntry::new(seq, value, expiry));
            }
        }
    }

    // == Scan ==
    /// Collects the entries matching `matcher`, split into live and expired.
    pub fn scan(&self, namespace: &Namespace, matcher: &KeyMatch, now: DateTime<Utc>) -> Scan {
        let mut scan = Scan::default();
        let Some(table) = self.tables.get(namespace) else {
            return scan;
        };

        let mut sort = |key: &String, entry: &MemoryEntry| {
            if entry.is_expired(now) {
                scan.expired.push(key.clone());
            } else {
                scan.live.push((key.clone(), entry.clone()));
            }
        };

        match matcher {
            KeyMatch::Exact(key) => {
                if let Some((key, entry)) = table.get_key_value(key) {
                    sort(key, entry);
                }
            }
            _ => {
                for (key, entry) in table.iter().filter(|(key, _)| matcher.matches(key)) {
                    sort(key, entry);
                }
            }
        }

        scan.live.sort_by_key(|(_, entry)| entry.seq);
        scan
    }

    // == Remove ==
    pub fn remove(&self, namespace: &Namespace, key: &str) -> bool {
        self.tables
            .get_mut(namespace)
            .is_some_and(|mut table| table.remove(key).is_some())
    }

    /// Removes the entry only if it is still expired at `now`.
    pub fn remove_if_expired(&self, namespace: &Namespace, key: &str, now: DateTime<Utc>) -> bool {
        let Some(mut table) = self.tables.get_mut(namespace) else {
            return false;
        };
        if table.get(key).is_some_and(|entry| entry.is_expired(now)) {
            table.remove(key);
            return true;
        }
        false
    }

    // == Sweep Expired ==
    /// Removes every expired entry in every namespace.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for mut table in self.tables.iter_mut() {
            let before = table.len();
            table.retain(|_, entry| !entry.is_expired(now));
            removed += before - table.len();
        }
        removed
    }

    // == Length ==
    /// Physical entry count, including expired entries not yet reaped.
    pub fn len(&self) -> usize {
        self.tables.iter().map(|table| table.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
