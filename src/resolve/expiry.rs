//! Expiry Resolution
//!
//! Write-time resolution of the absolute expiry and read-time liveness.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use crate::models::{Record, WriteOptions};

/// Resolves the absolute expiry of a write. First match wins:
///
/// 1. operation `ttl` (now + ttl)
/// 2. operation `expiry`
/// 3. record `expiry`
/// 4. record `ttl` (now + ttl)
///
/// `None` means the record never expires.
pub fn resolve_expiry(
    record: &Record,
    opts: &WriteOptions,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    opts.ttl
        .map(|ttl| add_ttl(now, ttl))
        .or(opts.expiry)
        .or(record.expiry)
        .or_else(|| record.ttl.map(|ttl| add_ttl(now, ttl)))
}

fn add_ttl(now: DateTime<Utc>, ttl: std::time::Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Liveness ==
/// A record is expired once its expiry is at or before `now`.
pub fn is_expired(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry.is_some_and(|at| at <= now)
}

// == Epoch Encoding ==
/// Encodes an expiry as epoch milliseconds, `0` meaning "never".
pub fn to_epoch_millis(expiry: Option<DateTime<Utc>>) -> i64 {
    expiry.map(|at| at.timestamp_millis().max(1)).unwrap_or(0)
}

/// Decodes the epoch-millisecond column, treating `0` as "never".
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}
