//! Store Contract
//!
//! The interface every backend implements identically. Callers depend on
//! `dyn Store` and pick a backend at construction time.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};

#[async_trait]
pub trait Store: Send + Sync {
    /// Merges `options` into the store configuration and reconnects.
    async fn init(&mut self, options: Options) -> Result<()>;

    /// Returns every live record matching `key`, or `NotFound` when none do.
    /// Records come back in the same order as [`Store::list`].
    async fn read(&self, key: &str, opts: ReadOptions) -> Result<Vec<Record>>;

    /// Upserts `record` with its resolved expiry.
    async fn write(&self, record: &Record, opts: WriteOptions) -> Result<()>;

    /// Removes the record with exactly this key. Missing keys are not an error.
    async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<()>;

    /// Returns the live keys matching the list filter.
    ///
    /// Pages are cut from a backend-specific order: the memory and MySQL
    /// backends order keys by first write (an update keeps the position),
    /// Redis orders them lexicographically since it keeps no write order.
    /// Expired records never occupy a page slot.
    async fn list(&self, opts: ListOptions) -> Result<Vec<String>>;

    /// Releases the connection; later operations fail with `Closed`.
    async fn close(&mut self) -> Result<()>;

    /// Short backend identifier.
    fn name(&self) -> &'static str;

    /// Snapshot of the current configuration.
    fn options(&self) -> Options;
}
