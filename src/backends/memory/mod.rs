//! Memory Backend
//!
//! An in-process store with the same contract as the network backends.
//! Useful for tests and single-process deployments.
//!
//! # Context settings
//! - `sweep_interval_secs` - periodic expired-entry sweep, 0 = off (default: 0)
//! - `reap_queue` - lazy-expiration queue capacity (default: 1024)

mod entry;
mod tables;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};
use crate::resolve::{paginate, resolve_expiry, KeyMatch, Namespace};
use crate::store::Store;
use crate::tasks::{spawn_sweep_task, Purge, Reaper, DEFAULT_REAP_QUEUE};

pub use entry::MemoryEntry;
pub use tables::{MemoryTables, Scan};

const NAME: &str = "memory";

// == Purger ==
struct MemoryPurge(Arc<MemoryTables>);

#[async_trait]
impl Purge for MemoryPurge {
    async fn purge(&self, namespace: &Namespace, key: &str) -> Result<bool> {
        Ok(self.0.remove_if_expired(namespace, key, Utc::now()))
    }
}

// == Memory Store ==
#[derive(Debug)]
pub struct MemoryStore {
    options: Options,
    fallback: Namespace,
    tables: Arc<MemoryTables>,
    reaper: Option<Reaper>,
    sweeper: Option<JoinHandle<()>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store with the `store.store` fallback namespace. Fails
    /// with `InvalidConfig` outside a tokio runtime.
    pub fn new(options: Options) -> Result<Self> {
        Self::with_fallback(options, Namespace::new("store", "store"))
    }

    /// Creates a store with an explicit fallback namespace.
    pub fn with_fallback(options: Options, fallback: Namespace) -> Result<Self> {
        let mut store = Self {
            options,
            fallback,
            tables: Arc::new(MemoryTables::new()),
            reaper: None,
            sweeper: None,
        };
        store.configure()?;
        Ok(store)
    }

    /// The underlying tables, shared with the background tasks.
    pub fn tables(&self) -> Arc<MemoryTables> {
        Arc::clone(&self.tables)
    }

    fn configure(&mut self) -> Result<()> {
        let sweep_secs = self
            .options
            .context_value::<u64>("sweep_interval_secs", 0)
            .map_err(StoreError::InvalidConfig)?;
        let queue = self
            .options
            .context_value::<usize>("reap_queue", DEFAULT_REAP_QUEUE)
            .map_err(StoreError::InvalidConfig)?;

        // Background tasks need a runtime to spawn onto
        tokio::runtime::Handle::try_current().map_err(|e| {
            StoreError::InvalidConfig(format!("memory store requires a tokio runtime: {e}"))
        })?;

        self.stop_tasks();
        self.reaper = Some(Reaper::spawn(
            MemoryPurge(Arc::clone(&self.tables)),
            queue,
            NAME,
        ));
        if sweep_secs > 0 {
            self.sweeper = Some(spawn_sweep_task(
                Arc::clone(&self.tables),
                Duration::from_secs(sweep_secs),
            ));
        }

        info!(
            namespace = %self.namespace(None, None),
            sweep_interval_secs = sweep_secs,
            "Memory store configured"
        );
        Ok(())
    }

    fn stop_tasks(&mut self) {
        self.reaper = None;
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }

    fn reaper(&self) -> Result<&Reaper> {
        self.reaper.as_ref().ok_or(StoreError::Closed(NAME))
    }

    fn namespace(&self, database: Option<&str>, table: Option<&str>) -> Namespace {
        Namespace::resolve(database, table, &self.options, &self.fallback)
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&mut self, options: Options) -> Result<()> {
        self.options.merge(options);
        self.configure()
    }

    async fn read(&self, key: &str, opts: ReadOptions) -> Result<Vec<Record>> {
        let reaper = self.reaper()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref());
        let matcher = KeyMatch::for_read(key, &opts);

        let now = Utc::now();
        let scan = self.tables.scan(&namespace, &matcher, now);
        for expired in &scan.expired {
            reaper.schedule(&namespace, expired);
        }
        if scan.live.is_empty() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let records = scan
            .live
            .iter()
            .map(|(key, entry)| entry.to_record(key, now))
            .collect();
        Ok(paginate(records, opts.limit, opts.offset))
    }

    async fn write(&self, record: &Record, opts: WriteOptions) -> Result<()> {
        self.reaper()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref());
        let expiry = resolve_expiry(record, &opts, Utc::now());

        self.tables
            .upsert(&namespace, &record.key, record.value.clone(), expiry);
        Ok(())
    }

    async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<()> {
        self.reaper()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref());
        self.tables.remove(&namespace, key);
        Ok(())
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<String>> {
        let reaper = self.reaper()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref());
        let matcher = KeyMatch::for_list(&opts);

        let scan = self.tables.scan(&namespace, &matcher, Utc::now());
        for expired in &scan.expired {
            reaper.schedule(&namespace, expired);
        }

        let keys = scan.live.into_iter().map(|(key, _)| key).collect();
        Ok(paginate(keys, opts.limit, opts.offset))
    }

    async fn close(&mut self) -> Result<()> {
        self.stop_tasks();
        Ok(())
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Options {
        self.options.clone()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn store() -> MemoryStore {
        MemoryStore::new(Options::default()).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = store();
        store
            .write(&Record::new("key1", "value1"), WriteOptions::new())
            .await
            .unwrap();

        let records = store.read("key1", ReadOptions::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "key1");
        assert_eq!(records[0].value, b"value1".to_vec());
        assert!(records[0].expiry.is_none());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let store = store();
        let result = store.read("nonexistent", ReadOptions::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_follows_first_write_order() {
        let store = store();
        for key in ["zeta", "alpha", "mid"] {
            store
                .write(&Record::new(key, "v"), WriteOptions::new())
                .await
                .unwrap();
        }
        store
            .write(&Record::new("zeta", "updated"), WriteOptions::new())
            .await
            .unwrap();

        let keys = store.list(ListOptions::new()).await.unwrap();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let records = store
            .read("", ReadOptions::new().with_prefix())
            .await
            .unwrap();
        let read_keys: Vec<String> = records.into_iter().map(|r| r.key).collect();
        assert_eq!(read_keys, keys);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = store();
        assert!(store.delete("nonexistent", DeleteOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_reports_ttl_and_expiry() {
        let store = store();
        let record = Record::new("k", "v").with_ttl(Duration::from_secs(60));
        store.write(&record, WriteOptions::new()).await.unwrap();

        let read = store.read("k", ReadOptions::new()).await.unwrap().remove(0);
        let ttl = read.ttl.unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl >= Duration::from_secs(59));
        assert!(read.expiry.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_expired_entry_is_reaped() {
        let store = store();
        let record = Record::new("k", "v").with_expiry(Utc::now() - ChronoDuration::seconds(1));
        store.write(&record, WriteOptions::new()).await.unwrap();
        assert_eq!(store.tables().len(), 1);

        let result = store.read("k", ReadOptions::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        for _ in 0..100 {
            if store.tables().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(store.tables().is_empty(), "Expired entry should be reaped");
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let mut store = store();
        store.close().await.unwrap();

        let result = store.write(&Record::new("k", "v"), WriteOptions::new()).await;
        assert!(matches!(result, Err(StoreError::Closed("memory"))));
    }

    #[tokio::test]
    async fn test_init_reopens_and_merges() {
        let mut store = store();
        store.close().await.unwrap();
        store
            .init(Options::default().with_database("app", "sessions"))
            .await
            .unwrap();

        assert_eq!(store.options().table.as_deref(), Some("sessions"));
        store
            .write(&Record::new("k", "v"), WriteOptions::new())
            .await
            .unwrap();
        let records = store
            .read("k", ReadOptions::new().with_database("app", "sessions"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_context_is_config_error() {
        let result = MemoryStore::new(Options::default().with_context("reap_queue", "lots"));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_new_outside_runtime_is_config_error() {
        let result = MemoryStore::new(Options::default());
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_name() {
        assert_eq!(store().name(), "memory");
    }
}
