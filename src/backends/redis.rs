//! Redis Backend
//!
//! Cache-style adapter. Records live under `table:key`; prefix and suffix
//! lookups use `KEYS` glob patterns and expiry is delegated to Redis'
//! native TTL.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use redis::aio::ConnectionManager;
use redis::IntoConnectionInfo;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};
use crate::resolve::{is_expired, paginate, resolve_expiry, KeyMatch, Namespace};
use crate::store::Store;

const NAME: &str = "redis";

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "redis://127.0.0.1:6379";

// == Redis Store ==
pub struct RedisStore {
    options: Options,
    fallback: Namespace,
    conn: Option<ConnectionManager>,
}

impl RedisStore {
    /// Connects with `store.store` as the fallback namespace.
    pub async fn connect(options: Options) -> Result<Self> {
        Self::connect_with_fallback(options, Namespace::new("store", "store")).await
    }

    pub async fn connect_with_fallback(options: Options, fallback: Namespace) -> Result<Self> {
        let mut store = Self {
            options,
            fallback,
            conn: None,
        };
        store.configure().await?;
        Ok(store)
    }

    async fn configure(&mut self) -> Result<()> {
        self.namespace(None, None)?;

        let address = self
            .options
            .primary_address()
            .unwrap_or(DEFAULT_ADDRESS)
            .to_string();
        let mut info = connection_info(&address)?;
        if self.options.auth {
            info.redis.password = self.options.password.clone();
        }

        let client =
            redis::Client::open(info).map_err(|e| StoreError::redis("connect", &address, e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::redis("connect", &address, e))?;

        self.conn = Some(conn);
        info!(address = %address, "Redis store connected");
        Ok(())
    }

    fn conn(&self) -> Result<ConnectionManager> {
        self.conn.clone().ok_or(StoreError::Closed(NAME))
    }

    fn namespace(&self, database: Option<&str>, table: Option<&str>) -> Result<Namespace> {
        let namespace = Namespace::resolve(database, table, &self.options, &self.fallback);
        namespace.validate_table()?;
        Ok(namespace)
    }

    /// Runs one `KEYS` per pattern and unions the results.
    async fn scan_keys(
        &self,
        conn: &mut ConnectionManager,
        patterns: Vec<String>,
    ) -> Result<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        for pattern in patterns {
            let found: Vec<String> = redis::cmd("KEYS")
                .arg(&pattern)
                .query_async(conn)
                .await
                .map_err(|e| StoreError::redis("keys", &pattern, e))?;
            keys.extend(found);
        }
        Ok(keys)
    }
}

/// Storage key prefix for a namespace. Tables never contain `:`, so no
/// table's prefix is a prefix of another's.
fn key_prefix(namespace: &Namespace) -> String {
    format!("{}:", namespace.table)
}

/// Accepts a URL or a bare `host:port` address.
fn connection_info(address: &str) -> Result<redis::ConnectionInfo> {
    let url = if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    };
    url.as_str()
        .into_connection_info()
        .map_err(|e| StoreError::InvalidConfig(format!("malformed redis address {address}: {e}")))
}

#[async_trait]
impl Store for RedisStore {
    async fn init(&mut self, options: Options) -> Result<()> {
        self.options.merge(options);
        self.configure().await
    }

    async fn read(&self, key: &str, opts: ReadOptions) -> Result<Vec<Record>> {
        let mut conn = self.conn()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let prefix = key_prefix(&namespace);
        let matcher = KeyMatch::for_read(key, &opts);

        let storage_keys: BTreeSet<String> = match &matcher {
            KeyMatch::Exact(_) => matcher.glob_patterns(&prefix).into_iter().collect(),
            _ => self.scan_keys(&mut conn, matcher.glob_patterns(&prefix)).await?,
        };

        let now = Utc::now();
        let mut records = Vec::with_capacity(storage_keys.len());
        for storage_key in storage_keys {
            let (value, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
                .atomic()
                .cmd("GET")
                .arg(&storage_key)
                .cmd("PTTL")
                .arg(&storage_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::redis("get", &storage_key, e))?;

            // Gone between KEYS and GET
            let Some(value) = value else { continue };

            // PTTL is -1 without expiry
            let expiry = (pttl >= 0).then(|| now + ChronoDuration::milliseconds(pttl));
            if is_expired(expiry, now) {
                continue;
            }

            let key = storage_key
                .strip_prefix(prefix.as_str())
                .unwrap_or(&storage_key)
                .to_string();
            records.push(Record::stored(key, value, expiry, now));
        }

        if records.is_empty() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(paginate(records, opts.limit, opts.offset))
    }

    async fn write(&self, record: &Record, opts: WriteOptions) -> Result<()> {
        let mut conn = self.conn()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let storage_key = format!("{}{}", key_prefix(&namespace), record.key);

        let now = Utc::now();
        let cmd = match resolve_expiry(record, &opts, now) {
            None => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&storage_key).arg(record.value.as_slice());
                cmd
            }
            Some(at) => {
                let millis = (at - now).num_milliseconds();
                if millis <= 0 {
                    // Already expired; the write must not leave an older value readable
                    debug!(key = %storage_key, "Write with elapsed expiry, deleting");
                    let mut cmd = redis::cmd("DEL");
                    cmd.arg(&storage_key);
                    cmd
                } else {
                    let mut cmd = redis::cmd("SET");
                    cmd.arg(&storage_key)
                        .arg(record.value.as_slice())
                        .arg("PX")
                        .arg(millis);
                    cmd
                }
            }
        };

        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| StoreError::redis("set", &storage_key, e))
    }

    async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<()> {
        let mut conn = self.conn()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let storage_key = format!("{}{}", key_prefix(&namespace), key);

        redis::cmd("DEL")
            .arg(&storage_key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| StoreError::redis("del", &storage_key, e))
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let prefix = key_prefix(&namespace);
        let matcher = KeyMatch::for_list(&opts);

        let storage_keys = self
            .scan_keys(&mut conn, matcher.glob_patterns(&prefix))
            .await?;
        let keys = storage_keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(prefix.as_str()).map(str::to_string))
            .collect();

        Ok(paginate(keys, opts.limit, opts.offset))
    }

    async fn close(&mut self) -> Result<()> {
        self.conn = None;
        info!("Redis store closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Options {
        self.options.clone()
    }
}
