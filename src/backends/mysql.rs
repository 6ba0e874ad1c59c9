//! MySQL Backend
//!
//! Relational adapter: one table per namespace with the layout
//! `(id, key UNIQUE, value BLOB, expiry BIGINT)`. `expiry` holds epoch
//! milliseconds, `0` meaning "never". Expired rows are filtered client-side
//! and handed to the reaper.
//!
//! # Context settings
//! - `max_connections` - pool size (default: 10)
//! - `idle_timeout_secs` - idle connection recycling (default: 10)
//! - `reap_queue` - lazy-expiration queue capacity (default: 1024)

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashSet;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, QueryBuilder};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};
use crate::resolve::{
    from_epoch_millis, is_expired, paginate, resolve_expiry, to_epoch_millis, KeyMatch, Namespace,
};
use crate::store::Store;
use crate::tasks::{Purge, Reaper, DEFAULT_REAP_QUEUE};

const NAME: &str = "mysql";

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "mysql://root@127.0.0.1:3306";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, sqlx::FromRow)]
struct StoredRow {
    key: String,
    value: Vec<u8>,
    expiry: i64,
}

/// Fully qualified, backtick-quoted table name. Callers validate the
/// namespace first.
fn table_ident(namespace: &Namespace) -> String {
    format!("`{}`.`{}`", namespace.database, namespace.table)
}

// == Query Building ==
/// `SELECT` for a scan, ordered by insertion.
fn scan_query(namespace: &Namespace, matcher: &KeyMatch) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT `key`, `value`, `expiry` FROM {}",
        table_ident(namespace)
    ));

    match matcher {
        KeyMatch::All => {}
        KeyMatch::Exact(key) => {
            qb.push(" WHERE `key` = ");
            qb.push_bind(key.clone());
        }
        KeyMatch::Affix { .. } => {
            qb.push(" WHERE (");
            {
                let mut clauses = qb.separated(" OR ");
                for pattern in matcher.like_patterns() {
                    clauses.push("`key` LIKE ");
                    clauses.push_bind_unseparated(pattern);
                }
            }
            qb.push(")");
        }
    }

    qb.push(" ORDER BY `id` ASC");
    qb
}

fn create_database_sql(namespace: &Namespace) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS `{}` DEFAULT CHARACTER SET utf8mb4 DEFAULT COLLATE utf8mb4_bin",
        namespace.database
    )
}

/// Keys compare by code point, matching the other backends.
fn create_table_sql(namespace: &Namespace) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         `id` BIGINT NOT NULL AUTO_INCREMENT, \
         `key` VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL, \
         `value` BLOB NOT NULL, \
         `expiry` BIGINT NOT NULL DEFAULT 0, \
         PRIMARY KEY (`id`), \
         UNIQUE KEY `uniq_key` (`key`))",
        table_ident(namespace)
    )
}

// == Purger ==
struct SqlPurge {
    pool: MySqlPool,
}

#[async_trait]
impl Purge for SqlPurge {
    async fn purge(&self, namespace: &Namespace, key: &str) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE `key` = ? AND `expiry` <> 0 AND `expiry` <= ? LIMIT 1",
            table_ident(namespace)
        );
        let result = sqlx::query(&sql)
            .bind(key)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::sql("reap", key, e))?;
        Ok(result.rows_affected() > 0)
    }
}

// == MySQL Store ==
pub struct MySqlStore {
    options: Options,
    fallback: Namespace,
    pool: Option<MySqlPool>,
    reaper: Option<Reaper>,
    /// Namespaces whose database and table are known to exist
    bootstrapped: DashSet<Namespace>,
}

impl MySqlStore {
    /// Connects with the `store.store` fallback namespace.
    pub async fn connect(options: Options) -> Result<Self> {
        Self::connect_with_fallback(options, Namespace::new("store", "store")).await
    }

    pub async fn connect_with_fallback(options: Options, fallback: Namespace) -> Result<Self> {
        let mut store = Self {
            options,
            fallback,
            pool: None,
            reaper: None,
            bootstrapped: DashSet::new(),
        };
        store.configure().await?;
        Ok(store)
    }

    async fn configure(&mut self) -> Result<()> {
        let namespace = self.namespace(None, None)?;

        let max_connections = self
            .options
            .context_value("max_connections", DEFAULT_MAX_CONNECTIONS)
            .map_err(StoreError::InvalidConfig)?;
        let idle_timeout = self
            .options
            .context_value("idle_timeout_secs", DEFAULT_IDLE_TIMEOUT_SECS)
            .map_err(StoreError::InvalidConfig)?;
        let queue = self
            .options
            .context_value("reap_queue", DEFAULT_REAP_QUEUE)
            .map_err(StoreError::InvalidConfig)?;

        let address = self
            .options
            .primary_address()
            .unwrap_or(DEFAULT_ADDRESS)
            .to_string();
        let mut connect = MySqlConnectOptions::from_str(&address).map_err(|e| {
            StoreError::InvalidConfig(format!("malformed mysql address {address}: {e}"))
        })?;
        if self.options.auth {
            if let Some(password) = &self.options.password {
                connect = connect.password(password);
            }
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(idle_timeout))
            .connect_with(connect)
            .await
            .map_err(|e| StoreError::sql("connect", &address, e))?;

        if let Some(old) = self.pool.replace(pool.clone()) {
            old.close().await;
        }
        self.bootstrapped.clear();
        self.reaper = Some(Reaper::spawn(SqlPurge { pool: pool.clone() }, queue, NAME));

        self.bootstrap(&pool, &namespace).await?;
        info!(
            address = %address,
            namespace = %namespace,
            max_connections,
            "MySQL store connected"
        );
        Ok(())
    }

    /// Creates the database and table of `namespace` on first use.
    async fn bootstrap(&self, pool: &MySqlPool, namespace: &Namespace) -> Result<()> {
        if self.bootstrapped.contains(namespace) {
            return Ok(());
        }

        let target = namespace.to_string();
        sqlx::query(&create_database_sql(namespace))
            .execute(pool)
            .await
            .map_err(|e| StoreError::sql("create database", &target, e))?;
        sqlx::query(&create_table_sql(namespace))
            .execute(pool)
            .await
            .map_err(|e| StoreError::sql("create table", &target, e))?;

        debug!(namespace = %namespace, "Namespace bootstrapped");
        self.bootstrapped.insert(namespace.clone());
        Ok(())
    }

    fn namespace(&self, database: Option<&str>, table: Option<&str>) -> Result<Namespace> {
        let namespace = Namespace::resolve(database, table, &self.options, &self.fallback);
        namespace.validate_database()?;
        namespace.validate_table()?;
        Ok(namespace)
    }

    /// Pool and reaper for a live store, with the namespace bootstrapped.
    async fn open(&self, namespace: &Namespace) -> Result<(&MySqlPool, &Reaper)> {
        let (Some(pool), Some(reaper)) = (self.pool.as_ref(), self.reaper.as_ref()) else {
            return Err(StoreError::Closed(NAME));
        };
        self.bootstrap(pool, namespace).await?;
        Ok((pool, reaper))
    }

    /// Runs the scan for `matcher` and returns the live rows, scheduling
    /// the expired ones for deletion.
    async fn scan(&self, namespace: &Namespace, matcher: &KeyMatch) -> Result<Vec<StoredRow>> {
        let (pool, reaper) = self.open(namespace).await?;

        let rows: Vec<StoredRow> = scan_query(namespace, matcher)
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(|e| StoreError::sql("scan", namespace.to_string(), e))?;

        let now = Utc::now();
        let (live, expired): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .partition(|row| !is_expired(from_epoch_millis(row.expiry), now));
        for row in &expired {
            reaper.schedule(namespace, &row.key);
        }
        Ok(live)
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn init(&mut self, options: Options) -> Result<()> {
        self.options.merge(options);
        self.configure().await
    }

    async fn read(&self, key: &str, opts: ReadOptions) -> Result<Vec<Record>> {
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let matcher = KeyMatch::for_read(key, &opts);

        let rows = self.scan(&namespace, &matcher).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let now = Utc::now();
        let records = rows
            .into_iter()
            .map(|row| Record::stored(row.key, row.value, from_epoch_millis(row.expiry), now))
            .collect();
        Ok(paginate(records, opts.limit, opts.offset))
    }

    async fn write(&self, record: &Record, opts: WriteOptions) -> Result<()> {
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let (pool, _) = self.open(&namespace).await?;
        let expiry = to_epoch_millis(resolve_expiry(record, &opts, Utc::now()));
        let table = table_ident(&namespace);
        let err = |e| StoreError::sql("write", record.key.clone(), e);

        let mut tx = pool.begin().await.map_err(err)?;

        let select = format!("SELECT `id` FROM {table} WHERE `key` = ? LIMIT 1 FOR UPDATE");
        let existing: Option<i64> = sqlx::query_scalar(&select)
            .bind(record.key.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(err)?;

        match existing {
            Some(id) => {
                let update = format!("UPDATE {table} SET `value` = ?, `expiry` = ? WHERE `id` = ?");
                sqlx::query(&update)
                    .bind(record.value.as_slice())
                    .bind(expiry)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(err)?;
            }
            None => {
                // A concurrent first insert of the same key turns into an update
                let insert = format!(
                    "INSERT INTO {table} (`key`, `value`, `expiry`) VALUES (?, ?, ?) \
                     ON DUPLICATE KEY UPDATE `value` = VALUES(`value`), `expiry` = VALUES(`expiry`)"
                );
                sqlx::query(&insert)
                    .bind(record.key.as_str())
                    .bind(record.value.as_slice())
                    .bind(expiry)
                    .execute(&mut *tx)
                    .await
                    .map_err(err)?;
            }
        }

        tx.commit().await.map_err(err)
    }

    async fn delete(&self, key: &str, opts: DeleteOptions) -> Result<()> {
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let (pool, _) = self.open(&namespace).await?;

        let sql = format!("DELETE FROM {} WHERE `key` = ? LIMIT 1", table_ident(&namespace));
        sqlx::query(&sql)
            .bind(key)
            .execute(pool)
            .await
            .map_err(|e| StoreError::sql("delete", key, e))?;
        Ok(())
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<String>> {
        let namespace = self.namespace(opts.database.as_deref(), opts.table.as_deref())?;
        let matcher = KeyMatch::for_list(&opts);

        let rows = self.scan(&namespace, &matcher).await?;
        let keys = rows.into_iter().map(|row| row.key).collect();
        Ok(paginate(keys, opts.limit, opts.offset))
    }

    async fn close(&mut self) -> Result<()> {
        self.reaper = None;
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        info!("MySQL store closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn options(&self) -> Options {
        self.options.clone()
    }
}
