//! kvstore probe - round-trips a record through the configured backend
//!
//! Writes a short-lived record, reads and lists it back, then deletes it.
//! Exits non-zero when any step fails.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvstore::{open, Config, DeleteOptions, ListOptions, ReadOptions, Record, WriteOptions};

const PROBE_KEY: &str = "kvstore-probe";

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvstore=info,kvstore_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        "Configuration loaded: backend={}, addresses={:?}, database={:?}, table={:?}",
        config.backend, config.options.addresses, config.options.database, config.options.table
    );

    let mut store = open(&config)
        .await
        .with_context(|| format!("Failed to open {} store", config.backend))?;

    let record = Record::new(PROBE_KEY, "ok").with_ttl(Duration::from_secs(30));
    store
        .write(&record, WriteOptions::new())
        .await
        .context("Probe write failed")?;

    let records = store
        .read(PROBE_KEY, ReadOptions::new())
        .await
        .context("Probe read failed")?;
    ensure!(
        records.len() == 1 && records[0].value == record.value,
        "Probe read returned unexpected records: {records:?}"
    );

    let keys = store
        .list(ListOptions::new().with_prefix(PROBE_KEY))
        .await
        .context("Probe list failed")?;
    ensure!(
        keys.iter().any(|k| k == PROBE_KEY),
        "Probe key missing from list: {keys:?}"
    );

    store
        .delete(PROBE_KEY, DeleteOptions::new())
        .await
        .context("Probe delete failed")?;
    store.close().await.context("Close failed")?;

    info!("Probe against {} store succeeded", store.name());
    Ok(())
}
