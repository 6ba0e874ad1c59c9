//! Expired Entry Sweep
//!
//! Background task that periodically removes expired entries from the
//! in-memory backend, so entries nobody reads again do not linger.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backends::memory::MemoryTables;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs until aborted, sleeping for `interval` between sweeps.
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it when the store is
/// closed or reconfigured.
pub fn spawn_sweep_task(tables: Arc<MemoryTables>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = tables.sweep_expired(Utc::now());

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Namespace;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let tables = Arc::new(MemoryTables::new());
        let ns = Namespace::new("store", "store");
        tables.upsert(
            &ns,
            "expire_soon",
            b"value".to_vec(),
            Some(Utc::now() + ChronoDuration::milliseconds(20)),
        );

        let handle = spawn_sweep_task(tables.clone(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(tables.is_empty(), "Expired entry should have been swept");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let tables = Arc::new(MemoryTables::new());
        let ns = Namespace::new("store", "store");
        tables.upsert(
            &ns,
            "long_lived",
            b"value".to_vec(),
            Some(Utc::now() + ChronoDuration::hours(1)),
        );
        tables.upsert(&ns, "forever", b"value".to_vec(), None);

        let handle = spawn_sweep_task(tables.clone(), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tables.len(), 2, "Valid entries should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_sweep_task(Arc::new(MemoryTables::new()), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
