//! Lazy Expiration Reaper
//!
//! Scans that run into expired entries hand them to a per-store worker which
//! deletes them in the background. Jobs are best effort: a full queue drops
//! the job and a failed delete is logged, in both cases the next scan finds
//! the entry again.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::resolve::Namespace;

/// Default number of queued deletes per store.
pub const DEFAULT_REAP_QUEUE: usize = 1024;

// == Purge ==
/// Backend hook deleting one expired entry. Implementations must re-check
/// the expiry so a record rewritten since the scan survives.
#[async_trait]
pub trait Purge: Send + Sync + 'static {
    /// Returns whether an entry was removed.
    async fn purge(&self, namespace: &Namespace, key: &str) -> Result<bool>;
}

#[derive(Debug)]
struct ReapJob {
    namespace: Namespace,
    key: String,
}

// == Reaper ==
#[derive(Debug)]
pub struct Reaper {
    tx: mpsc::Sender<ReapJob>,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawns the worker. Must be called from within a tokio runtime.
    pub fn spawn<P: Purge>(purger: P, capacity: usize, backend: &'static str) -> Self {
        let (tx, mut rx) = mpsc::channel::<ReapJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            debug!(backend, "Reaper started");
            while let Some(job) = rx.recv().await {
                match purger.purge(&job.namespace, &job.key).await {
                    Ok(true) => debug!(backend, namespace = %job.namespace, key = %job.key, "Reaped expired entry"),
                    Ok(false) => {}
                    Err(err) => warn!(
                        backend,
                        namespace = %job.namespace,
                        key = %job.key,
                        error = %err,
                        "Failed to reap expired entry"
                    ),
                }
            }
            debug!(backend, "Reaper stopped");
        });

        Self { tx, handle }
    }

    /// Queues an expired entry for deletion without waiting.
    pub fn schedule(&self, namespace: &Namespace, key: &str) {
        let job = ReapJob {
            namespace: namespace.clone(),
            key: key.to_string(),
        };
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                debug!(key = %job.key, "Reap queue full, dropping job");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CountingPurge {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Purge for CountingPurge {
        async fn purge(&self, _namespace: &Namespace, _key: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Closed("test"));
            }
            Ok(true)
        }
    }

    async fn wait_for(calls: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_scheduled_jobs_are_purged() {
        let purger = CountingPurge::default();
        let calls = purger.calls.clone();
        let reaper = Reaper::spawn(purger, 8, "test");

        let ns = Namespace::new("db", "t");
        reaper.schedule(&ns, "a");
        reaper.schedule(&ns, "b");

        wait_for(&calls, 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let purger = CountingPurge {
            fail: true,
            ..CountingPurge::default()
        };
        let calls = purger.calls.clone();
        let reaper = Reaper::spawn(purger, 8, "test");

        let ns = Namespace::new("db", "t");
        reaper.schedule(&ns, "a");
        reaper.schedule(&ns, "b");

        // The worker keeps going after the first failure
        wait_for(&calls, 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct StuckPurge;

    #[async_trait]
    impl Purge for StuckPurge {
        async fn purge(&self, _namespace: &Namespace, _key: &str) -> Result<bool> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_full_queue_does_not_block() {
        let reaper = Reaper::spawn(StuckPurge, 1, "test");
        let ns = Namespace::new("db", "t");

        let scheduling = async {
            for i in 0..16 {
                reaper.schedule(&ns, &format!("k{i}"));
            }
        };
        tokio::time::timeout(Duration::from_millis(100), scheduling)
            .await
            .expect("schedule should never wait on a full queue");
    }
}
