//! Cache Maintenance Tasks
//!
//! Background tasks that sweep expired entries and re-probe the remote tier.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheCoordinator;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The sweep only holds the local store's lock for the scan itself, so it
/// runs alongside regular reads and writes.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheCoordinator::default());
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<CacheCoordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep();
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

/// Spawns a background task that periodically re-probes the remote tier,
/// bringing it back into use once it is healthy again.
pub fn spawn_reprobe_task(cache: Arc<CacheCoordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting remote re-probe task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;
            cache.reprobe_remote().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryRemote, ManualClock, SystemClock};
    use serde_json::json;

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = Arc::new(CacheCoordinator::new(clock.clone()));

        cache.set("expire_soon", json!("value"), 1).await.unwrap();
        cache.set("long_lived", json!("value"), 3600).await.unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        // Sweep removed the entry physically; only the long-lived one remains
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.get("long_lived").await, Some(json!("value")));
    }

    #[tokio::test]
    async fn test_reprobe_task_restores_remote() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_healthy(false);
        let cache = Arc::new(
            CacheCoordinator::with_remote(
                remote.clone(),
                Duration::from_millis(50),
                Arc::new(SystemClock),
            )
            .await,
        );
        assert!(!cache.remote_available());

        remote.set_healthy(true);
        let handle = spawn_reprobe_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(cache.remote_available());
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache = Arc::new(CacheCoordinator::default());

        let handle = spawn_sweep_task(cache, Duration::from_secs(1));

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
