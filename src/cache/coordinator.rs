//! Cache Coordinator Module
//!
//! Unifies the local tier and the optional remote tier behind one handle,
//! with a fixed fallback order and aggregate hit/miss accounting.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, CacheValue, Clock, KeyRegistry, KeyTemplate, LocalStore, RemoteStore,
    StatsCounters, SystemClock, Ttl,
};
use crate::error::{RemoteError, RemoteResult, Result};

/// Default bound on a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(250);

// == Cache Coordinator ==
/// Shared cache handle.
///
/// Reads try the remote tier first when it is available, then the local
/// tier. Writes always land in the local tier and are copied to the remote
/// tier best-effort. Remote failures and timeouts are logged and treated as
/// "nothing returned"; they never reach the caller.
#[derive(Debug)]
pub struct CacheCoordinator {
    local: LocalStore,
    remote: Option<Arc<dyn RemoteStore>>,
    remote_available: AtomicBool,
    /// Set when a write skipped the remote tier while it was unavailable
    remote_stale: AtomicBool,
    remote_timeout: Duration,
    stats: StatsCounters,
    registry: RwLock<KeyRegistry>,
}

impl CacheCoordinator {
    // == Constructors ==
    /// Local-only coordinator.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            local: LocalStore::new(clock),
            remote: None,
            remote_available: AtomicBool::new(false),
            remote_stale: AtomicBool::new(false),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            stats: StatsCounters::new(),
            registry: RwLock::new(KeyRegistry::with_defaults()),
        }
    }

    /// Coordinator backed by `remote`.
    ///
    /// The remote is probed once here. If the probe fails or times out the
    /// coordinator runs in local-only mode until `reprobe_remote` succeeds.
    pub async fn with_remote(
        remote: Arc<dyn RemoteStore>,
        remote_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut coordinator = Self::new(clock);
        coordinator.remote = Some(remote);
        coordinator.remote_timeout = remote_timeout;

        if coordinator.reprobe_remote().await {
            info!("Remote cache tier available");
        } else {
            warn!("Remote cache tier unavailable, running local-only");
        }
        coordinator
    }

    // == Get ==
    /// Looks `key` up, remote tier first.
    ///
    /// Counts exactly one hit or one miss for the whole lookup.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        if let Some(remote) = self.active_remote() {
            match self.remote_call(remote.get(key)).await {
                Ok(Some(bytes)) => match serde_json::from_slice::<CacheValue>(&bytes) {
                    Ok(value) => {
                        self.stats.record_hit();
                        return Some(value);
                    }
                    Err(err) => warn!(key, error = %RemoteError::from(err), "Remote get failed"),
                },
                Ok(None) => {}
                Err(err) => warn!(key, error = %err, "Remote get failed"),
            }
        }

        let value = self.local.get(key);
        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        value
    }

    /// Looks `key` up and decodes it as `T`.
    ///
    /// A value that does not decode is logged and reported as absent.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key, error = %err, "Cached value has unexpected shape");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Fails only on an invalid key or a zero TTL. Remote write failures are
    /// logged and do not affect the result.
    pub async fn set(&self, key: &str, value: CacheValue, ttl: impl Into<Ttl>) -> Result<()> {
        let ttl_secs = ttl.into().as_secs();
        let encoded = self.remote.as_ref().map(|_| serde_json::to_vec(&value));

        self.local.set(key, value, ttl_secs)?;

        if let (Some(remote), Some(encoded)) = (self.write_target(), encoded) {
            let outcome = match encoded {
                Ok(bytes) => {
                    self.remote_call(remote.set(key, bytes, Duration::from_secs(ttl_secs)))
                        .await
                }
                Err(err) => Err(RemoteError::from(err)),
            };
            if let Err(err) = outcome {
                warn!(key, error = %err, "Remote set failed");
            }
        }
        Ok(())
    }

    /// Serializes `value` and stores it.
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: impl Into<Ttl>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }

    // == Delete ==
    /// Removes `key` from both tiers. Returns whether the local tier held it.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.local.delete(key);
        if let Some(remote) = self.write_target() {
            if let Err(err) = self.remote_call(remote.delete(key)).await {
                warn!(key, error = %err, "Remote delete failed");
            }
        }
        removed
    }

    // == Clear ==
    /// Empties both tiers.
    pub async fn clear(&self) {
        self.local.clear();
        if let Some(remote) = self.write_target() {
            if let Err(err) = self.remote_call(remote.clear()).await {
                warn!(error = %err, "Remote clear failed");
            }
        }
        info!("Cache cleared");
    }

    // == Sweep ==
    /// Drops expired entries from the local tier, returning how many.
    pub fn sweep(&self) -> usize {
        self.local.sweep()
    }

    // == Stats ==
    /// Current counters and tier state.
    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.local.live_len(),
            self.stats.hits(),
            self.stats.misses(),
            self.remote_available(),
        )
    }

    pub fn remote_available(&self) -> bool {
        self.remote_available.load(Ordering::SeqCst)
    }

    // == Reprobe Remote ==
    /// Re-runs the remote health probe and updates availability.
    ///
    /// A remote that comes back after missing writes is cleared before it is
    /// used again, so it cannot serve values deleted or replaced during the
    /// outage. If that clear fails the remote stays unavailable.
    ///
    /// Returns the new availability; always false without a remote tier.
    pub async fn reprobe_remote(&self) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };

        let mut healthy = tokio::time::timeout(self.remote_timeout, remote.health())
            .await
            .unwrap_or(false);

        if healthy && !self.remote_available() && self.remote_stale.swap(false, Ordering::SeqCst) {
            match self.remote_call(remote.clear()).await {
                Ok(()) => info!("Remote cache tier reset after missed writes"),
                Err(err) => {
                    warn!(error = %err, "Remote cache tier could not be reset, keeping it disabled");
                    self.remote_stale.store(true, Ordering::SeqCst);
                    healthy = false;
                }
            }
        }

        let was = self.remote_available.swap(healthy, Ordering::SeqCst);

        if was != healthy {
            if healthy {
                info!("Remote cache tier recovered");
            } else {
                let err = RemoteError::Unavailable("health probe failed".to_string());
                warn!(error = %err, "Remote cache tier marked unavailable");
            }
        } else {
            debug!(healthy, "Remote cache probe");
        }
        healthy
    }

    // == Invalidation ==
    /// Registers the per-subject key template of `category`.
    pub fn register_category(&self, category: &str, template: &str) -> Result<KeyTemplate> {
        let template = KeyTemplate::parse(template)?;
        if let Some(previous) = self.registry.write().register(category, template.clone()) {
            if previous != template {
                warn!(
                    category,
                    previous = previous.as_str(),
                    current = template.as_str(),
                    "Key template replaced"
                );
            }
        }
        Ok(template)
    }

    /// Registered category names.
    pub fn categories(&self) -> Vec<String> {
        self.registry
            .read()
            .categories()
            .map(str::to_string)
            .collect()
    }

    /// Deletes every registered key of `subject` from both tiers.
    ///
    /// Only keys produced by registered templates are touched.
    pub async fn invalidate_subject(&self, subject: &str) {
        let keys = self.registry.read().keys_for(subject);

        let mut removed = 0;
        for key in &keys {
            if self.delete(key).await {
                removed += 1;
            }
        }
        info!(
            subject,
            candidates = keys.len(),
            removed,
            "Cache invalidated for subject"
        );
    }

    // == Helpers ==
    fn active_remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.remote.as_ref().filter(|_| self.remote_available())
    }

    /// Remote tier for a write, recording the miss when it is unavailable.
    fn write_target(&self) -> Option<&Arc<dyn RemoteStore>> {
        let remote = self.remote.as_ref()?;
        if self.remote_available() {
            Some(remote)
        } else {
            self.remote_stale.store(true, Ordering::SeqCst);
            None
        }
    }

    /// Runs one remote call under the per-call timeout.
    async fn remote_call<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.remote_timeout.as_millis() as u64)),
        }
    }
}

impl Default for CacheCoordinator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryRemote, ManualClock, TtlPolicy};
    use serde_json::json;
    use std::time::Instant;

    fn local_coordinator() -> (CacheCoordinator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (CacheCoordinator::new(clock.clone()), clock)
    }

    async fn remote_coordinator(remote: Arc<InMemoryRemote>) -> CacheCoordinator {
        CacheCoordinator::with_remote(
            remote,
            Duration::from_millis(50),
            Arc::new(ManualClock::new(0)),
        )
        .await
    }

    #[tokio::test]
    async fn test_get_unset_key_is_one_miss() {
        let (cache, _) = local_coordinator();

        assert_eq!(cache.get("never_set").await, None);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_set_then_get_is_one_hit() {
        let (cache, _) = local_coordinator();

        cache.set("k", json!({"a": 1}), 60).await.unwrap();
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_price_expiry_scenario() {
        let (cache, clock) = local_coordinator();

        cache.set("AAPL_price", json!(150.0), 300).await.unwrap();

        clock.set(100_000);
        assert_eq!(cache.get("AAPL_price").await, Some(json!(150.0)));

        clock.set(400_000);
        assert_eq!(cache.get("AAPL_price").await, None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.hit_rate_display, "50.0%");
    }

    #[tokio::test]
    async fn test_set_rejects_zero_ttl() {
        let (cache, _) = local_coordinator();
        assert!(cache.set("k", json!(1), 0u64).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (cache, _) = local_coordinator();

        cache.set("a", json!(1), TtlPolicy::News).await.unwrap();
        cache.set("b", json!(2), TtlPolicy::News).await.unwrap();

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
        assert_eq!(cache.get("a").await, None);

        cache.clear().await;
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let (cache, _) = local_coordinator();

        cache.set_as("prices", &vec![1.5, 2.5], 60).await.unwrap();
        let prices: Option<Vec<f64>> = cache.get_as("prices").await;
        assert_eq!(prices, Some(vec![1.5, 2.5]));

        let wrong: Option<String> = cache.get_as("prices").await;
        assert_eq!(wrong, None);
    }

    #[tokio::test]
    async fn test_sweep_drops_expired() {
        let (cache, clock) = local_coordinator();

        cache.set("short", json!(1), 1).await.unwrap();
        cache.set("long", json!(2), 100).await.unwrap();
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.sweep(), 1);
    }

    #[tokio::test]
    async fn test_remote_hit_is_returned_directly() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        assert!(cache.remote_available());

        remote
            .set("k", b"\"from-remote\"".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await, Some(json!("from-remote")));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_set_writes_both_tiers() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;

        cache.set("k", json!([1, 2]), 60).await.unwrap();

        assert_eq!(remote.peek("k"), Some(b"[1,2]".to_vec()));
        assert_eq!(cache.local.get("k"), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_remote_miss_falls_back_to_local_without_double_count() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;

        cache.local.set("local_only", json!(7), 60).unwrap();

        assert_eq!(cache.get("local_only").await, Some(json!(7)));
        assert_eq!(cache.get("nowhere").await, None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_remote_failures_are_absorbed() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        remote.set_failing(true);

        cache.set("k", json!("v"), 60).await.unwrap();
        assert_eq!(cache.get("k").await, Some(json!("v")));
        assert!(cache.delete("k").await);
        cache.clear().await;

        assert!(cache.remote_available());
    }

    #[tokio::test]
    async fn test_slow_remote_is_bounded_by_timeout() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        cache.set("k", json!(1), 60).await.unwrap();
        remote.set_delay(Duration::from_secs(5));

        let started = Instant::now();
        assert_eq!(cache.get("k").await, Some(json!(1)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unhealthy_remote_degrades_to_local() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_healthy(false);
        let cache = remote_coordinator(remote.clone()).await;

        cache.set("k", json!(1), 60).await.unwrap();
        assert_eq!(cache.get("k").await, Some(json!(1)));
        assert!(cache.delete("k").await);

        assert!(!cache.stats().remote_available);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_reprobe_recovers_remote() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_healthy(false);
        let cache = remote_coordinator(remote.clone()).await;
        assert!(!cache.remote_available());

        remote.set_healthy(true);
        assert!(cache.reprobe_remote().await);
        assert!(cache.stats().remote_available);
    }

    #[tokio::test]
    async fn test_expiry_with_remote_attached() {
        let clock = Arc::new(ManualClock::new(0));
        let remote = Arc::new(InMemoryRemote::with_clock(clock.clone()));
        let cache =
            CacheCoordinator::with_remote(remote, Duration::from_millis(50), clock.clone()).await;
        assert!(cache.remote_available());

        cache.set("AAPL_price", json!(150.0), 300).await.unwrap();

        clock.set(100_000);
        assert_eq!(cache.get("AAPL_price").await, Some(json!(150.0)));

        clock.set(400_000);
        assert_eq!(cache.get("AAPL_price").await, None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_delete_during_outage_survives_recovery() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        cache.set("k", json!("v1"), 60).await.unwrap();

        remote.set_healthy(false);
        assert!(!cache.reprobe_remote().await);
        assert!(cache.delete("k").await);

        remote.set_healthy(true);
        assert!(cache.reprobe_remote().await);
        assert_eq!(remote.peek("k"), None);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_during_outage_survives_recovery() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        cache.set("k", json!("v1"), 60).await.unwrap();

        remote.set_healthy(false);
        cache.reprobe_remote().await;
        cache.set("k", json!("v2"), 60).await.unwrap();

        remote.set_healthy(true);
        assert!(cache.reprobe_remote().await);
        assert_eq!(cache.get("k").await, Some(json!("v2")));
    }

    #[tokio::test]
    async fn test_recovery_waits_for_successful_reset() {
        let remote = Arc::new(InMemoryRemote::new());
        let cache = remote_coordinator(remote.clone()).await;
        cache.set("k", json!("v1"), 60).await.unwrap();

        remote.set_healthy(false);
        cache.reprobe_remote().await;
        cache.delete("k").await;

        remote.set_healthy(true);
        remote.set_failing(true);
        assert!(!cache.reprobe_remote().await);
        assert!(!cache.remote_available());

        remote.set_failing(false);
        assert!(cache.reprobe_remote().await);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_initial_probe_keeps_remote_contents() {
        let remote = Arc::new(InMemoryRemote::new());
        remote
            .set("warm", b"1".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let cache = remote_coordinator(remote.clone()).await;
        assert!(cache.remote_available());
        assert_eq!(remote.peek("warm"), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_local_only_reprobe_is_false() {
        let (cache, _) = local_coordinator();
        assert!(!cache.reprobe_remote().await);
    }

    #[tokio::test]
    async fn test_invalidate_subject_scoped() {
        let (cache, _) = local_coordinator();

        for key in ["stock_price_AAPL", "news_AAPL", "ai_report_AAPL"] {
            cache.set(key, json!(1), 60).await.unwrap();
        }
        cache.set("stock_price_MSFT", json!(2), 60).await.unwrap();
        cache.set("custom_AAPL", json!(3), 60).await.unwrap();

        cache.invalidate_subject("AAPL").await;

        assert_eq!(cache.get("stock_price_AAPL").await, None);
        assert_eq!(cache.get("news_AAPL").await, None);
        assert_eq!(cache.get("ai_report_AAPL").await, None);
        assert_eq!(cache.get("stock_price_MSFT").await, Some(json!(2)));
        assert_eq!(cache.get("custom_AAPL").await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_registered_category_is_invalidated() {
        let (cache, _) = local_coordinator();
        cache.register_category("custom", "custom_{subject}").unwrap();
        assert!(cache.categories().contains(&"custom".to_string()));

        cache.set("custom_AAPL", json!(3), 60).await.unwrap();
        cache.invalidate_subject("AAPL").await;

        assert_eq!(cache.get("custom_AAPL").await, None);
    }

    #[tokio::test]
    async fn test_register_category_rejects_bad_template() {
        let (cache, _) = local_coordinator();
        assert!(cache.register_category("bad", "no_placeholder").is_err());
    }
}
