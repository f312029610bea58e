//! Remote Store Module
//!
//! Contract for the optional external key-value tier, plus a Redis adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::{Clock, SystemClock};
use crate::error::{RemoteError, RemoteResult};

// == Remote Store Trait ==
/// Minimal contract of the remote tier.
///
/// The coordinator consumes this; it does not own the backing service. Every
/// method reports failure explicitly and the coordinator decides how to
/// degrade.
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Fetches the bytes stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> RemoteResult<Option<Vec<u8>>>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> RemoteResult<()>;

    async fn delete(&self, key: &str) -> RemoteResult<()>;

    /// Drops every key in the remote keyspace.
    async fn clear(&self) -> RemoteResult<()>;

    /// Returns true when the remote answers a liveness probe.
    async fn health(&self) -> bool;
}

// == In-Memory Remote ==
/// Process-local stand-in for a remote tier, with switchable faults.
///
/// Useful for local runs without a Redis server and for exercising the
/// coordinator's degrade paths. Entries expire like `SET EX` keys: once the
/// clock reaches their deadline they read as absent.
#[derive(Debug)]
pub struct InMemoryRemote {
    /// Stored bytes with their absolute expiry in milliseconds
    entries: Mutex<HashMap<String, (Vec<u8>, u64)>>,
    clock: Arc<dyn Clock>,
    unhealthy: AtomicBool,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicU64,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Remote whose expiry follows `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            unhealthy: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Makes `health()` report false.
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Makes every data operation return an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every data operation by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of data operations received (get/set/delete/clear).
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Raw bytes currently stored under `key`, bypassing faults and expiry.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).map(|(bytes, _)| bytes.clone())
    }

    async fn enter(&self) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Operation("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn get(&self, key: &str) -> RemoteResult<Option<Vec<u8>>> {
        self.enter().await?;
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some((_, expires_at)) => now >= *expires_at,
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> RemoteResult<()> {
        self.enter().await?;
        let expires_at = self.clock.now_ms() + ttl.as_millis() as u64;
        self.entries
            .lock()
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> RemoteResult<()> {
        self.enter().await?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> RemoteResult<()> {
        self.enter().await?;
        self.entries.lock().clear();
        Ok(())
    }

    async fn health(&self) -> bool {
        !self.unhealthy.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

#[cfg(feature = "redis")]
mod redis_store {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use tracing::{debug, info};

    use super::RemoteStore;
    use crate::error::RemoteResult;

    // == Redis Store ==
    /// Remote tier backed by a Redis server.
    #[derive(Clone)]
    pub struct RedisStore {
        conn: ConnectionManager,
        url: String,
    }

    impl std::fmt::Debug for RedisStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisStore").field("url", &self.url).finish()
        }
    }

    impl RedisStore {
        // == Connect ==
        /// Opens a managed connection to `url` (e.g. `redis://127.0.0.1:6379/0`).
        pub async fn connect(url: &str) -> RemoteResult<Self> {
            let client = redis::Client::open(url)?;
            let conn = client.get_connection_manager().await?;
            info!("Connected to remote cache at {}", url);
            Ok(Self {
                conn,
                url: url.to_string(),
            })
        }
    }

    #[async_trait]
    impl RemoteStore for RedisStore {
        async fn get(&self, key: &str) -> RemoteResult<Option<Vec<u8>>> {
            let mut conn = self.conn.clone();
            let value = redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<Vec<u8>>>(&mut conn)
                .await?;
            Ok(value)
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> RemoteResult<()> {
            let mut conn = self.conn.clone();
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok(())
        }

        async fn delete(&self, key: &str) -> RemoteResult<()> {
            let mut conn = self.conn.clone();
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok(())
        }

        async fn clear(&self) -> RemoteResult<()> {
            let mut conn = self.conn.clone();
            redis::cmd("FLUSHDB").query_async::<_, ()>(&mut conn).await?;
            Ok(())
        }

        async fn health(&self) -> bool {
            let mut conn = self.conn.clone();
            match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
                Ok(reply) => reply == "PONG",
                Err(err) => {
                    debug!("Remote health probe failed: {}", err);
                    false
                }
            }
        }
    }
}
