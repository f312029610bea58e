//! Memoization Module
//!
//! Cache-aside wrappers around arbitrary operations.
//!
//! A wrapper checks the coordinator first and only runs the operation on a
//! miss, storing its successful result under the wrapper's TTL. Failures
//! propagate untouched and are never cached; if the caller drops the future
//! before the operation finishes, nothing is written either.
//!
//! There is no per-key mutual exclusion: callers racing on a cold key each
//! run the operation and the last write wins. Expensive operations that are
//! hit concurrently on a cold cache will be computed more than once.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::cache::{fingerprint, CacheCoordinator, CallArgs, KeyTemplate, Ttl};
use crate::error::{CacheError, Result as CacheResult};

// == Memoizer ==
/// Memoizes one named operation, keyed by the fingerprint of its arguments.
#[derive(Debug, Clone)]
pub struct Memoizer {
    cache: Arc<CacheCoordinator>,
    op: String,
    ttl: Ttl,
}

impl Memoizer {
    /// Wraps the operation `op`, caching results for `ttl`.
    pub fn new(cache: Arc<CacheCoordinator>, op: impl Into<String>, ttl: impl Into<Ttl>) -> Self {
        Self {
            cache,
            op: op.into(),
            ttl: ttl.into(),
        }
    }

    /// Wraps a per-subject operation whose key comes from `template`.
    ///
    /// The template is registered under `category` so that
    /// `CacheCoordinator::invalidate_subject` reaches every entry this
    /// wrapper writes.
    pub fn for_subject(
        cache: Arc<CacheCoordinator>,
        category: &str,
        template: &str,
        ttl: impl Into<Ttl>,
    ) -> CacheResult<SubjectMemoizer> {
        let template = cache.register_category(category, template)?;
        Ok(SubjectMemoizer {
            cache,
            category: category.to_string(),
            template,
            ttl: ttl.into(),
        })
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Fingerprint under which a call with `args` is cached.
    pub fn key_for(&self, args: &CallArgs) -> CacheResult<String> {
        fingerprint(&self.op, args)
    }

    /// Runs a suspension-capable operation with cache-aside semantics.
    ///
    /// If the arguments cannot be fingerprinted the operation runs uncached.
    pub async fn call<T, E, F, Fut>(&self, args: CallArgs, operation: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.key_for(&args) {
            Ok(key) => cached_or_compute(&self.cache, &self.op, &key, self.ttl, operation).await,
            Err(err) => {
                warn!(op = %self.op, error = %err, "Cannot fingerprint call, running uncached");
                operation().await
            }
        }
    }

    /// Runs a blocking operation with cache-aside semantics.
    ///
    /// The operation executes on the blocking thread pool, so the calling
    /// task yields instead of stalling its scheduler. A panic inside the
    /// operation resumes on the caller; if the runtime shuts down before the
    /// operation runs, the call fails with `CacheError::Internal`.
    pub async fn call_blocking<T, E, F>(&self, args: CallArgs, operation: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.call(args, || run_blocking(operation)).await
    }
}

// == Subject Memoizer ==
/// Memoizes a per-subject operation under a registered key template.
#[derive(Debug, Clone)]
pub struct SubjectMemoizer {
    cache: Arc<CacheCoordinator>,
    category: String,
    template: KeyTemplate,
    ttl: Ttl,
}

impl SubjectMemoizer {
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Cache key for `subject`.
    pub fn key_for(&self, subject: &str) -> String {
        self.template.key_for(subject)
    }

    /// Runs a suspension-capable operation for `subject` with cache-aside semantics.
    pub async fn call<T, E, F, Fut>(&self, subject: &str, operation: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.key_for(subject);
        cached_or_compute(&self.cache, &self.category, &key, self.ttl, operation).await
    }

    /// Runs a blocking operation for `subject` on the blocking thread pool.
    ///
    /// Failure modes match `Memoizer::call_blocking`.
    pub async fn call_blocking<T, E, F>(&self, subject: &str, operation: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: From<CacheError> + Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.call(subject, || run_blocking(operation)).await
    }
}

// == Helpers ==
async fn cached_or_compute<T, E, F, Fut>(
    cache: &CacheCoordinator,
    op: &str,
    key: &str,
    ttl: Ttl,
    operation: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(cached) = cache.get_as::<T>(key).await {
        debug!(op, key, "Memoized result served from cache");
        return Ok(cached);
    }

    let result = operation().await?;

    match serde_json::to_value(&result) {
        Ok(value) => {
            if let Err(err) = cache.set(key, value, ttl).await {
                warn!(op, key, error = %err, "Failed to cache result");
            }
        }
        Err(err) => warn!(op, key, error = %err, "Result is not serializable, not cached"),
    }
    Ok(result)
}

async fn run_blocking<T, E, F>(operation: F) -> Result<T, E>
where
    T: Send + 'static,
    E: From<CacheError> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    match tokio::task::spawn_blocking(operation).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        // Blocking tasks are only cancelled when the runtime shuts down
        Err(err) => Err(CacheError::Internal(format!(
            "blocking operation did not complete: {}",
            err
        ))
        .into()),
    }
}
