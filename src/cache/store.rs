//! Local Store Module
//!
//! Per-process key/value map with absolute per-entry expiry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheValue, Clock, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

// == Local Store ==
/// In-process cache tier.
///
/// The map sits behind a single mutex that is held for exactly one map
/// operation and never across an await point or a caller's computation.
#[derive(Debug)]
pub struct LocalStore {
    /// Key-value storage
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Time source for creation and expiry
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    // == Constructor ==
    /// Creates an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // == Get ==
    /// Returns the value if present and not expired.
    ///
    /// An expired entry is treated as absent and removed on the way out.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    // == Set ==
    /// Inserts or overwrites `key`, expiring `ttl_seconds` from now.
    pub fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) -> Result<()> {
        validate_key(key)?;
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidTtl(format!(
                "TTL for '{}' must be greater than 0 seconds",
                key
            )));
        }

        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl_seconds);
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present; absent keys are
    /// not an error.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    // == Sweep ==
    /// Removes all entries that are expired at the moment they are examined.
    ///
    /// Returns the number of entries removed. An entry overwritten by a
    /// concurrent `set` carries its new expiry and is kept.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    // == Length ==
    /// Number of physically stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Number of entries that are still live.
    pub fn live_len(&self) -> usize {
        let now = self.clock.now_ms();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    // == Is Empty ==
    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Rejects empty and oversize keys.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
