//! Cache Statistics Module
//!
//! Tracks hit/miss counters and builds the stats snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Monotonic hit and miss counters, shared by every caller of the coordinator.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsCounters {
    // == Constructor ==
    /// Creates counters starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Live entries in the local tier
    pub entries: usize,
    /// Number of lookups answered from a tier
    pub hits: u64,
    /// Number of lookups no tier could answer
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before the first lookup
    pub hit_rate: f64,
    /// `hit_rate` as a percentage string, e.g. "50.0%"
    pub hit_rate_display: String,
    /// hits + misses
    pub total_requests: u64,
    /// Whether the remote tier is currently in use
    pub remote_available: bool,
}

impl CacheStats {
    // == Constructor ==
    /// Builds a snapshot, deriving the hit rate from the counters.
    pub fn new(entries: usize, hits: u64, misses: u64, remote_available: bool) -> Self {
        let total_requests = hits + misses;
        let hit_rate = hit_rate(hits, misses);
        Self {
            entries,
            hits,
            misses,
            hit_rate,
            hit_rate_display: format!("{:.1}%", hit_rate * 100.0),
            total_requests,
            remote_available,
        }
    }
}

// == Hit Rate ==
/// Returns hits / (hits + misses), or 0.0 if no requests have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
