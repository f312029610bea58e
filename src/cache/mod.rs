//! Cache Module
//!
//! Two-tier TTL cache: an in-process store, an optional remote tier, the
//! coordinator that unifies them, and the memoization wrappers built on top.

mod clock;
mod coordinator;
mod entry;
mod fingerprint;
mod invalidation;
mod memoize;
mod remote;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use coordinator::{CacheCoordinator, DEFAULT_REMOTE_TIMEOUT};
pub use entry::CacheEntry;
pub use fingerprint::{fingerprint, CallArgs, FINGERPRINT_LEN};
pub use invalidation::{KeyRegistry, KeyTemplate, DEFAULT_CATEGORIES, SUBJECT_PLACEHOLDER};
pub use memoize::{Memoizer, SubjectMemoizer};
#[cfg(feature = "redis")]
pub use remote::RedisStore;
pub use remote::{InMemoryRemote, RemoteStore};
pub use stats::{hit_rate, CacheStats, StatsCounters};
pub use store::LocalStore;
pub use ttl::{Ttl, TtlPolicy};

/// Opaque cached value.
pub type CacheValue = serde_json::Value;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;
