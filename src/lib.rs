//! Tiered Cache - Two-tier TTL cache with memoization
//!
//! Provides an in-process TTL store with an optional remote tier, a
//! coordinator that unifies both, argument fingerprinting, cache-aside
//! memoization wrappers and per-subject invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheCoordinator, Memoizer, TtlPolicy};
pub use config::Config;
pub use tasks::{spawn_reprobe_task, spawn_sweep_task};
