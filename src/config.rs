//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Remote tier URL, `None` runs local-only
    pub remote_url: Option<String>,
    /// Bound on each remote call in milliseconds
    pub remote_timeout_ms: u64,
    /// Remote health re-probe interval in seconds, 0 disables re-probing
    pub remote_reprobe_interval: u64,
    /// Whether idempotent API responses are cached
    pub response_cache: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expired-entry sweep frequency in seconds (default: 60)
    /// - `REMOTE_URL` - Remote tier URL, e.g. `redis://127.0.0.1:6379/0` (default: unset)
    /// - `REMOTE_TIMEOUT_MS` - Per-call remote timeout (default: 250)
    /// - `REMOTE_REPROBE_INTERVAL` - Remote re-probe frequency in seconds (default: 0, off)
    /// - `RESPONSE_CACHE` - Cache idempotent API responses (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sweep_interval: parse_var("SWEEP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
            remote_url: env::var("REMOTE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            remote_timeout_ms: parse_var("REMOTE_TIMEOUT_MS").unwrap_or(defaults.remote_timeout_ms),
            remote_reprobe_interval: parse_var("REMOTE_REPROBE_INTERVAL")
                .unwrap_or(defaults.remote_reprobe_interval),
            response_cache: parse_var("RESPONSE_CACHE").unwrap_or(defaults.response_cache),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            sweep_interval: 60,
            remote_url: None,
            remote_timeout_ms: 250,
            remote_reprobe_interval: 0,
            response_cache: true,
        }
    }
}
