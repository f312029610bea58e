//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};

use crate::cache::TtlPolicy;

/// Response body for key deletion (DELETE /cache/keys/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// The key that was targeted
    pub key: String,
    /// Whether the local tier held the key
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        Self {
            key: key.into(),
            deleted,
        }
    }
}

/// Response body for subject invalidation (DELETE /cache/subjects/:subject)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The invalidated subject
    pub subject: String,
    /// Categories whose keys were deleted
    pub categories: Vec<String>,
}

impl InvalidateResponse {
    pub fn new(subject: impl Into<String>, categories: Vec<String>) -> Self {
        let subject = subject.into();
        Self {
            message: format!("Cache invalidated for '{}'", subject),
            subject,
            categories,
        }
    }
}

/// Generic acknowledgement (POST /cache/clear)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for an explicit sweep (POST /cache/sweep)
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Number of expired entries removed
    pub removed: usize,
}

/// One row of the TTL policy table (GET /cache/policies)
#[derive(Debug, Clone, Serialize)]
pub struct PolicyEntry {
    pub name: TtlPolicy,
    pub seconds: u64,
}

impl PolicyEntry {
    /// Full policy table in declaration order.
    pub fn table() -> Vec<PolicyEntry> {
        TtlPolicy::ALL
            .into_iter()
            .map(|policy| PolicyEntry {
                name: policy,
                seconds: policy.seconds(),
            })
            .collect()
    }
}

/// Mock market quote (GET /api/stock/:ticker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    /// Generation time in RFC 3339
    pub as_of: String,
}

/// One daily bar (GET /api/stock/:ticker/history)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// ISO date (YYYY-MM-DD)
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the remote tier is in use
    pub remote_available: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(remote_available: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            remote_available,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
