//! Request DTOs for the cache API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Largest history window served.
pub const MAX_HISTORY_DAYS: u32 = 365;

/// Query string of GET /api/stock/:ticker/history
///
/// # Fields
/// - `days`: Number of daily bars (defaults to 30)
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

/// Validates a history window: 1 to `MAX_HISTORY_DAYS` bars.
pub fn validate_days(days: u32) -> Option<String> {
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Some(format!(
            "days must be between 1 and {}",
            MAX_HISTORY_DAYS
        ));
    }
    None
}

/// Validates a ticker symbol: 1-10 characters of `A-Z`, `0-9`, `.` or `-`.
pub fn validate_ticker(ticker: &str) -> Option<String> {
    if ticker.is_empty() || ticker.len() > 10 {
        return Some("Ticker must be 1-10 characters".to_string());
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Some(format!("Invalid ticker '{}'", ticker));
    }
    None
}
