//! API Handlers
//!
//! HTTP request handlers for the cache admin and market-data endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::response_cache::register_response_keys;
use crate::cache::{CacheCoordinator, CacheStats};
use crate::error::Result;
use crate::market::MarketData;
use crate::models::{
    DeleteResponse, HealthResponse, HistoryQuery, InvalidateResponse, MessageResponse,
    PolicyEntry, PriceBar, Quote, SweepResponse,
};

/// Application state shared across all handlers.
///
/// Every handler reaches the cache through the coordinator handle; no
/// handler touches a storage tier directly.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache coordinator
    pub cache: Arc<CacheCoordinator>,
    /// Memoized market-data provider
    pub market: Arc<MarketData>,
    /// Whether idempotent API responses are cached
    pub response_cache: bool,
}

impl AppState {
    /// Creates a new AppState around `cache`, with response caching on.
    ///
    /// Registers the market and response key templates, so subject
    /// invalidation covers both layers.
    pub fn new(cache: Arc<CacheCoordinator>) -> Result<Self> {
        let market = MarketData::new(cache.clone())?;
        register_response_keys(&cache)?;
        Ok(Self {
            cache,
            market: Arc::new(market),
            response_cache: true,
        })
    }

    /// Enables or disables the response cache layer.
    pub fn with_response_cache(mut self, enabled: bool) -> Self {
        self.response_cache = enabled;
        self
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.remote_available()))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Handler for GET /cache/policies
pub async fn policies_handler() -> Json<Vec<PolicyEntry>> {
    Json(PolicyEntry::table())
}

/// Handler for DELETE /cache/keys/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key).await;
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for DELETE /cache/subjects/:subject
///
/// Deletes every registered per-subject key of `subject`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Json<InvalidateResponse> {
    state.cache.invalidate_subject(&subject).await;
    Json(InvalidateResponse::new(subject, state.cache.categories()))
}

/// Handler for POST /cache/clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.clear().await;
    Json(MessageResponse::new("Cache cleared"))
}

/// Handler for POST /cache/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    Json(SweepResponse {
        removed: state.cache.sweep(),
    })
}

/// Handler for GET /api/stock/:ticker
pub async fn quote_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<Quote>> {
    let quote = state.market.quote(&ticker).await?;
    Ok(Json(quote))
}

/// Handler for GET /api/stock/:ticker/history?days=N
pub async fn history_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PriceBar>>> {
    let bars = state.market.history(&ticker, query.days).await?;
    Ok(Json(bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheCoordinator;
    use crate::error::CacheError;

    fn test_state() -> AppState {
        AppState::new(Arc::new(CacheCoordinator::default())).unwrap()
    }

    #[tokio::test]
    async fn test_quote_handler() {
        let state = test_state();

        let response = quote_handler(State(state.clone()), Path("AAPL".to_string()))
            .await
            .unwrap();
        assert_eq!(response.ticker, "AAPL");

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_quote_handler_rejects_bad_ticker() {
        let state = test_state();

        let result = quote_handler(State(state), Path("no spaces".to_string())).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_history_handler_validates_days() {
        let state = test_state();

        let result = history_handler(
            State(state),
            Path("AAPL".to_string()),
            Query(HistoryQuery { days: 0 }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_key_handler() {
        let state = test_state();
        state
            .cache
            .set("to_delete", serde_json::json!(1), 60)
            .await
            .unwrap();

        let response = delete_key_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(response.deleted);

        let response = delete_key_handler(State(state), Path("to_delete".to_string())).await;
        assert!(!response.deleted);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        quote_handler(State(state.clone()), Path("AAPL".to_string()))
            .await
            .unwrap();

        let response = invalidate_handler(State(state.clone()), Path("AAPL".to_string())).await;
        assert_eq!(response.subject, "AAPL");
        assert!(response.categories.contains(&"stock_price".to_string()));
        assert_eq!(state.cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_clear_and_sweep_handlers() {
        let state = test_state();
        state.market.warm_up(&["AAPL", "MSFT"]).await;

        let swept = sweep_handler(State(state.clone())).await;
        assert_eq!(swept.removed, 0);

        clear_handler(State(state.clone())).await;
        assert_eq!(state.cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(test_state())).await;
        assert_eq!(response.status, "healthy");
        assert!(!response.remote_available);
    }
}
