//! API Routes
//!
//! Configures the Axum router with the cache admin and market-data endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_key_handler, health_handler, history_handler, invalidate_handler,
    policies_handler, quote_handler, stats_handler, sweep_handler, AppState,
};
use super::response_cache::response_cache;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /cache/stats` - Hit/miss statistics
/// - `GET /cache/policies` - TTL policy table
/// - `DELETE /cache/keys/:key` - Delete one key
/// - `DELETE /cache/subjects/:subject` - Invalidate every key of a subject
/// - `POST /cache/clear` - Empty the cache
/// - `POST /cache/sweep` - Drop expired entries now
/// - `GET /api/stock/:ticker` - Memoized quote
/// - `GET /api/stock/:ticker/history` - Memoized daily bars
///
/// # Middleware
/// - Response cache: replays idempotent market-data reads
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/stock/:ticker", get(quote_handler))
        .route("/api/stock/:ticker/history", get(history_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), response_cache));

    // Build router with all endpoints
    Router::new()
        .route("/health", get(health_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/policies", get(policies_handler))
        .route("/cache/keys/:key", delete(delete_key_handler))
        .route("/cache/subjects/:subject", delete(invalidate_handler))
        .route("/cache/clear", post(clear_handler))
        .route("/cache/sweep", post(sweep_handler))
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheCoordinator;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::new(Arc::new(CacheCoordinator::default())).unwrap();
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clear_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_ticker_is_bad_request() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stock/aapl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
