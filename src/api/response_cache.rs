//! Response Cache Layer
//!
//! Serves repeated idempotent API reads from the cache coordinator.
//!
//! Only `GET` requests under the market-data prefixes are considered. The
//! cache key is built from the path and the raw query string; successful
//! (200) UTF-8 responses are stored with the `short_quote` lifetime.
//!
//! Query-less per-ticker response keys are registered with the coordinator,
//! so invalidating a subject also drops its replayed responses. Reads with a
//! query string are only reachable through expiry, `delete` or `clear`.

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::handlers::AppState;
use crate::cache::{CacheCoordinator, TtlPolicy};
use crate::error::Result;

/// Path prefixes whose responses may be cached.
pub const CACHEABLE_PREFIXES: [&str; 4] = [
    "/api/stock/",
    "/api/fundamental/",
    "/api/technical/",
    "/api/news/",
];

/// Response header reporting whether the response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Bodies larger than this, or of unknown length, are passed through uncached.
const MAX_CACHED_BODY: usize = 1024 * 1024;

/// Response key templates invalidated together with their subject.
pub const RESPONSE_KEY_TEMPLATES: [(&str, &str); 2] = [
    ("http_stock", "http_/api/stock/{subject}_"),
    ("http_stock_history", "http_/api/stock/{subject}/history_"),
];

/// Stored form of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    content_type: Option<String>,
    body: String,
}

/// Cache key of a request.
pub fn response_key(path: &str, query: Option<&str>) -> String {
    format!("http_{}_{}", path, query.unwrap_or(""))
}

/// Registers the per-subject response keys with `cache`.
pub fn register_response_keys(cache: &CacheCoordinator) -> Result<()> {
    for (category, template) in RESPONSE_KEY_TEMPLATES {
        cache.register_category(category, template)?;
    }
    Ok(())
}

fn is_cacheable(method: &Method, path: &str) -> bool {
    *method == Method::GET && CACHEABLE_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Middleware entry point.
pub async fn response_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.response_cache || !is_cacheable(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let key = response_key(request.uri().path(), request.uri().query());
    if let Some(cached) = state.cache.get_as::<CachedResponse>(&key).await {
        debug!(key = %key, "Serving cached response");
        return replay(cached);
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let within_limit = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHED_BODY as u64);
    if !within_limit {
        debug!(key = %key, "Response too large or unsized, not cached");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(key = %key, error = %err, "Response body could not be buffered");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let cached = CachedResponse {
                content_type: parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                body: text.to_string(),
            };
            if let Err(err) = state
                .cache
                .set_as(&key, &cached, TtlPolicy::ShortQuote)
                .await
            {
                warn!(key = %key, error = %err, "Failed to cache response");
            }
        }
        Err(_) => debug!(key = %key, "Binary response not cached"),
    }

    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

fn replay(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    let headers = response.headers_mut();
    if let Some(value) = cached
        .content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("HIT"));
    response
}
