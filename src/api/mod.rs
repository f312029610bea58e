//! API Module
//!
//! HTTP handlers and routing for the cache admin and market-data API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats` - Cache statistics
//! - `GET /cache/policies` - TTL policy table
//! - `DELETE /cache/keys/:key` - Delete a key
//! - `DELETE /cache/subjects/:subject` - Invalidate a subject
//! - `POST /cache/clear` - Clear the cache
//! - `POST /cache/sweep` - Sweep expired entries
//! - `GET /api/stock/:ticker` - Quote
//! - `GET /api/stock/:ticker/history` - Daily bars

pub mod handlers;
pub mod response_cache;
pub mod routes;

pub use handlers::*;
pub use response_cache::{
    register_response_keys, response_key, CACHEABLE_PREFIXES, CACHE_STATUS_HEADER,
    RESPONSE_KEY_TEMPLATES,
};
pub use routes::create_router;
