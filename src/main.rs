//! Tiered Cache - cache admin and market-data server
//!
//! Serves the memoized market-data API and the cache admin endpoints on top
//! of one shared cache coordinator.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::create_router;
use tiered_cache::cache::{CacheCoordinator, SystemClock};
use tiered_cache::{spawn_reprobe_task, spawn_sweep_task, AppState, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache coordinator (probing the remote tier if configured)
/// 4. Start background sweep (and remote re-probe) tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, sweep_interval={}s, remote={}, remote_timeout={}ms",
        config.server_port,
        config.sweep_interval,
        config.remote_url.as_deref().unwrap_or("disabled"),
        config.remote_timeout_ms
    );

    let cache = Arc::new(build_coordinator(&config).await);
    let state = AppState::new(cache.clone())
        .context("failed to initialize application state")?
        .with_response_cache(config.response_cache);

    let mut tasks = vec![spawn_sweep_task(
        cache.clone(),
        Duration::from_secs(config.sweep_interval),
    )];
    if config.remote_url.is_some() && config.remote_reprobe_interval > 0 {
        tasks.push(spawn_reprobe_task(
            cache.clone(),
            Duration::from_secs(config.remote_reprobe_interval),
        ));
    }
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Builds the coordinator, attaching the remote tier when one is configured
/// and reachable.
async fn build_coordinator(config: &Config) -> CacheCoordinator {
    let clock = Arc::new(SystemClock);

    match config.remote_url.as_deref() {
        Some(url) => connect_remote(url, config, clock).await,
        None => CacheCoordinator::new(clock),
    }
}

#[cfg(feature = "redis")]
async fn connect_remote(url: &str, config: &Config, clock: Arc<SystemClock>) -> CacheCoordinator {
    match tiered_cache::cache::RedisStore::connect(url).await {
        Ok(store) => {
            CacheCoordinator::with_remote(Arc::new(store), config.remote_timeout(), clock).await
        }
        Err(err) => {
            warn!(error = %err, "Remote cache unavailable, running local-only");
            CacheCoordinator::new(clock)
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_remote(url: &str, _config: &Config, clock: Arc<SystemClock>) -> CacheCoordinator {
    warn!(url, "Built without the redis feature, running local-only");
    CacheCoordinator::new(clock)
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
