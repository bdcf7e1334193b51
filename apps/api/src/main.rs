//! # Aria API server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Aria API Server                                │
//! │                                                                         │
//! │  Browser ───► HTTP (8000) ───► axum routes ───► SQLite                 │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                              Redis / memory                             │
//! │                            (storefront cache)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aria_api::auth::AuthService;
use aria_api::cache::{MemoryCache, RedisCache};
use aria_api::{build_router, ApiConfig, AppCache, AppState};
use aria_db::{Database, DbConfig};

/// How often expired refresh tokens are purged.
const TOKEN_FLUSH_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aria_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Aria API server...");

    let config = ApiConfig::load().context("Failed to load configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.database_max_connections),
    )
    .await
    .context("Failed to open database")?;

    let cache = match config.redis_url.as_deref() {
        Some(url) => match RedisCache::connect(url).await {
            Ok(redis) => {
                info!("Connected to Redis");
                AppCache::Redis(redis)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, using the in-process cache");
                AppCache::Memory(MemoryCache::new())
            }
        },
        None => AppCache::Memory(MemoryCache::new()),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db.clone(), config, cache);

    spawn_token_flush(state.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn spawn_token_flush(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_FLUSH_INTERVAL);
        loop {
            interval.tick().await;
            match AuthService::new(&state.db, &state.jwt).flush_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Flushed expired refresh tokens"),
                Err(e) => warn!(error = %e, "Failed to flush expired refresh tokens"),
            }
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
