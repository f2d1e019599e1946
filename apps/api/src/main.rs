mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod extract;
mod models;
mod monitor;
mod notify;
mod referrals;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::AnalyticsCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::monitor::DbMetricsMonitor;
use crate::notify::Notifier;
use crate::referrals::pg_store::PgReferralStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Referrals API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    let mut db_monitor = DbMetricsMonitor::new(
        db.clone(),
        Duration::from_secs(config.db_metrics_interval_secs),
    );
    db_monitor.start();

    // Initialize Redis analytics cache (optional)
    let cache = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis analytics cache enabled");
            Some(AnalyticsCache::new(client, config.analytics_cache_ttl_secs))
        }
        None => {
            info!("REDIS_URL not set; analytics cache disabled");
            None
        }
    };

    let notifier = match &config.notify_webhook_url {
        Some(url) => {
            info!("Hire notifications enabled");
            Notifier::new(Some(url.clone()))
        }
        None => Notifier::disabled(),
    };

    // Build app state
    let state = AppState {
        store: Arc::new(PgReferralStore::new(db.clone())),
        cache,
        notifier,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the portal domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_monitor.stop().await;
    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
