use anyhow::{Context, Result};
use axum::http::StatusCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use znuost::config::{Config, CounterMode, TrackingMode};
use znuost::redirect::{create_redirect_router, Redirector};
use znuost::storage;

/// How long shutdown waits for background click tracking
const TRACKING_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let store = storage::connect(&config.database).await?;
    info!("Database initialized successfully");

    let tracking = &config.tracking;
    let redirector = Redirector::from_config(store, tracking)?;

    match tracking.mode {
        TrackingMode::Inline => info!("Click tracking runs before the redirect is sent"),
        TrackingMode::Background => info!("Click tracking runs in the background"),
    }
    if tracking.counter_mode == CounterMode::Observed {
        info!("Click counters use observed-count updates and may drift under concurrency");
    }
    info!(
        "Geolocation via {} (timeout {}ms), dedup window {}ms",
        tracking.geo_api_url, tracking.geo_timeout_ms, tracking.dedup.window_ms
    );

    let redirect_status = StatusCode::from_u16(config.redirect.status)
        .context("invalid redirect status code")?;
    let router = create_redirect_router(
        redirector.clone(),
        config.redirect.home_url.clone(),
        redirect_status,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Redirect server listening on http://{}", addr);
    info!("   - Short links available at http://{}/l/{{code}}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    redirector.drain_background(TRACKING_DRAIN_TIMEOUT).await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
