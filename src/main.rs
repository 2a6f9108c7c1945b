// =============================================================================
// AuraLens Stock Data Backend: Main Entry Point
// =============================================================================
//
// Serves `GET /get_stock_data`: daily history for one ticker from Yahoo
// Finance with SMA(20) and RSI(14) computed on the closes.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod config;
mod indicators;
mod market_data;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::market_data::YahooProvider;

const DEFAULT_CONFIG_PATH: &str = "auralens_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("AURALENS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = ServerConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ServerConfig::default()
    });
    config.apply_env(|key| std::env::var(key).ok())?;

    info!(
        default_ticker = %config.default_ticker,
        default_days = config.default_days,
        provider = %config.provider.base_url,
        auto_adjust = config.provider.auto_adjust,
        "AuraLens backend starting"
    );

    // ── 2. Provider & shared state ───────────────────────────────────────
    let provider = YahooProvider::new(&config.provider).context("failed to build provider")?;
    let bind_addr = config.bind_addr()?;
    let state = AppState::new(config, Arc::new(provider));

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("AuraLens backend shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
