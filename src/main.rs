// =============================================================================
// Futures Trend Scanner — Main Entry Point
// =============================================================================
//
// Scans every USDT-margined perpetual on a fixed interval, surfaces symbols
// with an aligned, not-yet-extended EMA uptrend confirmed by a volume spike,
// and serves the latest result over a small read-only JSON API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod indicators;
mod market_data;
mod risk;
mod runtime_config;
mod scan_report;
mod scanner;
mod strategy;
#[cfg(test)]
mod test_support;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::market_data::MarketDataGateway;
use crate::runtime_config::RuntimeConfig;
use crate::scan_report::ScanReport;
use crate::scanner::Scanner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Futures Trend Scanner — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SCANNER_CONFIG").unwrap_or_else(|_| "scanner_config.json".into());
    let mut config = RuntimeConfig::load_or_default(&config_path)?;

    if let Ok(quote) = std::env::var("SCANNER_QUOTE_ASSET") {
        let quote = quote.trim().to_uppercase();
        if !quote.is_empty() {
            config.quote_asset = quote;
        }
    }
    config.validate().context("invalid scanner configuration")?;

    info!(
        quote = %config.quote_asset,
        timeframe = %config.timeframe,
        ema_periods = ?config.indicator_params.ema_periods,
        refresh_secs = config.refresh_interval_secs,
        "Scanner configured"
    );

    // ── 2. Exchange connectivity ─────────────────────────────────────────
    let client = connect_gateway(&config).await?;
    let gateway_mode = client.mode();
    info!(mode = %gateway_mode, "Market data gateway ready");

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(
        AppState::new(config.clone(), gateway_mode).with_rate_limit(client.rate_limit_tracker()),
    );
    let scanner = Scanner::new(Arc::new(client), &config);

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("SCANNER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Scan loop ─────────────────────────────────────────────────────
    let refresh = Duration::from_secs(config.refresh_interval_secs);
    let scan_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh);
        loop {
            interval.tick().await;

            let report = ScanReport::capture(&scanner, refresh).await;
            info!(
                scan_id = %report.scan_id,
                duration_secs = report.scan_duration_secs,
                scanned = report.result.total_scanned_count,
                winners = report.result.winning_symbols.len(),
                next_refresh = %report.next_refresh_at.format("%H:%M:%S"),
                "scan published"
            );
            scan_state.publish_report(report);
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping");
    info!("Futures Trend Scanner shut down complete.");
    Ok(())
}

/// Build the futures client. Credentials from the environment select live
/// mode, but only if the exchange accepts them; anything else falls back to
/// the public, unauthenticated client.
async fn connect_gateway(config: &RuntimeConfig) -> anyhow::Result<BinanceClient> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
    let api_secret = std::env::var("BINANCE_API_SECRET").unwrap_or_default();

    if api_key.is_empty() || api_secret.is_empty() {
        info!("No API key/secret provided — using public client");
        return BinanceClient::public(&config.futures_base_url, timeout);
    }

    let client =
        BinanceClient::with_credentials(&config.futures_base_url, api_key, api_secret, timeout)?;
    match client.verify_credentials().await {
        Ok(()) => Ok(client),
        Err(e) => {
            warn!(error = %e, "API credentials rejected — falling back to public client");
            BinanceClient::public(&config.futures_base_url, timeout)
        }
    }
}
