// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only endpoints under `/api/v1/` serving the latest scan to a dashboard.
// CORS is configured permissively; the API exposes nothing but public market
// analysis.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::binance::rate_limit::RateLimitSnapshot;
use crate::types::GatewayMode;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/scan", get(latest_scan))
        .route("/api/v1/config", get(config))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    gateway_mode: GatewayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_limit: Option<RateLimitSnapshot>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        gateway_mode: state.gateway_mode,
        rate_limit: state.rate_limit(),
    };
    Json(resp)
}

// =============================================================================
// Latest scan
// =============================================================================

async fn latest_scan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.latest_report() {
        Some(report) => Json(report).into_response(),
        None => {
            let body = serde_json::json!({ "scan": null, "message": "First scan still in progress" });
            Json(body).into_response()
        }
    }
}

// =============================================================================
// Active configuration
// =============================================================================

async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.runtime_config.clone())
}
