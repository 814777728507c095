//! Health check routes

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use market_services::{FallbackReason, Provenance};
use serde::Serialize;

use crate::AppState;

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy", "demo" or "degraded"
    pub status: String,
    pub version: String,
    pub chain_id: u64,
    pub watcher_running: bool,
    pub admin_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Full health check
///
/// Degraded while the watcher is stopped or chain reads are failing.
/// Running without a configured market is healthy demo mode.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let watcher_running = state.watcher.is_running();
    let snapshot = state.watcher.current();

    let status = match snapshot.as_deref().map(|s| &s.provenance) {
        _ if !watcher_running => "degraded",
        Some(Provenance::Live) => "healthy",
        Some(Provenance::Fallback(FallbackReason::ConfigurationAbsent)) => "demo",
        _ => "degraded",
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain_id: state.ctx.chain_id,
        watcher_running,
        admin_enabled: state.admin.is_some(),
        generation: snapshot.as_ref().map(|s| s.generation),
        source: snapshot.as_ref().map(|s| s.provenance.label()),
        reason: snapshot
            .as_ref()
            .and_then(|s| s.provenance.reason().map(|r| r.to_string())),
    };

    let code = if status == "degraded" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (code, Json(response))
}

/// Simple liveness check
async fn liveness() -> &'static str {
    "OK"
}
