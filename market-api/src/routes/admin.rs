//! Admin routes: oracle resolution trigger

use alloy_primitives::Address;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use market_services::{AdminError, MarketView};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::error_response;
use crate::AppState;

/// Create admin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/markets", get(list_triggerable))
        .route("/admin/trigger", post(trigger_resolution))
}

#[derive(Debug, Serialize)]
pub struct TriggerableResponse {
    pub enabled: bool,
    /// Fee attached to each trigger, in wei
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    pub markets: Vec<MarketView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub market_id: String,
}

/// Markets that can be sent to the oracle
async fn list_triggerable(State(state): State<AppState>) -> Json<TriggerableResponse> {
    match &state.admin {
        Some(admin) => Json(TriggerableResponse {
            enabled: true,
            fee: Some(admin.fee().to_string()),
            markets: admin
                .triggerable_markets()
                .iter()
                .map(MarketView::from_market)
                .collect(),
        }),
        None => Json(TriggerableResponse {
            enabled: false,
            fee: None,
            markets: Vec::new(),
        }),
    }
}

/// Request resolution of a market
async fn trigger_resolution(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Response {
    let Some(admin) = &state.admin else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Admin trigger not configured",
        );
    };

    let Ok(market_id) = request.market_id.parse::<Address>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid market id: {}", request.market_id),
        );
    };

    match admin.trigger_resolution(market_id).await {
        Ok(receipt) => {
            info!("Resolution requested for {}", market_id);
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(e) => {
            let status = match &e {
                AdminError::NoLiveData | AdminError::AlreadyResolved(_) => StatusCode::CONFLICT,
                AdminError::UnknownMarket(_) => StatusCode::NOT_FOUND,
                AdminError::Write(_) => {
                    error!("Oracle trigger for {} failed: {}", market_id, e);
                    StatusCode::BAD_GATEWAY
                }
            };
            error_response(status, e.to_string())
        }
    }
}
