//! Market board routes

use alloy_primitives::Address;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use market_core::{Market, MarketBoard};
use market_services::{
    FallbackProvider, FallbackReason, MarketDetailView, MarketView, Provenance, Snapshot,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::{error_response, Source};
use crate::AppState;

/// Create market routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/markets", get(list_markets))
        .route("/markets/refresh", post(refresh_markets))
        .route("/markets/{id}", get(get_market))
}

/// Market board response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsResponse {
    pub active: Vec<Market>,
    pub resolved: Vec<Market>,
    pub active_views: Vec<MarketView>,
    pub resolved_views: Vec<MarketView>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    pub observed_at: i64,
}

/// Market detail response
#[derive(Debug, Serialize)]
pub struct MarketDetailResponse {
    pub market: Market,
    pub detail: MarketDetailView,
    pub source: Source,
}

/// Current board, or the placeholder board before the first refresh lands
fn current_board(state: &AppState) -> (Option<Arc<Snapshot>>, MarketBoard, Provenance, i64) {
    match state.watcher.current() {
        Some(snapshot) => {
            let board = snapshot.board.clone();
            let provenance = snapshot.provenance.clone();
            let observed_at = snapshot.observed_at;
            (Some(snapshot), board, provenance, observed_at)
        }
        None => {
            let now = state.clock.now();
            (
                None,
                FallbackProvider.board(now),
                Provenance::Fallback(FallbackReason::Pending),
                now,
            )
        }
    }
}

/// List active and resolved markets
async fn list_markets(State(state): State<AppState>) -> Json<MarketsResponse> {
    let (snapshot, board, provenance, observed_at) = current_board(&state);

    Json(MarketsResponse {
        active_views: board.active.iter().map(MarketView::from_market).collect(),
        resolved_views: board.resolved.iter().map(MarketView::from_market).collect(),
        active: board.active,
        resolved: board.resolved,
        source: Source::from(&provenance),
        generation: snapshot.map(|s| s.generation),
        observed_at,
    })
}

/// Get one market with its probability history
async fn get_market(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<Address>() else {
        return error_response(StatusCode::BAD_REQUEST, format!("Invalid market id: {}", id));
    };

    let (_, board, provenance, _) = current_board(&state);
    let Some(market) = board.find(&id) else {
        return error_response(StatusCode::NOT_FOUND, format!("Market not found: {}", id));
    };

    let created_at = if market.created_at > 0 {
        market.created_at
    } else {
        state.created_at
    };
    let history = state.watcher.store().series(&id, created_at);

    Json(MarketDetailResponse {
        detail: MarketDetailView::new(market, &history),
        market: market.clone(),
        source: Source::from(&provenance),
    })
    .into_response()
}

/// Request an immediate refresh
async fn refresh_markets(State(state): State<AppState>) -> Response {
    match state.watcher.request_refresh().await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "refresh requested" })),
        )
            .into_response(),
        Err(e) => {
            warn!("Refresh request rejected: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::app;
    use crate::test_support::{state, MARKET_MAKER, NOW};
    use alloy_primitives::U256;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use market_chain::testing::FakeChain;
    use market_services::FallbackProvider;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_lists_live_board() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain.clone(), Some(MARKET_MAKER)).await;

        let (status, body) = get_json(app(state), "/api/markets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["kind"], "live");
        assert_eq!(body["active"].as_array().unwrap().len(), 1);
        assert_eq!(body["activeViews"][0]["yesProbability"], "50.00%");
        assert_eq!(body["generation"], 1);
    }

    #[tokio::test]
    async fn test_lists_placeholder_board_in_demo_mode() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain, None).await;

        let (status, body) = get_json(app(state), "/api/markets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["kind"], "fallback");
        assert_eq!(
            body["resolved"].as_array().unwrap().len(),
            FallbackProvider.board(NOW).resolved.len()
        );
    }

    #[tokio::test]
    async fn test_market_detail_has_history() {
        let chain = Arc::new(FakeChain::new());
        chain.set_prices(
            MARKET_MAKER,
            U256::from(650_000_000_000_000_000u128),
            U256::from(350_000_000_000_000_000u128),
        );
        let state = state(chain, Some(MARKET_MAKER)).await;

        let uri = format!("/api/markets/{}", MARKET_MAKER);
        let (status, body) = get_json(app(state), &uri).await;

        assert_eq!(status, StatusCode::OK);
        let history = body["detail"]["history"].as_array().unwrap();
        assert_eq!(history.first().unwrap()["yesPct"], "50.00");
        assert_eq!(history.last().unwrap()["yesPct"], "65.00");
    }

    #[tokio::test]
    async fn test_market_detail_errors() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain, Some(MARKET_MAKER)).await;

        let (status, _) = get_json(app(state.clone()), "/api/markets/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/markets/{}", alloy_primitives::Address::repeat_byte(0x77));
        let (status, body) = get_json(app(state), &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Market not found"));
    }

    #[tokio::test]
    async fn test_refresh_accepted() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain, Some(MARKET_MAKER)).await;

        let response = app(state)
            .oneshot(
                Request::post("/api/markets/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
