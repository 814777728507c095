//! Portfolio routes

use alloy_primitives::Address;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use market_core::Portfolio;
use market_services::{PositionView, TokenBalance};
use serde::Serialize;
use tracing::warn;

use super::{error_response, Source};
use crate::AppState;

/// Create portfolio routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/portfolio/{address}", get(get_portfolio))
}

/// Portfolio response
#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub portfolio: Portfolio,
    pub positions: Vec<PositionView>,
    /// Collateral balance of the account; absent without a live market
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral: Option<TokenBalance>,
    pub source: Source,
}

/// Get positions of an account
async fn get_portfolio(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let Ok(account) = address.parse::<Address>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid address: {}", address),
        );
    };

    let snapshot = state.watcher.current();
    let read = state
        .portfolio
        .portfolio(&state.ctx, Some(account), snapshot.as_deref())
        .await;

    let live_market = snapshot.as_deref().and_then(|s| {
        s.board
            .markets()
            .find(|m| s.is_live_market(&m.id))
            .cloned()
    });

    let collateral = match live_market {
        Some(market) => match state
            .portfolio
            .collateral_balance(&state.ctx, market.collateral_token_address, account)
            .await
        {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Failed to read collateral balance of {}: {}", account, e);
                None
            }
        },
        None => None,
    };

    let positions = read
        .portfolio
        .holdings
        .iter()
        .map(|h| PositionView::new(&h.market, &h.position))
        .collect();

    Json(PortfolioResponse {
        positions,
        portfolio: read.portfolio,
        collateral,
        source: Source::from(&read.provenance),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use crate::app;
    use crate::test_support::{state, COLLATERAL, MARKET_MAKER};
    use alloy_primitives::{Address, U256};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use market_chain::testing::{FakeChain, ONE};
    use market_core::Outcome;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const ACCOUNT: Address = Address::repeat_byte(0x42);

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
    async fn test_live_portfolio_with_collateral() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain.clone(), Some(MARKET_MAKER)).await;
        chain.credit_position(MARKET_MAKER, ACCOUNT, Outcome::Yes, U256::from(25 * ONE));
        chain.set_token_balance(COLLATERAL, ACCOUNT, U256::from(7 * ONE));

        let uri = format!("/api/portfolio/{}", ACCOUNT);
        let (status, body) = get_json(app(state), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["kind"], "live");
        assert_eq!(body["positions"].as_array().unwrap().len(), 1);
        assert_eq!(body["positions"][0]["amount"], "25.00");
        assert_eq!(body["collateral"]["formatted"], "7.00");
        assert_eq!(body["collateral"]["symbol"], "COL");
    }

    #[tokio::test]
    async fn test_demo_portfolio_is_placeholder() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain, None).await;

        let uri = format!("/api/portfolio/{}", ACCOUNT);
        let (status, body) = get_json(app(state), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"]["kind"], "fallback");
        assert_eq!(body["positions"].as_array().unwrap().len(), 3);
        assert!(body.get("collateral").is_none());
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let chain = Arc::new(FakeChain::new());
        let state = state(chain, None).await;

        let (status, _) = get_json(app(state), "/api/portfolio/0x12").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
