//! API route definitions

mod admin;
mod health;
mod markets;
mod portfolio;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use market_services::Provenance;
use serde::Serialize;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(markets::routes())
        .merge(portfolio::routes())
        .merge(admin::routes())
        .merge(health::routes())
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Where a response's data came from
#[derive(Debug, Serialize)]
pub struct Source {
    /// "live" or "fallback"
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&Provenance> for Source {
    fn from(provenance: &Provenance) -> Self {
        Self {
            kind: provenance.label(),
            reason: provenance.reason().map(|r| r.to_string()),
        }
    }
}
