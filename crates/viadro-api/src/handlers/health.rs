//! Liveness endpoint.

use crate::handlers::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

/// `GET /v1/healthcheck`
pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.config.environment,
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": state.started_at.elapsed().as_secs(),
        },
        "cache": state.cache.stats(),
    }))
}
