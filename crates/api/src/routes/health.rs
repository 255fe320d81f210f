use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{ApiError, AppState};

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Health check endpoint, no auth required. Fails with 503 once the engine
/// task has stopped.
async fn healthz(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let snapshot = state.engine.snapshot().await?;
    Ok(Json(json!({
        "status": "ok",
        "symbol": snapshot.symbol,
        "trades_today": snapshot.trades_today,
    })))
}
