use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use common::{ExecutionSettings, Market, Quote, StrategyId, Trade};
use engine::{SessionSnapshot, Statistics, StrategyStatus};

use crate::{auth::require_auth, ApiError, AppState};

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/strategies", get(get_strategies))
        .route("/api/strategies/:id/arm", post(arm_strategy))
        .route("/api/strategies/:id/disarm", post(disarm_strategy))
        .route("/api/trades", get(get_trades))
        .route("/api/trades/:id", delete(close_trade))
        .route("/api/stats", get(get_stats))
        .route("/api/quote", get(get_quote))
        .route("/api/settings", get(get_settings).post(post_settings))
        .route("/api/session/reset", post(reset_session))
        .route("/api/market", get(get_market).post(post_market))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// ─── Session ──────────────────────────────────────────────────────────────────

async fn get_snapshot(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.engine.snapshot().await?))
}

async fn reset_session(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.engine.reset_session().await?;
    info!("Trading session reset from dashboard");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Market ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MarketForm {
    symbol: String,
    timeframe: String,
}

async fn get_market(State(state): State<AppState>) -> Json<Market> {
    Json(state.engine.market())
}

/// Switch symbol/timeframe. The feed refreshes right away.
async fn post_market(
    State(state): State<AppState>,
    Json(form): Json<MarketForm>,
) -> Result<Json<Market>, ApiError> {
    let market = Market::parse(&form.symbol, &form.timeframe)?;
    state.engine.set_market(market.clone()).await?;
    Ok(Json(market))
}

// ─── Strategies ───────────────────────────────────────────────────────────────

async fn get_strategies(
    State(state): State<AppState>,
) -> Result<Json<Vec<StrategyStatus>>, ApiError> {
    Ok(Json(state.engine.strategies().await?))
}

async fn arm_strategy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let strategy = parse_strategy(&id)?;
    let changed = state.engine.arm_strategy(strategy).await?;
    Ok(Json(json!({ "strategy": strategy, "armed": true, "changed": changed })))
}

async fn disarm_strategy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let strategy = parse_strategy(&id)?;
    let changed = state.engine.disarm_strategy(strategy).await?;
    Ok(Json(json!({ "strategy": strategy, "armed": false, "changed": changed })))
}

fn parse_strategy(raw: &str) -> Result<StrategyId, ApiError> {
    StrategyId::from_str(raw).map_err(|_| ApiError::NotFound(format!("unknown strategy '{raw}'")))
}

// ─── Trades ───────────────────────────────────────────────────────────────────

async fn get_trades(State(state): State<AppState>) -> Result<Json<Vec<Trade>>, ApiError> {
    Ok(Json(state.engine.open_trades().await?))
}

/// Closing an unknown id is a no-op and still answers 204.
async fn close_trade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.close_trade(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Market / stats ───────────────────────────────────────────────────────────

async fn get_stats(State(state): State<AppState>) -> Result<Json<Statistics>, ApiError> {
    Ok(Json(state.engine.statistics().await?))
}

async fn get_quote(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let quote: Quote = state.engine.quote().await?;
    Ok(Json(json!({
        "bid": quote.bid,
        "ask": quote.ask,
        "spread_pips": quote.spread_pips(),
    })))
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Raw order-form values; anything unparseable means "not set".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsForm {
    volume: String,
    stop_loss: String,
    take_profit: String,
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let settings = state.engine.execution_settings().await?;
    Ok(Json(settings_json(&settings)))
}

async fn post_settings(
    State(state): State<AppState>,
    Json(form): Json<SettingsForm>,
) -> Result<Json<Value>, ApiError> {
    let settings = ExecutionSettings::parse(&form.volume, &form.stop_loss, &form.take_profit);
    state.engine.set_execution_settings(settings).await?;
    Ok(Json(settings_json(&settings)))
}

fn settings_json(settings: &ExecutionSettings) -> Value {
    json!({
        "volume": settings.volume,
        "stop_loss": settings.stop_loss,
        "take_profit": settings.take_profit,
        "effective_volume": settings.effective_volume(),
    })
}
