use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Candle, Config, Market, Result};
use engine::CycleReport;
use engine::{Engine, EngineHandle, SessionConfig, TradingSession};
use paper::SyntheticFeed;
use risk::RiskConfig;
use strategy::{LocalClock, StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(
        symbol = %cfg.symbol,
        timeframe = %cfg.timeframe,
        max_trades_per_day = cfg.max_trades_per_day,
        "SignalDesk starting"
    );

    let strategy_file = match &cfg.strategy_config_path {
        Some(path) => StrategyFileConfig::load(path),
        None => StrategyFileConfig::default(),
    };

    // ── Engine ────────────────────────────────────────────────────────────────
    let registry = StrategyRegistry::from_config(&strategy_file, Arc::new(LocalClock));
    let session = TradingSession::new(
        SessionConfig {
            symbol: cfg.symbol.clone(),
            timeframe: cfg.timeframe,
            risk: RiskConfig {
                max_trades_per_day: cfg.max_trades_per_day,
            },
            execution: cfg.execution,
        },
        registry,
    );
    let (engine, engine_handle) = Engine::new(session);

    // ── Dashboard API ─────────────────────────────────────────────────────────
    let api_state = api::AppState {
        engine: engine_handle.clone(),
        dashboard_token: cfg.dashboard_token.clone(),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.dashboard_port;
    tokio::spawn(engine.run());
    tokio::spawn(run_feed(
        engine_handle.market_updates(),
        engine_handle,
        SyntheticFeed::new(cfg.timeframe),
        Duration::from_secs(cfg.refresh_interval_secs.max(1)),
        Duration::from_millis(cfg.tick_interval_ms.max(10)),
    ));
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "Dashboard API stopped");
        }
    });

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}

/// Drives the engine with mock prices: a full history on every refresh and
/// an intra-bar nudge of the latest candle on every tick. Both feed the same
/// evaluation cycle. A market switch refreshes at once at the new timeframe.
async fn run_feed(
    mut market: watch::Receiver<Market>,
    engine: EngineHandle,
    mut feed: SyntheticFeed,
    refresh_every: Duration,
    tick_every: Duration,
) {
    let mut refresh = interval(refresh_every);
    let mut tick = interval(tick_every);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut latest: Option<Candle> = None;

    loop {
        let result = tokio::select! {
            _ = refresh.tick() => {
                refresh_now(&engine, &mut feed, &mut latest).await
            }
            changed = market.changed() => {
                if changed.is_err() {
                    warn!("Market channel closed - price feed stopping");
                    break;
                }
                let timeframe = market.borrow_and_update().timeframe;
                if timeframe != feed.timeframe() {
                    info!(from = %feed.timeframe(), to = %timeframe, "Feed timeframe switched");
                    feed.set_timeframe(timeframe);
                }
                refresh.reset();
                refresh_now(&engine, &mut feed, &mut latest).await
            }
            _ = tick.tick() => {
                let Some(current) = latest else { continue };
                let next = feed.tick(&current);
                latest = Some(next);
                engine.price_tick(next).await
            }
        };

        match result {
            Ok(report) => {
                if !report.opened.is_empty() || !report.rejected.is_empty() {
                    debug!(
                        opened = report.opened.len(),
                        rejected = report.rejected.len(),
                        "Cycle produced executions"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Price feed stopping");
                break;
            }
        }
    }
}

async fn refresh_now(
    engine: &EngineHandle,
    feed: &mut SyntheticFeed,
    latest: &mut Option<Candle>,
) -> Result<CycleReport> {
    let candles = feed.refresh(Utc::now());
    *latest = candles.last().copied();
    engine.price_refresh(candles).await
}
