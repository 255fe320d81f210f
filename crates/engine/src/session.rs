use serde::Serialize;
use tracing::{debug, info, warn};

use common::{
    Candle, CandleSeries, Direction, EngineEvent, Error, Evaluation, ExecutionSettings, Market,
    Quote, RejectionReason, StrategyId, Timeframe, Trade,
};
use risk::{RiskConfig, RiskManager};
use strategy::StrategyRegistry;

use crate::executor::ExecutionController;
use crate::ledger::TradeLedger;
use crate::quote::{QuoteProvider, SpreadQuoteProvider};
use crate::stats::{MockStatistics, Statistics, StatisticsProvider};

/// Session-level settings applied at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub risk: RiskConfig,
    pub execution: ExecutionSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            timeframe: Timeframe::default(),
            risk: RiskConfig::default(),
            execution: ExecutionSettings::default(),
        }
    }
}

/// An execution attempt refused during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rejection {
    pub strategy: StrategyId,
    pub direction: Direction,
    pub reason: RejectionReason,
}

/// Everything one evaluation cycle produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub evaluations: Vec<Evaluation>,
    pub opened: Vec<Trade>,
    pub rejected: Vec<Rejection>,
}

impl CycleReport {
    pub fn events(&self) -> Vec<EngineEvent> {
        let opened = self
            .opened
            .iter()
            .map(|trade| EngineEvent::TradeOpened { trade: trade.clone() });
        let rejected = self.rejected.iter().map(|r| EngineEvent::ExecutionRejected {
            strategy: r.strategy,
            direction: r.direction,
            reason: r.reason,
        });
        opened.chain(rejected).collect()
    }
}

/// Display row for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyStatus {
    pub strategy: StrategyId,
    pub armed: bool,
    pub last_signal: Option<Direction>,
    pub evaluation: Option<Evaluation>,
}

/// Point-in-time view of the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: usize,
    pub latest: Option<Candle>,
    pub quote: Quote,
    pub strategies: Vec<StrategyStatus>,
    pub open_trades: Vec<Trade>,
    pub trades_today: u32,
    pub trades_remaining: u32,
    pub statistics: Statistics,
    pub execution: ExecutionSettings,
}

/// The signal engine for one trading session.
///
/// Owns the candle series, strategy registry, execution controller (with its
/// daily counter) and trade ledger. Not thread-safe by itself: wrap it in
/// `Engine` to share it between tasks.
pub struct TradingSession {
    series: CandleSeries,
    timeframe: Timeframe,
    registry: StrategyRegistry,
    controller: ExecutionController,
    ledger: TradeLedger,
    execution: ExecutionSettings,
    stats: Box<dyn StatisticsProvider>,
}

impl TradingSession {
    pub fn new(config: SessionConfig, registry: StrategyRegistry) -> Self {
        let controller = ExecutionController::new(
            config.symbol,
            RiskManager::new(config.risk),
            Box::new(SpreadQuoteProvider::default()),
        );
        Self {
            series: CandleSeries::default(),
            timeframe: config.timeframe,
            registry,
            controller,
            ledger: TradeLedger::new(),
            execution: config.execution,
            stats: Box::new(MockStatistics::default()),
        }
    }

    /// Replace the default spread-derived quotes.
    pub fn with_quote_provider(mut self, quotes: Box<dyn QuoteProvider>) -> Self {
        self.controller.set_quote_provider(quotes);
        self
    }

    /// Replace the default simulated statistics.
    pub fn with_statistics(mut self, stats: Box<dyn StatisticsProvider>) -> Self {
        self.stats = stats;
        self
    }

    // ─── Price triggers ──────────────────────────────────────────────────────

    /// Coarse refresh: replace the whole series, then run a cycle.
    pub fn on_price_refresh(&mut self, candles: Vec<Candle>) -> CycleReport {
        self.series.replace(candles);
        self.run_cycle()
    }

    /// Fine tick: overwrite the most recent candle, then run a cycle.
    pub fn on_price_tick(&mut self, latest: Candle) -> CycleReport {
        self.series.update_latest(latest);
        self.run_cycle()
    }

    /// Evaluate every strategy for display, then execute on new signals from
    /// armed strategies in arming order. A rejected execution still consumes
    /// the signal.
    pub fn run_cycle(&mut self) -> CycleReport {
        let candles = self.series.as_slice();
        let evaluations = self.registry.evaluate_all(candles);
        let mut report = CycleReport {
            evaluations: evaluations.clone(),
            ..CycleReport::default()
        };

        // Armed strategies act in the order they were armed, which decides
        // who gets the last slot under the daily cap.
        for id in self.registry.armed() {
            let signal = evaluations
                .iter()
                .find(|e| e.strategy == id)
                .and_then(|e| e.signal);
            if !self.registry.is_new_signal(id, signal) {
                continue;
            }
            let Some(direction) = signal else {
                continue;
            };

            match self.controller.try_execute(
                id,
                direction,
                self.series.as_slice(),
                &self.execution,
                &mut self.ledger,
            ) {
                Ok(trade) => report.opened.push(trade),
                Err(Error::OrderRejected { reason }) => report.rejected.push(Rejection {
                    strategy: id,
                    direction,
                    reason,
                }),
                Err(e) => warn!(strategy = %id, error = %e, "Execution failed"),
            }
            self.registry.consume_signal(id, direction);
        }

        debug!(
            candles = self.series.len(),
            opened = report.opened.len(),
            rejected = report.rejected.len(),
            "Evaluation cycle complete"
        );
        report
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    pub fn arm_strategy(&mut self, id: StrategyId) -> bool {
        self.registry.arm(id)
    }

    pub fn disarm_strategy(&mut self, id: StrategyId) -> bool {
        self.registry.disarm(id)
    }

    /// Close an open trade. Unknown ids are a silent no-op.
    pub fn close_trade(&mut self, id: &str) -> Option<Trade> {
        self.ledger.close(id)
    }

    pub fn set_execution_settings(&mut self, settings: ExecutionSettings) {
        self.execution = settings;
    }

    /// Switch the watched chart. The old series is dropped so nothing from
    /// the previous symbol is evaluated or quoted; the next refresh fills it.
    /// Open trades, strategy state and the daily counter are kept.
    pub fn set_market(&mut self, market: Market) {
        info!(
            from_symbol = %self.symbol(),
            from_timeframe = %self.timeframe,
            symbol = %market.symbol,
            timeframe = %market.timeframe,
            "Market changed"
        );
        self.controller.set_symbol(market.symbol);
        self.timeframe = market.timeframe;
        self.series.replace(Vec::new());
    }

    /// Start a new trading day: the trade counter goes back to zero. Open
    /// trades and strategy state are kept.
    pub fn reset_session(&mut self) {
        self.controller.reset_session();
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn armed(&self) -> Vec<StrategyId> {
        self.registry.armed()
    }

    /// Latest evaluation of every strategy evaluated so far.
    pub fn evaluations(&self) -> Vec<Evaluation> {
        StrategyId::ALL
            .iter()
            .filter_map(|id| self.registry.last_evaluation(*id))
            .collect()
    }

    pub fn strategies(&self) -> Vec<StrategyStatus> {
        StrategyId::ALL
            .iter()
            .map(|id| StrategyStatus {
                strategy: *id,
                armed: self.registry.is_armed(*id),
                last_signal: self.registry.last_signal(*id),
                evaluation: self.registry.last_evaluation(*id),
            })
            .collect()
    }

    pub fn open_trades(&self) -> &[Trade] {
        self.ledger.open_trades()
    }

    pub fn trades_today(&self) -> u32 {
        self.controller.trades_today()
    }

    pub fn quote(&self) -> Quote {
        self.controller.quote(self.series.as_slice())
    }

    pub fn statistics(&mut self) -> Statistics {
        let quote = self.quote();
        self.stats
            .snapshot(&self.ledger, self.controller.trades_today(), quote)
    }

    pub fn symbol(&self) -> &str {
        self.controller.symbol()
    }

    pub fn market(&self) -> Market {
        Market {
            symbol: self.symbol().to_string(),
            timeframe: self.timeframe,
        }
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        self.execution
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        SessionSnapshot {
            symbol: self.symbol().to_string(),
            timeframe: self.timeframe,
            candles: self.series.len(),
            latest: self.series.latest().copied(),
            quote: self.quote(),
            strategies: self.strategies(),
            open_trades: self.open_trades().to_vec(),
            trades_today: self.trades_today(),
            trades_remaining: self.controller.trades_remaining(),
            statistics: self.statistics(),
            execution: self.execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use common::{SidedCheck, SignalDetails, TradeStatus, DEFAULT_VOLUME};
    use strategy::{FixedClock, KillzoneWindow};

    use crate::stats::MarkToMarketStatistics;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(chrono::Utc::now(), open, high, low, close)
    }

    fn bullish() -> Candle {
        bar(1.1000, 1.1010, 1.0990, 1.1005)
    }

    fn bearish() -> Candle {
        bar(1.1005, 1.1010, 1.0990, 1.1000)
    }

    fn session_at(hour: u32) -> TradingSession {
        let registry = StrategyRegistry::new(Arc::new(FixedClock(hour)), KillzoneWindow::default());
        TradingSession::new(SessionConfig::default(), registry)
    }

    fn session() -> TradingSession {
        session_at(12)
    }

    #[test]
    fn custom_buy_opens_one_trade_at_ask() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        let report = s.on_price_refresh(vec![bullish()]);

        assert_eq!(report.opened.len(), 1);
        let trade = &report.opened[0];
        assert_eq!(trade.direction, Direction::Buy);
        assert_eq!(trade.entry_price, 1.1006);
        assert_eq!(trade.volume, DEFAULT_VOLUME);
        assert_eq!(trade.strategy, StrategyId::Custom);
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(s.open_trades().len(), 1);
        assert_eq!(s.trades_today(), 1);
    }

    #[test]
    fn smc_two_candles_breaks_structure_without_trading() {
        let mut s = session();
        s.arm_strategy(StrategyId::Smc);
        let report = s.on_price_refresh(vec![bar(1.0, 1.0, 1.0, 1.0), bar(1.0, 1.2, 0.9, 1.15)]);

        assert!(report.opened.is_empty());
        let smc = report.evaluations[0];
        assert_eq!(smc.strategy, StrategyId::Smc);
        assert_eq!(smc.signal, None);
        match smc.details {
            SignalDetails::Smc { bos, fvg, .. } => {
                assert!(bos.buy);
                assert_eq!(fvg, SidedCheck::NONE);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn repeated_signal_executes_once() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        assert_eq!(s.on_price_refresh(vec![bullish()]).opened.len(), 1);
        assert!(s.on_price_tick(bullish()).opened.is_empty());
        assert!(s.run_cycle().opened.is_empty());
        assert_eq!(s.trades_today(), 1);
    }

    #[test]
    fn signal_flip_executes_the_new_side() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);
        let report = s.on_price_tick(bearish());
        assert_eq!(report.opened.len(), 1);
        assert_eq!(report.opened[0].direction, Direction::Sell);
        assert_eq!(report.opened[0].entry_price, 1.0999);
    }

    #[test]
    fn missing_signal_does_not_reset_dedup() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);
        // Doji: no signal, last signal stays BUY.
        s.on_price_tick(bar(1.1, 1.1010, 1.0990, 1.1));
        assert!(s.on_price_tick(bullish()).opened.is_empty());
        assert_eq!(s.trades_today(), 1);
    }

    #[test]
    fn fourth_signal_hits_daily_limit() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);
        s.on_price_tick(bearish());
        s.on_price_tick(bullish());
        assert_eq!(s.trades_today(), 3);

        let report = s.on_price_tick(bearish());
        assert!(report.opened.is_empty());
        assert_eq!(
            report.rejected,
            vec![Rejection {
                strategy: StrategyId::Custom,
                direction: Direction::Sell,
                reason: RejectionReason::DailyLimitReached { limit: 3 },
            }]
        );
        assert_eq!(s.open_trades().len(), 3);
        assert_eq!(s.trades_today(), 3);

        // The rejected signal was consumed: no retry on the next tick.
        let again = s.on_price_tick(bearish());
        assert!(again.rejected.is_empty());
    }

    #[test]
    fn rearming_fires_again_on_unchanged_signal() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);
        assert!(s.run_cycle().opened.is_empty());

        s.disarm_strategy(StrategyId::Custom);
        s.arm_strategy(StrategyId::Custom);
        let report = s.run_cycle();
        assert_eq!(report.opened.len(), 1);
        assert_eq!(report.opened[0].direction, Direction::Buy);
    }

    #[test]
    fn unarmed_strategies_are_display_only() {
        let mut s = session();
        let report = s.on_price_refresh(vec![bullish()]);
        assert!(report.opened.is_empty());
        assert_eq!(report.evaluations.len(), 3);
        assert_eq!(report.evaluations[2].signal, Some(Direction::Buy));

        // Arming later still sees the signal as new.
        s.arm_strategy(StrategyId::Custom);
        assert_eq!(s.run_cycle().opened.len(), 1);
    }

    #[test]
    fn ict_trades_inside_killzone() {
        let mut s = session_at(8);
        s.arm_strategy(StrategyId::Ict);
        let report = s.on_price_refresh(vec![
            bar(1.1000, 1.1010, 1.0990, 1.1000),
            bar(1.1000, 1.1005, 1.0980, 1.1000),
        ]);
        assert_eq!(report.opened.len(), 1);
        assert_eq!(report.opened[0].strategy, StrategyId::Ict);
        assert_eq!(report.opened[0].direction, Direction::Buy);
    }

    #[test]
    fn several_strategies_can_fire_in_one_cycle() {
        let mut s = session_at(8);
        s.arm_strategy(StrategyId::Ict);
        s.arm_strategy(StrategyId::Custom);
        let report = s.on_price_refresh(vec![
            bar(1.1000, 1.1010, 1.0990, 1.1000),
            bar(1.1000, 1.1005, 1.0980, 1.1004),
        ]);
        let strategies: Vec<StrategyId> = report.opened.iter().map(|t| t.strategy).collect();
        assert_eq!(strategies, vec![StrategyId::Ict, StrategyId::Custom]);
    }

    #[test]
    fn last_slot_goes_to_the_first_armed_strategy() {
        let registry = StrategyRegistry::new(Arc::new(FixedClock(8)), KillzoneWindow::default());
        let config = SessionConfig {
            risk: RiskConfig { max_trades_per_day: 1 },
            ..SessionConfig::default()
        };
        let mut s = TradingSession::new(config, registry);
        s.arm_strategy(StrategyId::Custom);
        s.arm_strategy(StrategyId::Ict);
        assert_eq!(s.armed(), vec![StrategyId::Custom, StrategyId::Ict]);

        let report = s.on_price_refresh(vec![
            bar(1.1000, 1.1010, 1.0990, 1.1000),
            bar(1.1000, 1.1005, 1.0980, 1.1004),
        ]);
        let opened: Vec<StrategyId> = report.opened.iter().map(|t| t.strategy).collect();
        assert_eq!(opened, vec![StrategyId::Custom]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].strategy, StrategyId::Ict);
        // Display still covers every strategy, in canonical order.
        let evaluated: Vec<StrategyId> = report.evaluations.iter().map(|e| e.strategy).collect();
        assert_eq!(evaluated, StrategyId::ALL.to_vec());
    }

    #[test]
    fn market_switch_tags_later_trades() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);

        s.set_market(Market::parse("gbpusd", "H1").unwrap());
        assert_eq!(s.symbol(), "GBPUSD");
        assert_eq!(s.quote(), crate::quote::FALLBACK_QUOTE);
        assert!(s.snapshot().latest.is_none());

        let trade = s.on_price_refresh(vec![bearish()]).opened.remove(0);
        assert_eq!(trade.symbol, "GBPUSD");
        assert_eq!(s.open_trades()[0].symbol, "EURUSD");
        let snap = s.snapshot();
        assert_eq!(snap.timeframe, Timeframe::H1);
        assert_eq!(snap.trades_today, 2);
        assert_eq!(snap.trades_remaining, 1);
        assert_eq!(s.market(), Market::parse("GBPUSD", "h1").unwrap());
    }

    struct FixedQuote(Quote);

    impl QuoteProvider for FixedQuote {
        fn quote(&self, _candles: &[Candle]) -> Quote {
            self.0
        }
    }

    #[test]
    fn custom_quote_provider_prices_entries() {
        let quote = Quote { bid: 1.2000, ask: 1.2003 };
        let mut s = session().with_quote_provider(Box::new(FixedQuote(quote)));
        s.arm_strategy(StrategyId::Custom);

        let buy = s.on_price_refresh(vec![bullish()]).opened.remove(0);
        assert_eq!(buy.entry_price, 1.2003);
        let sell = s.on_price_tick(bearish()).opened.remove(0);
        assert_eq!(sell.entry_price, 1.2000);

        assert_eq!(s.quote(), quote);
        assert_eq!(s.snapshot().quote, quote);
    }

    #[test]
    fn close_trade_and_unknown_id() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        let id = s.on_price_refresh(vec![bullish()]).opened[0].id.clone();

        assert!(s.close_trade("missing").is_none());
        assert_eq!(s.open_trades().len(), 1);

        let closed = s.close_trade(&id).unwrap();
        assert_eq!(closed.status, TradeStatus::Closed);
        assert!(s.open_trades().is_empty());
        // Closing does not give back the daily allowance.
        assert_eq!(s.trades_today(), 1);
    }

    #[test]
    fn reset_session_restores_allowance() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bullish()]);
        s.on_price_tick(bearish());
        s.on_price_tick(bullish());
        s.reset_session();
        assert_eq!(s.trades_today(), 0);
        assert_eq!(s.on_price_tick(bearish()).opened.len(), 1);
    }

    #[test]
    fn execution_settings_are_read_at_execution_time() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        s.set_execution_settings(ExecutionSettings::parse("0.5", "1.0950", ""));
        let trade = s.on_price_refresh(vec![bullish()]).opened.remove(0);
        assert_eq!(trade.volume, 0.5);
        assert_eq!(trade.stop_loss, Some(1.0950));
        assert_eq!(trade.take_profit, None);
    }

    #[test]
    fn events_follow_report() {
        let mut s = session();
        s.arm_strategy(StrategyId::Custom);
        let report = s.on_price_refresh(vec![bullish()]);
        let events = report.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::TradeOpened { .. }));
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = session().with_statistics(Box::new(MarkToMarketStatistics));
        s.arm_strategy(StrategyId::Custom);
        s.on_price_refresh(vec![bar(1.0, 1.0, 1.0, 1.0), bullish()]);
        let snap = s.snapshot();
        assert_eq!(snap.symbol, "EURUSD");
        assert_eq!(snap.candles, 2);
        assert_eq!(snap.trades_today, 1);
        assert_eq!(snap.open_trades.len(), 1);
        assert_eq!(snap.quote, Quote { bid: 1.1004, ask: 1.1006 });
        assert!(snap.strategies[2].armed);
        assert_eq!(snap.strategies[2].last_signal, Some(Direction::Buy));
        assert_eq!(snap.statistics.trades_today, 1);
        assert_eq!(s.evaluations().len(), 3);
    }

    #[test]
    fn empty_series_yields_no_signals() {
        let mut s = session_at(8);
        for id in StrategyId::ALL {
            s.arm_strategy(id);
        }
        let report = s.on_price_refresh(Vec::new());
        assert!(report.opened.is_empty());
        assert!(report.evaluations.iter().all(|e| e.signal.is_none()));
        assert_eq!(s.quote(), crate::quote::FALLBACK_QUOTE);
    }
}
