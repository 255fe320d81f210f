use chrono::Utc;
use tracing::info;

use common::{
    Candle, Direction, Error, ExecutionSettings, Quote, Result, StrategyId, Trade, TradeStatus,
};
use risk::RiskManager;

use crate::ledger::TradeLedger;
use crate::quote::QuoteProvider;

/// Turns approved strategy signals into trades.
///
/// This is the ONLY component that creates `Trade`s. Every attempt passes
/// the `RiskManager` daily cap first.
pub struct ExecutionController {
    symbol: String,
    risk: RiskManager,
    quotes: Box<dyn QuoteProvider>,
}

impl ExecutionController {
    pub fn new(symbol: impl Into<String>, risk: RiskManager, quotes: Box<dyn QuoteProvider>) -> Self {
        Self {
            symbol: symbol.into(),
            risk,
            quotes,
        }
    }

    /// Open a trade for `direction` at the current quote.
    ///
    /// The caller is responsible for only calling this for armed strategies
    /// with a new signal. On rejection nothing changes: no trade, no count.
    pub fn try_execute(
        &mut self,
        strategy: StrategyId,
        direction: Direction,
        candles: &[Candle],
        settings: &ExecutionSettings,
        ledger: &mut TradeLedger,
    ) -> Result<Trade> {
        self.risk
            .check()
            .map_err(|reason| Error::OrderRejected { reason })?;

        let quote = self.quotes.quote(candles);
        let trade = Trade {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: self.symbol.clone(),
            direction,
            volume: settings.effective_volume(),
            entry_price: quote.entry_for(direction),
            stop_loss: settings.stop_loss,
            take_profit: settings.take_profit,
            opened_at: Utc::now(),
            status: TradeStatus::Open,
            strategy,
        };

        self.risk.record_execution();
        ledger.open(trade.clone());

        info!(
            strategy = %strategy,
            side = %direction,
            volume = trade.volume,
            symbol = %trade.symbol,
            price = trade.entry_price,
            "Trade executed"
        );
        Ok(trade)
    }

    pub fn set_quote_provider(&mut self, quotes: Box<dyn QuoteProvider>) {
        self.quotes = quotes;
    }

    pub fn quote(&self, candles: &[Candle]) -> Quote {
        self.quotes.quote(candles)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Trades opened from now on carry `symbol`. Open trades keep theirs.
    pub fn set_symbol(&mut self, symbol: impl Into<String>) {
        self.symbol = symbol.into();
    }

    pub fn trades_today(&self) -> u32 {
        self.risk.trades_today()
    }

    pub fn trades_remaining(&self) -> u32 {
        self.risk.remaining()
    }

    pub fn reset_session(&mut self) {
        self.risk.reset_session();
    }
}
