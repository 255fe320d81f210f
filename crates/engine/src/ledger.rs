use tracing::info;

use common::{Trade, TradeStatus};

/// Open trades, in the order they were opened.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Remove a trade and return it marked closed. Unknown ids are ignored.
    pub fn close(&mut self, id: &str) -> Option<Trade> {
        let idx = self.trades.iter().position(|t| t.id == id)?;
        let mut trade = self.trades.remove(idx);
        trade.status = TradeStatus::Closed;
        info!(id = %trade.id, symbol = %trade.symbol, strategy = %trade.strategy, "Trade closed");
        Some(trade)
    }

    pub fn get(&self, id: &str) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn open_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
