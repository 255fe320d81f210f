use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use common::{Direction, Quote};

use crate::ledger::TradeLedger;

/// Units per standard lot, used to turn price moves into account currency.
pub const CONTRACT_SIZE: f64 = 100_000.0;

/// Aggregate figures shown next to the trade list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub trades_today: u32,
    pub win_rate_pct: f64,
    pub profit_loss: f64,
}

/// Produces the statistics view. Swappable without touching the ledger.
pub trait StatisticsProvider: Send {
    fn snapshot(&mut self, ledger: &TradeLedger, trades_today: u32, quote: Quote) -> Statistics;
}

/// Simulated figures with no relation to real outcomes: a win rate drawn
/// from [50, 80) once anything has traded today, and a P&L drawn from
/// [-50, 50).
pub struct MockStatistics {
    rng: StdRng,
}

impl Default for MockStatistics {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl MockStatistics {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl StatisticsProvider for MockStatistics {
    fn snapshot(&mut self, _ledger: &TradeLedger, trades_today: u32, _quote: Quote) -> Statistics {
        let win_rate_pct = if trades_today > 0 {
            self.rng.gen_range(50..80) as f64
        } else {
            0.0
        };
        let profit_loss = (self.rng.gen::<f64>() - 0.5) * 100.0;
        Statistics {
            trades_today,
            win_rate_pct,
            profit_loss,
        }
    }
}

/// Marks open trades against the current quote. Buys exit at the bid and
/// sells at the ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkToMarketStatistics;

impl StatisticsProvider for MarkToMarketStatistics {
    fn snapshot(&mut self, ledger: &TradeLedger, trades_today: u32, quote: Quote) -> Statistics {
        let trades = ledger.open_trades();
        let pnls: Vec<f64> = trades
            .iter()
            .map(|t| {
                let move_in_favour = match t.direction {
                    Direction::Buy => quote.bid - t.entry_price,
                    Direction::Sell => t.entry_price - quote.ask,
                };
                move_in_favour * t.volume * CONTRACT_SIZE
            })
            .collect();

        let winners = pnls.iter().filter(|p| **p > 0.0).count();
        let win_rate_pct = if pnls.is_empty() {
            0.0
        } else {
            winners as f64 / pnls.len() as f64 * 100.0
        };

        Statistics {
            trades_today,
            win_rate_pct,
            profit_loss: pnls.iter().sum(),
        }
    }
}
