//! Inner Circle Trader detector: a liquidity sweep of the previous bar,
//! accepted only inside the killzone hours.

use std::sync::Arc;

use common::{Candle, Direction, Evaluation, SidedCheck, SignalDetails, StrategyId};

use super::last_two;
use crate::{Clock, KillzoneWindow, LocalClock, PatternDetector};

#[derive(Clone)]
pub struct IctDetector {
    clock: Arc<dyn Clock>,
    window: KillzoneWindow,
}

impl Default for IctDetector {
    fn default() -> Self {
        Self::new(Arc::new(LocalClock), KillzoneWindow::default())
    }
}

impl IctDetector {
    pub fn new(clock: Arc<dyn Clock>, window: KillzoneWindow) -> Self {
        Self { clock, window }
    }

    /// Latest low below the previous low (buy-side sweep) or latest high
    /// above the previous high (sell-side sweep).
    pub fn detect_liquidity_sweep(&self, candles: &[Candle]) -> SidedCheck {
        let Some((latest, previous)) = last_two(candles) else {
            return SidedCheck::NONE;
        };
        SidedCheck {
            buy: latest.low < previous.low,
            sell: latest.high > previous.high,
        }
    }

    pub fn detect_killzone(&self) -> bool {
        self.window.contains(self.clock.local_hour())
    }

    pub fn signal(&self, candles: &[Candle]) -> Option<Direction> {
        combine(self.detect_liquidity_sweep(candles), self.detect_killzone())
    }
}

fn combine(sweep: SidedCheck, killzone: bool) -> Option<Direction> {
    if !killzone {
        return None;
    }
    if sweep.buy {
        Some(Direction::Buy)
    } else if sweep.sell {
        Some(Direction::Sell)
    } else {
        None
    }
}

impl PatternDetector for IctDetector {
    fn id(&self) -> StrategyId {
        StrategyId::Ict
    }

    fn evaluate(&self, candles: &[Candle]) -> Evaluation {
        let liquidity_sweep = self.detect_liquidity_sweep(candles);
        // One clock read per evaluation so signal and details agree.
        let killzone = self.detect_killzone();
        Evaluation {
            strategy: StrategyId::Ict,
            signal: combine(liquidity_sweep, killzone),
            details: SignalDetails::Ict { liquidity_sweep, killzone },
        }
    }
}
