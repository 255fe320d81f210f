//! Candle-colour momentum check on the latest bar.

use common::{Candle, Direction, Evaluation, SignalDetails, StrategyId};

use crate::PatternDetector;

#[derive(Debug, Clone, Copy, Default)]
pub struct CustomDetector;

impl CustomDetector {
    pub fn signal(&self, candles: &[Candle]) -> Option<Direction> {
        let latest = candles.last()?;
        if latest.close > latest.open {
            Some(Direction::Buy)
        } else if latest.close < latest.open {
            Some(Direction::Sell)
        } else {
            None
        }
    }
}

impl PatternDetector for CustomDetector {
    fn id(&self) -> StrategyId {
        StrategyId::Custom
    }

    fn evaluate(&self, candles: &[Candle]) -> Evaluation {
        let signal = self.signal(candles);
        Evaluation {
            strategy: StrategyId::Custom,
            signal,
            details: SignalDetails::Custom { signal },
        }
    }
}
