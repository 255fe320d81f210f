//! Smart Money Concepts detector.
//!
//! Fires only when a break of structure and a fair value gap agree on the
//! same side. The order block check is reported for display and never
//! gates the signal.

use common::{Candle, Direction, Evaluation, SidedCheck, SignalDetails, StrategyId};

use super::last_two;
use crate::PatternDetector;

#[derive(Debug, Clone, Copy, Default)]
pub struct SmcDetector;

impl SmcDetector {
    /// Latest close beyond the previous candle's high (buy) or low (sell).
    pub fn detect_bos(&self, candles: &[Candle]) -> SidedCheck {
        let Some((latest, previous)) = last_two(candles) else {
            return SidedCheck::NONE;
        };
        SidedCheck {
            buy: latest.close > previous.high,
            sell: latest.close < previous.low,
        }
    }

    /// Gap between the candle two bars back and the latest candle.
    pub fn detect_fvg(&self, candles: &[Candle]) -> SidedCheck {
        if candles.len() < 3 {
            return SidedCheck::NONE;
        }
        let latest = &candles[candles.len() - 1];
        let third = &candles[candles.len() - 3];
        SidedCheck {
            buy: third.high < latest.low,
            sell: third.low > latest.high,
        }
    }

    /// Candle colour of a single bar.
    pub fn detect_order_block(&self, candle: Option<&Candle>) -> SidedCheck {
        match candle {
            Some(c) => SidedCheck {
                buy: c.close > c.open,
                sell: c.close < c.open,
            },
            None => SidedCheck::NONE,
        }
    }

    pub fn signal(&self, candles: &[Candle]) -> Option<Direction> {
        combine(self.detect_bos(candles), self.detect_fvg(candles))
    }
}

fn combine(bos: SidedCheck, fvg: SidedCheck) -> Option<Direction> {
    if bos.buy && fvg.buy {
        Some(Direction::Buy)
    } else if bos.sell && fvg.sell {
        Some(Direction::Sell)
    } else {
        None
    }
}

impl PatternDetector for SmcDetector {
    fn id(&self) -> StrategyId {
        StrategyId::Smc
    }

    fn evaluate(&self, candles: &[Candle]) -> Evaluation {
        let bos = self.detect_bos(candles);
        let fvg = self.detect_fvg(candles);
        let order_block = self.detect_order_block(candles.last());
        Evaluation {
            strategy: StrategyId::Smc,
            signal: combine(bos, fvg),
            details: SignalDetails::Smc { bos, fvg, order_block },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::bar;

    #[test]
    fn bos_needs_two_candles() {
        let smc = SmcDetector;
        assert_eq!(smc.detect_bos(&[]), SidedCheck::NONE);
        assert_eq!(smc.detect_bos(&[bar(1.0, 2.0, 0.5, 1.8)]), SidedCheck::NONE);
    }

    #[test]
    fn two_candle_series_breaks_structure_but_has_no_gap() {
        let smc = SmcDetector;
        let candles = [bar(1.0, 1.0, 1.0, 1.0), bar(1.0, 1.2, 0.9, 1.15)];
        assert!(smc.detect_bos(&candles).buy);
        assert_eq!(smc.detect_fvg(&candles), SidedCheck::NONE);
        assert_eq!(smc.signal(&candles), None);
    }

    #[test]
    fn bullish_bos_and_gap_give_buy() {
        let smc = SmcDetector;
        let candles = [
            bar(1.00, 1.01, 0.99, 1.005),
            bar(1.005, 1.02, 1.00, 1.015),
            bar(1.035, 1.05, 1.03, 1.04),
        ];
        let eval = smc.evaluate(&candles);
        assert_eq!(eval.signal, Some(Direction::Buy));
        match eval.details {
            SignalDetails::Smc { bos, fvg, order_block } => {
                assert!(bos.buy && fvg.buy);
                assert!(order_block.buy);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn bearish_bos_and_gap_give_sell() {
        let smc = SmcDetector;
        let candles = [
            bar(1.05, 1.06, 1.04, 1.045),
            bar(1.045, 1.05, 1.03, 1.035),
            bar(1.02, 1.03, 1.00, 1.01),
        ];
        assert_eq!(smc.signal(&candles), Some(Direction::Sell));
    }

    #[test]
    fn order_block_does_not_gate_signal() {
        let smc = SmcDetector;
        // Bearish latest bar, still a bullish break + gap.
        let candles = [
            bar(1.00, 1.01, 0.99, 1.005),
            bar(1.005, 1.02, 1.00, 1.015),
            bar(1.045, 1.05, 1.03, 1.04),
        ];
        let eval = smc.evaluate(&candles);
        assert_eq!(eval.signal, Some(Direction::Buy));
        let SignalDetails::Smc { order_block, .. } = eval.details else {
            panic!("expected SMC details");
        };
        assert!(order_block.sell);
    }

    #[test]
    fn bos_without_gap_is_silent() {
        let smc = SmcDetector;
        let candles = [
            bar(1.00, 1.03, 0.99, 1.005),
            bar(1.005, 1.02, 1.00, 1.015),
            bar(1.02, 1.05, 1.02, 1.04),
        ];
        assert!(smc.detect_bos(&candles).buy);
        assert!(!smc.detect_fvg(&candles).buy);
        assert_eq!(smc.signal(&candles), None);
    }
}
