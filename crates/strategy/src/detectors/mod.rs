//! Pattern detectors, one per strategy.
//!
//! Each detector looks back at most three candles, so it is cheap enough to
//! re-run on every tick. Signal timing (deduplication) is handled by the
//! registry, not here.

pub mod custom;
pub mod ict;
pub mod smc;

pub use custom::CustomDetector;
pub use ict::IctDetector;
pub use smc::SmcDetector;

use common::Candle;

/// Latest and previous candle, if at least two exist.
fn last_two(candles: &[Candle]) -> Option<(&Candle, &Candle)> {
    match candles {
        [.., previous, latest] => Some((latest, previous)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle::new(chrono::Utc::now(), open, high, low, close)
}
