use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use common::{Candle, Timeframe};

/// Candles produced by a full refresh.
pub const REFRESH_CANDLES: usize = 100;

/// Mock market data for the dashboard.
///
/// No real prices are ever fetched. `refresh` builds a fresh history of
/// independent candles and `tick` nudges the close of the latest one.
///
/// Refresh candles are drawn independently, so `close` can land outside
/// `[low, high]`. Detectors must tolerate that.
pub struct SyntheticFeed {
    timeframe: Timeframe,
    rng: StdRng,
}

impl SyntheticFeed {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic feed for tests and replays.
    pub fn seeded(timeframe: Timeframe, seed: u64) -> Self {
        Self {
            timeframe,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Candle spacing for later refreshes.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
    }

    /// A full history ending at `now`, oldest first.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Vec<Candle> {
        let step = Duration::minutes(self.timeframe.minutes());
        let candles: Vec<Candle> = (0..REFRESH_CANDLES)
            .map(|i| {
                let back = (REFRESH_CANDLES - 1 - i) as i32;
                let time = now - step * back;
                let base = 1.10 + self.rng.gen::<f64>() * 0.1;
                let high = base + self.rng.gen::<f64>() * 0.005;
                let low = base - self.rng.gen::<f64>() * 0.005;
                let close = base + (self.rng.gen::<f64>() - 0.5) * 0.01;
                Candle::new(time, base, high, low, close)
            })
            .collect();

        debug!(
            timeframe = %self.timeframe,
            candles = candles.len(),
            "Synthetic history generated"
        );
        candles
    }

    /// Move the close of `latest` by a small random step, widening the
    /// range when the new close falls outside it.
    pub fn tick(&mut self, latest: &Candle) -> Candle {
        let close = latest.close + (self.rng.gen::<f64>() - 0.5) * 0.0005;
        Candle {
            close,
            high: latest.high.max(close),
            low: latest.low.min(close),
            ..*latest
        }
    }
}
