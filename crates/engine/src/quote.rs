use common::{Candle, Quote};

/// Used when there is no candle to derive a price from.
pub const FALLBACK_QUOTE: Quote = Quote {
    bid: 1.10000,
    ask: 1.10010,
};

/// Source of the current bid/ask at execution time.
pub trait QuoteProvider: Send + Sync {
    fn quote(&self, candles: &[Candle]) -> Quote;
}

/// Derives bid/ask from the latest close with a fixed half-spread, rounded
/// to the quoted number of digits.
#[derive(Debug, Clone, Copy)]
pub struct SpreadQuoteProvider {
    pub half_spread: f64,
    pub digits: u32,
}

impl Default for SpreadQuoteProvider {
    fn default() -> Self {
        Self {
            half_spread: 0.0001,
            digits: 5,
        }
    }
}

impl QuoteProvider for SpreadQuoteProvider {
    fn quote(&self, candles: &[Candle]) -> Quote {
        match candles.last() {
            Some(latest) => Quote {
                bid: round_to(latest.close - self.half_spread, self.digits),
                ask: round_to(latest.close + self.half_spread, self.digits),
            },
            None => FALLBACK_QUOTE,
        }
    }
}

fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_at(close: f64) -> Candle {
        Candle::new(chrono::Utc::now(), close, close, close, close)
    }

    #[test]
    fn quotes_one_pip_either_side_of_close() {
        let q = SpreadQuoteProvider::default().quote(&[close_at(1.1005)]);
        assert_eq!(q.ask, 1.1006);
        assert_eq!(q.bid, 1.1004);
    }

    #[test]
    fn rounds_to_five_digits() {
        let q = SpreadQuoteProvider::default().quote(&[close_at(1.123456789)]);
        assert_eq!(q.ask, 1.12356);
        assert_eq!(q.bid, 1.12336);
    }

    #[test]
    fn empty_series_uses_fallback() {
        assert_eq!(SpreadQuoteProvider::default().quote(&[]), FALLBACK_QUOTE);
    }
}
