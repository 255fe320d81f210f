use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC price bar.
///
/// `high >= max(open, close)` and `low <= min(open, close)` are expected but
/// not enforced: the synthetic refresh path can produce bars where the close
/// sits outside the high/low range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { time, open, high, low, close }
    }
}

/// Ordered buffer of candles, oldest first.
///
/// Append-only from the outside, except that the most recent candle may be
/// replaced in place by tick updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Replace the whole series (coarse refresh).
    pub fn replace(&mut self, candles: Vec<Candle>) {
        self.candles = candles;
    }

    /// Overwrite the most recent candle (fine tick). An empty series gets
    /// the candle appended instead.
    pub fn update_latest(&mut self, candle: Candle) {
        match self.candles.last_mut() {
            Some(latest) => *latest = candle,
            None => self.candles.push(candle),
        }
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Side of a trade or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// The fixed set of pattern strategies the desk can monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyId {
    Smc,
    Ict,
    Custom,
}

impl StrategyId {
    pub const ALL: [StrategyId; 3] = [StrategyId::Smc, StrategyId::Ict, StrategyId::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Smc => "SMC",
            StrategyId::Ict => "ICT",
            StrategyId::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMC" => Ok(StrategyId::Smc),
            "ICT" => Ok(StrategyId::Ict),
            "CUSTOM" => Ok(StrategyId::Custom),
            other => Err(crate::Error::Config(format!("unknown strategy '{other}'"))),
        }
    }
}

/// Whether a directional sub-check fired on the buy side, the sell side, or
/// neither. Both may be true at once (e.g. an outside bar sweeping both
/// extremes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidedCheck {
    pub buy: bool,
    pub sell: bool,
}

impl SidedCheck {
    pub const NONE: SidedCheck = SidedCheck { buy: false, sell: false };

    pub fn present(&self) -> bool {
        self.buy || self.sell
    }
}

/// Sub-check values behind a strategy's signal, kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalDetails {
    Smc {
        bos: SidedCheck,
        fvg: SidedCheck,
        /// Display only; never gates the signal.
        order_block: SidedCheck,
    },
    Ict {
        liquidity_sweep: SidedCheck,
        killzone: bool,
    },
    Custom {
        signal: Option<Direction>,
    },
}

/// Result of running one strategy's detector against the current series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub strategy: StrategyId,
    pub signal: Option<Direction>,
    pub details: SignalDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A simulated position opened by the execution controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub volume: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
    pub status: TradeStatus,
    pub strategy: StrategyId,
}

/// Current two-sided price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    /// Entry price for a new position: buys lift the ask, sells hit the bid.
    pub fn entry_for(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Buy => self.ask,
            Direction::Sell => self.bid,
        }
    }

    pub fn spread_pips(&self) -> f64 {
        (self.ask - self.bid) * 10_000.0
    }
}

/// Lot size used when no usable volume is configured.
pub const DEFAULT_VOLUME: f64 = 0.1;

/// Order-form snapshot read by the execution controller at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionSettings {
    pub volume: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl ExecutionSettings {
    /// Build settings from raw form values. Blank or non-numeric input is
    /// treated as "not set"; this never fails.
    pub fn parse(volume: &str, stop_loss: &str, take_profit: &str) -> Self {
        Self {
            volume: parse_lenient(volume),
            stop_loss: parse_lenient(stop_loss),
            take_profit: parse_lenient(take_profit),
        }
    }

    /// Configured volume if it is a finite positive number, else 0.1 lots.
    pub fn effective_volume(&self) -> f64 {
        self.volume
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_VOLUME)
    }
}

/// Reads the longest numeric prefix, so "0.5 lots" gives 0.5.
fn parse_lenient(raw: &str) -> Option<f64> {
    let raw = raw.trim_start();
    raw.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .find_map(|end| raw[..end].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Candle period of the monitored chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    #[default]
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeframe {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M1" => Ok(Timeframe::M1),
            "M5" => Ok(Timeframe::M5),
            "M15" => Ok(Timeframe::M15),
            "M30" => Ok(Timeframe::M30),
            "H1" => Ok(Timeframe::H1),
            "H4" => Ok(Timeframe::H4),
            "D1" => Ok(Timeframe::D1),
            other => Err(crate::Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

/// The chart being watched: which symbol, at which candle period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl Market {
    /// Validate raw selector values. The symbol is upper-cased.
    pub fn parse(symbol: &str, timeframe: &str) -> crate::Result<Self> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(crate::Error::Config("symbol must not be empty".into()));
        }
        Ok(Self {
            symbol,
            timeframe: timeframe.parse()?,
        })
    }
}

/// Reason an execution attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    DailyLimitReached { limit: u32 },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::DailyLimitReached { limit } => {
                write!(f, "maximum trades per day reached ({limit})")
            }
        }
    }
}

/// Notifications for UI collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    StrategyArmed {
        strategy: StrategyId,
    },
    StrategyDisarmed {
        strategy: StrategyId,
    },
    TradeOpened {
        trade: Trade,
    },
    ExecutionRejected {
        strategy: StrategyId,
        direction: Direction,
        reason: RejectionReason,
    },
    TradeClosed {
        id: String,
    },
    SessionReset,
    MarketChanged {
        market: Market,
    },
}
