pub mod executor;
pub mod ledger;
pub mod lifecycle;
pub mod quote;
pub mod session;
pub mod stats;

pub use executor::ExecutionController;
pub use ledger::TradeLedger;
pub use lifecycle::{Engine, EngineHandle};
pub use quote::{QuoteProvider, SpreadQuoteProvider, FALLBACK_QUOTE};
pub use session::{
    CycleReport, Rejection, SessionConfig, SessionSnapshot, StrategyStatus, TradingSession,
};
pub use stats::{MarkToMarketStatistics, MockStatistics, Statistics, StatisticsProvider};
