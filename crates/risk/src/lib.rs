pub mod manager;

pub use manager::{RiskConfig, RiskManager, MAX_TRADES_PER_DAY};
