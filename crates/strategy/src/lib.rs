pub mod clock;
pub mod config;
pub mod detectors;
pub mod registry;

pub use clock::{Clock, FixedClock, LocalClock};
pub use config::{KillzoneWindow, StrategyFileConfig};
pub use detectors::{CustomDetector, IctDetector, SmcDetector};
pub use registry::StrategyRegistry;

use common::{Candle, Evaluation, StrategyId};

/// Every pattern detector must satisfy this trait.
pub trait PatternDetector: Send + Sync {
    /// The strategy this detector implements.
    fn id(&self) -> StrategyId;

    /// Evaluate the series (oldest first) and report the signal together
    /// with the sub-check values behind it.
    ///
    /// Must not keep state between calls. Too little history yields no
    /// signal, never an error.
    fn evaluate(&self, candles: &[Candle]) -> Evaluation;
}
