use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::RejectionReason;

/// Trades allowed per session unless configured otherwise.
pub const MAX_TRADES_PER_DAY: u32 = 3;

/// User-configurable risk parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Executions allowed before every further attempt is rejected.
    pub max_trades_per_day: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_trades_per_day: MAX_TRADES_PER_DAY,
        }
    }
}

/// The gatekeeper in front of trade execution.
///
/// Owns the session's trade counter. The counter only moves forward through
/// `record_execution` and only goes back to zero through `reset_session`,
/// which belongs to whoever owns the session lifecycle.
#[derive(Debug, Clone, Default)]
pub struct RiskManager {
    config: RiskConfig,
    trades_today: u32,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            trades_today: 0,
        }
    }

    /// Approve or reject a new execution. Never changes state.
    pub fn check(&self) -> Result<(), RejectionReason> {
        if self.trades_today >= self.config.max_trades_per_day {
            let reason = RejectionReason::DailyLimitReached {
                limit: self.config.max_trades_per_day,
            };
            warn!(
                trades_today = self.trades_today,
                reason = %reason,
                "Execution rejected by RiskManager"
            );
            return Err(reason);
        }
        Ok(())
    }

    /// Count a completed execution against today's allowance.
    pub fn record_execution(&mut self) {
        self.trades_today += 1;
        info!(
            trades_today = self.trades_today,
            limit = self.config.max_trades_per_day,
            "Execution counted"
        );
    }

    pub fn reset_session(&mut self) {
        info!(previous = self.trades_today, "Daily trade counter reset");
        self.trades_today = 0;
    }

    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    pub fn remaining(&self) -> u32 {
        self.config.max_trades_per_day.saturating_sub(self.trades_today)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
