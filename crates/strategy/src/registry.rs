use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use common::{Candle, Direction, Evaluation, StrategyId};

use crate::config::StrategyFileConfig;
use crate::detectors::{CustomDetector, IctDetector, SmcDetector};
use crate::{Clock, KillzoneWindow, LocalClock, PatternDetector};

/// Per-strategy monitoring state.
#[derive(Debug, Clone, Copy, Default)]
struct StrategyState {
    armed: bool,
    /// Most recent signal consumed by the execution path. Cleared on disarm.
    last_signal: Option<Direction>,
    /// Most recent evaluation, armed or not, for display.
    last_evaluation: Option<Evaluation>,
}

/// Holds one detector per strategy and tracks which strategies are armed.
pub struct StrategyRegistry {
    smc: SmcDetector,
    ict: IctDetector,
    custom: CustomDetector,
    states: BTreeMap<StrategyId, StrategyState>,
    /// Armed strategies, oldest arm first. Execution follows this order.
    arm_order: Vec<StrategyId>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(Arc::new(LocalClock), KillzoneWindow::default())
    }
}

impl StrategyRegistry {
    /// Build a registry with every strategy disarmed.
    pub fn new(clock: Arc<dyn Clock>, killzone: KillzoneWindow) -> Self {
        let states = StrategyId::ALL
            .iter()
            .map(|id| (*id, StrategyState::default()))
            .collect();
        Self {
            smc: SmcDetector,
            ict: IctDetector::new(clock, killzone),
            custom: CustomDetector,
            states,
            arm_order: Vec::new(),
        }
    }

    /// Build the registry from config, arming the listed strategies.
    pub fn from_config(file_cfg: &StrategyFileConfig, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::new(clock, file_cfg.killzone);
        for id in &file_cfg.armed {
            registry.arm(*id);
        }
        info!(
            armed = ?registry.armed(),
            killzone_start = file_cfg.killzone.start_hour,
            killzone_end = file_cfg.killzone.end_hour,
            "Strategy registry configured"
        );
        registry
    }

    /// Start monitoring a strategy. Returns `false` if it was already armed.
    pub fn arm(&mut self, id: StrategyId) -> bool {
        let state = self.state_mut(id);
        if state.armed {
            return false;
        }
        state.armed = true;
        self.arm_order.push(id);
        info!(strategy = %id, "Strategy armed - monitoring for signals");
        true
    }

    /// Stop monitoring a strategy and forget its last signal, so re-arming
    /// can fire again on an unchanged signal. Returns `false` if it was not
    /// armed.
    pub fn disarm(&mut self, id: StrategyId) -> bool {
        let state = self.state_mut(id);
        let was_armed = state.armed;
        state.armed = false;
        state.last_signal = None;
        if was_armed {
            self.arm_order.retain(|armed| *armed != id);
            info!(strategy = %id, "Strategy disarmed");
        }
        was_armed
    }

    pub fn is_armed(&self, id: StrategyId) -> bool {
        self.states.get(&id).is_some_and(|s| s.armed)
    }

    /// Armed strategies in the order they were armed.
    pub fn armed(&self) -> Vec<StrategyId> {
        self.arm_order.clone()
    }

    /// Run one strategy's detector and remember the result for display.
    pub fn evaluate(&mut self, id: StrategyId, candles: &[Candle]) -> Evaluation {
        let evaluation = self.detector(id).evaluate(candles);
        debug!(
            strategy = %id,
            signal = ?evaluation.signal,
            candles = candles.len(),
            "Strategy evaluated"
        );
        self.state_mut(id).last_evaluation = Some(evaluation);
        evaluation
    }

    /// Evaluate every strategy, armed or not.
    pub fn evaluate_all(&mut self, candles: &[Candle]) -> Vec<Evaluation> {
        StrategyId::ALL
            .iter()
            .map(|id| self.evaluate(*id, candles))
            .collect()
    }

    /// A signal is new when it is present and differs from the last one
    /// consumed for this strategy.
    pub fn is_new_signal(&self, id: StrategyId, signal: Option<Direction>) -> bool {
        match signal {
            Some(direction) => self.last_signal(id) != Some(direction),
            None => false,
        }
    }

    /// Record that `direction` has been acted upon for this strategy.
    pub fn consume_signal(&mut self, id: StrategyId, direction: Direction) {
        self.state_mut(id).last_signal = Some(direction);
    }

    pub fn last_signal(&self, id: StrategyId) -> Option<Direction> {
        self.states.get(&id).and_then(|s| s.last_signal)
    }

    pub fn last_evaluation(&self, id: StrategyId) -> Option<Evaluation> {
        self.states.get(&id).and_then(|s| s.last_evaluation)
    }

    fn detector(&self, id: StrategyId) -> &dyn PatternDetector {
        match id {
            StrategyId::Smc => &self.smc,
            StrategyId::Ict => &self.ict,
            StrategyId::Custom => &self.custom,
        }
    }

    fn state_mut(&mut self, id: StrategyId) -> &mut StrategyState {
        self.states.entry(id).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;

    fn bar(open: f64, close: f64) -> Candle {
        Candle::new(chrono::Utc::now(), open, open.max(close), open.min(close), close)
    }

    fn registry() -> StrategyRegistry {
        StrategyRegistry::new(Arc::new(FixedClock(12)), KillzoneWindow::default())
    }

    #[test]
    fn new_registry_has_nothing_armed() {
        let reg = registry();
        assert!(reg.armed().is_empty());
        for id in StrategyId::ALL {
            assert_eq!(reg.last_signal(id), None);
            assert_eq!(reg.last_evaluation(id), None);
        }
    }

    #[test]
    fn arm_is_idempotent() {
        let mut reg = registry();
        assert!(reg.arm(StrategyId::Smc));
        assert!(!reg.arm(StrategyId::Smc));
        assert_eq!(reg.armed(), vec![StrategyId::Smc]);
    }

    #[test]
    fn armed_lists_in_arming_order() {
        let mut reg = registry();
        reg.arm(StrategyId::Custom);
        reg.arm(StrategyId::Smc);
        reg.arm(StrategyId::Ict);
        assert_eq!(
            reg.armed(),
            vec![StrategyId::Custom, StrategyId::Smc, StrategyId::Ict]
        );
    }

    #[test]
    fn rearm_moves_strategy_to_the_back() {
        let mut reg = registry();
        reg.arm(StrategyId::Custom);
        reg.arm(StrategyId::Ict);
        reg.disarm(StrategyId::Custom);
        assert_eq!(reg.armed(), vec![StrategyId::Ict]);
        reg.arm(StrategyId::Custom);
        assert_eq!(reg.armed(), vec![StrategyId::Ict, StrategyId::Custom]);
    }

    #[test]
    fn disarm_clears_last_signal() {
        let mut reg = registry();
        reg.arm(StrategyId::Custom);
        reg.consume_signal(StrategyId::Custom, Direction::Buy);
        assert!(reg.disarm(StrategyId::Custom));
        assert!(!reg.is_armed(StrategyId::Custom));
        assert_eq!(reg.last_signal(StrategyId::Custom), None);
        assert!(!reg.disarm(StrategyId::Custom));
    }

    #[test]
    fn dedup_rules() {
        let mut reg = registry();
        let id = StrategyId::Custom;
        assert!(!reg.is_new_signal(id, None));
        assert!(reg.is_new_signal(id, Some(Direction::Buy)));
        reg.consume_signal(id, Direction::Buy);
        assert!(!reg.is_new_signal(id, Some(Direction::Buy)));
        assert!(reg.is_new_signal(id, Some(Direction::Sell)));
        assert!(!reg.is_new_signal(id, None));
    }

    #[test]
    fn evaluate_all_caches_every_strategy() {
        let mut reg = registry();
        let candles = [bar(1.0, 1.0), bar(1.0, 1.1)];
        let evals = reg.evaluate_all(&candles);
        assert_eq!(evals.len(), 3);
        assert_eq!(evals[2].signal, Some(Direction::Buy));
        assert_eq!(reg.last_evaluation(StrategyId::Custom), Some(evals[2]));
        // Evaluation alone never consumes a signal.
        assert_eq!(reg.last_signal(StrategyId::Custom), None);
    }

    #[test]
    fn from_config_arms_listed_strategies() {
        let cfg = StrategyFileConfig {
            armed: vec![StrategyId::Ict, StrategyId::Ict],
            killzone: KillzoneWindow { start_hour: 12, end_hour: 12 },
        };
        let mut reg = StrategyRegistry::from_config(&cfg, Arc::new(FixedClock(12)));
        assert_eq!(reg.armed(), vec![StrategyId::Ict]);
        let candles = [bar(1.0, 1.0), Candle::new(chrono::Utc::now(), 1.0, 1.0, 0.9, 1.0)];
        assert_eq!(reg.evaluate(StrategyId::Ict, &candles).signal, Some(Direction::Buy));
    }
}
