use serde::{Deserialize, Serialize};

use common::{Error, Result, StrategyId};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// armed = ["SMC", "CUSTOM"]
///
/// [killzone]
/// start_hour = 7
/// end_hour = 10
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    /// Strategies armed for auto-execution at startup.
    #[serde(default)]
    pub armed: Vec<StrategyId>,
    #[serde(default)]
    pub killzone: KillzoneWindow,
}

/// Inclusive local-time hour range during which the ICT strategy may fire.
/// A window whose start is after its end wraps past midnight (22 to 2 covers
/// 22, 23, 0, 1 and 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct KillzoneWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for KillzoneWindow {
    fn default() -> Self {
        Self { start_hour: 7, end_hour: 10 }
    }
}

impl KillzoneWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..=self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }

    /// Both bounds must be hours of the day.
    pub fn validate(&self) -> Result<()> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(Error::Config(format!(
                "killzone hours must be within 0-23 (got {}-{})",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path).unwrap_or_else(|e| {
            panic!("Failed to read strategy config at '{path}': {e}")
        });
        Self::parse(&content).unwrap_or_else(|e| {
            panic!("Failed to parse strategy config at '{path}': {e}")
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.killzone.validate()?;
        Ok(cfg)
    }
}
