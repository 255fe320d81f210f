use crate::{ExecutionSettings, Timeframe};

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Dashboard
    pub dashboard_token: String,
    pub dashboard_port: u16,

    // Market
    pub symbol: String,
    pub timeframe: Timeframe,

    // Execution
    pub execution: ExecutionSettings,
    pub max_trades_per_day: u32,

    // Feed timers
    pub refresh_interval_secs: u64,
    pub tick_interval_ms: u64,

    // Strategy config file path (armed set, killzone window)
    pub strategy_config_path: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let timeframe = match optional_env("TIMEFRAME") {
            Some(raw) => raw
                .parse()
                .unwrap_or_else(|e| panic!("ERROR: TIMEFRAME is invalid: {e}")),
            None => Timeframe::default(),
        };

        // Order-form values are lenient: garbage means "not set".
        let execution = ExecutionSettings::parse(
            &optional_env("TRADE_VOLUME").unwrap_or_default(),
            &optional_env("STOP_LOSS").unwrap_or_default(),
            &optional_env("TAKE_PROFIT").unwrap_or_default(),
        );

        Config {
            dashboard_token: required_env("DASHBOARD_TOKEN"),
            dashboard_port: optional_env("DASHBOARD_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            symbol: optional_env("SYMBOL").unwrap_or_else(|| "EURUSD".to_string()),
            timeframe,
            execution,
            max_trades_per_day: optional_env("MAX_TRADES_PER_DAY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            refresh_interval_secs: optional_env("REFRESH_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(5),
            tick_interval_ms: optional_env("TICK_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1000),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH"),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
