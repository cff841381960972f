//! Engine tuning knobs, read once at startup from the environment.

use std::env;
use std::time::Duration;

/// Pacing and retry configuration for the generation loop.
///
/// The defaults keep a steady ~1 write/second against the editing API and
/// back off for 20 seconds when it answers 429. All three are overridable:
/// `GENERATION_MAX_RETRIES`, `GENERATION_BACKOFF_SECS`,
/// `GENERATION_ITEM_DELAY_MS`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum retries of a single rate-limited call before the row is
    /// marked as failed.
    pub max_retries: u32,
    /// Sleep between retries of a rate-limited call.
    pub rate_limit_backoff: Duration,
    /// Sleep after every item, success or failure.
    pub inter_item_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_retries: 3,
            rate_limit_backoff: Duration::from_secs(20),
            inter_item_delay: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        EngineConfig {
            max_retries: env_parse("GENERATION_MAX_RETRIES", defaults.max_retries),
            rate_limit_backoff: Duration::from_secs(env_parse(
                "GENERATION_BACKOFF_SECS",
                defaults.rate_limit_backoff.as_secs(),
            )),
            inter_item_delay: Duration::from_millis(env_parse(
                "GENERATION_ITEM_DELAY_MS",
                defaults.inter_item_delay.as_millis() as u64,
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
