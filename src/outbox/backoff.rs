//! Exponential backoff for the outbox processor.
//!
//! ```text
//! consecutive failures   delay (base=100ms, max=5s)
//!          1                  100ms
//!          2                  200ms
//!          3                  400ms
//!         ...                 capped at 5s
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_DELAY_MS: u64 = 100;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_base_delay() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl BackoffConfig {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_delay_ms: base.as_millis() as u64,
            max_delay_ms: max.as_millis() as u64,
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (failures - 1).min(32);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}
