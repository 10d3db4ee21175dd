//! Exponential backoff with jitter for the accept loop.

use std::time::Duration;

use rand::Rng;

use crate::config::AcceptConfig;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` counts consecutive failures; zero means no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    // Up to 10% extra so listeners sharing a failure don't retry in lockstep.
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Tracks consecutive accept failures.
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
}

impl AcceptBackoff {
    pub fn new(config: &AcceptConfig) -> Self {
        Self {
            base_ms: config.backoff_base_ms,
            max_ms: config.backoff_max_ms,
            failures: 0,
        }
    }

    /// Record a failed accept and return how long to wait before the next one.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        calculate_backoff(self.failures, self.base_ms, self.max_ms)
    }

    /// Record a successful accept.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
