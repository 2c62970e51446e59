use std::time::Duration;

use rand::Rng;

/// Exponential retry delay with proportional jitter.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent;
        self
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        let capped = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_ms);
        let jitter = if self.jitter_percent > 0 && capped > 0 {
            let span = capped.saturating_mul(self.jitter_percent) / 100;
            rand::thread_rng().gen_range(0..=span)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}
