use std::time::Duration;

use crate::errors::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `failure_count` is the number of failures before this one.
    pub fn should_retry(&self, failure_count: u32, err: &CatalogError) -> bool {
        err.kind().is_retryable() && failure_count < self.max_retries
    }

    /// Backoff before retry number `attempt_index + 1`: base doubled per attempt, capped.
    pub fn delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt_index);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
