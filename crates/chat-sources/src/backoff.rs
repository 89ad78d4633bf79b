//! Capped exponential reconnect delay shared by every adapter.

use std::time::Duration;

pub const BASE_BACKOFF: Duration = Duration::from_secs(2);
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Counts consecutive failures and yields the delay before the next attempt.
#[derive(Debug, Clone)]
pub struct Backoff {
    failures: u32,
    base: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BASE_BACKOFF, MAX_BACKOFF)
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            failures: 0,
            base,
            max: max.max(base),
        }
    }

    /// Record a failure and return how long to wait before reconnecting.
    pub fn fail(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay()
    }

    /// Forget past failures once a session is healthy again.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn delay(&self) -> Duration {
        let exp = self.failures.saturating_sub(1).min(16);
        self.base.saturating_mul(2u32.saturating_pow(exp)).min(self.max)
    }
}
