//! Capped exponential backoff for the pending-tag reconciliation loop.

use std::time::Duration;

use crate::config::TagSyncConfig;

/// Interval schedule of the reconciliation loop.
///
/// Intervals are tracked in whole milliseconds and rounded up on growth, so
/// every grown interval is at least `growth` times the previous one.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    base_ms: u64,
    max_ms: u64,
    growth: f64,
    current_ms: u64,
}

impl BackoffSchedule {
    pub fn new(base: Duration, max: Duration, growth: f64) -> Self {
        let base_ms = duration_ms(base).max(1);
        let max_ms = duration_ms(max).max(base_ms);
        Self {
            base_ms,
            max_ms,
            growth: growth.max(1.0),
            current_ms: base_ms,
        }
    }

    pub fn from_config(config: &TagSyncConfig) -> Self {
        Self::new(config.retry_base, config.retry_max, config.retry_growth)
    }

    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Advance after a tick that left `remaining` tags queued.
    ///
    /// An empty queue resets to the base interval.
    pub fn next(&mut self, remaining: usize) -> Duration {
        if remaining == 0 {
            self.current_ms = self.base_ms;
        } else {
            let grown = (self.current_ms as f64 * self.growth).ceil() as u64;
            self.current_ms = grown.min(self.max_ms);
        }
        self.current()
    }

    pub fn reset(&mut self) {
        self.current_ms = self.base_ms;
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
