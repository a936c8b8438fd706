//! Restart backoff for failed cycles
//!
//! A failed cycle is restarted from scratch after a delay that starts at the
//! minimum and doubles with each consecutive failure, capped at the maximum.
//! A successful cycle resets it.

use std::time::Duration;

/// Minimum backoff delay in seconds
pub const MIN_BACKOFF_SECS: u64 = 5;
/// Maximum backoff delay in seconds
pub const MAX_BACKOFF_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failures tolerated; `None` restarts forever
    pub max_restarts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy {
            min_backoff: Duration::from_secs(MIN_BACKOFF_SECS),
            max_backoff: Duration::from_secs(MAX_BACKOFF_SECS),
            max_restarts: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestartBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
    /// Number of consecutive errors
    error_count: u32,
}

impl RestartBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        RestartBackoff {
            min,
            max,
            current: min,
            error_count: 0,
        }
    }

    pub fn from_policy(policy: &RestartPolicy) -> Self {
        Self::new(policy.min_backoff, policy.max_backoff)
    }

    /// Reset backoff after a successful cycle
    pub fn record_success(&mut self) {
        if self.error_count > 0 {
            log::debug!("[RESTART] Success after {} failure(s), backoff reset", self.error_count);
        }
        self.current = self.min;
        self.error_count = 0;
    }

    /// Record a failed cycle and get the delay before the next one
    pub fn record_error(&mut self) -> Duration {
        self.error_count += 1;
        // Exponential backoff: double the delay, capped at max
        if self.error_count > 1 {
            self.current = (self.current * 2).min(self.max);
        }

        log::warn!(
            "[RESTART] Error #{}, backoff: {}s",
            self.error_count,
            self.current.as_secs()
        );
        self.current
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.error_count
    }

    /// Current delay, if any failure is being backed off from
    pub fn current_delay(&self) -> Option<Duration> {
        (self.error_count > 0).then_some(self.current)
    }
}
