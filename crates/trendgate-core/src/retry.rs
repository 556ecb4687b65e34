//! Retry policy shared by the validator's fetches and the order executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Backoff strategy applied between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// Fixed delay between attempts.
    Fixed { delay: Duration },
    /// Exponential delay: `initial * factor^(attempt - 1)` before attempt
    /// `attempt + 1`, capped at `max`.
    Exponential {
        initial: Duration,
        factor: f64,
        max: Duration,
        /// Apply +/- 50% random jitter. Off by default so the backoff
        /// sequence stays deterministic for audit and tests.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay to sleep after `completed_attempt` failed (1-based).
    ///
    /// With the default policy the sequence is 1s after attempt 1, 2s after
    /// attempt 2, 4s after attempt 3, and so on.
    pub fn delay_after_attempt(self, completed_attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                initial,
                factor,
                max,
                jitter,
            } => {
                let exponent = completed_attempt.saturating_sub(1);
                let scaled = initial.as_secs_f64() * factor.powi(exponent as i32);
                let capped = scaled.min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(capped);

                if jitter {
                    let half = (delay.as_millis() as f64 * 0.5) as u64;
                    let offset = fastrand::u64(0..=(half * 2));
                    let total = delay.as_millis() as i64 + (offset as i64 - half as i64);
                    delay = Duration::from_millis(total.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Attempts-and-backoff policy for one class of transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `completed_attempt` failed.
    pub const fn allows_retry(&self, completed_attempt: u32) -> bool {
        completed_attempt < self.max_attempts
    }

    pub fn delay_after_attempt(&self, completed_attempt: u32) -> Duration {
        self.backoff.delay_after_attempt(completed_attempt)
    }

    /// The full deterministic backoff schedule: one delay per retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .map(|attempt| self.delay_after_attempt(attempt))
            .collect()
    }
}
