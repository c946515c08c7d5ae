//! Attempt budget and inter-attempt delay.

use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::PolicyError;

/// How many times to observe and how long to wait between failed attempts.
///
/// A policy is built once per verification and consumed by a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: NonZeroU32,
    delay_between_attempts: Duration,
}

impl PollPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] when `max_attempts` is 0.
    pub fn new(max_attempts: u32, delay_between_attempts: Duration) -> Result<Self, PolicyError> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or(PolicyError::ZeroAttempts)?;
        Ok(Self {
            max_attempts,
            delay_between_attempts,
        })
    }

    /// Create a policy with the delay given in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] when `max_attempts` is 0.
    pub fn from_millis(max_attempts: u32, delay_ms: u64) -> Result<Self, PolicyError> {
        Self::new(max_attempts, Duration::from_millis(delay_ms))
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    #[must_use]
    pub fn delay_between_attempts(&self) -> Duration {
        self.delay_between_attempts
    }

    /// Return a copy with a different attempt budget.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] when `max_attempts` is 0.
    pub fn with_max_attempts(self, max_attempts: u32) -> Result<Self, PolicyError> {
        Self::new(max_attempts, self.delay_between_attempts)
    }

    /// Return a copy with a different delay.
    #[must_use]
    pub fn with_delay(self, delay_between_attempts: Duration) -> Self {
        Self {
            delay_between_attempts,
            ..self
        }
    }

    /// Upper bound of time spent sleeping: the final failed attempt never sleeps.
    #[must_use]
    pub fn total_wait(&self) -> Duration {
        self.delay_between_attempts
            .checked_mul(self.max_attempts.get() - 1)
            .unwrap_or(Duration::MAX)
    }
}

/// What an interrupted wait does to the rest of the poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptPolicy {
    /// Cut the current wait short, log it and continue with the next attempt.
    #[default]
    SkipWait,
    /// Stop polling and return [`crate::PollError::Interrupted`].
    Abort,
}
