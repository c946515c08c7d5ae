//! Error types for condition polling.

use std::time::Duration;

use thiserror::Error;

/// The awaited condition never held within the attempt budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Failed to verify '{target}' - is not in state '{condition}' after {attempts} attempts \
     (waited {}ms)",
    waited.as_millis()
)]
pub struct ConditionTimeout {
    /// Resource name or label expression that was awaited.
    pub target: String,
    /// Condition the target was expected to reach.
    pub condition: String,
    /// Number of observations performed.
    pub attempts: u32,
    /// Total time spent waiting between attempts.
    pub waited: Duration,
}

/// Errors returned by a poll.
#[derive(Debug, Error)]
pub enum PollError<E> {
    /// Predicate never satisfied within the attempt budget
    #[error(transparent)]
    Timeout(#[from] ConditionTimeout),

    /// The observation itself failed; never retried
    #[error(transparent)]
    Observation(E),

    /// A wait was interrupted and the poll was configured to abort
    #[error("Interrupted while waiting for '{target}' (attempt {attempt})")]
    Interrupted { target: String, attempt: u32 },
}

impl<E> PollError<E> {
    /// Whether this is the recoverable "condition never met" failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Invalid poll policy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
}

/// Malformed `key=value` label expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Label expression '{0}' has an empty key")]
    EmptyKey(String),
}
