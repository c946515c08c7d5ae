//! The attempt/wait/timeout loop shared by every verification.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::error::{ConditionTimeout, PollError};
use crate::policy::{InterruptPolicy, PollPolicy};
use crate::sleeper::{Interrupter, Sleeper, Wake};

/// Result of a poll that does not turn exhaustion into an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// Predicate satisfied; carries the satisfying observation.
    Success(T),
    /// No attempt satisfied the predicate.
    Exhausted,
}

impl<T> PollOutcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert into the satisfying value, or `None` when exhausted.
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Exhausted => None,
        }
    }
}

/// Polls an observation until a predicate holds or the attempt budget runs out.
///
/// * `observe` returns `Ok(Some(value))` when something was observed,
///   `Ok(None)` when nothing is observable yet, and `Err` when the observation
///   itself failed. Errors abort the poll immediately.
/// * `is_satisfied` is only called for `Some` observations.
/// * Between failed attempts the poller waits for the policy delay. The last
///   failed attempt does not wait.
///
/// Attempts run strictly one after another on the caller.
#[derive(Debug, Clone)]
pub struct ConditionPoller<S = Interrupter> {
    policy: PollPolicy,
    on_interrupt: InterruptPolicy,
    sleeper: S,
}

impl ConditionPoller<Interrupter> {
    /// Create a poller that waits with an interruptible [`Interrupter`].
    #[must_use]
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            on_interrupt: InterruptPolicy::default(),
            sleeper: Interrupter::new(),
        }
    }

    /// Handle for interrupting this poller's waits from elsewhere.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        self.sleeper.clone()
    }

    /// Share an existing interrupt handle.
    #[must_use]
    pub fn with_interrupter(self, interrupter: Interrupter) -> Self {
        self.with_sleeper(interrupter)
    }

    /// Async variant of [`ConditionPoller::poll_outcome`]; waits on the tokio timer.
    ///
    /// # Errors
    ///
    /// See [`ConditionPoller::poll_outcome`].
    pub async fn poll_outcome_async<T, E, O, Fut, P, D>(
        &self,
        mut observe: O,
        mut is_satisfied: P,
        describe: D,
        condition: &str,
    ) -> Result<PollOutcome<T>, PollError<E>>
    where
        O: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        P: FnMut(&T) -> bool,
        D: FnOnce() -> String,
    {
        let target = describe();
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            self.log_attempt(attempt, &target, condition);

            if let Some(value) = observe().await.map_err(PollError::Observation)? {
                if is_satisfied(&value) {
                    self.log_success(attempt, &target, condition);
                    return Ok(PollOutcome::Success(value));
                }
            }

            if attempt < max_attempts {
                self.log_retry(attempt, &target, condition);
                let wake = self
                    .sleeper
                    .sleep_async(self.policy.delay_between_attempts())
                    .await;
                self.after_wait(wake, attempt, &target)?;
            }
        }

        Ok(PollOutcome::Exhausted)
    }

    /// Async variant of [`ConditionPoller::poll`].
    ///
    /// # Errors
    ///
    /// See [`ConditionPoller::poll`].
    pub async fn poll_async<T, E, O, Fut, P, D>(
        &self,
        observe: O,
        is_satisfied: P,
        describe: D,
        condition: &str,
    ) -> Result<T, PollError<E>>
    where
        O: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        P: FnMut(&T) -> bool,
        D: FnOnce() -> String,
    {
        let target = describe();
        let outcome = self
            .poll_outcome_async(observe, is_satisfied, || target.clone(), condition)
            .await?;
        self.finish(outcome, target, condition)
    }
}

impl<S: Sleeper> ConditionPoller<S> {
    /// Replace the blocking wait implementation.
    #[must_use]
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> ConditionPoller<T> {
        ConditionPoller {
            policy: self.policy,
            on_interrupt: self.on_interrupt,
            sleeper,
        }
    }

    /// Choose what an interrupted wait does to the rest of the poll.
    #[must_use]
    pub fn on_interrupt(mut self, on_interrupt: InterruptPolicy) -> Self {
        self.on_interrupt = on_interrupt;
        self
    }

    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll on the calling thread, reporting exhaustion as [`PollOutcome::Exhausted`].
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Observation`] as soon as `observe` fails, and
    /// [`PollError::Interrupted`] when a wait is interrupted under
    /// [`InterruptPolicy::Abort`].
    pub fn poll_outcome<T, E, O, P, D>(
        &self,
        mut observe: O,
        mut is_satisfied: P,
        describe: D,
        condition: &str,
    ) -> Result<PollOutcome<T>, PollError<E>>
    where
        O: FnMut() -> Result<Option<T>, E>,
        P: FnMut(&T) -> bool,
        D: FnOnce() -> String,
    {
        let target = describe();
        let max_attempts = self.policy.max_attempts();

        for attempt in 1..=max_attempts {
            self.log_attempt(attempt, &target, condition);

            if let Some(value) = observe().map_err(PollError::Observation)? {
                if is_satisfied(&value) {
                    self.log_success(attempt, &target, condition);
                    return Ok(PollOutcome::Success(value));
                }
            }

            if attempt < max_attempts {
                self.log_retry(attempt, &target, condition);
                let wake = self.sleeper.sleep(self.policy.delay_between_attempts());
                self.after_wait(wake, attempt, &target)?;
            }
        }

        Ok(PollOutcome::Exhausted)
    }

    /// Poll on the calling thread until `is_satisfied` holds.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Timeout`] when no attempt satisfied the predicate,
    /// plus everything [`ConditionPoller::poll_outcome`] returns.
    pub fn poll<T, E, O, P, D>(
        &self,
        observe: O,
        is_satisfied: P,
        describe: D,
        condition: &str,
    ) -> Result<T, PollError<E>>
    where
        O: FnMut() -> Result<Option<T>, E>,
        P: FnMut(&T) -> bool,
        D: FnOnce() -> String,
    {
        let target = describe();
        let outcome = self.poll_outcome(observe, is_satisfied, || target.clone(), condition)?;
        self.finish(outcome, target, condition)
    }
}

impl<S> ConditionPoller<S> {
    fn finish<T, E>(
        &self,
        outcome: PollOutcome<T>,
        target: String,
        condition: &str,
    ) -> Result<T, PollError<E>> {
        match outcome {
            PollOutcome::Success(value) => Ok(value),
            PollOutcome::Exhausted => {
                let timeout = ConditionTimeout {
                    target,
                    condition: condition.to_string(),
                    attempts: self.policy.max_attempts(),
                    waited: self.policy.total_wait(),
                };
                warn!(
                    resource = %timeout.target,
                    condition = %timeout.condition,
                    attempts = timeout.attempts,
                    waited_ms = timeout.waited.as_millis(),
                    "Condition not met within attempt budget"
                );
                Err(PollError::Timeout(timeout))
            }
        }
    }

    fn after_wait<E>(&self, wake: Wake, attempt: u32, target: &str) -> Result<(), PollError<E>> {
        if wake == Wake::Elapsed {
            return Ok(());
        }

        match self.on_interrupt {
            InterruptPolicy::SkipWait => {
                warn!(resource = %target, attempt, "Interrupted while waiting for resource condition");
                Ok(())
            }
            InterruptPolicy::Abort => Err(PollError::Interrupted {
                target: target.to_string(),
                attempt,
            }),
        }
    }

    fn log_attempt(&self, attempt: u32, target: &str, condition: &str) {
        debug!(
            resource = %target,
            condition = %condition,
            attempt,
            remaining = self.policy.max_attempts() - attempt,
            "Checking condition"
        );
    }

    fn log_success(&self, attempt: u32, target: &str, condition: &str) {
        info!(resource = %target, condition = %condition, attempt, "Verified '{target}' state '{condition}'");
    }

    fn log_retry(&self, attempt: u32, target: &str, condition: &str) {
        warn!(
            resource = %target,
            condition = %condition,
            attempt,
            max_attempts = self.policy.max_attempts(),
            delay_ms = self.policy.delay_between_attempts().as_millis(),
            "Waiting for '{target}' in state '{condition}' - retry in {} ms",
            self.policy.delay_between_attempts().as_millis()
        );
    }
}
