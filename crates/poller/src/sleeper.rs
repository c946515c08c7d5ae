//! Interruptible waits between poll attempts.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full delay elapsed.
    Elapsed,
    /// The wait was cut short by an interrupt.
    Interrupted,
}

/// Blocking wait used by [`crate::ConditionPoller::poll`].
pub trait Sleeper {
    /// Block the calling thread for up to `duration`.
    fn sleep(&self, duration: Duration) -> Wake;
}

#[derive(Debug, Default)]
struct Signal {
    pending: Mutex<bool>,
    cond: Condvar,
    notify: Notify,
}

/// Handle that interrupts the current (or next) wait of a poll.
///
/// Cloning shares the handle. An interrupt raised while nobody is waiting
/// stays pending and cuts the next wait short; each interrupt is consumed by
/// exactly one wait.
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
    signal: Arc<Signal>,
}

impl Interrupter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt the wait in progress, or the next one.
    pub fn interrupt(&self) {
        *self.pending() = true;
        self.signal.cond.notify_all();
        self.signal.notify.notify_waiters();
    }

    /// Whether an interrupt is waiting to be consumed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        *self.pending()
    }

    fn pending(&self) -> MutexGuard<'_, bool> {
        self.signal
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> bool {
        std::mem::replace(&mut *self.pending(), false)
    }

    /// Wait for `duration` on the tokio timer, or until interrupted.
    pub async fn sleep_async(&self, duration: Duration) -> Wake {
        let notified = self.signal.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so an interrupt in between is not lost.
        notified.as_mut().enable();

        if self.take() {
            return Wake::Interrupted;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => Wake::Elapsed,
            () = notified => {
                self.take();
                Wake::Interrupted
            }
        }
    }
}

impl Sleeper for Interrupter {
    fn sleep(&self, duration: Duration) -> Wake {
        // None when the delay is too large to represent; only an interrupt ends that wait.
        let deadline = Instant::now().checked_add(duration);
        let mut pending = self.pending();

        loop {
            if *pending {
                *pending = false;
                return Wake::Interrupted;
            }

            let Some(deadline) = deadline else {
                pending = self
                    .signal
                    .cond
                    .wait(pending)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Wake::Elapsed;
            }

            pending = self
                .signal
                .cond
                .wait_timeout(pending, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
