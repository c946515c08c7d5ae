//! Poll settings shared by the action builders.

use std::time::Duration;

use poller::{ConditionPoller, InterruptPolicy, Interrupter, PollPolicy};

use crate::error::VerifyError;

/// Builder-side poll configuration: settings defaults plus overrides.
#[derive(Debug, Clone)]
pub(crate) struct WaitConfig {
    defaults: PollPolicy,
    max_attempts: Option<u32>,
    delay: Option<Duration>,
    on_interrupt: InterruptPolicy,
    interrupter: Option<Interrupter>,
}

impl WaitConfig {
    pub(crate) fn new(defaults: PollPolicy) -> Self {
        Self {
            defaults,
            max_attempts: None,
            delay: None,
            on_interrupt: InterruptPolicy::default(),
            interrupter: None,
        }
    }

    pub(crate) fn max_attempts(&mut self, max_attempts: u32) {
        self.max_attempts = Some(max_attempts);
    }

    pub(crate) fn delay(&mut self, delay: Duration) {
        self.delay = Some(delay);
    }

    pub(crate) fn interrupter(&mut self, interrupter: Interrupter) {
        self.interrupter = Some(interrupter);
    }

    pub(crate) fn on_interrupt(&mut self, on_interrupt: InterruptPolicy) {
        self.on_interrupt = on_interrupt;
    }

    pub(crate) fn build(self) -> Result<Wait, VerifyError> {
        let mut policy = self.defaults;
        if let Some(max_attempts) = self.max_attempts {
            policy = policy.with_max_attempts(max_attempts)?;
        }
        if let Some(delay) = self.delay {
            policy = policy.with_delay(delay);
        }

        Ok(Wait {
            policy,
            on_interrupt: self.on_interrupt,
            interrupter: self.interrupter.unwrap_or_default(),
        })
    }
}

/// Resolved poll configuration carried by a built action.
#[derive(Debug, Clone)]
pub(crate) struct Wait {
    pub(crate) policy: PollPolicy,
    on_interrupt: InterruptPolicy,
    interrupter: Interrupter,
}

impl Wait {
    pub(crate) fn poller(&self) -> ConditionPoller {
        ConditionPoller::new(self.policy)
            .with_interrupter(self.interrupter.clone())
            .on_interrupt(self.on_interrupt)
    }
}
