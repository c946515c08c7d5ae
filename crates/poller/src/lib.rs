//! Fixed-interval condition polling.
//!
//! A [`ConditionPoller`] repeatedly observes some external state and checks it
//! against a predicate until the predicate holds or the [`PollPolicy`] attempt
//! budget is spent. Failures of the observation itself are never retried.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use poller::{ConditionPoller, PollPolicy};
//!
//! let policy = PollPolicy::new(3, Duration::from_millis(100)).expect("valid policy");
//! let phase = ConditionPoller::new(policy).poll(
//!     || Ok::<_, std::io::Error>(Some("Running".to_string())),
//!     |phase| phase == "Running",
//!     || "pod/web-0".to_string(),
//!     "Running",
//! );
//! assert!(phase.is_ok());
//! ```
//!
//! Waits block the calling thread in [`ConditionPoller::poll`] and use the
//! tokio timer in [`ConditionPoller::poll_async`]. Either can be cut short
//! with an [`Interrupter`]; the [`InterruptPolicy`] decides whether that
//! skips one wait or aborts the poll.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod label;
pub mod policy;
pub mod poller;
pub mod sleeper;

pub use error::{ConditionTimeout, LabelError, PolicyError, PollError};
pub use label::LabelExpression;
pub use policy::{InterruptPolicy, PollPolicy};
pub use poller::{ConditionPoller, PollOutcome};
pub use sleeper::{Interrupter, Sleeper, Wake};
