//! Error types for verification actions.

use poller::{ConditionTimeout, LabelError, PolicyError, PollError};
use thiserror::Error;

/// Errors raised while loading [`crate::Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Errors that can occur when verifying a resource.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Kubernetes API call failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource never reached the awaited state
    #[error(transparent)]
    Timeout(#[from] ConditionTimeout),

    /// Waiting was interrupted and the action was configured to abort
    #[error("Interrupted while waiting for '{target}' (attempt {attempt})")]
    Interrupted { target: String, attempt: u32 },

    /// Neither a resource name nor a label selector was given
    #[error("Missing resource name or label selector")]
    MissingTarget,

    /// Custom resource type is incomplete
    #[error("Invalid custom resource type: {0}")]
    InvalidResourceType(String),

    /// Malformed label expression
    #[error(transparent)]
    Label(#[from] LabelError),

    /// Invalid attempt budget
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Invalid settings
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl VerifyError {
    /// Whether the resource was reachable but never reached the awaited state.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<PollError<VerifyError>> for VerifyError {
    fn from(err: PollError<VerifyError>) -> Self {
        match err {
            PollError::Timeout(timeout) => Self::Timeout(timeout),
            PollError::Observation(e) => e,
            PollError::Interrupted { target, attempt } => Self::Interrupted { target, attempt },
        }
    }
}
