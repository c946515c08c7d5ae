//! What a verification looks at: one named resource or a label selection.

use std::fmt;

use poller::LabelExpression;

use crate::error::VerifyError;

/// Resource selected by name or by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Name(String),
    Label(LabelExpression),
}

impl Target {
    /// Pick the target from builder input. A non-empty name wins over a label.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MissingTarget`] when neither is set, and
    /// [`VerifyError::Label`] when the label expression is malformed.
    pub fn resolve(name: Option<&str>, label: Option<&str>) -> Result<Self, VerifyError> {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            return Ok(Self::Name(name.to_string()));
        }

        match label.filter(|l| !l.is_empty()) {
            Some(expression) => Ok(Self::Label(LabelExpression::parse(expression)?)),
            None => Err(VerifyError::MissingTarget),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}
