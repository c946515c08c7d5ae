//! `key=value` label expressions used to select resources.

use std::fmt;
use std::str::FromStr;

use crate::error::LabelError;

/// A single `key=value` label selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelExpression {
    key: String,
    value: String,
}

impl LabelExpression {
    /// Build an expression from an already split key and value.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::EmptyKey`] when the key is blank.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, LabelError> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();
        if key.is_empty() {
            return Err(LabelError::EmptyKey(format!("={value}")));
        }
        Ok(Self { key, value })
    }

    /// Parse `key=value`. Splits on the first `=`; a missing `=` yields an empty value.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::EmptyKey`] when the key part is blank.
    pub fn parse(expression: &str) -> Result<Self, LabelError> {
        let (key, value) = expression.split_once('=').unwrap_or((expression, ""));
        if key.trim().is_empty() {
            return Err(LabelError::EmptyKey(expression.to_string()));
        }
        Self::new(key, value)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for LabelExpression {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LabelExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        let label = LabelExpression::parse("app=my-service").unwrap();
        assert_eq!(label.key(), "app");
        assert_eq!(label.value(), "my-service");
        assert_eq!(label.to_string(), "app=my-service");
    }

    #[test]
    fn test_parse_without_value() {
        let label: LabelExpression = "app".parse().unwrap();
        assert_eq!(label.key(), "app");
        assert_eq!(label.value(), "");
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let label = LabelExpression::parse("selector=a=b").unwrap();
        assert_eq!(label.key(), "selector");
        assert_eq!(label.value(), "a=b");
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        assert_eq!(
            LabelExpression::parse("=value"),
            Err(LabelError::EmptyKey("=value".to_string()))
        );
        assert!(LabelExpression::parse("  ").is_err());
        assert!(LabelExpression::new("", "x").is_err());
    }
}
