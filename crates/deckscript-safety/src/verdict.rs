//! Validation outcome types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which validator produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Syntax-tree walk
    TreeWalk,
    /// Regex screening of raw text
    Pattern,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::TreeWalk => f.write_str("tree-walk"),
            Strategy::Pattern => f.write_str("pattern"),
        }
    }
}

/// Validator selection, as written in configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorChoice {
    /// Tree walk when available, pattern otherwise
    #[default]
    Auto,
    /// Tree walk only
    Tree,
    /// Pattern only
    Pattern,
}

/// Pass/fail outcome of validating one snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// Whether extraction may proceed
    pub passed: bool,
    /// First violation found, when rejected
    pub reason: Option<String>,
    /// Strategy that decided
    pub strategy: Strategy,
}

impl SafetyVerdict {
    /// Accepting verdict
    #[must_use]
    pub fn pass(strategy: Strategy) -> Self {
        Self {
            passed: true,
            reason: None,
            strategy,
        }
    }

    /// Rejecting verdict with a reason
    #[must_use]
    pub fn reject(strategy: Strategy, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            strategy,
        }
    }
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, self.passed) {
            (_, true) => write!(f, "passed ({})", self.strategy),
            (Some(reason), false) => write!(f, "rejected by {}: {}", self.strategy, reason),
            (None, false) => write!(f, "rejected by {}", self.strategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(SafetyVerdict::pass(Strategy::Pattern).to_string(), "passed (pattern)");
        assert_eq!(
            SafetyVerdict::reject(Strategy::TreeWalk, "banned identifier `fetch`").to_string(),
            "rejected by tree-walk: banned identifier `fetch`"
        );
    }

    #[test]
    fn choice_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            validator: ValidatorChoice,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"validator": "pattern"}"#).unwrap();
        assert_eq!(parsed.validator, ValidatorChoice::Pattern);
    }
}
