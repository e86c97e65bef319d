//! Error types for the interpreter
//!
//! - [`ScanError`]: delimiter scanning failures (always fail-closed)
//! - [`EvalError`]: expression evaluation failures

/// Errors raised by the delimiter scanner
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Source ended (or a mismatched closer appeared) before depth returned to zero
    #[error("unbalanced delimiters at byte {0}")]
    Unbalanced(usize),

    /// A string literal was never closed
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),

    /// The byte at the given index is not `(`, `[` or `{`
    #[error("expected an opening delimiter at byte {0}")]
    NotAnOpener(usize),

    /// Template literals nested too deeply inside `${...}` spans
    #[error("template literal nesting too deep at byte {0}")]
    NestingTooDeep(usize),
}

/// Errors raised while evaluating an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Expression is outside the supported grammar
    #[error("unsupported expression: {0}")]
    Unsupported(String),

    /// Delimiter scanning failed inside the expression
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Nesting exceeded the configured evaluation depth
    #[error("expression nesting too deep (limit {0})")]
    TooDeep(usize),

    /// A string, array or object grew past the configured value budget
    #[error("value exceeds the {0}-byte budget")]
    TooLarge(usize),

    /// A helper was called with unusable arguments
    #[error("invalid arguments to {helper}: {reason}")]
    HelperArguments {
        /// Helper name as written in the snippet
        helper: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Resource locator argument was not a safe relative path
    #[error("rejected resource path: {0:?}")]
    UnsafeResourcePath(String),

    /// Resolved resource locator did not carry the internal scheme
    #[error("resolved locator {0:?} is outside the internal resource scheme")]
    ForeignResourceScheme(String),
}

impl EvalError {
    /// Create an unsupported-expression error for the given text
    #[inline]
    pub fn unsupported(text: impl Into<String>) -> Self {
        Self::Unsupported(text.into())
    }

    /// Depth and size limits abort the whole expression instead of
    /// degrading to `NaN` or a dropped entry
    #[inline]
    #[must_use]
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::TooDeep(_) | Self::TooLarge(_))
    }

    /// Create a helper-argument error
    #[inline]
    pub fn helper(helper: &'static str, reason: impl Into<String>) -> Self {
        Self::HelperArguments {
            helper,
            reason: reason.into(),
        }
    }
}
