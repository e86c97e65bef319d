//! Validator construction errors

/// Errors raised while building a validator
///
/// Validation itself never fails: every outcome is a [`crate::SafetyVerdict`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SafetyError {
    /// Grammar could not be loaded into the parser
    #[error("failed to initialize parser: {0}")]
    ParserInit(String),

    /// Tree-walk strategy requested but compiled out
    #[error("tree-walk validator not compiled in (enable the `tree-sitter` feature)")]
    TreeUnavailable,
}
