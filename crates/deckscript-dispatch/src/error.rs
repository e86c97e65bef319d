//! Error types for dispatch
//!
//! - [`DispatchError`]: one call record could not be dispatched
//! - [`BackendError`]: the presentation builder refused a call
//! - [`AssetError`]: an icon could not be fetched or recoloured
//!
//! None of these abort a snippet; the dispatcher turns them into diagnostics.

use deckscript_interp::{EvalError, Operation};

/// Failure dispatching a single call record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// An argument expression failed to evaluate
    #[error("{operation}: argument {index} failed to evaluate: {source}")]
    Eval {
        /// Operation being dispatched
        operation: Operation,
        /// 1-based argument position
        index: usize,
        /// Evaluator failure
        #[source]
        source: EvalError,
    },

    /// Arguments do not match the operation's contract
    #[error("{operation}: {reason}")]
    Arguments {
        /// Operation being dispatched
        operation: Operation,
        /// What was wrong
        reason: String,
    },

    /// Backend rejected the call
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DispatchError {
    /// Create arguments error
    pub fn arguments(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Arguments {
            operation,
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`crate::PresentationBuilder`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Slide handle does not exist
    #[error("no slide with id {0}")]
    NoSuchSlide(usize),

    /// Malformed table data
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Malformed chart data
    #[error("invalid chart: {0}")]
    InvalidChart(String),

    /// Any other refusal
    #[error("backend rejected call: {0}")]
    Rejected(String),
}

/// Errors raised while fetching or tinting an icon
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// No asset at the locator
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Transport failure
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// Locator requested
        url: String,
        /// Transport detail
        reason: String,
    },

    /// Body is not an SVG document
    #[error("asset is not an SVG document: {0}")]
    NotSvg(String),
}
