//! Error types for the pipeline
//!
//! - [`ConfigError`]: configuration could not be loaded or is inconsistent
//! - [`RenderError`]: a snippet was refused before any backend call

use deckscript_safety::{SafetyError, SafetyVerdict};
use std::path::PathBuf;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File requested
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::DeckScriptConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are individually valid but unusable
    #[error("invalid config value: {0}")]
    Invalid(String),

    /// Requested validator cannot be built
    #[error("validator unavailable: {0}")]
    Validator(#[from] SafetyError),
}

impl ConfigError {
    /// Create invalid-value error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Reasons a snippet produced no backend calls at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Snippet exceeds the configured size limit
    #[error("snippet is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Snippet size in bytes
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Safety validation failed
    #[error("snippet rejected: {}", .0.reason.as_deref().unwrap_or("unsafe construct"))]
    Rejected(SafetyVerdict),
}
