//! # DeckScript Safety
//!
//! Static screening of snippets before any statement is extracted.
//!
//! ## Architecture
//!
//! ```text
//! snippet ──► SafetyValidator::validate ──► SafetyVerdict { passed, reason, strategy }
//!                  │
//!                  ├── TreeWalkValidator   (tree-sitter; feature `tree-sitter`)
//!                  │        └── syntax errors ──► PatternValidator as well
//!                  └── PatternValidator    (regex set over raw text)
//! ```
//!
//! Both strategies share the capability [`policy`]: banned ambient names,
//! banned prototype members, and the whitelist of callable names.

mod error;
pub mod pattern;
pub mod policy;
#[cfg(feature = "tree-sitter")]
pub mod tree;
mod verdict;

use std::fmt;

pub use error::SafetyError;
pub use pattern::PatternValidator;
#[cfg(feature = "tree-sitter")]
pub use tree::TreeWalkValidator;
pub use verdict::{SafetyVerdict, Strategy, ValidatorChoice};

/// Capability check run once per snippet
///
/// Implementations are pure: no state changes between calls, so a single
/// validator may be shared across threads.
pub trait SafetyValidator: Send + Sync + fmt::Debug + 'static {
    /// Decide whether `snippet` may be extracted
    fn validate(&self, snippet: &str) -> SafetyVerdict;

    /// Strategy this validator implements
    fn strategy(&self) -> Strategy;
}

impl<V: SafetyValidator + ?Sized> SafetyValidator for Box<V> {
    fn validate(&self, snippet: &str) -> SafetyVerdict {
        (**self).validate(snippet)
    }

    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }
}

/// Tree-walk validator when compiled in and initializable, otherwise pattern
#[must_use]
pub fn default_validator() -> Box<dyn SafetyValidator> {
    match build_validator(ValidatorChoice::Auto) {
        Ok(validator) => validator,
        Err(e) => {
            tracing::warn!("Falling back to pattern validator: {}", e);
            Box::new(PatternValidator::new())
        }
    }
}

/// Build the validator named by configuration
///
/// # Errors
/// `TreeUnavailable` when `Tree` is requested without the `tree-sitter`
/// feature, `ParserInit` when the grammar cannot be loaded.
pub fn build_validator(choice: ValidatorChoice) -> Result<Box<dyn SafetyValidator>, SafetyError> {
    match choice {
        ValidatorChoice::Pattern => Ok(Box::new(PatternValidator::new())),
        ValidatorChoice::Tree => tree_validator(),
        ValidatorChoice::Auto => tree_validator().or_else(|e| {
            tracing::debug!("Tree-walk validator unavailable: {}", e);
            build_validator(ValidatorChoice::Pattern)
        }),
    }
}

#[cfg(feature = "tree-sitter")]
fn tree_validator() -> Result<Box<dyn SafetyValidator>, SafetyError> {
    Ok(Box::new(TreeWalkValidator::new()?))
}

#[cfg(not(feature = "tree-sitter"))]
fn tree_validator() -> Result<Box<dyn SafetyValidator>, SafetyError> {
    Err(SafetyError::TreeUnavailable)
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        default_validator, PatternValidator, SafetyValidator, SafetyVerdict, Strategy,
        ValidatorChoice,
    };

    #[cfg(feature = "tree-sitter")]
    pub use crate::TreeWalkValidator;
}

/// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
