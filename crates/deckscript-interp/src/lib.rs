//! DeckScript Interpreter Core
//!
//! Turns untrusted slide-building snippets into an ordered list of
//! [`CallRecord`]s without ever executing the snippet as code.
//!
//! # Architecture
//!
//! ```text
//! snippet → strip_comments → Extractor ──→ Vec<CallRecord>
//!                               │   ↑
//!                               ↓   │
//!                          Scanner + Evaluator ← Environment
//! ```
//!
//! The [`scanner`] locates matching delimiters and top-level separators, the
//! [`Evaluator`] turns expression text into a [`Value`], and the
//! [`Extractor`] walks statements, unrolls the two supported loop forms and
//! records whitelisted operation calls together with a snapshot of the
//! [`Environment`] active at that point.
//!
//! # Example
//!
//! ```rust,ignore
//! use deckscript_interp::prelude::*;
//!
//! let extractor = Extractor::new(Evaluator::default(), ExtractOptions::default());
//! let extraction = extractor.extract(
//!     r#"for (let i = 0; i < 3; i++) { slide.addShape("rect", {x: i, y: 0}); }"#,
//!     Environment::new(),
//! );
//! assert_eq!(extraction.records.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod env;
pub mod error;
pub mod eval;
pub mod extract;
pub mod record;
pub mod resource;
pub mod scanner;
pub mod value;

pub use env::Environment;
pub use error::{EvalError, ScanError};
pub use eval::{EvalOptions, Evaluator, Helper, SlideSize};
pub use extract::{Extraction, ExtractOptions, Extractor, SkippedStatement};
pub use record::{CallRecord, Operation};
pub use resource::{BaseUrlResolver, ResourceResolver};
pub use value::{Object, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the interpreter
    pub use crate::env::Environment;
    pub use crate::eval::{EvalOptions, Evaluator, SlideSize};
    pub use crate::extract::{Extraction, ExtractOptions, Extractor};
    pub use crate::record::{CallRecord, Operation};
    pub use crate::value::{Object, Value};
}
