//! # DeckScript
//!
//! Renders AI-authored slide-building snippets without executing them.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!   snippet text ──► │ Pipeline                     │
//!                    │  preprocess (line stripping) │
//!                    │  deckscript-safety           │ ─► rejected: placeholder slide
//!                    │  deckscript-interp           │
//!                    │  deckscript-dispatch         │ ─► PresentationBuilder
//!                    └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use deckscript_core::prelude::*;
//!
//! let pipeline = Pipeline::new(DeckScriptConfig::default())?;
//! let mut builder = RecordingBuilder::new();
//! let report = pipeline
//!     .render_or_placeholder(r#"slide.addText("Hello", {x: 1, y: 1});"#, &mut builder)
//!     .await;
//! assert_eq!(report.dispatched, 1);
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod telemetry;

pub use config::{DeckScriptConfig, Limits, ResourceConfig, SlideConfig};
pub use error::{ConfigError, RenderError};
pub use pipeline::{Pipeline, RenderReport, PLACEHOLDER_TEXT};
pub use preprocess::{strip_unsafe_lines, Preprocessed};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{DeckScriptConfig, Pipeline, RenderError, RenderReport};
    pub use deckscript_dispatch::{PresentationBuilder, RecordingBuilder};
    pub use deckscript_safety::{SafetyValidator, SafetyVerdict, ValidatorChoice};
}

/// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
