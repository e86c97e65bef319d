//! # DeckScript Dispatch
//!
//! Turns extracted [`CallRecord`](deckscript_interp::CallRecord)s into typed
//! calls on a [`PresentationBuilder`].
//!
//! ## Architecture
//!
//! ```text
//! CallRecord ──► args::bind ──► sanitize ──► model::*Options ──► PresentationBuilder
//!   (texts +      (evaluate,     (colors,       (typed,              (RecordingBuilder
//!    env)          contract)      geometry,      serde)               or host backend)
//!                                 locators)
//!                                    │
//!                                    └── assets::IconTinter (moka cache, AssetFetcher)
//! ```
//!
//! Failures are per call: the [`Dispatcher`] records a [`Diagnostic`] and
//! continues with the next record.

pub mod args;
pub mod assets;
pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod ops;
pub mod sanitize;

pub use assets::{AssetFetcher, IconTinter, StaticAssetFetcher, FALLBACK_ICON_SVG};
pub use backend::{Deck, Element, PresentationBuilder, RecordingBuilder, Slide, SlideId};
pub use dispatcher::{Diagnostic, DispatchOptions, DispatchReport, Dispatcher};
pub use error::{AssetError, BackendError, DispatchError};
pub use model::StyleDefaults;
pub use ops::{presentation_constants, ChartKind, ShapeKind};
pub use sanitize::normalize_color;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DispatchOptions, DispatchReport, Dispatcher, PresentationBuilder, RecordingBuilder,
        StyleDefaults,
    };
}

/// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
