//! End-to-end snippet rendering
//!
//! ```text
//! snippet ─► size check ─► strip_unsafe_lines ─► SafetyValidator
//!                                                   │ rejected ─► RenderError::Rejected (no backend calls)
//!                                                   ▼
//!                                               Extractor ─► Dispatcher ─► PresentationBuilder
//! ```

use crate::config::DeckScriptConfig;
use crate::error::{ConfigError, RenderError};
use crate::preprocess::strip_unsafe_lines;
use deckscript_dispatch::model::{
    Geometry, HAlign, SlideOptions, TextOptions, TextRun, TextStyle, VAlign,
};
use deckscript_dispatch::{
    presentation_constants, AssetFetcher, Diagnostic, Dispatcher, IconTinter,
    PresentationBuilder,
};
use deckscript_interp::{Environment, Evaluator, Extraction, Extractor};
use deckscript_safety::{build_validator, SafetyValidator, SafetyVerdict};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

/// Text of the slide shown when a snippet cannot be rendered
pub const PLACEHOLDER_TEXT: &str = "Slide generation failed";

/// Outcome of rendering one snippet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    /// Safety verdict
    pub verdict: SafetyVerdict,
    /// Call records extracted
    pub records_extracted: usize,
    /// Statements the extractor skipped
    pub skipped_statements: usize,
    /// Whether the record cap cut extraction short
    pub truncated: bool,
    /// Calls the builder accepted
    pub dispatched: usize,
    /// Slides created implicitly
    pub auto_created_slides: usize,
    /// Failed calls
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the placeholder slide was drawn instead
    pub placeholder: bool,
}

/// Validates, extracts and dispatches snippets with one configuration
#[derive(Debug)]
pub struct Pipeline {
    config: DeckScriptConfig,
    validator: Box<dyn SafetyValidator>,
    extractor: Extractor,
    dispatcher: Dispatcher,
}

impl Pipeline {
    /// Build a pipeline from validated configuration
    ///
    /// # Errors
    /// `Invalid` for inconsistent configuration, `Validator` when the chosen
    /// validator is not available.
    pub fn new(config: DeckScriptConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = build_validator(config.validator)?;
        let evaluator = Evaluator::new(config.eval_options(), Arc::new(config.resolver()));
        let extractor = Extractor::new(evaluator.clone(), config.extract_options());
        let dispatcher = Dispatcher::new(evaluator, config.dispatch_options());
        tracing::debug!("Pipeline ready ({} validator)", validator.strategy());
        Ok(Self {
            config,
            validator,
            extractor,
            dispatcher,
        })
    }

    /// Replace the safety validator
    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn SafetyValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Re-tint internal icons fetched through `fetcher`
    #[must_use]
    pub fn with_asset_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        let tinter = IconTinter::new(fetcher, self.config.resources.internal_scheme.clone());
        self.dispatcher = self.dispatcher.with_tinter(tinter);
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeckScriptConfig {
        &self.config
    }

    /// Environment every snippet starts from: the presentation constants
    /// under each configured global
    #[must_use]
    pub fn environment(&self) -> Environment {
        let constants = presentation_constants();
        Environment::with_globals(
            self.config
                .presentation_globals
                .iter()
                .map(|name| (name.clone(), constants.clone())),
        )
    }

    /// Size check, line stripping and validation
    ///
    /// Returns the stripped text alongside a passing verdict.
    ///
    /// # Errors
    /// `TooLarge` or `Rejected`.
    pub fn screen(&self, snippet: &str) -> Result<(String, SafetyVerdict), RenderError> {
        let limit = self.config.limits.max_snippet_bytes;
        if snippet.len() > limit {
            return Err(RenderError::TooLarge {
                size: snippet.len(),
                limit,
            });
        }
        let stripped = strip_unsafe_lines(snippet);
        let verdict = self.validator.validate(&stripped.text);
        if verdict.passed {
            Ok((stripped.text, verdict))
        } else {
            tracing::warn!("Snippet rejected: {}", verdict);
            Err(RenderError::Rejected(verdict))
        }
    }

    /// Screen and extract without dispatching
    ///
    /// # Errors
    /// As [`Self::screen`].
    pub fn extract(&self, snippet: &str) -> Result<(Extraction, SafetyVerdict), RenderError> {
        let (text, verdict) = self.screen(snippet)?;
        let extraction = self.extractor.extract(&text, self.environment());
        if !extraction.skipped.is_empty() {
            tracing::warn!("Skipped {} statement(s)", extraction.skipped.len());
        }
        tracing::info!(
            "Extracted {} call record(s){}",
            extraction.records.len(),
            if extraction.truncated { " (truncated)" } else { "" }
        );
        Ok((extraction, verdict))
    }

    /// Render `snippet` onto `builder`
    ///
    /// A rejected snippet leaves `builder` untouched.
    ///
    /// # Errors
    /// `TooLarge` or `Rejected`; per-call failures are reported in
    /// [`RenderReport::diagnostics`] instead.
    pub async fn render<B>(&self, snippet: &str, builder: &mut B) -> Result<RenderReport, RenderError>
    where
        B: PresentationBuilder + ?Sized,
    {
        let span = tracing::info_span!("render", bytes = snippet.len());
        async {
            let (extraction, verdict) = self.extract(snippet)?;
            let dispatch = self
                .dispatcher
                .dispatch_all(&extraction.records, builder)
                .await;
            Ok::<_, RenderError>(RenderReport {
                verdict,
                records_extracted: extraction.records.len(),
                skipped_statements: extraction.skipped.len(),
                truncated: extraction.truncated,
                dispatched: dispatch.dispatched,
                auto_created_slides: dispatch.auto_created_slides,
                diagnostics: dispatch.diagnostics,
                placeholder: false,
            })
        }
        .instrument(span)
        .await
    }

    /// Render, drawing the failure placeholder slide when the snippet is refused
    pub async fn render_or_placeholder<B>(&self, snippet: &str, builder: &mut B) -> RenderReport
    where
        B: PresentationBuilder + ?Sized,
    {
        match self.render(snippet, builder).await {
            Ok(report) => report,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Drawing placeholder slide: {}", message);
                let verdict = match e {
                    RenderError::Rejected(verdict) => verdict,
                    RenderError::TooLarge { .. } => {
                        SafetyVerdict::reject(self.validator.strategy(), message)
                    }
                };
                self.draw_placeholder(builder);
                RenderReport {
                    verdict,
                    records_extracted: 0,
                    skipped_statements: 0,
                    truncated: false,
                    dispatched: 0,
                    auto_created_slides: 0,
                    diagnostics: Vec::new(),
                    placeholder: true,
                }
            }
        }
    }

    fn draw_placeholder<B>(&self, builder: &mut B)
    where
        B: PresentationBuilder + ?Sized,
    {
        let defaults = &self.config.defaults;
        let slide = match builder.add_slide(SlideOptions {
            background: Some(defaults.background.clone()),
        }) {
            Ok(slide) => slide,
            Err(e) => {
                tracing::warn!("Placeholder slide refused: {}", e);
                return;
            }
        };
        let size = self.config.slide_size();
        let options = TextOptions {
            geometry: Geometry {
                x: Some(0.0),
                y: Some(0.0),
                w: Some(size.width),
                h: Some(size.height),
            },
            style: TextStyle {
                font_size: Some(24.0),
                color: Some(defaults.text_color.clone()),
                align: Some(HAlign::Center),
                valign: Some(VAlign::Middle),
                ..TextStyle::default()
            },
        };
        let run = TextRun {
            text: PLACEHOLDER_TEXT.to_string(),
            style: TextStyle::default(),
        };
        if let Err(e) = builder.add_text(slide, vec![run], options) {
            tracing::warn!("Placeholder text refused: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckscript_dispatch::{Element, RecordingBuilder};
    use deckscript_safety::ValidatorChoice;

    fn pipeline() -> Pipeline {
        Pipeline::new(DeckScriptConfig::new().with_validator(ValidatorChoice::Pattern)).unwrap()
    }

    #[test]
    fn environment_binds_constants_per_global() {
        let env = pipeline().environment();
        for global in ["pptx", "pres", "presentation"] {
            let shapes = env.get(global).map(|v| v.member("shapes").member("RECTANGLE"));
            assert_eq!(shapes, Some(deckscript_interp::Value::from("rect")));
        }
    }

    #[test]
    fn oversized_snippets_are_refused() {
        let pipeline =
            Pipeline::new(DeckScriptConfig::new().with_max_snippet_bytes(8)).unwrap();
        let snippet = "slide.addText('x', {});";
        assert_eq!(
            pipeline.screen(snippet).unwrap_err(),
            RenderError::TooLarge {
                size: snippet.len(),
                limit: 8
            }
        );
    }

    #[test]
    fn stripped_boilerplate_does_not_trip_validation() {
        let (text, verdict) = pipeline()
            .screen("const pptx = new PptxGenJS();\nslide.addText('x', {});")
            .unwrap();
        assert!(verdict.passed);
        assert_eq!(text, "\nslide.addText('x', {});");
    }

    #[test]
    fn write_call_survives_stripping_and_rejects() {
        let err = pipeline()
            .screen("const pptx = new PptxGenJS();\nslide.addText('x', {});\npptx.writeFile();")
            .unwrap_err();
        assert!(matches!(err, RenderError::Rejected(ref v) if !v.passed));
    }

    #[tokio::test]
    async fn rejection_draws_placeholder_only() {
        let mut builder = RecordingBuilder::new();
        let report = pipeline()
            .render_or_placeholder("fetch('https://x'); slide.addText('x', {});", &mut builder)
            .await;

        assert!(report.placeholder);
        assert!(!report.verdict.passed);
        assert_eq!(builder.slide_count(), 1);
        match &builder.deck().slides[0].elements[..] {
            [Element::Text { runs, .. }] => assert_eq!(runs[0].text, PLACEHOLDER_TEXT),
            other => panic!("unexpected elements {other:?}"),
        }
    }
}
