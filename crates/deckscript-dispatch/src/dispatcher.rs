//! Call dispatcher
//!
//! Consumes call records in source order and drives a
//! [`PresentationBuilder`]. Each record is handled independently: a failed
//! call becomes a [`Diagnostic`] and the next record is dispatched.

use crate::args::{bind, chart_series, table_rows, text_runs, Bound};
use crate::assets::IconTinter;
use crate::backend::{PresentationBuilder, SlideId};
use crate::error::DispatchError;
use crate::model::{
    ChartOptions, Geometry, ImageOptions, ImageSource, ShapeOptions, SlideOptions, StyleDefaults,
    TableOptions, TextOptions, TextStyle,
};
use crate::sanitize::{has_allowed_scheme, Fields};
use deckscript_interp::{CallRecord, Evaluator, Operation, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Scheme prefixes an image locator may use
    pub allowed_image_schemes: Vec<String>,
    /// Colors substituted for unparseable ones
    pub defaults: StyleDefaults,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            allowed_image_schemes: vec![
                "chrome-extension://".to_string(),
                "https://".to_string(),
                "data:image/".to_string(),
            ],
            defaults: StyleDefaults::default(),
        }
    }
}

/// One failed call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Operation that failed
    pub operation: Operation,
    /// Byte offset of the call in the cleaned snippet
    pub offset: usize,
    /// Error text
    pub message: String,
}

/// Outcome of dispatching one snippet's records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Calls the builder accepted
    pub dispatched: usize,
    /// Slides created because a content call arrived before any `addSlide`
    pub auto_created_slides: usize,
    /// Calls that failed, in source order
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-snippet cursor state
#[derive(Debug, Default)]
struct Session {
    current: Option<SlideId>,
    bindings: HashMap<String, SlideId>,
}

/// Evaluates, sanitizes and dispatches call records
#[derive(Debug, Clone)]
pub struct Dispatcher {
    evaluator: Evaluator,
    options: DispatchOptions,
    tinter: Option<IconTinter>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Evaluator::default(), DispatchOptions::default())
    }
}

impl Dispatcher {
    /// Create dispatcher; percentages resolve against the evaluator's slide size
    #[must_use]
    pub fn new(evaluator: Evaluator, options: DispatchOptions) -> Self {
        Self {
            evaluator,
            options,
            tinter: None,
        }
    }

    /// Enable icon re-tinting
    #[must_use]
    pub fn with_tinter(mut self, tinter: IconTinter) -> Self {
        self.tinter = Some(tinter);
        self
    }

    /// Dispatcher settings
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Dispatch `records` in order against `builder`
    ///
    /// Icon fetches are awaited inline, so later calls always observe the
    /// effects of earlier ones.
    pub async fn dispatch_all<B>(&self, records: &[CallRecord], builder: &mut B) -> DispatchReport
    where
        B: PresentationBuilder + ?Sized,
    {
        let mut session = Session::default();
        let mut report = DispatchReport::default();

        for record in records {
            match self.dispatch_one(record, builder, &mut session, &mut report).await {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    tracing::warn!("Skipping {} at byte {}: {}", record.operation(), record.offset(), e);
                    report.diagnostics.push(Diagnostic {
                        operation: record.operation(),
                        offset: record.offset(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Dispatched {} of {} calls ({} failed)",
            report.dispatched,
            records.len(),
            report.diagnostics.len()
        );
        report
    }

    async fn dispatch_one<B>(
        &self,
        record: &CallRecord,
        builder: &mut B,
        session: &mut Session,
        report: &mut DispatchReport,
    ) -> Result<(), DispatchError>
    where
        B: PresentationBuilder + ?Sized,
    {
        let op = record.operation();
        let args = bind(record, &self.evaluator)?;
        let size = self.evaluator.options().slide;
        let defaults = &self.options.defaults;

        if let (Operation::AddSlide, [options]) = (op, args.as_slice()) {
            let obj = options.object();
            let id = builder.add_slide(SlideOptions::read(&Fields::new(&obj, size), defaults))?;
            session.current = Some(id);
            if let Some(name) = record.binding() {
                session.bindings.insert(name.to_string(), id);
            }
            tracing::debug!("Created {}", id);
            return Ok(());
        }

        let slide = Self::target(record, builder, session, report)?;
        match (op, args.as_slice()) {
            (Operation::AddText, [Bound::Any(text), options]) => {
                let obj = options.object();
                let fields = Fields::new(&obj, size);
                let runs = text_runs(text, size, defaults)?;
                let options = TextOptions {
                    geometry: Geometry::read(&fields),
                    style: TextStyle::read(&fields, defaults),
                };
                builder.add_text(slide, runs, options)?;
            }
            (Operation::AddShape, [Bound::Shape(kind), options]) => {
                let obj = options.object();
                let options = ShapeOptions::read(&Fields::new(&obj, size), defaults);
                builder.add_shape(slide, *kind, options)?;
            }
            (Operation::AddImage, [options]) => {
                let obj = options.object();
                let fields = Fields::new(&obj, size);
                let source = self.image_source(&fields).await?;
                let options = ImageOptions {
                    source,
                    geometry: Geometry::read(&fields),
                    alt_text: fields.string("altText"),
                };
                builder.add_image(slide, options)?;
            }
            (Operation::AddTable, [Bound::Any(rows), options]) => {
                let obj = options.object();
                let rows = table_rows(rows, size, defaults)?;
                let options = TableOptions::read(&Fields::new(&obj, size), defaults);
                builder.add_table(slide, rows, options)?;
            }
            (Operation::AddChart, [Bound::Chart(kind), Bound::Any(data), options]) => {
                let obj = options.object();
                let series = chart_series(data)?;
                let options = ChartOptions::read(&Fields::new(&obj, size), defaults);
                builder.add_chart(slide, *kind, series, options)?;
            }
            _ => {
                return Err(DispatchError::arguments(op, "arguments do not match the operation"));
            }
        }
        Ok(())
    }

    /// Slide a content call draws on: the receiver's binding, else the
    /// cursor, else a freshly created slide
    fn target<B>(
        record: &CallRecord,
        builder: &mut B,
        session: &mut Session,
        report: &mut DispatchReport,
    ) -> Result<SlideId, DispatchError>
    where
        B: PresentationBuilder + ?Sized,
    {
        if let Some(id) = session.bindings.get(record.receiver()) {
            return Ok(*id);
        }
        if let Some(id) = session.current {
            return Ok(id);
        }
        let id = builder.add_slide(SlideOptions::default())?;
        tracing::info!("No slide before {}; created {}", record.operation(), id);
        report.auto_created_slides += 1;
        session.current = Some(id);
        Ok(id)
    }

    async fn image_source(&self, fields: &Fields<'_>) -> Result<ImageSource, DispatchError> {
        let err = |reason: String| DispatchError::arguments(Operation::AddImage, reason);

        if let Some(data) = fields.get("data").and_then(Value::as_str) {
            return if is_image_data(data) {
                Ok(ImageSource::Data(data.to_string()))
            } else {
                Err(err("`data` must be a data:image/ URI".to_string()))
            };
        }

        let path = fields
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| err("image needs a string `path` or `data`".to_string()))?;
        if !has_allowed_scheme(path, &self.options.allowed_image_schemes) {
            let shown: String = path.chars().take(48).collect();
            return Err(err(format!("image locator scheme not allowed: {shown}")));
        }

        if let Some(tinter) = &self.tinter {
            if let Some(request) = tinter.tint_request(path) {
                return Ok(ImageSource::Data(tinter.tinted_data_uri(&request).await));
            }
        }
        if is_image_data(path) {
            Ok(ImageSource::Data(path.to_string()))
        } else {
            Ok(ImageSource::Path(path.to_string()))
        }
    }
}

fn is_image_data(text: &str) -> bool {
    text.trim_start()
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Element, RecordingBuilder};
    use crate::ops::ShapeKind;
    use deckscript_interp::Environment;

    fn call(op: Operation, receiver: &str, args: &[&str]) -> CallRecord {
        CallRecord::new(
            op,
            receiver,
            args.iter().map(|a| (*a).to_string()).collect(),
            Environment::new(),
        )
    }

    #[tokio::test]
    async fn content_before_slide_auto_creates() {
        let mut builder = RecordingBuilder::new();
        let records = vec![call(Operation::AddText, "slide", &["'hi'", "{x: 1, y: 1}"])];
        let report = Dispatcher::default().dispatch_all(&records, &mut builder).await;

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.auto_created_slides, 1);
        assert_eq!(builder.slide_count(), 1);
    }

    #[tokio::test]
    async fn bound_receivers_target_their_slide() {
        let mut builder = RecordingBuilder::new();
        let records = vec![
            call(Operation::AddSlide, "pptx", &[]).with_binding("a"),
            call(Operation::AddSlide, "pptx", &[]).with_binding("b"),
            call(Operation::AddShape, "a", &["'rect'", "{x: 0, y: 0, w: 1, h: 1}"]),
            call(Operation::AddShape, "slide", &["'ellipse'", "{x: '50%', y: 0, w: 1, h: 1}"]),
        ];
        let report = Dispatcher::default().dispatch_all(&records, &mut builder).await;
        assert_eq!(report.dispatched, 4);

        let deck = builder.deck();
        assert!(matches!(
            deck.slides[0].elements[0],
            Element::Shape { kind: ShapeKind::Rect, .. }
        ));
        match &deck.slides[1].elements[0] {
            Element::Shape { kind, options } => {
                assert_eq!(*kind, ShapeKind::Ellipse);
                assert_eq!(options.geometry.x, Some(5.0));
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_calls() {
        let mut builder = RecordingBuilder::new();
        let records = vec![
            call(Operation::AddSlide, "pptx", &[]),
            call(Operation::AddTable, "slide", &["[]", "{}"]),
            call(Operation::AddImage, "slide", &["{path: 'file:///etc/passwd'}"]),
            call(Operation::AddShape, "slide", &["'rect'", "{}"]),
        ];
        let report = Dispatcher::default().dispatch_all(&records, &mut builder).await;

        assert_eq!(report.dispatched, 2);
        let failed: Vec<_> = report.diagnostics.iter().map(|d| d.operation).collect();
        assert_eq!(failed, vec![Operation::AddTable, Operation::AddImage]);
        assert!(report.diagnostics[0].message.contains("invalid table"));
        assert!(report.diagnostics[1].message.contains("scheme not allowed"));
    }

    #[tokio::test]
    async fn image_sources() {
        let dispatcher = Dispatcher::default();
        let mut builder = RecordingBuilder::new();
        let records = vec![
            call(Operation::AddImage, "s", &["{data: 'data:image/png;base64,AAAA'}"]),
            call(Operation::AddImage, "s", &["{path: 'https://cdn.example/a.png', altText: 'logo'}"]),
            call(Operation::AddImage, "s", &["{data: 'javascript:alert(1)'}"]),
        ];
        let report = dispatcher.dispatch_all(&records, &mut builder).await;
        assert_eq!(report.dispatched, 2);

        let elements = &builder.deck().slides[0].elements;
        assert!(matches!(
            &elements[0],
            Element::Image { options } if matches!(options.source, ImageSource::Data(_))
        ));
        assert!(matches!(
            &elements[1],
            Element::Image { options } if options.source == ImageSource::Path("https://cdn.example/a.png".into())
        ));
    }
}
