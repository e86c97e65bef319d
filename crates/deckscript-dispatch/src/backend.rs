//! Presentation builder interface and the in-memory reference backend

use crate::error::BackendError;
use crate::model::{
    ChartOptions, ChartSeries, ImageOptions, ShapeOptions, SlideOptions, TableCell, TableOptions,
    TextOptions, TextRun,
};
use crate::ops::{ChartKind, ShapeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a slide created by a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlideId(pub usize);

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide#{}", self.0)
    }
}

/// The sole mutation target of a dispatch run
///
/// Implementations may reject individual calls; the dispatcher records the
/// error and moves on to the next call.
pub trait PresentationBuilder {
    /// Append a slide
    fn add_slide(&mut self, options: SlideOptions) -> Result<SlideId, BackendError>;

    /// Add a text box
    fn add_text(
        &mut self,
        slide: SlideId,
        runs: Vec<TextRun>,
        options: TextOptions,
    ) -> Result<(), BackendError>;

    /// Add a shape
    fn add_shape(
        &mut self,
        slide: SlideId,
        kind: ShapeKind,
        options: ShapeOptions,
    ) -> Result<(), BackendError>;

    /// Add an image
    fn add_image(&mut self, slide: SlideId, options: ImageOptions) -> Result<(), BackendError>;

    /// Add a table
    fn add_table(
        &mut self,
        slide: SlideId,
        rows: Vec<Vec<TableCell>>,
        options: TableOptions,
    ) -> Result<(), BackendError>;

    /// Add a chart
    fn add_chart(
        &mut self,
        slide: SlideId,
        kind: ChartKind,
        series: Vec<ChartSeries>,
        options: ChartOptions,
    ) -> Result<(), BackendError>;

    /// Number of slides created so far
    fn slide_count(&self) -> usize;
}

/// Element drawn on a recorded slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Element {
    Text {
        runs: Vec<TextRun>,
        options: TextOptions,
    },
    Shape {
        kind: ShapeKind,
        options: ShapeOptions,
    },
    Image {
        options: ImageOptions,
    },
    Table {
        rows: Vec<Vec<TableCell>>,
        options: TableOptions,
    },
    Chart {
        kind: ChartKind,
        series: Vec<ChartSeries>,
        options: ChartOptions,
    },
}

/// Recorded slide
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Options the slide was created with
    pub options: SlideOptions,
    /// Elements in draw order
    pub elements: Vec<Element>,
}

/// Recorded deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Slides in creation order
    pub slides: Vec<Slide>,
}

/// In-memory builder that records every accepted call
///
/// Enforces the same structural rules a real backend does: tables need at
/// least one non-empty row, and chart series need one value per label.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuilder {
    deck: Deck,
}

impl RecordingBuilder {
    /// Create empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded deck
    #[inline]
    #[must_use]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Consume into the recorded deck
    #[must_use]
    pub fn into_deck(self) -> Deck {
        self.deck
    }

    /// Total elements across all slides
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.deck.slides.iter().map(|s| s.elements.len()).sum()
    }

    fn push(&mut self, slide: SlideId, element: Element) -> Result<(), BackendError> {
        self.deck
            .slides
            .get_mut(slide.0)
            .ok_or(BackendError::NoSuchSlide(slide.0))?
            .elements
            .push(element);
        Ok(())
    }
}

impl PresentationBuilder for RecordingBuilder {
    fn add_slide(&mut self, options: SlideOptions) -> Result<SlideId, BackendError> {
        self.deck.slides.push(Slide {
            options,
            elements: Vec::new(),
        });
        Ok(SlideId(self.deck.slides.len() - 1))
    }

    fn add_text(
        &mut self,
        slide: SlideId,
        runs: Vec<TextRun>,
        options: TextOptions,
    ) -> Result<(), BackendError> {
        self.push(slide, Element::Text { runs, options })
    }

    fn add_shape(
        &mut self,
        slide: SlideId,
        kind: ShapeKind,
        options: ShapeOptions,
    ) -> Result<(), BackendError> {
        self.push(slide, Element::Shape { kind, options })
    }

    fn add_image(&mut self, slide: SlideId, options: ImageOptions) -> Result<(), BackendError> {
        self.push(slide, Element::Image { options })
    }

    fn add_table(
        &mut self,
        slide: SlideId,
        rows: Vec<Vec<TableCell>>,
        options: TableOptions,
    ) -> Result<(), BackendError> {
        if rows.is_empty() || rows.iter().all(Vec::is_empty) {
            return Err(BackendError::InvalidTable("table has no cells".into()));
        }
        self.push(slide, Element::Table { rows, options })
    }

    fn add_chart(
        &mut self,
        slide: SlideId,
        kind: ChartKind,
        series: Vec<ChartSeries>,
        options: ChartOptions,
    ) -> Result<(), BackendError> {
        if series.is_empty() {
            return Err(BackendError::InvalidChart("chart has no series".into()));
        }
        if let Some(bad) = series.iter().find(|s| s.labels.len() != s.values.len()) {
            return Err(BackendError::InvalidChart(format!(
                "series `{}` has {} labels but {} values",
                bad.name,
                bad.labels.len(),
                bad.values.len()
            )));
        }
        self.push(
            slide,
            Element::Chart {
                kind,
                series,
                options,
            },
        )
    }

    fn slide_count(&self) -> usize {
        self.deck.slides.len()
    }
}
