//! Typed option structs handed to the presentation builder
//!
//! Backends never see snippet values: every field below has been read
//! through [`Fields`] and sanitized on the way in.

use crate::sanitize::{color_value, Axis, Fields};
use serde::{Deserialize, Serialize};

/// Fallback colors used when a snippet color cannot be normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    /// Text color
    pub text_color: String,
    /// Shape fill and table/text fill
    pub shape_fill: String,
    /// Line and border color
    pub line_color: String,
    /// Slide background
    pub background: String,
    /// Chart series palette
    pub chart_colors: Vec<String>,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            text_color: "1F2937".to_string(),
            shape_fill: "4472C4".to_string(),
            line_color: "404040".to_string(),
            background: "FFFFFF".to_string(),
            chart_colors: ["4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5", "70AD47"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Position and size in inches
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Left edge
    pub x: Option<f64>,
    /// Top edge
    pub y: Option<f64>,
    /// Width
    pub w: Option<f64>,
    /// Height
    pub h: Option<f64>,
}

impl Geometry {
    /// Read `x y w h`, resolving percentages against the slide
    #[must_use]
    pub fn read(fields: &Fields<'_>) -> Self {
        Self {
            x: fields.length("x", Axis::Horizontal),
            y: fields.length("y", Axis::Vertical),
            w: fields.length("w", Axis::Horizontal),
            h: fields.length("h", Axis::Vertical),
        }
    }
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl HAlign {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "l" => Some(Self::Left),
            "center" | "centre" | "ctr" => Some(Self::Center),
            "right" | "r" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "top" | "t" => Some(Self::Top),
            "middle" | "center" | "ctr" => Some(Self::Middle),
            "bottom" | "b" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Character and paragraph formatting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TextStyle {
    pub font_size: Option<f64>,
    pub font_face: Option<String>,
    pub color: Option<String>,
    pub fill: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub bullet: bool,
    pub align: Option<HAlign>,
    pub valign: Option<VAlign>,
}

impl TextStyle {
    /// Read formatting keys from an options object
    #[must_use]
    pub fn read(fields: &Fields<'_>, defaults: &StyleDefaults) -> Self {
        Self {
            font_size: fields.number("fontSize").filter(|n| *n > 0.0),
            font_face: fields.string("fontFace"),
            color: fields.color("color", &defaults.text_color),
            fill: fields.color("fill", &defaults.shape_fill),
            bold: fields.flag("bold"),
            italic: fields.flag("italic"),
            underline: fields.flag("underline"),
            bullet: fields.flag("bullet"),
            align: fields
                .get("align")
                .and_then(|v| v.as_str())
                .and_then(HAlign::from_name),
            valign: fields
                .get("valign")
                .and_then(|v| v.as_str())
                .and_then(VAlign::from_name),
        }
    }
}

/// Stroke
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    /// Normalized color
    pub color: Option<String>,
    /// Width in points
    pub width: Option<f64>,
}

impl LineStyle {
    /// `line: "333333"` or `line: {color, width}`
    #[must_use]
    pub fn read(fields: &Fields<'_>, key: &str, defaults: &StyleDefaults) -> Option<Self> {
        let value = fields.get(key)?;
        let width = value
            .as_object()
            .map(|obj| Fields::new(obj, fields.slide()))
            .and_then(|nested| nested.number("width").or_else(|| nested.number("pt")));
        Some(Self {
            color: Some(color_value(value).unwrap_or_else(|| defaults.line_color.clone())),
            width: width.filter(|w| *w >= 0.0),
        })
    }
}

/// `addSlide` options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideOptions {
    /// Normalized background color
    pub background: Option<String>,
}

impl SlideOptions {
    /// Read `background` (or `bkgd`)
    #[must_use]
    pub fn read(fields: &Fields<'_>, defaults: &StyleDefaults) -> Self {
        let background = fields
            .first(&["background", "bkgd"])
            .map(|v| color_value(v).unwrap_or_else(|| defaults.background.clone()));
        Self { background }
    }
}

/// One formatted run of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Text content
    pub text: String,
    /// Run-level formatting
    pub style: TextStyle,
}

/// `addText` options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    /// Text box placement
    pub geometry: Geometry,
    /// Box-level formatting
    pub style: TextStyle,
}

/// `addShape` options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeOptions {
    /// Placement
    pub geometry: Geometry,
    /// Normalized fill color
    pub fill: Option<String>,
    /// Outline
    pub line: Option<LineStyle>,
    /// Rotation in degrees
    pub rotate: Option<f64>,
    /// Corner radius for rounded rectangles (0..=1)
    pub rect_radius: Option<f64>,
}

impl ShapeOptions {
    /// Read shape keys
    #[must_use]
    pub fn read(fields: &Fields<'_>, defaults: &StyleDefaults) -> Self {
        Self {
            geometry: Geometry::read(fields),
            fill: fields.color("fill", &defaults.shape_fill),
            line: LineStyle::read(fields, "line", defaults),
            rotate: fields.number("rotate"),
            rect_radius: fields.number("rectRadius").map(|r| r.clamp(0.0, 1.0)),
        }
    }
}

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// Locator with an allowed scheme
    Path(String),
    /// `data:image/...` URI
    Data(String),
}

/// `addImage` options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Image bytes or locator
    pub source: ImageSource,
    /// Placement
    pub geometry: Geometry,
    /// Accessibility text
    pub alt_text: Option<String>,
}

/// One table cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell text
    pub text: String,
    /// Cell formatting
    pub style: TextStyle,
}

/// `addTable` options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Placement
    pub geometry: Geometry,
    /// Column widths in inches
    pub col_w: Vec<f64>,
    /// Table-wide formatting
    pub style: TextStyle,
    /// Cell borders
    pub border: Option<LineStyle>,
}

impl TableOptions {
    /// Read table keys
    #[must_use]
    pub fn read(fields: &Fields<'_>, defaults: &StyleDefaults) -> Self {
        let col_w = match fields.get("colW") {
            Some(value) => match value.as_array() {
                Some(items) => items
                    .iter()
                    .filter_map(|v| crate::sanitize::resolve_length(v, Axis::Horizontal, fields.slide()))
                    .collect(),
                None => crate::sanitize::resolve_length(value, Axis::Horizontal, fields.slide())
                    .into_iter()
                    .collect(),
            },
            None => Vec::new(),
        };
        Self {
            geometry: Geometry::read(fields),
            col_w,
            style: TextStyle::read(fields, defaults),
            border: LineStyle::read(fields, "border", defaults),
        }
    }
}

/// One chart series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    /// Legend name
    pub name: String,
    /// Category labels
    pub labels: Vec<String>,
    /// Values, one per label
    pub values: Vec<f64>,
}

/// `addChart` options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Placement
    pub geometry: Geometry,
    /// Normalized series palette
    pub colors: Vec<String>,
    /// Chart title
    pub title: Option<String>,
    /// Show legend
    pub show_legend: bool,
    /// Show data labels
    pub show_value: bool,
}

impl ChartOptions {
    /// Read chart keys; invalid palette entries are dropped
    #[must_use]
    pub fn read(fields: &Fields<'_>, defaults: &StyleDefaults) -> Self {
        let mut colors: Vec<String> = fields
            .get("chartColors")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(color_value).collect())
            .unwrap_or_default();
        if colors.is_empty() {
            colors.clone_from(&defaults.chart_colors);
        }
        Self {
            geometry: Geometry::read(fields),
            colors,
            title: fields.string("title"),
            show_legend: fields.flag("showLegend"),
            show_value: fields.flag("showValue"),
        }
    }
}
