//! Whitelisted operation table
//!
//! Each [`Operation`] has a fixed argument contract. Shape and chart kinds
//! are closed enums; snippets may name them as plain strings (`"rect"`) or
//! through the presentation constants (`pptx.ShapeType.rect`,
//! `pptx.shapes.RECTANGLE`), which [`presentation_constants`] provides.

use deckscript_interp::{Object, Operation, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected kind of one argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Object literal, must be present
    RequiredObject,
    /// Object literal or absent
    OptionalObject,
    /// Any value, must be present
    Any,
    /// Name from a backend constant set
    Constant(ConstantSet),
}

/// Backend-defined constant sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantSet {
    /// [`ShapeKind`]
    Shape,
    /// [`ChartKind`]
    Chart,
}

/// Argument contract for `op`
#[must_use]
pub fn signature(op: Operation) -> &'static [ArgKind] {
    use ArgKind::{Any, Constant, OptionalObject, RequiredObject};
    match op {
        Operation::AddSlide => &[OptionalObject],
        Operation::AddText => &[Any, RequiredObject],
        Operation::AddShape => &[Constant(ConstantSet::Shape), RequiredObject],
        Operation::AddImage => &[RequiredObject],
        Operation::AddTable => &[Any, OptionalObject],
        Operation::AddChart => &[Constant(ConstantSet::Chart), Any, OptionalObject],
    }
}

macro_rules! constant_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $table:ident {
            $( $variant:ident => $canonical:literal, $upper:literal $(, $alias:literal)* ; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                #[serde(rename = $canonical)]
                $variant,
            )+
        }

        const $table: &[($name, &str, &str, &[&str])] = &[
            $( ($name::$variant, $canonical, $upper, &[$($alias),*]), )+
        ];

        impl $name {
            /// Every kind, in table order
            pub fn all() -> impl Iterator<Item = Self> {
                $table.iter().map(|entry| entry.0)
            }

            /// Name used in snippets and serialized output
            #[must_use]
            pub fn canonical_name(self) -> &'static str {
                $table
                    .iter()
                    .find(|entry| entry.0 == self)
                    .map_or("", |entry| entry.1)
            }

            /// Upper-case constant name (`pptx.shapes.*` style)
            #[must_use]
            pub fn constant_name(self) -> &'static str {
                $table
                    .iter()
                    .find(|entry| entry.0 == self)
                    .map_or("", |entry| entry.2)
            }

            /// Resolve a name, ignoring case and underscores
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = fold_name(name);
                $table
                    .iter()
                    .find(|(_, canonical, upper, aliases)| {
                        fold_name(canonical) == wanted
                            || fold_name(upper) == wanted
                            || aliases.iter().any(|alias| fold_name(alias) == wanted)
                    })
                    .map(|entry| entry.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.canonical_name())
            }
        }
    };
}

constant_enum! {
    /// Drawable shape kinds
    ShapeKind, SHAPES {
        Rect => "rect", "RECTANGLE", "rectangle";
        RoundRect => "roundRect", "ROUNDED_RECTANGLE", "roundedRectangle";
        Ellipse => "ellipse", "OVAL", "circle";
        Line => "line", "LINE";
        Triangle => "triangle", "TRIANGLE", "isoscelesTriangle";
        RightTriangle => "rtTriangle", "RIGHT_TRIANGLE", "rightTriangle";
        Diamond => "diamond", "DIAMOND";
        Pentagon => "pentagon", "PENTAGON", "homePlate";
        Hexagon => "hexagon", "HEXAGON";
        Chevron => "chevron", "CHEVRON";
        RightArrow => "rightArrow", "RIGHT_ARROW", "arrow";
        LeftArrow => "leftArrow", "LEFT_ARROW";
        Star => "star5", "STAR_5_POINT", "star";
        Donut => "donut", "DONUT";
    }
}

constant_enum! {
    /// Chart kinds
    ChartKind, CHARTS {
        Bar => "bar", "BAR", "column";
        Line => "line", "LINE";
        Pie => "pie", "PIE";
        Doughnut => "doughnut", "DOUGHNUT", "donut";
        Area => "area", "AREA";
        Scatter => "scatter", "SCATTER";
        Radar => "radar", "RADAR";
    }
}

fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Constant tables bound under each presentation global
///
/// ```text
/// pptx.ShapeType.rect      == "rect"
/// pptx.shapes.RECTANGLE    == "rect"
/// pptx.ChartType.bar       == "bar"
/// pptx.charts.BAR          == "bar"
/// ```
#[must_use]
pub fn presentation_constants() -> Value {
    let mut shape_type = Object::new();
    let mut shapes = Object::new();
    for kind in ShapeKind::all() {
        let name = Value::from(kind.canonical_name());
        shape_type.insert(kind.canonical_name().to_string(), name.clone());
        shapes.insert(kind.constant_name().to_string(), name);
    }
    let mut chart_type = Object::new();
    let mut charts = Object::new();
    for kind in ChartKind::all() {
        let name = Value::from(kind.canonical_name());
        chart_type.insert(kind.canonical_name().to_string(), name.clone());
        charts.insert(kind.constant_name().to_string(), name);
    }

    let mut root = Object::new();
    root.insert("ShapeType".into(), Value::Object(shape_type));
    root.insert("shapes".into(), Value::Object(shapes));
    root.insert("ChartType".into(), Value::Object(chart_type));
    root.insert("charts".into(), Value::Object(charts));
    Value::Object(root)
}
