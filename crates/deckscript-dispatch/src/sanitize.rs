//! Domain sanitization: colors, geometry and image locators
//!
//! Everything here is lossy on purpose. A value that cannot be normalized is
//! dropped, and callers substitute a configured default instead of passing
//! raw snippet text through to the backend.

use deckscript_interp::{Object, SlideSize, Value};
use once_cell::sync::Lazy;
use regex::Regex;

static RGB_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^rgba?\(\s*([0-9.]+%?)\s*[,\s]\s*([0-9.]+%?)\s*[,\s]\s*([0-9.]+%?)\s*(?:[,/]\s*[0-9.]+%?\s*)?\)$")
        .expect("rgb() pattern")
});

/// CSS names accepted in color fields
const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "000000"),
    ("white", "FFFFFF"),
    ("red", "FF0000"),
    ("green", "008000"),
    ("blue", "0000FF"),
    ("yellow", "FFFF00"),
    ("orange", "FFA500"),
    ("purple", "800080"),
    ("gray", "808080"),
    ("grey", "808080"),
    ("navy", "000080"),
    ("teal", "008080"),
    ("silver", "C0C0C0"),
    ("maroon", "800000"),
];

/// Normalize a color to six upper-case hex digits
///
/// Accepts `#rrggbb`, `rrggbb`, `#rgb`, `rgb`, `rgb()`/`rgba()` (alpha is
/// discarded) and a handful of CSS names. Returns `None` for anything else.
#[must_use]
pub fn normalize_color(input: &str) -> Option<String> {
    let text = input.trim();
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        match hex.len() {
            6 => return Some(hex.to_ascii_uppercase()),
            3 => {
                return Some(
                    hex.chars()
                        .flat_map(|c| [c, c])
                        .collect::<String>()
                        .to_ascii_uppercase(),
                )
            }
            _ => {}
        }
    }
    if let Some(caps) = RGB_FUNCTION.captures(text) {
        let mut out = String::with_capacity(6);
        for i in 1..=3 {
            let channel = channel(caps.get(i)?.as_str())?;
            out.push_str(&format!("{channel:02X}"));
        }
        return Some(out);
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(text))
        .map(|(_, hex)| (*hex).to_string())
}

fn channel(text: &str) -> Option<u8> {
    let value = match text.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok()? * 2.55,
        None => text.parse::<f64>().ok()?,
    };
    (0.0..=255.0)
        .contains(&value)
        .then(|| value.round() as u8)
}

/// Normalize a color-bearing value: a string or `{color: ...}`
#[must_use]
pub fn color_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_color(s),
        Value::Object(obj) => obj.get("color").and_then(color_value),
        _ => None,
    }
}

/// Which slide dimension a percentage refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `x`, `w`: slide width
    Horizontal,
    /// `y`, `h`: slide height
    Vertical,
}

/// Resolve a length to inches
///
/// Numbers are inches already; `"NN%"` is a share of the slide dimension on
/// `axis`; numeric strings are accepted as inches.
#[must_use]
pub fn resolve_length(value: &Value, axis: Axis, slide: SlideSize) -> Option<f64> {
    let inches = match value {
        Value::Number(n) => *n,
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => {
                    let extent = match axis {
                        Axis::Horizontal => slide.width,
                        Axis::Vertical => slide.height,
                    };
                    pct.trim().parse::<f64>().ok()? / 100.0 * extent
                }
                None => s.parse::<f64>().ok()?,
            }
        }
        _ => return None,
    };
    inches.is_finite().then_some(inches)
}

/// Whether an image locator uses one of `schemes`
#[must_use]
pub fn has_allowed_scheme(locator: &str, schemes: &[String]) -> bool {
    let lower = locator.trim_start().to_ascii_lowercase();
    schemes
        .iter()
        .any(|scheme| lower.starts_with(&scheme.to_ascii_lowercase()))
}

/// Typed reads from an options object
///
/// Every accessor returns `None` when the key is missing or the value cannot
/// be sanitized.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    object: &'a Object,
    slide: SlideSize,
}

impl<'a> Fields<'a> {
    /// Wrap an options object
    #[must_use]
    pub fn new(object: &'a Object, slide: SlideSize) -> Self {
        Self { object, slide }
    }

    /// Raw value, treating `undefined`/`null` as missing
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_nullish())
    }

    /// First present key among `keys`
    #[must_use]
    pub fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Length in inches
    #[must_use]
    pub fn length(&self, key: &str, axis: Axis) -> Option<f64> {
        self.get(key).and_then(|v| resolve_length(v, axis, self.slide))
    }

    /// Finite number
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)
            .map(Value::to_number)
            .filter(|n| n.is_finite())
    }

    /// Truthiness, `false` when missing
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(Value::truthy)
    }

    /// Display string of a present value
    #[must_use]
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(ToString::to_string)
    }

    /// Normalized color, or `fallback` when present but unparseable
    #[must_use]
    pub fn color(&self, key: &str, fallback: &str) -> Option<String> {
        let value = self.get(key)?;
        Some(color_value(value).unwrap_or_else(|| {
            tracing::debug!("Dropping unparseable color in `{}`", key);
            fallback.to_string()
        }))
    }

    /// Nested object
    #[must_use]
    pub fn object(&self, key: &str) -> Option<&'a Object> {
        self.get(key).and_then(Value::as_object)
    }

    /// Slide dimensions percentages resolve against
    #[must_use]
    pub fn slide(&self) -> SlideSize {
        self.slide
    }
}
