//! Builtin helper functions
//!
//! Layout helpers work in inches against the configured [`SlideSize`]. The
//! numeric helpers mirror their `Math.*` / global counterparts closely enough
//! for slide geometry; they are not a general numeric library.

use super::SlideSize;
use crate::error::EvalError;
use crate::value::{Object, Value};

/// Callable builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `centerX(width)`: left edge that centers `width` horizontally
    CenterX,
    /// `centerY(height)`: top edge that centers `height` vertically
    CenterY,
    /// `spaceEvenly(index, count, size, start?, extent?)`
    SpaceEvenly,
    /// `gridCell(index, cols, cellW, cellH, originX?, originY?, gap?)`
    GridCell,
    /// `Math.min`
    Min,
    /// `Math.max`
    Max,
    /// `Math.round`
    Round,
    /// `Math.floor`
    Floor,
    /// `Math.ceil`
    Ceil,
    /// `Math.abs`
    Abs,
    /// `Math.sqrt`
    Sqrt,
    /// `Math.pow`
    Pow,
    /// `Number(x)`
    ToNumber,
    /// `String(x)`
    ToString,
    /// `parseInt(s)`
    ParseInt,
    /// `parseFloat(s)`
    ParseFloat,
}

const NAMES: &[(&str, Helper)] = &[
    ("centerX", Helper::CenterX),
    ("centerY", Helper::CenterY),
    ("spaceEvenly", Helper::SpaceEvenly),
    ("gridCell", Helper::GridCell),
    ("Math.min", Helper::Min),
    ("Math.max", Helper::Max),
    ("Math.round", Helper::Round),
    ("Math.floor", Helper::Floor),
    ("Math.ceil", Helper::Ceil),
    ("Math.abs", Helper::Abs),
    ("Math.sqrt", Helper::Sqrt),
    ("Math.pow", Helper::Pow),
    ("Number", Helper::ToNumber),
    ("String", Helper::ToString),
    ("parseInt", Helper::ParseInt),
    ("parseFloat", Helper::ParseFloat),
];

impl Helper {
    /// Every helper name a snippet may call
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMES.iter().map(|(name, _)| *name)
    }

    /// Look up a helper by its (dotted) callee name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.iter().find(|(n, _)| *n == name).map(|(_, h)| *h)
    }

    /// Callee name as written in snippets
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, h)| *h == self)
            .map_or("anonymous", |(n, _)| n)
    }

    /// Invoke with already-evaluated arguments
    ///
    /// # Errors
    /// `HelperArguments` when a required argument is missing or not numeric.
    pub fn call(self, args: &[Value], slide: SlideSize) -> Result<Value, EvalError> {
        let n = |i: usize| args.get(i).map_or(f64::NAN, Value::to_number);
        let number = match self {
            Helper::CenterX => (slide.width - self.required(args, 0)?) / 2.0,
            Helper::CenterY => (slide.height - self.required(args, 0)?) / 2.0,
            Helper::SpaceEvenly => {
                let index = self.required(args, 0)?;
                let count = self.required(args, 1)?;
                let size = self.required(args, 2)?;
                let start = self.optional(args, 3, 0.0)?;
                let extent = self.optional(args, 4, slide.width)?;
                if count <= 0.0 {
                    return Err(EvalError::helper(self.name(), "count must be positive"));
                }
                let gap = (extent - count * size) / (count + 1.0);
                start + gap + index * (size + gap)
            }
            Helper::GridCell => return self.grid_cell(args),
            Helper::Min => args
                .iter()
                .map(Value::to_number)
                .try_fold(f64::INFINITY, |acc, v| (!v.is_nan()).then(|| acc.min(v)))
                .unwrap_or(f64::NAN),
            Helper::Max => args
                .iter()
                .map(Value::to_number)
                .try_fold(f64::NEG_INFINITY, |acc, v| (!v.is_nan()).then(|| acc.max(v)))
                .unwrap_or(f64::NAN),
            Helper::Round => (n(0) + 0.5).floor(),
            Helper::Floor => n(0).floor(),
            Helper::Ceil => n(0).ceil(),
            Helper::Abs => n(0).abs(),
            Helper::Sqrt => n(0).sqrt(),
            Helper::Pow => n(0).powf(n(1)),
            Helper::ToNumber => args.first().map_or(0.0, Value::to_number),
            Helper::ToString => {
                return Ok(Value::String(
                    args.first().map(ToString::to_string).unwrap_or_default(),
                ))
            }
            Helper::ParseInt => leading_number(args.first(), false),
            Helper::ParseFloat => leading_number(args.first(), true),
        };
        Ok(Value::Number(number))
    }

    fn required(self, args: &[Value], i: usize) -> Result<f64, EvalError> {
        match args.get(i).and_then(numeric) {
            Some(n) => Ok(n),
            None => Err(EvalError::helper(
                self.name(),
                format!("argument {} must be a number", i + 1),
            )),
        }
    }

    fn optional(self, args: &[Value], i: usize, default: f64) -> Result<f64, EvalError> {
        match args.get(i) {
            None | Some(Value::Undefined) => Ok(default),
            Some(_) => self.required(args, i),
        }
    }

    fn grid_cell(self, args: &[Value]) -> Result<Value, EvalError> {
        let index = self.required(args, 0)?;
        let cols = self.required(args, 1)?;
        let cell_w = self.required(args, 2)?;
        let cell_h = self.required(args, 3)?;
        let origin_x = self.optional(args, 4, 0.5)?;
        let origin_y = self.optional(args, 5, 1.0)?;
        let gap = self.optional(args, 6, 0.2)?;
        if cols < 1.0 {
            return Err(EvalError::helper(self.name(), "cols must be at least 1"));
        }
        let cols = cols.floor();
        let col = (index % cols).floor();
        let row = (index / cols).floor();

        let mut cell = Object::new();
        cell.insert("x".into(), Value::Number(origin_x + col * (cell_w + gap)));
        cell.insert("y".into(), Value::Number(origin_y + row * (cell_h + gap)));
        cell.insert("w".into(), Value::Number(cell_w));
        cell.insert("h".into(), Value::Number(cell_h));
        Ok(Value::Object(cell))
    }
}

/// Numeric value of an argument, accepting numeric strings
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if !n.is_nan() => Some(*n),
        Value::String(_) | Value::Bool(_) => Some(value.to_number()).filter(|n| !n.is_nan()),
        _ => None,
    }
}

/// `parseInt` / `parseFloat`: longest numeric prefix after leading whitespace
fn leading_number(value: Option<&Value>, fractional: bool) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    if let Value::Number(n) = value {
        return if fractional { *n } else { n.trunc() };
    }
    let text = value.to_string();
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let digits_start = end;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if fractional && !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if end == digits_start || (seen_dot && end == digits_start + 1) {
        return f64::NAN;
    }
    text[..end].parse().unwrap_or(f64::NAN)
}
