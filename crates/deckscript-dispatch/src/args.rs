//! Argument evaluation and contract checking
//!
//! Raw argument texts from a [`CallRecord`] are evaluated against the
//! environment captured with the record, then matched against the
//! operation's [`ArgKind`] list. Arguments past the contract are ignored.

use crate::error::DispatchError;
use crate::model::{ChartSeries, StyleDefaults, TableCell, TextRun, TextStyle};
use crate::ops::{signature, ArgKind, ChartKind, ConstantSet, ShapeKind};
use crate::sanitize::Fields;
use deckscript_interp::{CallRecord, Evaluator, Object, Operation, SlideSize, Value};

/// One argument after contract checking
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Object argument
    Object(Object),
    /// Optional argument left out
    Absent,
    /// Unconstrained value
    Any(Value),
    /// Resolved shape constant
    Shape(ShapeKind),
    /// Resolved chart constant
    Chart(ChartKind),
}

impl Bound {
    /// Options object, empty when absent
    #[must_use]
    pub fn object(&self) -> Object {
        match self {
            Bound::Object(obj) => obj.clone(),
            _ => Object::new(),
        }
    }
}

/// Evaluate and check every argument of `record`
///
/// # Errors
/// `Eval` when an argument fails to evaluate, `Arguments` when a required
/// argument is missing or has the wrong kind.
pub fn bind(record: &CallRecord, evaluator: &Evaluator) -> Result<Vec<Bound>, DispatchError> {
    let op = record.operation();
    let expected = signature(op);
    if record.args().len() > expected.len() {
        tracing::debug!(
            "{}: ignoring {} extra argument(s)",
            op,
            record.args().len() - expected.len()
        );
    }

    expected
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let value = match record.args().get(i) {
                Some(text) => evaluator.evaluate(text, record.env()).map_err(|source| {
                    DispatchError::Eval {
                        operation: op,
                        index: i + 1,
                        source,
                    }
                })?,
                None => Value::Undefined,
            };
            check(op, i + 1, *kind, value)
        })
        .collect()
}

fn check(op: Operation, index: usize, kind: ArgKind, value: Value) -> Result<Bound, DispatchError> {
    match (kind, value) {
        (ArgKind::RequiredObject | ArgKind::OptionalObject, Value::Object(obj)) => {
            Ok(Bound::Object(obj))
        }
        (ArgKind::OptionalObject, Value::Undefined | Value::Null) => Ok(Bound::Absent),
        (ArgKind::RequiredObject | ArgKind::OptionalObject, other) => Err(DispatchError::arguments(
            op,
            format!("argument {index} must be an object, got {}", other.type_name()),
        )),
        (ArgKind::Any, Value::Undefined) => Err(DispatchError::arguments(
            op,
            format!("argument {index} is required"),
        )),
        (ArgKind::Any, other) => Ok(Bound::Any(other)),
        (ArgKind::Constant(set), Value::String(name)) => {
            let resolved = match set {
                ConstantSet::Shape => ShapeKind::from_name(&name).map(Bound::Shape),
                ConstantSet::Chart => ChartKind::from_name(&name).map(Bound::Chart),
            };
            resolved.ok_or_else(|| {
                DispatchError::arguments(op, format!("unknown {} `{name}`", set_label(set)))
            })
        }
        (ArgKind::Constant(set), other) => Err(DispatchError::arguments(
            op,
            format!(
                "argument {index} must name a {}, got {}",
                set_label(set),
                other.type_name()
            ),
        )),
    }
}

fn set_label(set: ConstantSet) -> &'static str {
    match set {
        ConstantSet::Shape => "shape",
        ConstantSet::Chart => "chart type",
    }
}

/// Text argument: a string, a number, or an array of `{text, options}` runs
///
/// # Errors
/// `Arguments` for any other shape.
pub fn text_runs(
    value: &Value,
    slide: SlideSize,
    defaults: &StyleDefaults,
) -> Result<Vec<TextRun>, DispatchError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(vec![TextRun {
            text: value.to_string(),
            style: TextStyle::default(),
        }]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => Ok(styled_text(obj, slide, defaults)),
                Value::String(_) | Value::Number(_) => Ok(TextRun {
                    text: item.to_string(),
                    style: TextStyle::default(),
                }),
                other => Err(DispatchError::arguments(
                    Operation::AddText,
                    format!("text run must be a string or object, got {}", other.type_name()),
                )),
            })
            .collect(),
        other => Err(DispatchError::arguments(
            Operation::AddText,
            format!("text must be a string or array of runs, got {}", other.type_name()),
        )),
    }
}

fn styled_text(obj: &Object, slide: SlideSize, defaults: &StyleDefaults) -> TextRun {
    let fields = Fields::new(obj, slide);
    let style = fields
        .object("options")
        .map(|opts| TextStyle::read(&Fields::new(opts, slide), defaults))
        .unwrap_or_default();
    TextRun {
        text: fields.string("text").unwrap_or_default(),
        style,
    }
}

/// Table rows: an array of arrays of strings, numbers or `{text, options}`
///
/// # Errors
/// `Arguments` when the rows or any row is not an array.
pub fn table_rows(
    value: &Value,
    slide: SlideSize,
    defaults: &StyleDefaults,
) -> Result<Vec<Vec<TableCell>>, DispatchError> {
    let rows = value.as_array().ok_or_else(|| {
        DispatchError::arguments(
            Operation::AddTable,
            format!("rows must be an array, got {}", value.type_name()),
        )
    })?;
    rows.iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = row.as_array().ok_or_else(|| {
                DispatchError::arguments(Operation::AddTable, format!("row {} is not an array", r + 1))
            })?;
            Ok(cells
                .iter()
                .map(|cell| match cell {
                    Value::Object(obj) => {
                        let run = styled_text(obj, slide, defaults);
                        TableCell {
                            text: run.text,
                            style: run.style,
                        }
                    }
                    Value::Undefined | Value::Null => TableCell::default(),
                    other => TableCell {
                        text: other.to_string(),
                        style: TextStyle::default(),
                    },
                })
                .collect())
        })
        .collect()
}

/// Chart data: an array of `{name, labels, values}` series
///
/// # Errors
/// `Arguments` when the data is not an array of objects or a value is not
/// numeric.
pub fn chart_series(value: &Value) -> Result<Vec<ChartSeries>, DispatchError> {
    let err = |reason: String| DispatchError::arguments(Operation::AddChart, reason);
    let items = value
        .as_array()
        .ok_or_else(|| err(format!("chart data must be an array, got {}", value.type_name())))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let series = item
                .as_object()
                .ok_or_else(|| err(format!("series {} is not an object", i + 1)))?;
            let labels: Vec<String> = series
                .get("labels")
                .and_then(Value::as_array)
                .map(|labels| labels.iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            let values = series
                .get("values")
                .and_then(Value::as_array)
                .unwrap_or_default()
                .iter()
                .map(|v| {
                    v.as_number()
                        .filter(|n| n.is_finite())
                        .ok_or_else(|| err(format!("series {} has a non-numeric value", i + 1)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ChartSeries {
                name: series
                    .get("name")
                    .filter(|v| !v.is_nullish())
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("Series {}", i + 1)),
                labels,
                values,
            })
        })
        .collect()
}
