//! Runtime values
//!
//! A deliberately small, JavaScript-flavoured value model: enough to express
//! slide geometry, text, table rows and chart series, nothing more.

use crate::eval::Helper;
use indexmap::IndexMap;
use std::fmt;

/// Insertion-ordered object properties
pub type Object = IndexMap<String, Value>;

/// Bytes charged per array element or object property
pub(crate) const ENTRY_BYTES: usize = std::mem::size_of::<Value>();

/// A value produced by the evaluator
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing binding or property
    #[default]
    Undefined,
    /// Explicit `null`
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE-754 double, as in the source dialect
    Number(f64),
    /// String
    String(String),
    /// Array literal or accumulated array
    Array(Vec<Value>),
    /// Object literal
    Object(Object),
    /// Reference to a builtin helper (e.g. `Math.max` used as a value)
    Function(Helper),
}

impl Value {
    /// `NaN` marks "no value" on the arithmetic path
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// `undefined` or `null`
    #[inline]
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Approximate heap footprint in bytes
    ///
    /// String bytes plus [`ENTRY_BYTES`] per element or property, summed
    /// without recursion so deeply nested values cannot exhaust the stack.
    #[must_use]
    pub fn footprint(&self) -> usize {
        let mut total = 0usize;
        let mut pending = vec![self];
        while let Some(value) = pending.pop() {
            let own = match value {
                Value::String(s) => s.len(),
                Value::Array(items) => {
                    pending.extend(items);
                    items.len() * ENTRY_BYTES
                }
                Value::Object(map) => {
                    pending.extend(map.values());
                    map.keys().map(|k| k.len() + ENTRY_BYTES).sum()
                }
                _ => 0,
            };
            total = total.saturating_add(own);
        }
        total
    }

    /// JavaScript truthiness
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Numeric conversion (`Number(x)` semantics)
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_numeric_string(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [only] => only.to_number(),
                _ => f64::NAN,
            },
            Value::Undefined | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Number if this is a finite-or-infinite (non-NaN) numeric value
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as array
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as object
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Type name as `typeof` would report it
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// Property lookup (`value.name`); missing properties are `undefined`
    #[must_use]
    pub fn member(&self, name: &str) -> Value {
        match self {
            Value::Object(map) => map.get(name).cloned().unwrap_or_default(),
            Value::Array(items) if name == "length" => Value::Number(items.len() as f64),
            Value::String(s) if name == "length" => Value::Number(s.chars().count() as f64),
            Value::Array(_) | Value::String(_) => name
                .parse::<usize>()
                .map_or(Value::Undefined, |i| self.index(&Value::Number(i as f64))),
            _ => Value::Undefined,
        }
    }

    /// Index lookup (`value[key]`); out-of-range or missing keys are `undefined`
    #[must_use]
    pub fn index(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::Array(items), Value::Number(n)) => array_slot(*n)
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or_default(),
            (Value::String(s), Value::Number(n)) => array_slot(*n)
                .and_then(|i| s.chars().nth(i))
                .map_or(Value::Undefined, |c| Value::String(c.to_string())),
            (_, Value::String(name)) => self.member(name),
            (Value::Object(_), other) => self.member(&other.to_string()),
            _ => Value::Undefined,
        }
    }

    /// Strict equality (`===`)
    #[must_use]
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            // Arrays and objects compare by identity, which snapshots never share
            _ => false,
        }
    }

    /// Loose equality (`==`), restricted to primitive coercions
    #[must_use]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Number(_) | Value::String(_) | Value::Bool(_),
                Value::Number(_) | Value::String(_) | Value::Bool(_),
            ) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }
}

fn array_slot(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < usize::MAX as f64).then_some(n as usize)
}

fn parse_numeric_string(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return crate::eval::parse_hex(hex).unwrap_or(f64::NAN);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) => {
            t.parse::<f64>().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Format a number the way the source dialect prints it
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(helper) => write!(f, "function {}() {{ [native code] }}", helper.name()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Value::Object(map)
    }
}
