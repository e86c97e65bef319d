//! Expression evaluator
//!
//! `evaluate(text, env)` tries the supported forms in a fixed precedence
//! order:
//!
//! 1. literals (`"s"`, `'s'`, `12.5`, `true`, `null`, `undefined`)
//! 2. ternary `cond ? a : b` (first top-level `?` and its depth-matched `:`)
//! 3. helper calls (`centerX(w)`, `Math.max(a, b)`, ...) and the resource
//!    locator `chrome.runtime.getURL("path")`
//! 4. template literals with `${expr}` interpolation
//! 5. object and array literals
//! 6. identifier paths (`a.b[0].c`) resolved against the [`Environment`]
//! 7. arithmetic and logical expressions
//!
//! Anything else fails with [`EvalError::Unsupported`]. Object and array
//! literals silently drop entries that fail or evaluate to `NaN`, and path
//! lookups yield `undefined` for missing segments. Depth and value-size
//! limits are the exception: they fail the whole expression.

mod arith;
mod helpers;

pub(crate) use arith::{apply_binary, Op};
pub use helpers::Helper;

use crate::env::Environment;
use crate::error::EvalError;
use crate::resource::{is_safe_relative_path, BaseUrlResolver, ResourceResolver, RESOURCE_LOCATORS};
use crate::scanner;
use crate::value::{Object, Value, ENTRY_BYTES};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*)\s*\(").expect("valid call regex")
});

/// Slide dimensions in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideSize {
    /// Width in inches
    pub width: f64,
    /// Height in inches
    pub height: f64,
}

impl Default for SlideSize {
    /// 16:9 layout
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 5.625,
        }
    }
}

/// Evaluator settings
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOptions {
    /// Slide dimensions used by geometry helpers
    pub slide: SlideSize,
    /// Maximum recursion depth for nested expressions
    pub max_depth: usize,
    /// Scheme every resolved resource locator must start with
    pub internal_scheme: String,
    /// Largest [`Value::footprint`] any intermediate result may reach
    pub max_value_bytes: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            slide: SlideSize::default(),
            max_depth: 64,
            internal_scheme: "chrome-extension://".to_string(),
            max_value_bytes: 256 * 1024,
        }
    }
}

/// Turns expression text into a [`Value`]
#[derive(Debug, Clone)]
pub struct Evaluator {
    options: EvalOptions,
    resolver: Arc<dyn ResourceResolver>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvalOptions::default(), Arc::new(BaseUrlResolver::default()))
    }
}

/// One step of an identifier path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Name(&'a str),
    Index(&'a str),
}

impl Evaluator {
    /// Create evaluator
    #[inline]
    #[must_use]
    pub fn new(options: EvalOptions, resolver: Arc<dyn ResourceResolver>) -> Self {
        Self { options, resolver }
    }

    /// Evaluator settings
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Evaluate `text` against `env`
    ///
    /// # Errors
    /// `Unsupported` for text outside the grammar, `Scan` for unbalanced
    /// delimiters, `TooDeep` past the nesting limit, `TooLarge` past the
    /// value budget, plus helper and resource locator failures.
    pub fn evaluate(&self, text: &str, env: &Environment) -> Result<Value, EvalError> {
        self.eval_at(text, env, 0)
    }

    /// Pass `value` through unless its footprint exceeds the value budget
    ///
    /// # Errors
    /// `TooLarge` carrying the configured budget.
    pub fn within_budget(&self, value: Value) -> Result<Value, EvalError> {
        self.check_budget(value.footprint())?;
        Ok(value)
    }

    /// Fail once `bytes` passes the value budget
    pub(crate) fn check_budget(&self, bytes: usize) -> Result<(), EvalError> {
        if bytes > self.options.max_value_bytes {
            return Err(EvalError::TooLarge(self.options.max_value_bytes));
        }
        Ok(())
    }

    pub(crate) fn eval_at(
        &self,
        text: &str,
        env: &Environment,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if depth > self.options.max_depth {
            return Err(EvalError::TooDeep(self.options.max_depth));
        }
        let text = unwrap_parens(text.trim())?;
        if text.is_empty() {
            return Err(EvalError::unsupported(text));
        }

        if let Some(value) = parse_literal(text)? {
            return Ok(value);
        }
        if let Some((cond, then, otherwise)) = split_ternary(text)? {
            let branch = if self.eval_at(cond, env, depth + 1)?.truthy() {
                then
            } else {
                otherwise
            };
            return self.eval_at(branch, env, depth + 1);
        }
        if let Some((callee, args)) = parse_call(text)? {
            return self.eval_call(&callee, &args, env, depth);
        }
        if text.starts_with('`') && scanner::string_end(text, 0)? == text.len() - 1 {
            return self.eval_template(&text[1..text.len() - 1], env, depth);
        }
        if let Some(value) = self.eval_collection(text, env, depth)? {
            return Ok(value);
        }
        if let Some((root, segments)) = parse_path(text)? {
            return Ok(self.resolve_path(root, &segments, env, depth));
        }
        arith::evaluate(self, text, env, depth)
    }

    fn eval_call(
        &self,
        callee: &str,
        args: &[&str],
        env: &Environment,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if RESOURCE_LOCATORS.contains(&callee) {
            return self.resolve_resource(args, env, depth);
        }
        let helper = Helper::from_name(callee)
            .ok_or_else(|| EvalError::unsupported(format!("call to {callee}")))?;
        let values = args
            .iter()
            .map(|arg| self.eval_at(arg, env, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        helper.call(&values, self.options.slide)
    }

    fn resolve_resource(
        &self,
        args: &[&str],
        env: &Environment,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let [arg] = args else {
            return Err(EvalError::UnsafeResourcePath(args.join(", ")));
        };
        let relative = match self.eval_at(arg, env, depth + 1)? {
            Value::String(s) => s,
            other => return Err(EvalError::UnsafeResourcePath(other.to_string())),
        };
        if !is_safe_relative_path(&relative) {
            return Err(EvalError::UnsafeResourcePath(relative));
        }
        let resolved = self.resolver.resolve(&relative);
        if !resolved.starts_with(&self.options.internal_scheme) {
            return Err(EvalError::ForeignResourceScheme(resolved));
        }
        Ok(Value::String(resolved))
    }

    fn eval_template(
        &self,
        inner: &str,
        env: &Environment,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let bytes = inner.as_bytes();
        let mut out = String::with_capacity(inner.len());
        let mut chunk_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    out.push_str(&unescape(&inner[chunk_start..i]));
                    let span = scanner::find_matching(inner, i + 1)?;
                    let value = self.eval_at(span.inner, env, depth + 1)?.to_string();
                    self.check_budget(out.len().saturating_add(value.len()))?;
                    out.push_str(&value);
                    i = span.close + 1;
                    chunk_start = i;
                }
                _ => i += 1,
            }
        }
        if chunk_start < bytes.len() {
            out.push_str(&unescape(&inner[chunk_start..]));
        }
        Ok(Value::String(out))
    }

    fn eval_collection(
        &self,
        text: &str,
        env: &Environment,
        depth: usize,
    ) -> Result<Option<Value>, EvalError> {
        let opener = text.as_bytes()[0];
        if opener != b'{' && opener != b'[' {
            return Ok(None);
        }
        let span = scanner::find_matching(text, 0)?;
        if span.close != text.len() - 1 {
            return Ok(None);
        }
        let entries = scanner::split_top_level(span.inner, b',')?;
        if opener == b'[' {
            return Ok(Some(Value::Array(self.eval_elements(&entries, env, depth)?)));
        }
        Ok(Some(Value::Object(self.eval_properties(&entries, env, depth)?)))
    }

    fn eval_elements(
        &self,
        entries: &[&str],
        env: &Environment,
        depth: usize,
    ) -> Result<Vec<Value>, EvalError> {
        let mut items = Vec::with_capacity(entries.len());
        let mut used = 0usize;
        for entry in entries {
            if let Some(spread) = entry.strip_prefix("...") {
                match self.eval_at(spread, env, depth + 1) {
                    Ok(Value::Array(values)) => {
                        let bytes: usize = values.iter().map(|v| v.footprint() + ENTRY_BYTES).sum();
                        used = used.saturating_add(bytes);
                        self.check_budget(used)?;
                        items.extend(values);
                    }
                    Err(e) if e.is_limit() => return Err(e),
                    _ => {}
                }
                continue;
            }
            match self.eval_at(entry, env, depth + 1) {
                Ok(value) if !value.is_nan() => {
                    used = used.saturating_add(value.footprint() + ENTRY_BYTES);
                    self.check_budget(used)?;
                    items.push(value);
                }
                Ok(_) => tracing::debug!(element = %entry, "dropping NaN array element"),
                Err(e) if e.is_limit() => return Err(e),
                Err(e) => tracing::debug!(element = %entry, error = %e, "dropping array element"),
            }
        }
        Ok(items)
    }

    fn eval_properties(
        &self,
        entries: &[&str],
        env: &Environment,
        depth: usize,
    ) -> Result<Object, EvalError> {
        let mut map = Object::new();
        let mut used = 0usize;
        for entry in entries {
            if let Some(spread) = entry.strip_prefix("...") {
                match self.eval_at(spread, env, depth + 1) {
                    Ok(Value::Object(props)) => {
                        let bytes: usize = props
                            .iter()
                            .map(|(k, v)| k.len() + ENTRY_BYTES + v.footprint())
                            .sum();
                        used = used.saturating_add(bytes);
                        self.check_budget(used)?;
                        map.extend(props);
                    }
                    Err(e) if e.is_limit() => return Err(e),
                    _ => {}
                }
                continue;
            }
            let (key, value_text) = match scanner::find_top_level(entry, |b, i| b[i] == b':')? {
                Some(colon) => match self.property_key(entry[..colon].trim(), env, depth) {
                    Some(key) => (key, &entry[colon + 1..]),
                    None => continue,
                },
                None if is_identifier(entry) => ((*entry).to_string(), *entry),
                None => continue,
            };
            match self.eval_at(value_text, env, depth + 1) {
                Ok(value) if !value.is_nan() => {
                    used = used.saturating_add(key.len() + ENTRY_BYTES + value.footprint());
                    self.check_budget(used)?;
                    map.insert(key, value);
                }
                Ok(_) => tracing::debug!(property = %key, "dropping NaN property"),
                Err(e) if e.is_limit() => return Err(e),
                Err(e) => tracing::debug!(property = %key, error = %e, "dropping property"),
            }
        }
        Ok(map)
    }

    fn property_key(&self, raw: &str, env: &Environment, depth: usize) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        if is_identifier(raw) || raw.bytes().all(|b| b.is_ascii_digit()) {
            return Some(raw.to_string());
        }
        if raw.starts_with('[') && raw.ends_with(']') && raw.len() >= 2 {
            return self
                .eval_at(&raw[1..raw.len() - 1], env, depth + 1)
                .ok()
                .map(|v| v.to_string());
        }
        match parse_literal(raw) {
            Ok(Some(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    fn resolve_path(
        &self,
        root: &str,
        segments: &[Segment<'_>],
        env: &Environment,
        depth: usize,
    ) -> Value {
        if !env.contains(root) && segments.iter().all(|s| matches!(s, Segment::Name(_))) {
            let dotted = std::iter::once(root)
                .chain(segments.iter().filter_map(|s| match s {
                    Segment::Name(n) => Some(*n),
                    Segment::Index(_) => None,
                }))
                .collect::<Vec<_>>()
                .join(".");
            if let Some(helper) = Helper::from_name(&dotted) {
                return Value::Function(helper);
            }
        }

        let mut current = env.get(root).cloned().unwrap_or_else(|| builtin_global(root));
        for segment in segments {
            if current.is_nullish() {
                return Value::Undefined;
            }
            current = match segment {
                Segment::Name(name) => current.member(name),
                Segment::Index(expr) => match self.eval_at(expr, env, depth + 1) {
                    Ok(key) => current.index(&key),
                    Err(_) => Value::Undefined,
                },
            };
        }
        current
    }
}

fn builtin_global(name: &str) -> Value {
    match name {
        "Math" => {
            let mut math = Object::new();
            math.insert("PI".into(), Value::Number(std::f64::consts::PI));
            math.insert("E".into(), Value::Number(std::f64::consts::E));
            Value::Object(math)
        }
        _ => Value::Undefined,
    }
}

fn unwrap_parens(mut text: &str) -> Result<&str, EvalError> {
    while text.starts_with('(') {
        let span = scanner::find_matching(text, 0)?;
        if span.close != text.len() - 1 {
            break;
        }
        text = span.inner.trim();
    }
    Ok(text)
}

#[inline]
pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

#[inline]
pub(crate) fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Whether `text` is a single identifier
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    let bytes = text.as_bytes();
    !bytes.is_empty() && is_ident_start(bytes[0]) && bytes[1..].iter().all(|&b| is_ident_continue(b))
}

/// End index (exclusive) of the identifier starting at `start`
pub(crate) fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && is_ident_continue(bytes[i]) {
        i += 1;
    }
    i
}

fn parse_literal(text: &str) -> Result<Option<Value>, EvalError> {
    let value = match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        "undefined" => Value::Undefined,
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        _ => {
            let Some(&first) = text.as_bytes().first() else {
                return Ok(None);
            };
            if first == b'"' || first == b'\'' {
                if scanner::string_end(text, 0)? != text.len() - 1 {
                    return Ok(None);
                }
                return Ok(Some(Value::String(unescape(&text[1..text.len() - 1]))));
            }
            match parse_number(text) {
                Some(n) => Value::Number(n),
                None => return Ok(None),
            }
        }
    };
    Ok(Some(value))
}

/// Parse a numeric literal (decimal, exponent or `0x` hex, optional sign)
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let first = *body.as_bytes().first()?;
    if !(first.is_ascii_digit() || first == b'.') {
        return None;
    }
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        parse_hex(hex)?
    } else if body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-' | b'_'))
    {
        body.replace('_', "").parse::<f64>().ok()?
    } else {
        return None;
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Digits after a `0x` prefix; signs, separators and empty bodies are rejected
pub(crate) fn parse_hex(digits: &str) -> Option<f64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(
        digits
            .bytes()
            .fold(0.0, |acc, b| acc * 16.0 + f64::from((b as char).to_digit(16).unwrap_or(0))),
    )
}

/// Decode backslash escapes in a string literal body
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&code),
                }
            }
            Some('x') => {
                let code: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&code),
                }
            }
            Some('\n') | None => {}
            Some(other) => out.push(other),
        }
    }
    out
}

type Ternary<'a> = (&'a str, &'a str, &'a str);

fn split_ternary(text: &str) -> Result<Option<Ternary<'_>>, EvalError> {
    let bytes = text.as_bytes();
    let mut question = None;
    let mut nested = 0usize;
    for i in scanner::top_level_indices(text)? {
        match bytes[i] {
            b'?' => {
                let next = bytes.get(i + 1).copied();
                let optional_chain =
                    next == Some(b'.') && !bytes.get(i + 2).is_some_and(u8::is_ascii_digit);
                let nullish = next == Some(b'?') || (i > 0 && bytes[i - 1] == b'?');
                if optional_chain || nullish {
                    continue;
                }
                if question.is_none() {
                    question = Some(i);
                } else {
                    nested += 1;
                }
            }
            b':' => {
                if let Some(q) = question {
                    if nested == 0 {
                        return Ok(Some((&text[..q], &text[q + 1..i], &text[i + 1..])));
                    }
                    nested -= 1;
                }
            }
            _ => {}
        }
    }
    Ok(None)
}

fn parse_call(text: &str) -> Result<Option<(String, Vec<&str>)>, EvalError> {
    let Some(head) = CALL_HEAD.captures(text) else {
        return Ok(None);
    };
    let whole = head.get(0).map_or(0, |m| m.end());
    let span = scanner::find_matching(text, whole - 1)?;
    if span.close != text.len() - 1 {
        return Ok(None);
    }
    let callee = head
        .get(1)
        .map_or("", |m| m.as_str())
        .split('.')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(".");
    Ok(Some((callee, scanner::split_top_level(span.inner, b',')?)))
}

type Path<'a> = (&'a str, Vec<Segment<'a>>);

fn parse_path(text: &str) -> Result<Option<Path<'_>>, EvalError> {
    let bytes = text.as_bytes();
    if !is_ident_start(bytes[0]) {
        return Ok(None);
    }
    let root_end = ident_end(bytes, 0);
    let root = &text[..root_end];
    let mut segments = Vec::new();
    let mut i = root_end;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'?' if bytes.get(i + 1) == Some(&b'.') => {
                i += 2;
                if bytes.get(i) == Some(&b'[') {
                    continue;
                }
                if !bytes.get(i).copied().is_some_and(is_ident_start) {
                    return Ok(None);
                }
                let end = ident_end(bytes, i);
                segments.push(Segment::Name(&text[i..end]));
                i = end;
            }
            b'.' => {
                i += 1;
                while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }
                if !bytes.get(i).copied().is_some_and(is_ident_start) {
                    return Ok(None);
                }
                let end = ident_end(bytes, i);
                segments.push(Segment::Name(&text[i..end]));
                i = end;
            }
            b'[' => {
                let span = scanner::find_matching(text, i)?;
                segments.push(Segment::Index(span.inner));
                i = span.close + 1;
            }
            _ => return Ok(None),
        }
    }
    Ok(Some((root, segments)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env() -> Environment {
        let mut env = Environment::new();
        env.declare("n", Value::Number(3.0));
        env.declare("title", Value::from("Q3"));
        env.declare(
            "items",
            Value::Array(vec![
                Value::Object(Object::from_iter([("label".to_string(), Value::from("A"))])),
                Value::Object(Object::from_iter([("label".to_string(), Value::from("B"))])),
            ]),
        );
        env
    }

    fn eval(text: &str) -> Value {
        Evaluator::default().evaluate(text, &env()).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(eval("'hi'"), Value::from("hi"));
        assert_eq!(eval(r#""a\"b""#), Value::from("a\"b"));
        assert_eq!(eval("-2.5"), Value::Number(-2.5));
        assert_eq!(eval("0x10"), Value::Number(16.0));
        assert_eq!(eval("null"), Value::Null);
        assert_eq!(eval("true"), Value::Bool(true));
    }

    #[test]
    fn signed_hex_bodies_are_not_numbers() {
        assert_eq!(parse_number("0xff"), Some(255.0));
        assert_eq!(parse_number("-0x10"), Some(-16.0));
        assert_eq!(parse_number("0x-10"), None);
        assert_eq!(parse_number("0x+1"), None);
        assert_eq!(parse_number("0x"), None);
        assert!(Evaluator::default().evaluate("0x-10", &env()).is_err());
    }

    #[test]
    fn value_budget_stops_growth() {
        let evaluator = Evaluator::new(
            EvalOptions {
                max_value_bytes: 8,
                ..EvalOptions::default()
            },
            Arc::new(BaseUrlResolver::default()),
        );
        let mut env = Environment::new();
        env.declare("s", Value::from("abcde"));

        assert_eq!(evaluator.evaluate("s + 'x'", &env).unwrap(), Value::from("abcdex"));
        for text in ["s + s", "`${s}${s}`", "[s, s]", "{a: s, b: s}", "n + (s + s)"] {
            let err = evaluator.evaluate(text, &env).unwrap_err();
            assert_eq!(err, EvalError::TooLarge(8), "{text}");
        }
    }

    #[test]
    fn ternary_picks_outer_pair() {
        assert_eq!(eval("n > 2 ? 'big' : 'small'"), Value::from("big"));
        assert_eq!(eval("n > 5 ? 'a' : n > 2 ? 'b' : 'c'"), Value::from("b"));
        assert_eq!(eval("n > 2 ? (n > 5 ? 1 : 2) : 3"), Value::Number(2.0));
        assert_eq!(eval("n ? 'x:y' : 'z'"), Value::from("x:y"));
    }

    #[test]
    fn helpers_evaluate_arguments() {
        assert_eq!(eval("centerX(4)"), Value::Number(3.0));
        assert_eq!(eval("Math.max(n, 1 + 5)"), Value::Number(6.0));
        assert_eq!(eval("Math.round(2.5)"), Value::Number(3.0));
    }

    #[test]
    fn unknown_call_is_unsupported() {
        let err = Evaluator::default().evaluate("alert(1)", &env()).unwrap_err();
        assert!(matches!(err, EvalError::Unsupported(_)));
    }

    #[test]
    fn template_interpolation() {
        assert_eq!(eval("`Slide ${n + 1}: ${title}`"), Value::from("Slide 4: Q3"));
        assert_eq!(eval("`${items[1].label}`"), Value::from("B"));
    }

    #[test]
    fn object_literal_drops_failures() {
        let value = eval("{x: n, y: 'a' * 2, z: nope(1), 'w': 2, n}");
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("x"), Some(&Value::Number(3.0)));
        assert!(!obj.contains_key("y"));
        assert!(!obj.contains_key("z"));
        assert_eq!(obj.get("w"), Some(&Value::Number(2.0)));
        assert_eq!(obj.get("n"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn object_spread_and_array_literal() {
        let value = eval("{...gridCell(1, 2, 3, 1), fill: 'FF0000'}");
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("w"), Some(&Value::Number(3.0)));
        assert_eq!(obj.get("fill"), Some(&Value::from("FF0000")));

        assert_eq!(
            eval("[1, 'x' - 1, n]"),
            Value::Array(vec![Value::Number(1.0), Value::Number(3.0)])
        );
    }

    #[test]
    fn paths_resolve_or_undefined() {
        assert_eq!(eval("items[0].label"), Value::from("A"));
        assert_eq!(eval("items.length"), Value::Number(2.0));
        assert_eq!(eval("items[n - 2].label"), Value::from("B"));
        assert_eq!(eval("items[9].label"), Value::Undefined);
        assert_eq!(eval("missing.deeply.nested"), Value::Undefined);
        assert_eq!(eval("Math.max"), Value::Function(Helper::Max));
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("-n + 10 % 4"), Value::Number(-1.0));
        assert_eq!(eval("'Item ' + (n + 1)"), Value::from("Item 4"));
        assert!(eval("missing * 2").is_nan());
    }

    #[test]
    fn resource_locator() {
        let value = eval("chrome.runtime.getURL('icons/star.svg')");
        assert_eq!(value, Value::from("chrome-extension://deckscript/icons/star.svg"));

        let err = Evaluator::default()
            .evaluate("chrome.runtime.getURL('https://evil.example/x')", &env())
            .unwrap_err();
        assert!(matches!(err, EvalError::UnsafeResourcePath(_)));
    }

    #[test]
    fn foreign_scheme_rejected() {
        let evaluator = Evaluator::new(
            EvalOptions::default(),
            Arc::new(BaseUrlResolver::new("https://cdn.example")),
        );
        let err = evaluator
            .evaluate("chrome.runtime.getURL('icons/a.svg')", &Environment::new())
            .unwrap_err();
        assert!(matches!(err, EvalError::ForeignResourceScheme(_)));
    }

    #[test]
    fn depth_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let evaluator = Evaluator::default();
        // Pure paren towers unwrap iteratively
        assert_eq!(evaluator.evaluate(&deep, &Environment::new()).unwrap(), Value::Number(1.0));

        let nested = format!("{}1{}", "[".repeat(200), "]".repeat(200));
        let err = evaluator.evaluate(&nested, &Environment::new()).unwrap_err();
        assert!(matches!(err, EvalError::TooDeep(64)));
    }
}
