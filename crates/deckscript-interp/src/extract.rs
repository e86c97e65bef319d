//! Statement extractor
//!
//! Walks a comment-stripped snippet top to bottom. At every step the earliest
//! recognised construct that does not start inside a string literal is
//! handled:
//!
//! | Construct | Effect |
//! |---|---|
//! | `for (x of EXPR)` / `for (let i = 0; i < N; i++)` | body unrolled per element |
//! | `EXPR.forEach((item, i) => { ... })` | body unrolled per element |
//! | `if (c) { ... } else { ... }` | chosen branch extracted |
//! | `while`, `switch`, `do`, function bodies | skipped, no records |
//! | `let/const/var x = e`, `x = e`, `x += e`, `x++` | environment updated |
//! | `const {a, b} = e` | destructured into the environment |
//! | `rows.push(e, ...)` | array binding extended |
//! | `recv.addText(...)` and the other operations | [`CallRecord`] emitted |
//!
//! Anything that fails to scan or evaluate is skipped and reported in
//! [`Extraction::skipped`]; extraction itself never fails.

use crate::env::Environment;
use crate::error::ScanError;
use crate::eval::{apply_binary, is_identifier, Evaluator, Op};
use crate::record::{CallRecord, Operation};
use crate::scanner;
use crate::value::{Value, ENTRY_BYTES};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid extractor regex")
}

static FOR_HEAD: Lazy<Regex> = Lazy::new(|| compile(r"\bfor\s*\("));
static FOR_EACH: Lazy<Regex> = Lazy::new(|| {
    compile(r"([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*|\[[^\[\]]*\])*)\s*\.\s*forEach\s*\(")
});
static IF_HEAD: Lazy<Regex> = Lazy::new(|| compile(r"\bif\s*\("));
static UNSUPPORTED: Lazy<Regex> = Lazy::new(|| {
    compile(r"\b(?:while|switch)\s*\(|\bdo\s*\{|\bfunction\b[\s\w$]*\(|=>\s*\{")
});
static DESTRUCTURE: Lazy<Regex> = Lazy::new(|| compile(r"\b(?:let|const|var)\s*[\{\[]"));
static ASSIGN: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:\b(let|const|var)\s+)?([A-Za-z_$][\w$]*)\s*(\+\+|--|\+=|-=|\*=|/=|%=|=)")
});
static BARE_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)\b(?:let|var)\s+([A-Za-z_$][\w$]*)\s*(?:;|$)"));
static PUSH: Lazy<Regex> = Lazy::new(|| compile(r"\b([A-Za-z_$][\w$]*)\s*\.\s*push\s*\("));
static CALL: Lazy<Regex> = Lazy::new(|| {
    let methods = Operation::ALL
        .iter()
        .map(|op| op.method_name())
        .collect::<Vec<_>>()
        .join("|");
    compile(&format!(r"\b([A-Za-z_$][\w$]*)\s*\.\s*({methods})\s*\("))
});

static FOR_OF: Lazy<Regex> =
    Lazy::new(|| compile(r"(?s)^\s*(?:(?:const|let|var)\s+)?(.+?)\s+of\s+(.+?)\s*$"));
static COUNTED: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?s)^\s*(?:let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*0\s*;\s*([A-Za-z_$][\w$]*)\s*<\s*([^;]+?)\s*;\s*(?:([A-Za-z_$][\w$]*)\s*(?:\+\+|\+=\s*1)|\+\+\s*([A-Za-z_$][\w$]*))\s*$",
    )
});

/// Maximum nesting of blocks (loop bodies and branches)
const MAX_BLOCK_NESTING: usize = 32;

const KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "delete", "do",
    "else", "finally", "for", "function", "if", "in", "instanceof", "let", "new", "of", "return",
    "switch", "this", "throw", "try", "typeof", "var", "void", "while", "yield",
];

/// Extraction limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum iterations unrolled for any single loop
    pub max_loop_iterations: usize,
    /// Maximum loop nesting; deeper loops are skipped
    pub max_loop_depth: usize,
    /// Maximum records per snippet; extraction stops once reached
    pub max_call_records: usize,
    /// Loop iterations allowed across the whole snippet, nested loops included
    pub max_total_iterations: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_loop_iterations: 100,
            max_loop_depth: 4,
            max_call_records: 2000,
            max_total_iterations: 10_000,
        }
    }
}

/// A statement that was skipped instead of aborting extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStatement {
    /// Byte offset in the comment-stripped snippet
    pub offset: usize,
    /// Why it was skipped
    pub reason: String,
}

/// Result of extracting one snippet
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    /// Call records in source order (loop bodies fully unrolled in place)
    pub records: Vec<CallRecord>,
    /// Environment after the last statement
    #[serde(skip)]
    pub environment: Environment,
    /// Statements skipped along the way
    pub skipped: Vec<SkippedStatement>,
    /// Whether the record cap cut extraction short
    pub truncated: bool,
}

/// Walks snippet statements and collects [`CallRecord`]s
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    evaluator: Evaluator,
    options: ExtractOptions,
}

impl Extractor {
    /// Create extractor
    #[must_use]
    pub fn new(evaluator: Evaluator, options: ExtractOptions) -> Self {
        Self { evaluator, options }
    }

    /// Evaluator used for declarations and loop heads
    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Extraction limits
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract call records from `src`, starting from `env`
    pub fn extract(&self, src: &str, env: Environment) -> Extraction {
        let cleaned = scanner::strip_comments(src);
        let mut walker = Walker {
            extractor: self,
            out: Extraction::default(),
            nesting: 0,
            iterations_left: self.options.max_total_iterations,
        };
        let mut env = env;
        walker.block(&cleaned, 0, &mut env, 0);

        let mut out = walker.out;
        out.environment = env;
        tracing::debug!(
            "Extracted {} call records ({} statements skipped)",
            out.records.len(),
            out.skipped.len()
        );
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    ForHead,
    ForEach,
    If,
    Unsupported,
    Destructure,
    Assign,
    BareDecl,
    Push,
    Call,
}

/// Tie-break order when two constructs start at the same byte
const KINDS: [Kind; 9] = [
    Kind::ForHead,
    Kind::ForEach,
    Kind::If,
    Kind::Unsupported,
    Kind::Destructure,
    Kind::Assign,
    Kind::BareDecl,
    Kind::Push,
    Kind::Call,
];

impl Kind {
    fn regex(self) -> &'static Regex {
        match self {
            Kind::ForHead => &FOR_HEAD,
            Kind::ForEach => &FOR_EACH,
            Kind::If => &IF_HEAD,
            Kind::Unsupported => &UNSUPPORTED,
            Kind::Destructure => &DESTRUCTURE,
            Kind::Assign => &ASSIGN,
            Kind::BareDecl => &BARE_DECL,
            Kind::Push => &PUSH,
            Kind::Call => &CALL,
        }
    }
}

enum Lookahead<'t> {
    Unknown,
    Found(Captures<'t>),
    Exhausted,
}

/// Per-kind cache of the next accepted match
struct Cursor<'t> {
    text: &'t str,
    mask: &'t [bool],
    slots: [Lookahead<'t>; KINDS.len()],
}

impl<'t> Cursor<'t> {
    fn new(text: &'t str, mask: &'t [bool]) -> Self {
        Self {
            text,
            mask,
            slots: std::array::from_fn(|_| Lookahead::Unknown),
        }
    }

    fn next(&mut self, from: usize) -> Option<(Kind, Captures<'t>)> {
        let mut best: Option<(usize, usize)> = None;
        for (slot, kind) in KINDS.iter().enumerate() {
            if let Lookahead::Found(caps) = &self.slots[slot] {
                if match_start(caps) < from {
                    self.slots[slot] = Lookahead::Unknown;
                }
            }
            if matches!(self.slots[slot], Lookahead::Unknown) {
                self.slots[slot] = match self.search(*kind, from) {
                    Some(caps) => Lookahead::Found(caps),
                    None => Lookahead::Exhausted,
                };
            }
            if let Lookahead::Found(caps) = &self.slots[slot] {
                let start = match_start(caps);
                if best.map_or(true, |(_, s)| start < s) {
                    best = Some((slot, start));
                }
            }
        }
        let (slot, _) = best?;
        match std::mem::replace(&mut self.slots[slot], Lookahead::Unknown) {
            Lookahead::Found(caps) => Some((KINDS[slot], caps)),
            _ => None,
        }
    }

    fn search(&self, kind: Kind, from: usize) -> Option<Captures<'t>> {
        let mut at = from;
        while at <= self.text.len() {
            let caps = kind.regex().captures_at(self.text, at)?;
            let start = match_start(&caps);
            if !self.mask[start] && accepts(kind, self.text, &caps) {
                return Some(caps);
            }
            // every pattern starts on an ASCII byte, so start + 1 is a char boundary
            at = start + 1;
        }
        None
    }
}

fn match_start(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(0, |m| m.start())
}

fn match_end(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(0, |m| m.end())
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str())
}

fn accepts(kind: Kind, text: &str, caps: &Captures<'_>) -> bool {
    let start = match_start(caps);
    let bytes = text.as_bytes();
    let after_member = start
        .checked_sub(1)
        .is_some_and(|p| matches!(bytes[p], b'.' | b'$' | b'_') || bytes[p].is_ascii_alphanumeric());
    match kind {
        Kind::Assign => {
            let name = group(caps, 2).unwrap_or_default();
            let op = group(caps, 3).unwrap_or_default();
            let declared = caps.get(1).is_some();
            if KEYWORDS.contains(&name) || (declared && op != "=") {
                return false;
            }
            if op == "=" && matches!(bytes.get(match_end(caps)), Some(b'=' | b'>')) {
                return false;
            }
            at_statement_start(bytes, start)
        }
        Kind::Destructure | Kind::BareDecl => at_statement_start(bytes, start),
        Kind::ForEach | Kind::Push | Kind::Call => !after_member,
        Kind::ForHead | Kind::If | Kind::Unsupported => true,
    }
}

/// Whether only whitespace separates `start` from the previous statement
fn at_statement_start(bytes: &[u8], start: usize) -> bool {
    let mut i = start;
    while i > 0 {
        match bytes[i - 1] {
            b' ' | b'\t' | b'\r' => i -= 1,
            b'\n' | b';' | b'{' | b'}' => return true,
            _ => return false,
        }
    }
    true
}

/// Index of the byte ending the statement that starts at `from`
///
/// A statement ends at a top-level `;`, at a closer belonging to an enclosing
/// group, at end of text, or at a line break. A line break does not end it
/// when the text before it ends with a binary operator or the next line
/// starts with one.
fn statement_end(text: &str, from: usize) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b';' | b')' | b']' | b'}' => return Ok(i),
            b'\n' if !continues_past(bytes, i) => return Ok(i),
            b'"' | b'\'' | b'`' => i = scanner::string_end(text, i)?,
            b'(' | b'[' | b'{' => i = scanner::find_matching(text, i)?.close,
            _ => {}
        }
        i += 1;
    }
    Ok(bytes.len())
}

fn continues_past(bytes: &[u8], newline: usize) -> bool {
    let Some(last) = bytes[..newline].iter().rposition(|b| !b.is_ascii_whitespace()) else {
        return true;
    };
    let trailing_op = matches!(
        bytes[last],
        b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'&' | b'|' | b'?' | b':' | b',' | b'.' | b'<' | b'>' | b'!'
    );
    let postfix = last > 0 && matches!(&bytes[last - 1..=last], b"++" | b"--");
    if trailing_op && !postfix {
        return true;
    }
    let next = bytes[newline..].iter().find(|b| !b.is_ascii_whitespace());
    matches!(
        next,
        Some(b'.' | b'?' | b':' | b'+' | b'*' | b'/' | b'%' | b'&' | b'|' | b'=' | b'<' | b'>')
    )
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Body of a loop or branch starting at or after `from`
struct Body<'a> {
    text: &'a str,
    start: usize,
    next: usize,
}

fn body_at(text: &str, from: usize) -> Result<Body<'_>, ScanError> {
    let i = skip_ws(text.as_bytes(), from);
    if text.as_bytes().get(i) == Some(&b'{') {
        let span = scanner::find_matching(text, i)?;
        return Ok(Body {
            text: span.inner,
            start: i + 1,
            next: span.close + 1,
        });
    }
    let end = statement_end(text, i)?;
    Ok(Body {
        text: &text[i..end],
        start: i,
        next: (end + 1).min(text.len()),
    })
}

/// `forEach` callback: parameter patterns and body
struct Callback<'a> {
    params: Vec<&'a str>,
    body: &'a str,
    body_start: usize,
}

fn parse_callback(args: &str) -> Result<Option<Callback<'_>>, ScanError> {
    let bytes = args.as_bytes();
    let start = skip_ws(bytes, 0);
    let rest = &args[start..];

    let (params, after_params) = if rest.starts_with("function") {
        let Some(paren) = rest.find('(') else {
            return Ok(None);
        };
        let span = scanner::find_matching(args, start + paren)?;
        (scanner::split_top_level(span.inner, b',')?, span.close + 1)
    } else if rest.starts_with('(') {
        let span = scanner::find_matching(args, start)?;
        (scanner::split_top_level(span.inner, b',')?, span.close + 1)
    } else {
        let end = start + rest.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$')).unwrap_or(rest.len());
        if !is_identifier(&args[start..end]) {
            return Ok(None);
        }
        (vec![&args[start..end]], end)
    };

    let mut i = skip_ws(bytes, after_params);
    if !rest.starts_with("function") {
        if !args[i..].starts_with("=>") {
            return Ok(None);
        }
        i = skip_ws(bytes, i + 2);
    }
    if bytes.get(i) == Some(&b'{') {
        let span = scanner::find_matching(args, i)?;
        return Ok(Some(Callback {
            params,
            body: span.inner,
            body_start: i + 1,
        }));
    }
    if rest.starts_with("function") {
        return Ok(None);
    }
    // expression body runs until a second forEach argument, if any
    let tail = &args[i..];
    let end = scanner::find_top_level(tail, |b, j| b[j] == b',')?.unwrap_or(tail.len());
    Ok(Some(Callback {
        params,
        body: &tail[..end],
        body_start: i,
    }))
}

/// How each unrolled iteration binds its loop variables
enum Binder<'a> {
    Pattern(&'a str),
    Counter(&'a str),
    Callback(Vec<&'a str>),
}

struct Walker<'e> {
    extractor: &'e Extractor,
    out: Extraction,
    nesting: usize,
    iterations_left: usize,
}

impl Walker<'_> {
    fn evaluate(&self, text: &str, env: &Environment) -> Result<Value, crate::EvalError> {
        self.extractor.evaluator.evaluate(text, env)
    }

    fn skip(&mut self, offset: usize, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!("Skipping statement at byte {}: {}", offset, reason);
        self.out.skipped.push(SkippedStatement { offset, reason });
    }

    fn emit(&mut self, record: CallRecord) {
        if self.out.records.len() >= self.extractor.options.max_call_records {
            if !self.out.truncated {
                tracing::warn!(
                    "Call record limit of {} reached, ignoring the rest of the snippet",
                    self.extractor.options.max_call_records
                );
            }
            self.out.truncated = true;
            return;
        }
        self.out.records.push(record);
    }

    fn block(&mut self, text: &str, base: usize, env: &mut Environment, depth: usize) {
        if self.nesting >= MAX_BLOCK_NESTING {
            self.skip(base, "blocks nested too deeply");
            return;
        }
        self.nesting += 1;
        self.statements(text, base, env, depth);
        self.nesting -= 1;
    }

    fn statements(&mut self, text: &str, base: usize, env: &mut Environment, depth: usize) {
        let mask = match scanner::string_mask(text) {
            Ok(mask) => mask,
            Err(e) => {
                self.skip(base, format!("block cannot be scanned: {e}"));
                return;
            }
        };
        let mut cursor = Cursor::new(text, &mask);
        let mut pos = 0;
        while !self.out.truncated {
            let Some((kind, caps)) = cursor.next(pos) else {
                break;
            };
            let result = match kind {
                Kind::ForHead => self.on_for(text, base, &caps, env, depth),
                Kind::ForEach => self.on_for_each(text, base, &caps, env, depth),
                Kind::If => self.on_if(text, base, &caps, env, depth),
                Kind::Unsupported => self.on_unsupported(text, base, &caps),
                Kind::Destructure => self.on_destructure(text, base, &caps, env),
                Kind::Assign => self.on_assign(text, base, &caps, env),
                Kind::BareDecl => {
                    if let Some(name) = group(&caps, 1) {
                        env.declare(name, Value::Undefined);
                    }
                    Ok(match_end(&caps))
                }
                Kind::Push => self.on_push(text, base, &caps, env),
                Kind::Call => self.on_call(text, base, &caps, env, None),
            };
            let next = match result {
                Ok(next) => next,
                Err(e) => {
                    self.skip(base + match_start(&caps), e.to_string());
                    match_end(&caps)
                }
            };
            pos = next.max(match_end(&caps)).min(text.len());
        }
    }

    fn on_call(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &Environment,
        binding: Option<&str>,
    ) -> Result<usize, ScanError> {
        let (Some(receiver), Some(operation)) = (
            group(caps, 1),
            group(caps, 2).and_then(Operation::from_method),
        ) else {
            return Ok(match_end(caps));
        };
        let span = scanner::find_matching(text, match_end(caps) - 1)?;
        let args = scanner::split_top_level(span.inner, b',')?
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut record =
            CallRecord::new(operation, receiver, args, env.clone()).at_offset(base + match_start(caps));
        if let Some(name) = binding {
            record = record.with_binding(name);
        }
        self.emit(record);
        Ok(statement_end(text, span.close + 1)? + 1)
    }

    fn on_assign(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
    ) -> Result<usize, ScanError> {
        let offset = base + match_start(caps);
        let declared = caps.get(1).is_some();
        let name = group(caps, 2).unwrap_or_default();
        let op = group(caps, 3).unwrap_or("=");
        let rhs_start = match_end(caps);
        let end = statement_end(text, rhs_start)?;
        let next = end + 1;

        match op {
            "++" | "--" => {
                let current = env.get(name).map_or(f64::NAN, Value::to_number);
                if current.is_nan() {
                    self.skip(offset, format!("`{name}{op}` on a non-numeric value"));
                } else {
                    let delta = if op == "++" { 1.0 } else { -1.0 };
                    env.assign(name, Value::Number(current + delta));
                }
                return Ok(next);
            }
            "=" => {}
            compound => {
                let op = match compound {
                    "+=" => Op::Add,
                    "-=" => Op::Sub,
                    "*=" => Op::Mul,
                    "/=" => Op::Div,
                    _ => Op::Rem,
                };
                let current = env.get(name).cloned().unwrap_or_default();
                match self.evaluate(&text[rhs_start..end], env) {
                    Ok(rhs) => {
                        let value = apply_binary(op, &current, &rhs);
                        match self.extractor.evaluator.within_budget(value) {
                            Ok(value) if value.is_nan() => {
                                self.skip(offset, format!("`{name} {compound}` produced NaN"));
                            }
                            Ok(value) => env.assign(name, value),
                            Err(e) => self.skip(offset, format!("`{name} {compound}`: {e}")),
                        }
                    }
                    Err(e) => self.skip(offset, format!("`{name} {compound}`: {e}")),
                }
                return Ok(next);
            }
        }

        // `const s = pptx.addSlide(...)` binds the created slide
        if let Some(call) = CALL.captures_at(&text[..end], rhs_start) {
            if text[rhs_start..match_start(&call)].trim().is_empty() {
                let next = self.on_call(text, base, &call, env, Some(name))?;
                bind(env, declared, name, Value::Null);
                return Ok(next);
            }
        }

        let rhs = &text[rhs_start..end];
        if !declared {
            self.bind_evaluated(env, false, name, rhs, offset);
            return Ok(next);
        }
        let mut declarators = scanner::split_top_level(rhs, b',')?.into_iter();
        match declarators.next() {
            Some(first) => self.bind_evaluated(env, true, name, first, offset),
            None => self.skip(offset, format!("`{name}` has no initializer")),
        }
        for extra in declarators {
            match extra.split_once('=') {
                Some((target, expr)) if is_identifier(target.trim()) && !expr.starts_with('=') => {
                    self.bind_evaluated(env, true, target.trim(), expr, offset);
                }
                _ if is_identifier(extra) => env.declare(extra, Value::Undefined),
                _ => self.skip(offset, format!("unsupported declarator `{extra}`")),
            }
        }
        Ok(next)
    }

    fn bind_evaluated(
        &mut self,
        env: &mut Environment,
        declared: bool,
        name: &str,
        expr: &str,
        offset: usize,
    ) {
        match self.evaluate(expr, env) {
            Ok(value) if !value.is_nan() => bind(env, declared, name, value),
            Ok(_) => self.skip(offset, format!("`{name}` evaluated to NaN")),
            Err(e) => self.skip(offset, format!("`{name}`: {e}")),
        }
    }

    fn on_destructure(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
    ) -> Result<usize, ScanError> {
        let offset = base + match_start(caps);
        let pattern = scanner::find_matching(text, match_end(caps) - 1)?;
        let eq = skip_ws(text.as_bytes(), pattern.close + 1);
        let bytes = text.as_bytes();
        if bytes.get(eq) != Some(&b'=') || bytes.get(eq + 1) == Some(&b'=') {
            let end = statement_end(text, pattern.close + 1)?;
            self.skip(offset, "destructuring without initializer");
            return Ok(end + 1);
        }
        let end = statement_end(text, eq + 1)?;
        match self.evaluate(&text[eq + 1..end], env) {
            Ok(value) => {
                let pattern_text = &text[pattern.open..=pattern.close];
                self.bind_pattern(env, pattern_text, value);
            }
            Err(e) => self.skip(offset, format!("destructuring: {e}")),
        }
        Ok(end + 1)
    }

    /// Declare every name in `pattern` (identifier, `{a, b: c, d = 1}` or
    /// `[x, y]`) from `value`
    fn bind_pattern(&mut self, env: &mut Environment, pattern: &str, value: Value) {
        let pattern = pattern.trim();
        if is_identifier(pattern) {
            env.declare(pattern, value);
            return;
        }
        let object = pattern.starts_with('{') && pattern.ends_with('}');
        let array = pattern.starts_with('[') && pattern.ends_with(']');
        if !(object || array) || pattern.len() < 2 {
            tracing::debug!("Unsupported binding pattern `{}`", pattern);
            return;
        }
        let Ok(parts) = scanner::split_top_level(&pattern[1..pattern.len() - 1], b',') else {
            return;
        };
        for (i, part) in parts.into_iter().enumerate() {
            let (target, default) = match scanner::find_top_level(part, |b, j| {
                b[j] == b'=' && b.get(j + 1) != Some(&b'=')
            }) {
                Ok(Some(eq)) => (part[..eq].trim(), Some(part[eq + 1..].trim())),
                _ => (part, None),
            };
            let (key, target) = if object {
                match target.split_once(':') {
                    Some((key, alias)) => (key.trim(), alias.trim()),
                    None => (target, target),
                }
            } else {
                (target, target)
            };
            let mut slot = if object {
                value.member(key)
            } else {
                value.index(&Value::Number(i as f64))
            };
            if matches!(slot, Value::Undefined) {
                if let Some(default) = default {
                    slot = self.evaluate(default, env).unwrap_or_default();
                }
            }
            self.bind_pattern(env, target, slot);
        }
    }

    fn on_push(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
    ) -> Result<usize, ScanError> {
        let offset = base + match_start(caps);
        let name = group(caps, 1).unwrap_or_default();
        let span = scanner::find_matching(text, match_end(caps) - 1)?;
        let next = statement_end(text, span.close + 1)? + 1;
        if !matches!(env.get(name), Some(Value::Array(_))) {
            self.skip(offset, format!("`{name}.push` target is not an array"));
            return Ok(next);
        }
        let mut values = Vec::new();
        for arg in scanner::split_top_level(span.inner, b',')? {
            match self.evaluate(arg, env) {
                Ok(value) if !value.is_nan() => values.push(value),
                Ok(_) => self.skip(offset, format!("`{name}.push` argument evaluated to NaN")),
                Err(e) => self.skip(offset, format!("`{name}.push`: {e}")),
            }
        }
        let existing = env.get(name).map_or(0, Value::footprint);
        let added: usize = values.iter().map(|v| v.footprint() + ENTRY_BYTES).sum();
        if let Err(e) = self.extractor.evaluator.check_budget(existing.saturating_add(added)) {
            self.skip(offset, format!("`{name}.push`: {e}"));
            return Ok(next);
        }
        if let Some(Value::Array(items)) = env.get_mut(name) {
            items.extend(values);
        }
        Ok(next)
    }

    fn on_for(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
        depth: usize,
    ) -> Result<usize, ScanError> {
        let offset = base + match_start(caps);
        let header = scanner::find_matching(text, match_end(caps) - 1)?;
        let body = body_at(text, header.close + 1)?;
        if !self.loop_allowed(offset, depth) {
            return Ok(body.next);
        }

        if let Some(of) = FOR_OF.captures(header.inner) {
            let pattern = group(&of, 1).unwrap_or_default();
            let iterable = group(&of, 2).unwrap_or_default();
            let items = match self.evaluate(iterable, env) {
                Ok(Value::Array(items)) => items,
                Ok(Value::String(s)) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                Ok(other) => {
                    self.skip(offset, format!("cannot iterate over {}", other.type_name()));
                    return Ok(body.next);
                }
                Err(e) => {
                    self.skip(offset, format!("loop iterable: {e}"));
                    return Ok(body.next);
                }
            };
            let count = items.len();
            let binder = Binder::Pattern(pattern);
            self.unroll(offset, &body, base, &binder, &items, count, env, depth);
            return Ok(body.next);
        }

        if let Some(counted) = COUNTED.captures(header.inner) {
            let var = group(&counted, 1).unwrap_or_default();
            let tested = group(&counted, 2).unwrap_or_default();
            let stepped = group(&counted, 4).or_else(|| group(&counted, 5)).unwrap_or_default();
            if var == tested && var == stepped {
                let bound = group(&counted, 3).unwrap_or_default();
                match self.evaluate(bound, env).map(|v| v.as_number()) {
                    Ok(Some(n)) => {
                        let count = if n > 0.0 { n.ceil().min(usize::MAX as f64) as usize } else { 0 };
                        let binder = Binder::Counter(var);
                        self.unroll(offset, &body, base, &binder, &[], count, env, depth);
                    }
                    Ok(None) => self.skip(offset, format!("loop bound `{bound}` is not a number")),
                    Err(e) => self.skip(offset, format!("loop bound: {e}")),
                }
                return Ok(body.next);
            }
        }

        self.skip(offset, format!("unsupported loop header `{}`", header.inner.trim()));
        Ok(body.next)
    }

    fn on_for_each(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
        depth: usize,
    ) -> Result<usize, ScanError> {
        let offset = base + match_start(caps);
        let target = group(caps, 1).unwrap_or_default();
        let call = scanner::find_matching(text, match_end(caps) - 1)?;
        let next = statement_end(text, call.close + 1)? + 1;
        if !self.loop_allowed(offset, depth) {
            return Ok(next);
        }
        let items = match self.evaluate(target, env) {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                self.skip(offset, format!("`{target}.forEach` on {}", other.type_name()));
                return Ok(next);
            }
            Err(e) => {
                self.skip(offset, format!("`{target}.forEach`: {e}"));
                return Ok(next);
            }
        };
        let Some(callback) = parse_callback(call.inner)? else {
            self.skip(offset, "unsupported forEach callback");
            return Ok(next);
        };
        let body = Body {
            text: callback.body,
            start: call.open + 1 + callback.body_start,
            next,
        };
        let count = items.len();
        let binder = Binder::Callback(callback.params);
        self.unroll(offset, &body, base, &binder, &items, count, env, depth);
        Ok(next)
    }

    fn loop_allowed(&mut self, offset: usize, depth: usize) -> bool {
        let limit = self.extractor.options.max_loop_depth;
        if depth < limit {
            return true;
        }
        tracing::warn!("Loop nesting deeper than {} at byte {}, skipping", limit, offset);
        self.skip(offset, format!("loop nesting exceeds {limit}"));
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn unroll(
        &mut self,
        offset: usize,
        body: &Body<'_>,
        base: usize,
        binder: &Binder<'_>,
        items: &[Value],
        count: usize,
        env: &mut Environment,
        depth: usize,
    ) {
        let cap = self.extractor.options.max_loop_iterations;
        if count > cap {
            tracing::warn!("Loop wants {} iterations, capping at {}", count, cap);
        }
        for i in 0..count.min(cap) {
            if self.out.truncated {
                break;
            }
            if self.iterations_left == 0 {
                let budget = self.extractor.options.max_total_iterations;
                tracing::warn!("Iteration budget of {} exhausted at byte {}", budget, offset);
                self.skip(offset, format!("iteration budget of {budget} exhausted"));
                break;
            }
            self.iterations_left -= 1;
            let mut child = env.child();
            match binder {
                Binder::Pattern(pattern) => {
                    let item = items.get(i).cloned().unwrap_or_default();
                    self.bind_pattern(&mut child, pattern, item);
                }
                Binder::Counter(var) => child.declare(*var, Value::Number(i as f64)),
                Binder::Callback(params) => {
                    if let Some(pattern) = params.first() {
                        let item = items.get(i).cloned().unwrap_or_default();
                        self.bind_pattern(&mut child, pattern, item);
                    }
                    if let Some(index) = params.get(1) {
                        self.bind_pattern(&mut child, index, Value::Number(i as f64));
                    }
                    if let Some(array) = params.get(2) {
                        self.bind_pattern(&mut child, array, Value::Array(items.to_vec()));
                    }
                }
            }
            self.block(body.text, base + body.start, &mut child, depth + 1);
            env.merge_from(&child);
        }
    }

    fn on_if(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
        env: &mut Environment,
        depth: usize,
    ) -> Result<usize, ScanError> {
        let bytes = text.as_bytes();
        let mut open = match_end(caps) - 1;
        let mut settled = false;
        loop {
            let cond = scanner::find_matching(text, open)?;
            let body = body_at(text, cond.close + 1)?;
            if !settled {
                match self.evaluate(cond.inner, env) {
                    Ok(value) if value.truthy() => {
                        self.branch(&body, base, env, depth);
                        settled = true;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // neither branch runs when the condition is unknown
                        self.skip(base + cond.open, format!("if condition: {e}"));
                        settled = true;
                    }
                }
            }

            let Some(after_else) = keyword_at(text, skip_ws(bytes, body.next), "else") else {
                return Ok(body.next);
            };
            let next = skip_ws(bytes, after_else);
            if let Some(after_if) = keyword_at(text, next, "if") {
                let paren = skip_ws(bytes, after_if);
                if bytes.get(paren) == Some(&b'(') {
                    open = paren;
                    continue;
                }
            }
            let otherwise = body_at(text, after_else)?;
            if !settled {
                self.branch(&otherwise, base, env, depth);
            }
            return Ok(otherwise.next);
        }
    }

    fn branch(&mut self, body: &Body<'_>, base: usize, env: &mut Environment, depth: usize) {
        let mut child = env.child();
        self.block(body.text, base + body.start, &mut child, depth);
        env.merge_from(&child);
    }

    fn on_unsupported(
        &mut self,
        text: &str,
        base: usize,
        caps: &Captures<'_>,
    ) -> Result<usize, ScanError> {
        let start = match_start(caps);
        let opener = match_end(caps) - 1;
        let construct = text[start..opener].trim().to_string();
        let next = if text.as_bytes()[opener] == b'(' {
            let header = scanner::find_matching(text, opener)?;
            body_at(text, header.close + 1)?.next
        } else {
            scanner::find_matching(text, opener)?.close + 1
        };
        self.skip(base + start, format!("unsupported construct `{construct}`"));
        Ok(next)
    }
}

fn bind(env: &mut Environment, declared: bool, name: &str, value: Value) {
    if declared {
        env.declare(name, value);
    } else {
        env.assign(name, value);
    }
}

/// Index just past `word` at `at`, if it is a whole keyword there
fn keyword_at(text: &str, at: usize, word: &str) -> Option<usize> {
    let end = at + word.len();
    let whole = text.get(at..end) == Some(word)
        && !text
            .as_bytes()
            .get(end)
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$'));
    whole.then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalOptions;
    use crate::resource::BaseUrlResolver;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn extract(src: &str) -> Extraction {
        Extractor::default().extract(src, Environment::new())
    }

    fn arg(record: &CallRecord, i: usize) -> Value {
        Evaluator::default()
            .evaluate(&record.args()[i], record.env())
            .unwrap()
    }

    #[test]
    fn straight_line_calls_in_order() {
        let out = extract(
            "const slide = pptx.addSlide();\n\
             slide.addText('Title', {x: 1, y: 0.5});\n\
             slide.addShape(pptx.ShapeType.rect, {x: 1, y: 2, w: 3, h: 1});",
        );
        let ops: Vec<_> = out.records.iter().map(CallRecord::operation).collect();
        assert_eq!(ops, vec![Operation::AddSlide, Operation::AddText, Operation::AddShape]);
        assert_eq!(out.records[0].binding(), Some("slide"));
        assert_eq!(out.records[1].receiver(), "slide");
        assert_eq!(out.records[1].args().len(), 2);
    }

    #[test]
    fn arguments_split_at_top_level() {
        let out = extract("slide.addText(a, {x: 1, y: 2}, b)");
        assert_eq!(out.records[0].args(), ["a", "{x: 1, y: 2}", "b"]);
    }

    #[test]
    fn counted_loop_unrolls_with_index() {
        let out = extract(
            "const n = 3;\nfor (let i = 0; i < n; i++) { slide.addShape('rect', {x: i, y: 0}); }",
        );
        assert_eq!(out.records.len(), 3);
        let xs: Vec<_> = out
            .records
            .iter()
            .map(|r| arg(r, 1).as_object().unwrap().get("x").cloned())
            .collect();
        assert_eq!(
            xs,
            vec![
                Some(Value::Number(0.0)),
                Some(Value::Number(1.0)),
                Some(Value::Number(2.0))
            ]
        );
    }

    #[test]
    fn counted_loop_shape_is_narrow() {
        let out = extract("for (let i = 1; i <= 3; i++) { slide.addText('x', {}); }");
        assert!(out.records.is_empty());
        assert_eq!(out.skipped.len(), 1);
    }

    #[test]
    fn for_of_and_running_offset() {
        let out = extract(
            "const items = ['a', 'b'];\nlet y = 1;\n\
             for (const item of items) {\n  slide.addText(item, {x: 0, y: y});\n  y += 0.5;\n}\n\
             slide.addText('done', {y: y});",
        );
        assert_eq!(out.records.len(), 3);
        assert_eq!(arg(&out.records[0], 0), Value::from("a"));
        assert_eq!(arg(&out.records[1], 0), Value::from("b"));
        assert_eq!(
            arg(&out.records[1], 1).as_object().unwrap().get("y"),
            Some(&Value::Number(1.5))
        );
        assert_eq!(out.environment.get("y"), Some(&Value::Number(2.0)));
        assert!(!out.environment.contains("item"));
    }

    #[test]
    fn for_each_with_index_and_destructuring() {
        let out = extract(
            "const rows = [{label: 'A', v: 1}, {label: 'B', v: 2}];\n\
             rows.forEach(({label, v}, idx) => {\n  slide.addText(`${idx}:${label}=${v}`, {});\n});",
        );
        let texts: Vec<_> = out.records.iter().map(|r| arg(r, 0)).collect();
        assert_eq!(texts, vec![Value::from("0:A=1"), Value::from("1:B=2")]);
    }

    #[test]
    fn for_each_expression_body_and_function_form() {
        let out = extract(
            "const xs = [1, 2];\n\
             xs.forEach(x => slide.addText(String(x), {}));\n\
             xs.forEach(function (x, i) { slide.addText('f' + x, {}); });",
        );
        let texts: Vec<_> = out.records.iter().map(|r| arg(r, 0)).collect();
        assert_eq!(
            texts,
            vec![Value::from("1"), Value::from("2"), Value::from("f1"), Value::from("f2")]
        );
    }

    #[test]
    fn iteration_cap_applies() {
        let out = extract("for (let i = 0; i < 1e9; i++) { slide.addText('x', {}); }");
        assert_eq!(out.records.len(), 100);
    }

    #[test]
    fn record_cap_truncates() {
        let extractor = Extractor::new(
            Evaluator::default(),
            ExtractOptions {
                max_call_records: 5,
                ..ExtractOptions::default()
            },
        );
        let out = extractor.extract(
            "for (let i = 0; i < 10; i++) { slide.addText('x', {}); }",
            Environment::new(),
        );
        assert_eq!(out.records.len(), 5);
        assert!(out.truncated);
    }

    #[test]
    fn iteration_budget_spans_nested_loops() {
        let extractor = Extractor::new(
            Evaluator::default(),
            ExtractOptions {
                max_total_iterations: 10,
                ..ExtractOptions::default()
            },
        );
        let out = extractor.extract(
            "for (let i = 0; i < 3; i++) { for (let j = 0; j < 5; j++) { s.addText('x', {}); } }",
            Environment::new(),
        );
        // i=0 runs 5 inner passes, i=1 runs 3 before the budget is gone
        assert_eq!(out.records.len(), 8);
        assert_eq!(out.skipped.len(), 2);
        assert!(out.skipped.iter().all(|s| s.reason == "iteration budget of 10 exhausted"));
        assert!(!out.truncated);
    }

    #[test]
    fn oversized_push_is_skipped() {
        let extractor = Extractor::new(
            Evaluator::new(
                EvalOptions {
                    max_value_bytes: 256,
                    ..EvalOptions::default()
                },
                Arc::new(BaseUrlResolver::default()),
            ),
            ExtractOptions::default(),
        );
        let out = extractor.extract(
            "const rows = [];\nfor (let i = 0; i < 10; i++) { rows.push('0123456789'); }",
            Environment::new(),
        );
        let rows = out.environment.get("rows").and_then(Value::as_array).unwrap();
        assert!(!rows.is_empty());
        assert!(rows.len() < 10);
        assert!(Value::Array(rows.to_vec()).footprint() <= 256);
        assert!(out.skipped.iter().any(|s| s.reason.contains("`rows.push`")));
    }

    #[test]
    fn loop_depth_limit() {
        let extractor = Extractor::new(
            Evaluator::default(),
            ExtractOptions {
                max_loop_depth: 1,
                ..ExtractOptions::default()
            },
        );
        let out = extractor.extract(
            "for (let i = 0; i < 2; i++) { for (let j = 0; j < 2; j++) { s.addText('x', {}); } }",
            Environment::new(),
        );
        assert!(out.records.is_empty());
        assert_eq!(out.skipped.len(), 2);
    }

    #[test]
    fn failed_declaration_is_skipped() {
        let out = extract("const a = fetchData();\nconst b = 2;\nslide.addText(String(b), {});");
        assert!(!out.environment.contains("a"));
        assert_eq!(out.environment.get("b"), Some(&Value::Number(2.0)));
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.skipped.len(), 1);
    }

    #[test]
    fn calls_inside_strings_and_comments_ignored() {
        let out = extract(
            "// slide.addText('no', {})\nconst s = \"slide.addText('no')\";\n/* x.addShape() */ slide.addText(s, {});",
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(arg(&out.records[0], 0), Value::from("slide.addText('no')"));
    }

    #[test]
    fn push_accumulates_rows() {
        let out = extract(
            "const rows = [['Name', 'Value']];\n\
             for (const n of [1, 2]) { rows.push(['Row ' + n, n * 10]); }\n\
             slide.addTable(rows, {x: 0.5});",
        );
        let rows = arg(&out.records[0], 0);
        assert_eq!(rows.as_array().unwrap().len(), 3);
    }

    #[test]
    fn if_else_chain_picks_one_branch() {
        let out = extract(
            "const n = 2;\n\
             if (n > 5) { slide.addText('big', {}); }\n\
             else if (n > 1) { slide.addText('mid', {}); }\n\
             else { slide.addText('small', {}); }",
        );
        assert_eq!(out.records.len(), 1);
        assert_eq!(arg(&out.records[0], 0), Value::from("mid"));
    }

    #[test]
    fn unsupported_constructs_emit_nothing() {
        let out = extract(
            "while (true) { slide.addText('loop', {}); }\n\
             function helper(s) { s.addText('fn', {}); }\n\
             const f = () => { slide.addText('arrow', {}); };\n\
             items.map(x => { slide.addText('map', {}); });",
        );
        assert!(out.records.is_empty());
    }

    #[test]
    fn multiline_expression_continues() {
        let out = extract("const w = 2 +\n  3\nconst h = w\n  * 2;\nslide.addText('x', {w, h});");
        assert_eq!(out.environment.get("w"), Some(&Value::Number(5.0)));
        assert_eq!(out.environment.get("h"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn postfix_increment_ends_statement() {
        let out = extract("let count = 0;\ncount++\ncount += 2;");
        assert_eq!(out.environment.get("count"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn deep_branch_nesting_is_bounded() {
        let src = format!(
            "{}slide.addText('deep', {{}});{}",
            "if (true) { ".repeat(200),
            " }".repeat(200)
        );
        let out = extract(&src);
        assert!(out.records.is_empty());
        assert!(out.skipped.iter().any(|s| s.reason.contains("nested")));
    }

    #[test]
    fn comparisons_are_not_assignments() {
        let out = extract("let a = 1;\nif (a == 1) { a = 4; }");
        assert_eq!(out.environment.get("a"), Some(&Value::Number(4.0)));
    }
}
