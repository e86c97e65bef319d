//! Arithmetic and logical expressions
//!
//! Operands (numbers, strings, templates, parenthesized groups, paths and
//! helper calls) are folded into values while tokenizing; what is left is a
//! flat token stream parsed by precedence climbing:
//!
//! `||` < `&&` < equality < comparison < `+ -` < `* / %` < unary `! - +`
//!
//! An operand that cannot be resolved becomes `NaN`, which then propagates
//! through arithmetic like it would in the source dialect.

use super::{ident_end, is_ident_start, Evaluator};
use crate::env::Environment;
use crate::error::EvalError;
use crate::scanner;
use crate::value::Value;
use std::cmp::Ordering;

/// Binary and unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Or,
    And,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(Value),
    Op(Op),
}

/// Longest-first operator spellings
const OPERATORS: &[(&str, Op)] = &[
    ("===", Op::StrictEq),
    ("!==", Op::StrictNe),
    ("==", Op::LooseEq),
    ("!=", Op::LooseNe),
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("&&", Op::And),
    ("||", Op::Or),
    ("<", Op::Lt),
    (">", Op::Gt),
    ("+", Op::Add),
    ("-", Op::Sub),
    ("*", Op::Mul),
    ("/", Op::Div),
    ("%", Op::Rem),
    ("!", Op::Not),
];

pub(super) fn evaluate(
    evaluator: &Evaluator,
    text: &str,
    env: &Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    let tokens = tokenize(evaluator, text, env, depth)?;
    let mut parser = Parser {
        evaluator,
        tokens: &tokens,
        pos: 0,
        text,
    };
    let value = parser.or()?;
    if parser.pos != tokens.len() {
        return Err(EvalError::unsupported(text));
    }
    Ok(value)
}

/// Resolve an operand, mapping any failure except a depth or size limit to `NaN`
fn operand(
    evaluator: &Evaluator,
    text: &str,
    env: &Environment,
    depth: usize,
) -> Result<Value, EvalError> {
    match evaluator.eval_at(text, env, depth + 1) {
        Ok(value) => Ok(value),
        Err(e) if e.is_limit() => Err(e),
        Err(e) => {
            tracing::trace!(operand = %text, error = %e, "operand resolved to NaN");
            Ok(Value::Number(f64::NAN))
        }
    }
}

fn tokenize(
    evaluator: &Evaluator,
    text: &str,
    env: &Environment,
    depth: usize,
) -> Result<Vec<Token>, EvalError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let end = number_end(bytes, i);
            let number = super::parse_number(&text[i..end])
                .ok_or_else(|| EvalError::unsupported(&text[i..end]))?;
            tokens.push(Token::Value(Value::Number(number)));
            i = end;
            continue;
        }

        if matches!(b, b'"' | b'\'' | b'`') {
            let end = scanner::string_end(text, i)?;
            tokens.push(Token::Value(evaluator.eval_at(&text[i..=end], env, depth + 1)?));
            i = end + 1;
            continue;
        }

        if matches!(b, b'(' | b'[' | b'{') {
            let span = scanner::find_matching(text, i)?;
            tokens.push(Token::Value(operand(evaluator, &text[i..=span.close], env, depth)?));
            i = span.close + 1;
            continue;
        }

        if is_ident_start(b) {
            let end = operand_end(text, i)?;
            tokens.push(Token::Value(operand(evaluator, &text[i..end], env, depth)?));
            i = end;
            continue;
        }

        let Some((spelling, op)) = OPERATORS
            .iter()
            .find(|(spelling, _)| text[i..].starts_with(spelling))
        else {
            return Err(EvalError::unsupported(text));
        };
        tokens.push(Token::Op(*op));
        i += spelling.len();
    }
    if tokens.is_empty() {
        return Err(EvalError::unsupported(text));
    }
    Ok(tokens)
}

fn number_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    if bytes[i] == b'0' && matches!(bytes.get(i + 1), Some(b'x' | b'X')) {
        i += 2;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        return i;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' | b'.' | b'_' => i += 1,
            b'e' | b'E' => {
                i += 1;
                if matches!(bytes.get(i), Some(b'+' | b'-')) {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    i
}

/// End of an identifier path operand, including member access, indexing
/// and a trailing call group
fn operand_end(text: &str, start: usize) -> Result<usize, EvalError> {
    let bytes = text.as_bytes();
    let mut i = ident_end(bytes, start);
    loop {
        match bytes.get(i) {
            Some(b'.') if bytes.get(i + 1).copied().is_some_and(is_ident_start) => {
                i = ident_end(bytes, i + 1);
            }
            Some(b'?') if bytes.get(i + 1) == Some(&b'.') => {
                i += 2;
                if bytes.get(i).copied().is_some_and(is_ident_start) {
                    i = ident_end(bytes, i);
                }
            }
            Some(b'[' | b'(') => i = scanner::find_matching(text, i)?.close + 1,
            _ => return Ok(i),
        }
    }
}

/// Apply a binary operator with the dialect's coercion rules
pub(crate) fn apply_binary(op: Op, left: &Value, right: &Value) -> Value {
    match op {
        Op::Or => {
            if left.truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
        Op::And => {
            if left.truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        Op::StrictEq => Value::Bool(left.strict_eq(right)),
        Op::StrictNe => Value::Bool(!left.strict_eq(right)),
        Op::LooseEq => Value::Bool(left.loose_eq(right)),
        Op::LooseNe => Value::Bool(!left.loose_eq(right)),
        Op::Lt | Op::Le | Op::Gt | Op::Ge => Value::Bool(compare(op, left, right)),
        Op::Add if is_concatenating(left) || is_concatenating(right) => {
            Value::String(format!("{left}{right}"))
        }
        Op::Add => Value::Number(left.to_number() + right.to_number()),
        Op::Sub => Value::Number(left.to_number() - right.to_number()),
        Op::Mul => Value::Number(left.to_number() * right.to_number()),
        Op::Div => Value::Number(left.to_number() / right.to_number()),
        Op::Rem => Value::Number(left.to_number() % right.to_number()),
        Op::Not => Value::Bool(!right.truthy()),
    }
}

#[inline]
fn is_concatenating(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn compare(op: Op, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    match ordering {
        None => false,
        Some(ordering) => match op {
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        },
    }
}

struct Parser<'t> {
    evaluator: &'t Evaluator,
    tokens: &'t [Token],
    pos: usize,
    text: &'t str,
}

impl Parser<'_> {
    fn eat(&mut self, ops: &[Op]) -> Option<Op> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) if ops.contains(op) => {
                self.pos += 1;
                Some(*op)
            }
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[Op],
        next: fn(&mut Self) -> Result<Value, EvalError>,
    ) -> Result<Value, EvalError> {
        let mut left = next(self)?;
        while let Some(op) = self.eat(ops) {
            let right = next(self)?;
            left = self.evaluator.within_budget(apply_binary(op, &left, &right))?;
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Value, EvalError> {
        self.binary_level(&[Op::Or], Self::and)
    }

    fn and(&mut self) -> Result<Value, EvalError> {
        self.binary_level(&[Op::And], Self::equality)
    }

    fn equality(&mut self) -> Result<Value, EvalError> {
        self.binary_level(
            &[Op::StrictEq, Op::StrictNe, Op::LooseEq, Op::LooseNe],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        self.binary_level(&[Op::Lt, Op::Le, Op::Gt, Op::Ge], Self::additive)
    }

    fn additive(&mut self) -> Result<Value, EvalError> {
        self.binary_level(&[Op::Add, Op::Sub], Self::term)
    }

    fn term(&mut self) -> Result<Value, EvalError> {
        self.binary_level(&[Op::Mul, Op::Div, Op::Rem], Self::unary)
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        match self.eat(&[Op::Not, Op::Sub, Op::Add]) {
            Some(Op::Not) => Ok(Value::Bool(!self.unary()?.truthy())),
            Some(Op::Sub) => Ok(Value::Number(-self.unary()?.to_number())),
            Some(_) => Ok(Value::Number(self.unary()?.to_number())),
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        match self.tokens.get(self.pos) {
            Some(Token::Value(value)) => {
                self.pos += 1;
                Ok(value.clone())
            }
            _ => Err(EvalError::unsupported(self.text)),
        }
    }
}
