//! Delimiter scanner
//!
//! Byte-level routines that respect string literal boundaries (`'`, `"` and
//! backtick templates with `${...}` spans) and nested `()`, `[]`, `{}` groups.
//! Every routine fails closed: if a range cannot be confirmed it returns a
//! [`ScanError`] instead of a guessed span.
//!
//! All delimiters are ASCII, so every index returned here is a valid `str`
//! slice boundary.

use crate::error::ScanError;

/// Matched delimiter pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Index of the opening delimiter
    pub open: usize,
    /// Index of the matching closing delimiter
    pub close: usize,
    /// Text strictly between the delimiters
    pub inner: &'a str,
}

#[inline]
fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

#[inline]
fn is_quote(b: u8) -> bool {
    matches!(b, b'"' | b'\'' | b'`')
}

/// Maximum nesting of template literals inside `${...}` spans
const MAX_TEMPLATE_NESTING: usize = 32;

/// Index of the quote closing the string literal that starts at `start`.
fn skip_string(src: &[u8], start: usize, nesting: usize) -> Result<usize, ScanError> {
    let quote = src[start];
    let mut i = start + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b if b == quote => return Ok(i),
            b'$' if quote == b'`' && src.get(i + 1) == Some(&b'{') => {
                if nesting >= MAX_TEMPLATE_NESTING {
                    return Err(ScanError::NestingTooDeep(i));
                }
                i = match_group(src, i + 1, nesting + 1)? + 1;
                continue;
            }
            b'\n' if quote != b'`' => return Err(ScanError::UnterminatedString(start)),
            _ => {}
        }
        i += 1;
    }
    Err(ScanError::UnterminatedString(start))
}

/// Index of the closer matching the opener at `open`.
fn match_group(src: &[u8], open: usize, nesting: usize) -> Result<usize, ScanError> {
    let first = src
        .get(open)
        .copied()
        .and_then(closer_for)
        .ok_or(ScanError::NotAnOpener(open))?;
    let mut stack = vec![first];
    let mut i = open + 1;
    while i < src.len() {
        let b = src[i];
        if is_quote(b) {
            i = skip_string(src, i, nesting)?;
        } else if let Some(closer) = closer_for(b) {
            stack.push(closer);
        } else if matches!(b, b')' | b']' | b'}') {
            if stack.pop() != Some(b) {
                return Err(ScanError::Unbalanced(i));
            }
            if stack.is_empty() {
                return Ok(i);
            }
        }
        i += 1;
    }
    Err(ScanError::Unbalanced(open))
}

/// Find the delimiter matching the opener at `open`.
///
/// # Errors
/// `NotAnOpener` if `src[open]` is not `(`, `[` or `{`; `Unbalanced` or
/// `UnterminatedString` if the group cannot be closed.
pub fn find_matching(src: &str, open: usize) -> Result<Span<'_>, ScanError> {
    let close = match_group(src.as_bytes(), open, 0)?;
    Ok(Span {
        open,
        close,
        inner: &src[open + 1..close],
    })
}

/// Index of the quote closing the string literal starting at `start`.
///
/// # Errors
/// `UnterminatedString` when no closing quote exists.
pub fn string_end(src: &str, start: usize) -> Result<usize, ScanError> {
    let bytes = src.as_bytes();
    match bytes.get(start) {
        Some(&b) if is_quote(b) => skip_string(bytes, start, 0),
        _ => Err(ScanError::UnterminatedString(start)),
    }
}

/// Byte indices that sit at nesting depth zero, outside any string literal.
///
/// Openers of nested groups and string quotes are reported; their contents
/// and closers are not.
///
/// # Errors
/// Fails on the first unbalanced group or unterminated string.
pub fn top_level_indices(src: &str) -> Result<Vec<usize>, ScanError> {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        out.push(i);
        if is_quote(b) {
            i = skip_string(bytes, i, 0)?;
        } else if closer_for(b).is_some() {
            i = match_group(bytes, i, 0)?;
        } else if matches!(b, b')' | b']' | b'}') {
            return Err(ScanError::Unbalanced(i));
        }
        i += 1;
    }
    Ok(out)
}

/// First top-level index whose byte satisfies `pred(bytes, index)`.
///
/// # Errors
/// Same as [`top_level_indices`].
pub fn find_top_level<F>(src: &str, mut pred: F) -> Result<Option<usize>, ScanError>
where
    F: FnMut(&[u8], usize) -> bool,
{
    let bytes = src.as_bytes();
    Ok(top_level_indices(src)?
        .into_iter()
        .find(|&i| pred(bytes, i)))
}

/// Split `src` on top-level occurrences of `sep`.
///
/// Pieces are trimmed. A trailing empty piece (trailing comma) is dropped, and
/// whitespace-only input yields no pieces, so `f()` has zero arguments.
///
/// # Errors
/// Same as [`top_level_indices`].
pub fn split_top_level(src: &str, sep: u8) -> Result<Vec<&str>, ScanError> {
    let bytes = src.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    for i in top_level_indices(src)? {
        if bytes[i] == sep {
            pieces.push(src[start..i].trim());
            start = i + 1;
        }
    }
    let last = src[start..].trim();
    if !last.is_empty() || !pieces.is_empty() {
        pieces.push(last);
    }
    if pieces.last().is_some_and(|p| p.is_empty()) {
        pieces.pop();
    }
    Ok(pieces)
}

/// Per-byte mask that is `true` inside string literals (quotes included).
///
/// # Errors
/// `UnterminatedString` if any literal is never closed.
pub fn string_mask(src: &str) -> Result<Vec<bool>, ScanError> {
    let bytes = src.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut i = 0;
    while i < bytes.len() {
        if is_quote(bytes[i]) {
            let end = skip_string(bytes, i, 0)?;
            mask[i..=end].iter_mut().for_each(|m| *m = true);
            i = end;
        }
        i += 1;
    }
    Ok(mask)
}

/// Remove `//` and `/* */` comments outside string literals.
///
/// Comment bytes are replaced with spaces (newlines are kept) so offsets in
/// the cleaned text line up with the original. An unterminated string is
/// copied through verbatim.
#[must_use]
pub fn strip_comments(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_quote(b) {
            let end = skip_string(bytes, i, 0).unwrap_or(bytes.len() - 1);
            out.extend_from_slice(&bytes[i..=end]);
            i = end + 1;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            out.extend_from_slice(b"  ");
            i += 2;
            while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
            if i < bytes.len() {
                out.extend_from_slice(b"  ");
                i += 2;
            }
            continue;
        }
        out.push(b);
        i += 1;
    }
    // Only whole UTF-8 sequences were copied or blanked byte-for-byte.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
