//! Caller-side line stripping
//!
//! Assistant output routinely opens with boilerplate that imports and
//! constructs the backend. A line is blanked only when it holds nothing but
//! one such statement, so no neighbouring call is lost. File writes are never
//! stripped: they reach the validator and reject the snippet.

use once_cell::sync::Lazy;
use regex::RegexSet;

static UNSAFE_LINE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"^\s*(?:(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=\s*)?new\s+PptxGenJS\s*\(\s*\)\s*;?\s*$",
        r#"^\s*import\s+[^;]*\bfrom\s+['"]pptxgenjs['"]\s*;?\s*$"#,
        r#"^\s*(?:(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=\s*)?require\s*\(\s*['"]pptxgenjs['"]\s*\)\s*;?\s*$"#,
    ])
    .expect("line stripping patterns")
});

/// Snippet after line stripping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    /// Text with boilerplate lines blanked (line count unchanged)
    pub text: String,
    /// 1-based numbers of the blanked lines
    pub removed_lines: Vec<usize>,
}

/// Blank every line that only imports or constructs the backend
#[must_use]
pub fn strip_unsafe_lines(snippet: &str) -> Preprocessed {
    let mut removed_lines = Vec::new();
    let text = snippet
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if UNSAFE_LINE.is_match(line) {
                removed_lines.push(i + 1);
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    if !removed_lines.is_empty() {
        tracing::debug!("Stripped {} boilerplate line(s): {:?}", removed_lines.len(), removed_lines);
    }
    Preprocessed {
        text,
        removed_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_import_and_construction() {
        let snippet = "import pptxgen from \"pptxgenjs\";\nconst pptx = new PptxGenJS();\nconst s = pptx.addSlide();\nconst P = require('pptxgenjs');";
        let out = strip_unsafe_lines(snippet);
        assert_eq!(out.removed_lines, vec![1, 2, 4]);
        assert_eq!(out.text, "\n\nconst s = pptx.addSlide();\n");
    }

    #[test]
    fn keeps_writes_and_shared_lines() {
        let snippet = "const pptx = new PptxGenJS(); slide.addText('x', {});\npptx.writeFile({fileName: \"a.pptx\"});\npptx.stream();";
        let out = strip_unsafe_lines(snippet);
        assert!(out.removed_lines.is_empty());
        assert_eq!(out.text, snippet);
    }

    #[test]
    fn leaves_clean_snippets_alone() {
        let snippet = "slide.addText(\"Write it down\", {x: 1, y: 1});\r\n";
        let out = strip_unsafe_lines(snippet);
        assert!(out.removed_lines.is_empty());
        assert_eq!(out.text, snippet);
    }
}
