//! Regex screening over raw snippet text
//!
//! Matches anywhere in the text, string contents included. That makes this
//! strategy stricter than the tree walk: a text run reading `"call fetch(url)"` is
//! rejected here and accepted there.

use crate::verdict::{SafetyVerdict, Strategy};
use crate::SafetyValidator;
use once_cell::sync::Lazy;
use regex::RegexSet;

/// `(pattern, description)` pairs; the description becomes the verdict reason
const RULES: &[(&str, &str)] = &[
    (r"\bfetch\s*\(", "network access via fetch"),
    (r"\bXMLHttpRequest\b", "network access via XMLHttpRequest"),
    (r"\bWebSocket\b", "network access via WebSocket"),
    (r"\bEventSource\b", "network access via EventSource"),
    (r"\bsendBeacon\b", "network access via sendBeacon"),
    (
        r"\b(?:localStorage|sessionStorage|indexedDB)\b",
        "persistent storage access",
    ),
    (r"\bcaches\s*[.\[]", "cache storage access"),
    (r"\bdocument\s*[.\[]", "host document access"),
    (r"\bwindow\s*[.\[]", "host window access"),
    (r"\bself\s*[.\[]", "global scope access via self"),
    (r"\bglobalThis\b", "global scope access via globalThis"),
    (r"\bnavigator\s*[.\[]", "navigator access"),
    (r"\blocation\s*(?:[.\[]|=[^=])", "location access"),
    (r"\bprocess\s*[.\[]", "process access"),
    (r"\beval\s*\(", "dynamic code evaluation"),
    (r"\bFunction\s*\(", "dynamic function construction"),
    (r"\bset(?:Timeout|Interval)\s*\(", "timer scheduling"),
    (r"\bimportScripts\b", "script import"),
    (r"\brequire\s*\(", "module loading via require"),
    (r"\bimport\s*\(", "dynamic import"),
    (r"(?m)^\s*import\b", "import statement"),
    (r"(?m)^\s*export\b", "export statement"),
    (r"\bnew\s+[A-Za-z_$][\w$]*\s*\(", "constructor call"),
    (r"\.\s*writeFile\s*\(", "file write"),
    (r"\.\s*write\s*\(", "file write"),
    (r"\.\s*stream\s*\(", "stream output"),
    (r"\[\s*['\x22`](?:writeFile|write|stream)['\x22`]\s*\]", "file write"),
    (
        r"\b(?:chrome|browser)\s*\.\s*(?:storage|tabs|scripting|cookies|downloads|history|identity|debugger|windows|webRequest|management|permissions)\b",
        "extension API access",
    ),
    (
        r"\b(?:chrome|browser)\s*\.\s*runtime\s*\.\s*(?:sendMessage|sendNativeMessage|connect|connectNative|reload)\b",
        "extension messaging",
    ),
    (r"__proto__", "prototype access"),
    (r"\.\s*constructor\b|\[\s*['\x22`]constructor", "constructor access"),
    (r"\.\s*prototype\b|\[\s*['\x22`]prototype", "prototype access"),
];

static RULE_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(RULES.iter().map(|(pattern, _)| *pattern)).expect("safety rule patterns")
});

/// Regex-based validator
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternValidator;

impl PatternValidator {
    /// Create a pattern validator
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Description of the first rule `snippet` trips, if any
    #[must_use]
    pub fn first_violation(&self, snippet: &str) -> Option<&'static str> {
        RULE_SET
            .matches(snippet)
            .iter()
            .next()
            .map(|index| RULES[index].1)
    }
}

impl SafetyValidator for PatternValidator {
    fn validate(&self, snippet: &str) -> SafetyVerdict {
        match self.first_violation(snippet) {
            Some(reason) => {
                tracing::debug!("Pattern rule matched: {}", reason);
                SafetyVerdict::reject(Strategy::Pattern, reason)
            }
            None => SafetyVerdict::pass(Strategy::Pattern),
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::Pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(snippet: &str) -> Option<&'static str> {
        PatternValidator::new().first_violation(snippet)
    }

    #[test]
    fn benign_snippet_passes() {
        let snippet = r#"
            const slide = pptx.addSlide();
            slide.addText("What's new in Q3", {x: 1, y: 1, color: "1F2937"});
            slide.addImage({path: chrome.runtime.getURL("icons/star.svg"), x: 1, y: 2, w: 1, h: 1});
        "#;
        assert_eq!(reason(snippet), None);
    }

    #[test]
    fn dangerous_text_is_rejected() {
        assert_eq!(reason("fetch('https://x')"), Some("network access via fetch"));
        assert_eq!(reason("pptx.writeFile({fileName: 'a'})"), Some("file write"));
        assert_eq!(reason("pptx[\"writeFile\"]({})"), Some("file write"));
        assert_eq!(reason("const p = new PptxGenJS();"), Some("constructor call"));
        assert_eq!(reason("x = window.top"), Some("host window access"));
        assert_eq!(reason("import fs from 'fs'"), Some("import statement"));
        assert_eq!(reason("a.constructor"), Some("constructor access"));
        assert_eq!(reason("chrome.storage.local.get()"), Some("extension API access"));
    }

    #[test]
    fn string_contents_are_not_exempt() {
        assert!(reason(r#"slide.addText("call fetch(url)", {})"#).is_some());
    }

    #[test]
    fn verdict_carries_strategy() {
        let verdict = PatternValidator::new().validate("eval('1')");
        assert!(!verdict.passed);
        assert_eq!(verdict.strategy, Strategy::Pattern);
        assert_eq!(verdict.reason.as_deref(), Some("dynamic code evaluation"));
    }
}
