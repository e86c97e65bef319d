//! Resource locator resolution
//!
//! The only call form in the dialect that reaches outside the snippet is
//! `chrome.runtime.getURL("relative/path")`. The evaluator checks the argument
//! with [`is_safe_relative_path`] before asking the host's
//! [`ResourceResolver`] for an absolute locator.

use std::fmt::Debug;

/// Callee names recognized as the resource locator
pub const RESOURCE_LOCATORS: &[&str] = &["chrome.runtime.getURL", "browser.runtime.getURL"];

/// Maps an internal relative path to an absolute locator
pub trait ResourceResolver: Send + Sync + Debug {
    /// Resolve `relative` (already checked to be safe) to an absolute locator
    fn resolve(&self, relative: &str) -> String;
}

/// Resolver that joins relative paths onto a fixed base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlResolver {
    base: String,
}

impl BaseUrlResolver {
    /// Create resolver for a base such as `chrome-extension://<id>/`
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    /// Configured base URL (always ends with `/`)
    #[inline]
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

impl Default for BaseUrlResolver {
    fn default() -> Self {
        Self::new("chrome-extension://deckscript/")
    }
}

impl ResourceResolver for BaseUrlResolver {
    fn resolve(&self, relative: &str) -> String {
        format!("{}{}", self.base, relative.trim_start_matches("./"))
    }
}

/// Whether `path` is a relative resource path with no scheme or traversal
#[must_use]
pub fn is_safe_relative_path(path: &str) -> bool {
    let path_part = path.split(['?', '#']).next().unwrap_or_default();
    !path_part.is_empty()
        && !path_part.starts_with('/')
        && !path_part.contains(':')
        && !path_part.contains('\\')
        && !path_part.split('/').any(|seg| seg == "..")
        && path.chars().all(|c| !c.is_control())
}
