//! Pipeline configuration
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! validator = "pattern"
//! presentation_globals = ["pptx", "deck"]
//!
//! [limits]
//! max_loop_iterations = 50
//! max_value_bytes = 65536
//!
//! [resources]
//! base_url = "chrome-extension://abcdef/"
//! ```

use crate::error::ConfigError;
use deckscript_dispatch::{DispatchOptions, StyleDefaults};
use deckscript_interp::eval::is_identifier;
use deckscript_interp::{BaseUrlResolver, EvalOptions, ExtractOptions, SlideSize};
use deckscript_safety::ValidatorChoice;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckScriptConfig {
    /// Resource bounds
    pub limits: Limits,
    /// Slide dimensions
    pub slide: SlideConfig,
    /// Resource locator settings
    pub resources: ResourceConfig,
    /// Identifiers bound to the presentation constants
    pub presentation_globals: Vec<String>,
    /// Fallback colors
    pub defaults: StyleDefaults,
    /// Safety validator selection
    pub validator: ValidatorChoice,
}

impl Default for DeckScriptConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            slide: SlideConfig::default(),
            resources: ResourceConfig::default(),
            presentation_globals: vec!["pptx".into(), "pres".into(), "presentation".into()],
            defaults: StyleDefaults::default(),
            validator: ValidatorChoice::Auto,
        }
    }
}

/// Resource bounds against adversarial snippets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Iterations unrolled per loop
    pub max_loop_iterations: usize,
    /// Loop nesting depth
    pub max_loop_depth: usize,
    /// Expression nesting depth
    pub max_eval_depth: usize,
    /// Call records per snippet
    pub max_call_records: usize,
    /// Snippet size in bytes
    pub max_snippet_bytes: usize,
    /// Loop iterations per snippet, summed over every loop
    pub max_total_iterations: usize,
    /// Footprint of any single string, array or object value
    pub max_value_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_loop_iterations: 100,
            max_loop_depth: 4,
            max_eval_depth: 64,
            max_call_records: 2000,
            max_snippet_bytes: 256 * 1024,
            max_total_iterations: 10_000,
            max_value_bytes: 256 * 1024,
        }
    }
}

/// Slide dimensions in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Default for SlideConfig {
    fn default() -> Self {
        let size = SlideSize::default();
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

/// Resource locator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Scheme every resolved internal resource must use
    pub internal_scheme: String,
    /// Base URL relative resource paths are joined onto
    pub base_url: String,
    /// Scheme prefixes accepted for image locators
    pub allowed_image_schemes: Vec<String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            internal_scheme: "chrome-extension://".into(),
            base_url: BaseUrlResolver::default().base().to_string(),
            allowed_image_schemes: DispatchOptions::default().allowed_image_schemes,
        }
    }
}

impl DeckScriptConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML and validate
    ///
    /// # Errors
    /// `Parse` for malformed TOML, `Invalid` for inconsistent values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `Io` when the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        for (name, value) in [
            ("limits.max_loop_iterations", limits.max_loop_iterations),
            ("limits.max_eval_depth", limits.max_eval_depth),
            ("limits.max_call_records", limits.max_call_records),
            ("limits.max_snippet_bytes", limits.max_snippet_bytes),
            ("limits.max_total_iterations", limits.max_total_iterations),
            ("limits.max_value_bytes", limits.max_value_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(format!("{name} must be positive")));
            }
        }
        let valid_dimension = |d: f64| d.is_finite() && d > 0.0;
        if !valid_dimension(self.slide.width) || !valid_dimension(self.slide.height) {
            return Err(ConfigError::invalid("slide dimensions must be positive"));
        }
        let resources = &self.resources;
        if !resources.internal_scheme.ends_with("://") {
            return Err(ConfigError::invalid(format!(
                "resources.internal_scheme `{}` must end with ://",
                resources.internal_scheme
            )));
        }
        if !resources.base_url.starts_with(&resources.internal_scheme) {
            return Err(ConfigError::invalid(format!(
                "resources.base_url `{}` must use scheme {}",
                resources.base_url, resources.internal_scheme
            )));
        }
        if let Some(bad) = self.presentation_globals.iter().find(|g| !is_identifier(g)) {
            return Err(ConfigError::invalid(format!(
                "presentation global `{bad}` is not an identifier"
            )));
        }
        Ok(())
    }

    /// With validator selection
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: ValidatorChoice) -> Self {
        self.validator = validator;
        self
    }

    /// With loop iteration cap
    #[inline]
    #[must_use]
    pub fn with_max_loop_iterations(mut self, max: usize) -> Self {
        self.limits.max_loop_iterations = max;
        self
    }

    /// With snippet size limit
    #[inline]
    #[must_use]
    pub fn with_max_snippet_bytes(mut self, max: usize) -> Self {
        self.limits.max_snippet_bytes = max;
        self
    }

    /// With slide dimensions
    #[inline]
    #[must_use]
    pub fn with_slide_size(mut self, width: f64, height: f64) -> Self {
        self.slide = SlideConfig { width, height };
        self
    }

    /// With resource base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.resources.base_url = base_url.into();
        self
    }

    /// With presentation globals
    #[must_use]
    pub fn with_presentation_globals<I, S>(mut self, globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presentation_globals = globals.into_iter().map(Into::into).collect();
        self
    }

    /// Slide size for geometry helpers and percentages
    #[must_use]
    pub fn slide_size(&self) -> SlideSize {
        SlideSize {
            width: self.slide.width,
            height: self.slide.height,
        }
    }

    /// Evaluator settings
    #[must_use]
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            slide: self.slide_size(),
            max_depth: self.limits.max_eval_depth,
            internal_scheme: self.resources.internal_scheme.clone(),
            max_value_bytes: self.limits.max_value_bytes,
        }
    }

    /// Extractor settings
    #[must_use]
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_loop_iterations: self.limits.max_loop_iterations,
            max_loop_depth: self.limits.max_loop_depth,
            max_call_records: self.limits.max_call_records,
            max_total_iterations: self.limits.max_total_iterations,
        }
    }

    /// Dispatcher settings
    #[must_use]
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            allowed_image_schemes: self.resources.allowed_image_schemes.clone(),
            defaults: self.defaults.clone(),
        }
    }

    /// Resolver joining onto the configured base URL
    #[must_use]
    pub fn resolver(&self) -> BaseUrlResolver {
        BaseUrlResolver::new(self.resources.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = DeckScriptConfig::from_toml_str(
            r#"
            validator = "pattern"
            presentation_globals = ["deck"]

            [limits]
            max_loop_iterations = 10

            [defaults]
            text_color = "000000"
            "#,
        )
        .unwrap();
        assert_eq!(config.validator, ValidatorChoice::Pattern);
        assert_eq!(config.limits.max_loop_iterations, 10);
        assert_eq!(config.limits.max_call_records, 2000);
        assert_eq!(config.defaults.text_color, "000000");
        assert_eq!(config.defaults.shape_fill, StyleDefaults::default().shape_fill);
        assert_eq!(config.presentation_globals, vec!["deck".to_string()]);
    }

    #[test]
    fn inconsistent_values_rejected() {
        let err = DeckScriptConfig::from_toml_str("[limits]\nmax_eval_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_eval_depth"));

        let err = DeckScriptConfig::from_toml_str("[limits]\nmax_value_bytes = 0").unwrap_err();
        assert!(err.to_string().contains("max_value_bytes"));

        let err = DeckScriptConfig::new()
            .with_base_url("https://example.com/")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DeckScriptConfig::new()
            .with_presentation_globals(["ok", "not ok"])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("not ok"));

        assert!(matches!(
            DeckScriptConfig::from_toml_str("validator = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn derived_options() {
        let config = DeckScriptConfig::new()
            .with_slide_size(13.333, 7.5)
            .with_max_loop_iterations(7);
        assert_eq!(config.eval_options().slide.height, 7.5);
        assert_eq!(config.extract_options().max_loop_iterations, 7);
        assert_eq!(config.extract_options().max_total_iterations, 10_000);
        assert_eq!(config.eval_options().max_value_bytes, 256 * 1024);
        assert_eq!(config.resolver().base(), "chrome-extension://deckscript/");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deckscript.toml");
        std::fs::write(&path, "[slide]\nwidth = 13.333\nheight = 7.5\n").unwrap();
        let config = DeckScriptConfig::load(&path).unwrap();
        assert_eq!(config.slide.width, 13.333);

        let missing = DeckScriptConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
