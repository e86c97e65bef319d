//! Icon retrieval and re-tinting
//!
//! Internal `.svg` icons may carry the color they should be drawn in as a
//! query parameter (`icons/bolt.svg?color=FFFFFF`). Such locators are
//! fetched, recoloured and handed to the builder as an SVG data URI. Fetched
//! documents are cached per locator; failures substitute
//! [`FALLBACK_ICON_SVG`].

use crate::error::AssetError;
use crate::sanitize::normalize_color;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use moka::future::Cache;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Drawn when an icon cannot be fetched: a filled circle with an
/// exclamation mark cut out
pub const FALLBACK_ICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="currentColor"><path fill-rule="evenodd" d="M12 2a10 10 0 1 0 0 20 10 10 0 0 0 0-20Zm-1 5h2v7h-2V7Zm0 9h2v2h-2v-2Z"/></svg>"##;

const DEFAULT_CACHE_CAPACITY: u64 = 256;

static PAINT_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(fill|stroke)\s*=\s*("[^"]*"|'[^']*')"#).expect("paint attribute pattern")
});

static PAINT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(fill|stroke)\s*:\s*([^;\x22']+)").expect("paint style pattern"));

static SVG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<svg\b[^>]*>").expect("svg tag pattern"));

/// Fetches raw asset bytes
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync + Debug {
    /// Fetch the document at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Fetcher backed by an in-memory map
#[derive(Debug, Clone, Default)]
pub struct StaticAssetFetcher {
    assets: HashMap<String, Vec<u8>>,
}

impl StaticAssetFetcher {
    /// Create empty fetcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset
    #[must_use]
    pub fn with_asset(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(url.into(), bytes.into());
        self
    }
}

#[async_trait::async_trait]
impl AssetFetcher for StaticAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(url.to_string()))
    }
}

/// Parsed `...svg?color=...` locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TintRequest {
    /// Locator without the query string
    pub url: String,
    /// Normalized six-digit hex color
    pub color: String,
}

/// Re-fetches and recolours internal SVG icons
#[derive(Debug, Clone)]
pub struct IconTinter {
    fetcher: Arc<dyn AssetFetcher>,
    cache: Cache<String, Arc<str>>,
    internal_scheme: String,
}

impl IconTinter {
    /// Create tinter for icons under `internal_scheme`
    #[must_use]
    pub fn new(fetcher: Arc<dyn AssetFetcher>, internal_scheme: impl Into<String>) -> Self {
        Self::with_capacity(fetcher, internal_scheme, DEFAULT_CACHE_CAPACITY)
    }

    /// Create tinter with a bounded icon cache
    #[must_use]
    pub fn with_capacity(
        fetcher: Arc<dyn AssetFetcher>,
        internal_scheme: impl Into<String>,
        max_capacity: u64,
    ) -> Self {
        Self {
            fetcher,
            cache: Cache::new(max_capacity),
            internal_scheme: internal_scheme.into(),
        }
    }

    /// Recognize an internal SVG locator that asks for a tint
    #[must_use]
    pub fn tint_request(&self, locator: &str) -> Option<TintRequest> {
        if !locator.starts_with(&self.internal_scheme) {
            return None;
        }
        let (url, query) = locator.split_once('?')?;
        if !url.to_ascii_lowercase().ends_with(".svg") {
            return None;
        }
        let query = query.split('#').next().unwrap_or_default();
        let raw = query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            matches!(key, "color" | "tint").then_some(value)
        })?;
        let raw = raw.replace("%23", "#");
        Some(TintRequest {
            url: url.to_string(),
            color: normalize_color(&raw)?,
        })
    }

    /// Tinted icon as a `data:image/svg+xml;base64,` URI
    ///
    /// Never fails: an unavailable icon is replaced by the fallback icon in
    /// the requested color.
    pub async fn tinted_data_uri(&self, request: &TintRequest) -> String {
        let svg = match self.svg(&request.url).await {
            Ok(svg) => svg,
            Err(e) => {
                tracing::warn!("Using fallback icon for {}: {}", request.url, e);
                Arc::from(FALLBACK_ICON_SVG)
            }
        };
        svg_data_uri(&recolor_svg(&svg, &request.color))
    }

    /// Number of cached icon documents
    #[must_use]
    pub fn cached_icons(&self) -> u64 {
        self.cache.entry_count()
    }

    async fn svg(&self, url: &str) -> Result<Arc<str>, AssetError> {
        if let Some(cached) = self.cache.get(url).await {
            return Ok(cached);
        }

        let bytes = self.fetcher.fetch(url).await?;
        let text = String::from_utf8(bytes).map_err(|_| AssetError::NotSvg(url.to_string()))?;
        if !text.contains("<svg") {
            return Err(AssetError::NotSvg(url.to_string()));
        }

        let svg: Arc<str> = Arc::from(text);
        self.cache.insert(url.to_string(), Arc::clone(&svg)).await;
        tracing::debug!("Cached icon {}", url);
        Ok(svg)
    }
}

/// Repaint every fill and stroke (except `none` and gradient references)
///
/// A root `<svg>` without a `fill` attribute gets one, so paths relying on
/// the default black fill are tinted too.
#[must_use]
pub fn recolor_svg(svg: &str, hex: &str) -> String {
    let paint = format!("#{hex}");
    let keep = |value: &str| {
        let value = value.trim().trim_matches(['"', '\'']);
        value.eq_ignore_ascii_case("none") || value.starts_with("url(")
    };

    let out = PAINT_ATTR.replace_all(svg, |caps: &Captures<'_>| {
        if keep(&caps[2]) {
            caps[0].to_string()
        } else {
            format!("{}=\"{}\"", &caps[1], paint)
        }
    });
    let out = PAINT_STYLE.replace_all(&out, |caps: &Captures<'_>| {
        if keep(&caps[2]) {
            caps[0].to_string()
        } else {
            format!("{}:{}", &caps[1], paint)
        }
    });
    let out = out.replace("currentColor", &paint);

    match SVG_OPEN.find(&out) {
        Some(tag) if !PAINT_ATTR.captures_iter(tag.as_str()).any(|c| &c[1] == "fill") => {
            let insert_at = tag.start() + "<svg".len();
            format!("{} fill=\"{}\"{}", &out[..insert_at], paint, &out[insert_at..])
        }
        _ => out,
    }
}

/// Base64 SVG data URI
#[must_use]
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}
