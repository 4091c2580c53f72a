//! Configuration types for receipt sorting.
//!
//! Two structs split the knobs by where they come from:
//!
//! * [`ReceiptConfig`] is the JSON configuration file: anchors, keywords,
//!   margins and output order. It is loaded once per run and read-only
//!   afterwards.
//! * [`SortOptions`] holds per-invocation runtime settings that never live
//!   in the JSON file (PDF password, pdfium library path, progress callback).
//!
//! Both are built through builders so callers only set what they care about.

use crate::error::SortError;
use crate::progress::ProgressCallback;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Category assigned when no keyword matches.
pub const OTHERS_CATEGORY: &str = "others";

/// Default distance (in points) kept above each header anchor.
pub const DEFAULT_MARGIN_TOP: f32 = 20.0;

/// Sorting configuration, normally loaded from `config.json`.
///
/// # Example
/// ```rust
/// use receipt_sorter::ReceiptConfig;
///
/// let config = ReceiptConfig::from_json_str(r#"{
///     "header_anchors": ["转账凭证", "回单"],
///     "category_keywords": {"CCB": ["建设银行"], "ICBC": ["工商银行"]},
///     "output_order": ["ICBC", "CCB", "others"]
/// }"#).unwrap();
///
/// assert_eq!(config.crop_margins.top, 20.0);
/// assert_eq!(config.category_keywords.categories().collect::<Vec<_>>(), ["CCB", "ICBC"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Header anchor texts in priority order. The first anchor that matches
    /// anything on a page is the only one used for that page.
    pub header_anchors: Vec<String>,

    /// Footer anchor texts. All of them are searched on every page.
    #[serde(default)]
    pub footer_anchors: Vec<String>,

    /// Margins applied around detected anchors.
    #[serde(default)]
    pub crop_margins: CropMargins,

    /// Category name → keywords, in declaration order.
    pub category_keywords: CategoryKeywords,

    /// Order in which categories are written. Empty means declaration order
    /// followed by [`OTHERS_CATEGORY`].
    #[serde(default)]
    pub output_order: Vec<String>,
}

impl ReceiptConfig {
    /// Create a new builder for `ReceiptConfig`.
    pub fn builder() -> ReceiptConfigBuilder {
        ReceiptConfigBuilder::default()
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SortError> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let raw = std::fs::read_to_string(path).map_err(|e| SortError::ConfigLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let config: ReceiptConfig =
            serde_json::from_str(&raw).map_err(|e| SortError::ConfigLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, SortError> {
        let config: ReceiptConfig =
            serde_json::from_str(json).map_err(|e| SortError::ConfigLoad {
                path: PathBuf::from("<inline>"),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Categories in the order they are written to the output.
    ///
    /// An empty `output_order` falls back to the declared categories
    /// followed by [`OTHERS_CATEGORY`]. Repeated entries are kept once, at
    /// their first position.
    pub fn effective_output_order(&self) -> Vec<String> {
        let requested: Vec<&str> = if self.output_order.is_empty() {
            self.category_keywords
                .categories()
                .chain(std::iter::once(OTHERS_CATEGORY))
                .collect()
        } else {
            self.output_order.iter().map(String::as_str).collect()
        };

        let mut order: Vec<String> = Vec::with_capacity(requested.len());
        for category in requested {
            if !order.iter().any(|c| c == category) {
                order.push(category.to_string());
            }
        }
        order
    }

    /// Check constraints the JSON schema cannot express.
    pub fn validate(&self) -> Result<(), SortError> {
        if let Some(i) = self.header_anchors.iter().position(|a| a.is_empty()) {
            return Err(SortError::InvalidConfig(format!(
                "header_anchors[{i}] is empty; an empty anchor matches every word"
            )));
        }
        if let Some(i) = self.footer_anchors.iter().position(|a| a.is_empty()) {
            return Err(SortError::InvalidConfig(format!(
                "footer_anchors[{i}] is empty; an empty anchor matches every word"
            )));
        }
        let top = self.crop_margins.top;
        if !top.is_finite() || top < 0.0 {
            return Err(SortError::InvalidConfig(format!(
                "crop_margins.top must be a finite number ≥ 0, got {top}"
            )));
        }
        for (category, keywords) in self.category_keywords.iter() {
            if category.is_empty() {
                return Err(SortError::InvalidConfig(
                    "category_keywords contains an empty category name".into(),
                ));
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(SortError::InvalidConfig(format!(
                    "category '{category}' has an empty keyword"
                )));
            }
        }
        Ok(())
    }
}

/// Margins applied around detected anchors, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropMargins {
    /// Space kept above each header anchor. Default: 20.
    #[serde(default = "default_margin_top")]
    pub top: f32,
}

fn default_margin_top() -> f32 {
    DEFAULT_MARGIN_TOP
}

impl Default for CropMargins {
    fn default() -> Self {
        Self {
            top: DEFAULT_MARGIN_TOP,
        }
    }
}

// ── Ordered keyword mapping ──────────────────────────────────────────────

/// Category → keywords mapping that keeps JSON declaration order.
///
/// Classification is first-match-wins in this order, so it must survive
/// deserialisation. A hash map would lose it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryKeywords(Vec<(String, Vec<String>)>);

impl CategoryKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a category. A repeated category keeps its first position and
    /// takes the new keywords, as a repeated JSON object key does.
    pub fn insert(&mut self, category: impl Into<String>, keywords: Vec<String>) {
        let category = category.into();
        match self.0.iter_mut().find(|(c, _)| *c == category) {
            Some((_, existing)) => *existing = keywords,
            None => self.0.push((category, keywords)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(c, k)| (c.as_str(), k.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C, K> FromIterator<(C, Vec<K>)> for CategoryKeywords
where
    C: Into<String>,
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, Vec<K>)>>(iter: I) -> Self {
        let mut map = CategoryKeywords::new();
        for (category, keywords) in iter {
            map.insert(category, keywords.into_iter().map(Into::into).collect());
        }
        map
    }
}

impl Serialize for CategoryKeywords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(c, k)| (c, k)))
    }
}

impl<'de> Deserialize<'de> for CategoryKeywords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = CategoryKeywords;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category name to a list of keywords")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = CategoryKeywords::new();
                while let Some((category, keywords)) = access.next_entry::<String, Vec<String>>()? {
                    map.insert(category, keywords);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Builder for [`ReceiptConfig`].
#[derive(Debug)]
pub struct ReceiptConfigBuilder {
    config: ReceiptConfig,
}

impl Default for ReceiptConfigBuilder {
    fn default() -> Self {
        Self {
            config: ReceiptConfig {
                header_anchors: Vec::new(),
                footer_anchors: Vec::new(),
                crop_margins: CropMargins::default(),
                category_keywords: CategoryKeywords::new(),
                output_order: Vec::new(),
            },
        }
    }
}

impl ReceiptConfigBuilder {
    pub fn header_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.config.header_anchors.push(anchor.into());
        self
    }

    pub fn footer_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.config.footer_anchors.push(anchor.into());
        self
    }

    pub fn margin_top(mut self, top: f32) -> Self {
        self.config.crop_margins.top = top;
        self
    }

    pub fn category<K: Into<String>>(
        mut self,
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = K>,
    ) -> Self {
        self.config
            .category_keywords
            .insert(name, keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn output_order<S: Into<String>>(mut self, order: impl IntoIterator<Item = S>) -> Self {
        self.config.output_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReceiptConfig, SortError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Runtime options ──────────────────────────────────────────────────────

/// Per-invocation settings that are not part of the configuration file.
#[derive(Clone, Default)]
pub struct SortOptions {
    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library. When `None`, the library
    /// is located through `PDFIUM_LIB_PATH`, the current directory and the
    /// system search path, in that order.
    pub pdfium_library: Option<PathBuf>,

    /// Optional progress callback for per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for SortOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SortProgressCallback>"),
            )
            .finish()
    }
}

impl SortOptions {
    pub fn builder() -> SortOptionsBuilder {
        SortOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`SortOptions`].
#[derive(Debug)]
pub struct SortOptionsBuilder {
    options: SortOptions,
}

impl SortOptionsBuilder {
    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.options.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.pdfium_library = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.options.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> SortOptions {
        self.options
    }
}
