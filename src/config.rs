//! Configuration types for PDF-to-Markdown conversion.
//!
//! Every threshold the heuristics use lives in [`ConversionConfig`], built via
//! [`ConversionConfigBuilder`]. The defaults reproduce the fixed schema the
//! pipeline was tuned for; callers only override what their documents need.

use crate::error::Pdf2MdError;
use crate::progress::{ConversionProgressCallback, ProgressCallback};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fallback page height (ISO A4, in points) when page geometry is unreadable.
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Watermark text markers: ISO dates, revision and document-code literals,
/// and the Vietnamese "issue date" phrase.
pub const DEFAULT_WATERMARK_PATTERN: &str = r"\d{4}-\d{2}-\d{2}|_Al Race|TD003|Lần ban hành";

/// Configuration for a PDF-to-Markdown conversion.
///
/// # Example
/// ```rust
/// use structmd::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .header_ratio(0.10)
///     .jpeg_quality(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 90);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Elements whose top edge lies above `header_ratio × page height` are
    /// running headers. Default: 0.12.
    pub header_ratio: f32,

    /// Elements whose bottom edge lies below `footer_ratio × page height` are
    /// running footers. Default: 0.90.
    pub footer_ratio: f32,

    /// Images whose pixel width or height is at or below this value are
    /// decorative glyphs. Default: 15.
    pub min_image_side: u32,

    /// Images with at most this many distinct colours are flat fills, rules or
    /// boxes. Default: 4.
    pub max_noise_colors: usize,

    /// Page height used when the backend cannot report one. Default: 841.89.
    pub default_page_height: f32,

    /// JPEG quality for saved images, 1–100. Default: 75.
    pub jpeg_quality: u8,

    /// Case-insensitive pattern searched in a block's first span to flag it
    /// as a watermark. Default: [`DEFAULT_WATERMARK_PATTERN`].
    pub watermark_pattern: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Number of documents converted at once by
    /// [`crate::convert::convert_batch`]. Default: 2.
    pub concurrency: usize,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            header_ratio: 0.12,
            footer_ratio: 0.90,
            min_image_side: 15,
            max_noise_colors: 4,
            default_page_height: A4_HEIGHT_PT,
            jpeg_quality: 75,
            watermark_pattern: DEFAULT_WATERMARK_PATTERN.to_string(),
            password: None,
            pages: PageSelection::default(),
            concurrency: 2,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("header_ratio", &self.header_ratio)
            .field("footer_ratio", &self.footer_ratio)
            .field("min_image_side", &self.min_image_side)
            .field("max_noise_colors", &self.max_noise_colors)
            .field("default_page_height", &self.default_page_height)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("watermark_pattern", &self.watermark_pattern)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn header_ratio(mut self, ratio: f32) -> Self {
        self.config.header_ratio = ratio;
        self
    }

    pub fn footer_ratio(mut self, ratio: f32) -> Self {
        self.config.footer_ratio = ratio;
        self
    }

    pub fn min_image_side(mut self, px: u32) -> Self {
        self.config.min_image_side = px;
        self
    }

    pub fn max_noise_colors(mut self, n: usize) -> Self {
        self.config.max_noise_colors = n;
        self
    }

    pub fn default_page_height(mut self, pt: f32) -> Self {
        self.config.default_page_height = pt;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn watermark_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.watermark_pattern = pattern.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if !(0.0..1.0).contains(&c.header_ratio) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "header ratio must be in [0, 1), got {}",
                c.header_ratio
            )));
        }
        if !(c.footer_ratio > c.header_ratio && c.footer_ratio <= 1.0) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "footer ratio must be in (header ratio, 1], got {}",
                c.footer_ratio
            )));
        }
        if c.default_page_height.is_nan() || c.default_page_height <= 0.0 {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "default page height must be positive, got {}",
                c.default_page_height
            )));
        }
        if let Err(e) = Regex::new(&c.watermark_pattern) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "watermark pattern does not compile: {e}"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
