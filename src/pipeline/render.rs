//! Markdown rendering of a [`StructuredDocument`].
//!
//! Text elements become one Markdown block each; image elements are decoded
//! from their source, saved as numbered JPEGs and linked. The document starts
//! with `# <title>` and blocks are separated by a blank line.

use super::encode::{image_link, save_jpeg};
use crate::error::Pdf2MdError;
use crate::model::{Content, ImageElement, Span, StructuredDocument, Tag};
use crate::source::DocumentSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

static RE_H1_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.?\s*").unwrap());
static RE_H2_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.?\s*").unwrap());
static RE_H3_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\.?\s*").unwrap());
static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•*\-\s]+|^\d+\.\s*").unwrap());
static RE_CAPTION_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(hình \d+\.?)").unwrap());

// ── Inline text ─────────────────────────────────────────────────────────

/// Concatenate span texts, newlines folded to spaces, trimmed.
pub fn spans_to_plain(spans: &[Span]) -> String {
    let joined: String = spans.iter().map(|s| s.text.as_str()).collect();
    joined.replace('\n', " ").trim().to_string()
}

/// Concatenate spans with inline emphasis.
///
/// Bold is `**t**`, italic `_t_`, both `_**t**_`. Whitespace-only spans are
/// never wrapped, and surrounding whitespace of a styled span is kept
/// outside its markers.
pub fn spans_to_markdown(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let text = span.text.as_str();
        let (bold, italic) = (span.is_bold(), span.is_italic());
        if span.is_blank() || !(bold || italic) {
            out.push_str(text);
            continue;
        }

        let core = text.trim();
        let lead = &text[..text.len() - text.trim_start().len()];
        let tail = &text[text.trim_end().len()..];
        out.push_str(lead);
        match (bold, italic) {
            (true, true) => {
                out.push_str("_**");
                out.push_str(core);
                out.push_str("**_");
            }
            (true, false) => {
                out.push_str("**");
                out.push_str(core);
                out.push_str("**");
            }
            _ => {
                out.push('_');
                out.push_str(core);
                out.push('_');
            }
        }
        out.push_str(tail);
    }
    out.replace('\n', " ").trim().to_string()
}

/// Render one text element, or `None` for images.
pub fn render_text(tag: Tag, spans: &[Span]) -> Option<String> {
    let block = match tag {
        Tag::H1 => {
            let text = spans_to_plain(spans);
            format!("# {}", RE_H1_NUMBER.replace(&text, "").trim())
        }
        Tag::H2 => {
            let text = spans_to_plain(spans);
            format!("## {}", RE_H2_NUMBER.replace(&text, "").trim())
        }
        Tag::H2NoNum => format!("## {}", spans_to_plain(spans)),
        Tag::H3 => {
            let text = spans_to_plain(spans);
            format!("### {}", RE_H3_NUMBER.replace(&text, "").trim())
        }
        Tag::P => spans_to_markdown(spans),
        Tag::Li => {
            let text = spans_to_markdown(spans);
            format!("  * {}", RE_LIST_MARKER.replace(&text, ""))
        }
        Tag::Caption => {
            let text = spans_to_markdown(spans);
            match RE_CAPTION_LABEL.captures(&text).and_then(|c| c.get(1)) {
                Some(label) => format!(
                    "_**{}** {}_",
                    label.as_str(),
                    text[label.end()..].trim()
                ),
                None => format!("_{}_", text),
            }
        }
        Tag::Image => return None,
    };
    Some(block)
}

// ── Images ──────────────────────────────────────────────────────────────

/// Sequence number of the next saved image, starting at 1.
///
/// A number is consumed only when an image is actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCounter(usize);

impl Default for ImageCounter {
    fn default() -> Self {
        ImageCounter(1)
    }
}

impl ImageCounter {
    pub fn peek(self) -> usize {
        self.0
    }

    /// Number of images saved so far.
    pub fn saved(self) -> usize {
        self.0 - 1
    }

    fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Result of rendering a document.
#[derive(Debug, Clone, Default)]
pub struct RenderedMarkdown {
    pub markdown: String,
    /// Paths of the written images, in document order.
    pub images: Vec<PathBuf>,
    /// Images that failed to decode or encode and were left out.
    pub skipped_images: usize,
}

/// Turns a structured document into Markdown plus image files.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    jpeg_quality: u8,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self { jpeg_quality: 75 }
    }
}

impl MarkdownRenderer {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Render `doc`, writing images into `images_dir` (which must exist).
    ///
    /// Images that cannot be decoded or encoded are skipped with a warning;
    /// only a failure to write a file aborts the render.
    pub fn render<S: DocumentSource + ?Sized>(
        &self,
        source: &S,
        doc: &StructuredDocument,
        title: &str,
        images_dir: &Path,
    ) -> Result<RenderedMarkdown, Pdf2MdError> {
        let mut blocks: Vec<String> = Vec::with_capacity(doc.len() + 1);
        blocks.push(format!("# {title}"));

        let mut counter = ImageCounter::default();
        let mut images = Vec::new();
        let mut skipped_images = 0;

        for element in doc.iter() {
            match &element.content {
                Content::Text { tag, spans } => {
                    if let Some(block) = render_text(*tag, spans) {
                        blocks.push(block);
                    }
                }
                Content::Image { image } => {
                    match self.save_image(source, image, images_dir, &mut counter)? {
                        Some((path, link)) => {
                            images.push(path);
                            blocks.push(link);
                        }
                        None => skipped_images += 1,
                    }
                }
            }
        }

        debug!(
            "Rendered {} blocks, {} images saved, {} skipped",
            blocks.len(),
            counter.saved(),
            skipped_images
        );

        let mut markdown = blocks.join("\n\n");
        markdown.push('\n');
        Ok(RenderedMarkdown {
            markdown,
            images,
            skipped_images,
        })
    }

    fn save_image<S: DocumentSource + ?Sized>(
        &self,
        source: &S,
        image: &ImageElement,
        images_dir: &Path,
        counter: &mut ImageCounter,
    ) -> Result<Option<(PathBuf, String)>, Pdf2MdError> {
        let pixels = match source.decode_image(&image.reference) {
            Ok(pixels) => pixels,
            Err(e) => {
                warn!("Skipping image {}: {}", image.reference, e);
                return Ok(None);
            }
        };

        let n = counter.peek();
        match save_jpeg(&pixels, images_dir, n, self.jpeg_quality) {
            Ok(path) => {
                counter.advance();
                Ok(Some((path, format!("![]({})", image_link(n)))))
            }
            Err(e @ Pdf2MdError::ImageEncodeFailed { .. }) => {
                warn!("Skipping image {}: {}", image.reference, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
