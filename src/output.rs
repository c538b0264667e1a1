//! Result types returned by the conversion entry points.

use crate::model::{StructuredDocument, Tag};
use crate::pipeline::noise::NoiseReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document information dictionary plus page count, as reported by pdfium.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Everything the filter, classifier and merger produced for one source,
/// before any file is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub document: StructuredDocument,
    /// Pages in the source.
    pub total_pages: usize,
    /// Selected pages whose content was read.
    pub processed_pages: usize,
    /// 1-indexed numbers of selected pages that could not be read.
    pub failed_pages: Vec<usize>,
    /// Text blocks read from the source, before filtering.
    pub raw_blocks: usize,
    /// Images read from the source, before filtering.
    pub raw_images: usize,
    /// Height used for the header/footer bands.
    pub page_height: f32,
    pub noise: NoiseReport,
}

impl Extraction {
    /// `true` when the source produced neither text nor images.
    pub fn is_empty(&self) -> bool {
        self.raw_blocks == 0 && self.raw_images == 0
    }
}

/// Statistics for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub skipped_pages: usize,

    pub raw_blocks: usize,
    pub raw_images: usize,
    pub noise: NoiseReport,

    /// Elements in the final document, after merging.
    pub elements: usize,
    pub headings: usize,
    pub paragraphs: usize,
    pub list_items: usize,
    pub captions: usize,

    pub images_saved: usize,
    pub images_skipped: usize,

    pub extract_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ConversionStats {
    /// Fill the page and element counts from an extraction.
    pub fn from_extraction(extraction: &Extraction) -> Self {
        let doc = &extraction.document;
        Self {
            total_pages: extraction.total_pages,
            processed_pages: extraction.processed_pages,
            failed_pages: extraction.failed_pages.len(),
            skipped_pages: extraction
                .total_pages
                .saturating_sub(extraction.processed_pages + extraction.failed_pages.len()),
            raw_blocks: extraction.raw_blocks,
            raw_images: extraction.raw_images,
            noise: extraction.noise,
            elements: doc.len(),
            headings: doc.iter().filter(|e| e.tag().is_heading()).count(),
            paragraphs: doc.count(Tag::P),
            list_items: doc.count(Tag::Li),
            captions: doc.count(Tag::Caption),
            ..Self::default()
        }
    }
}

/// Output of a completed conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Contents of `main.md`.
    pub markdown: String,
    /// `<output_root>/extracted/<stem>/`.
    pub output_dir: PathBuf,
    pub markdown_path: PathBuf,
    /// Saved images, in document order.
    pub images: Vec<PathBuf>,
    pub stats: ConversionStats,
}
