//! # structmd
//!
//! Convert PDF documents to structured Markdown plus extracted JPEG images,
//! using layout heuristics instead of OCR or a language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Source     text blocks + image placements per page (pdfium)
//!  ├─ 2. Noise      drop headers, footers, watermarks, decorative images
//!  ├─ 3. Classify   H1 / H2 / H3 / LI / P / CAPTION from the first span
//!  ├─ 4. Merge      reading-order sort, consecutive paragraphs joined
//!  └─ 5. Render     main.md + images/image<N>.jpg
//! ```
//!
//! Every stage reads pages through the [`source::DocumentSource`] trait, so
//! the heuristics run the same against a real PDF
//! ([`source::pdfium::PdfiumDocument`]) and an in-memory document
//! ([`source::memory::MemoryDocument`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use structmd::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("manual.pdf", "output", &config).await?;
//!     println!("{}", output.markdown_path.display());
//!     eprintln!("{} elements, {} images",
//!         output.stats.elements,
//!         output.stats.images_saved);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! structmd = { version = "0.3", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The pdfium shared library is loaded at runtime from `PDFIUM_LIB_PATH`, the
//! working directory, or the system library path, in that order.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{
    convert, convert_batch, convert_source, convert_sync, inspect, render_document,
    structure_document,
};
pub use error::Pdf2MdError;
pub use model::{ClassifiedElement, StructuredDocument, Tag};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, Extraction};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use source::DocumentSource;
