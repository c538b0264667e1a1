//! Error types for the structmd library.
//!
//! A single enum, [`Pdf2MdError`], covers every failure the pipeline can
//! report. Not every variant is fatal:
//!
//! * Source failures that stop a document from being opened at all
//!   (missing file, not a PDF, wrong password) are returned from the
//!   top-level `convert*` functions.
//!
//! * [`Pdf2MdError::PageReadFailed`] and [`Pdf2MdError::ImageDecodeFailed`]
//!   are produced by [`crate::source::DocumentSource`] implementations but
//!   handled locally by the pipeline: the page or image is skipped and the
//!   run continues.
//!
//! * [`Pdf2MdError::EmptyExtraction`] short-circuits a run before any output
//!   directory is created.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the structmd library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The backend could not read the content of one page.
    #[error("Failed to read page {page}: {detail}")]
    PageReadFailed { page: usize, detail: String },

    /// The raw bytes of one embedded image could not be decoded.
    #[error("Failed to decode image {object} on page {page}: {detail}")]
    ImageDecodeFailed {
        page: usize,
        object: usize,
        detail: String,
    },

    /// No text or image was extracted, or everything extracted was noise.
    /// Nothing was written.
    #[error("Nothing to write for '{source_name}': no text or images left after extraction")]
    EmptyExtraction { source_name: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another input of the same batch already writes to this directory.
    #[error("Skipping '{path}': '{first}' already writes to {output_dir:?}\nRename one of the files to convert both.")]
    DuplicateOutput {
        path: PathBuf,
        first: PathBuf,
        output_dir: PathBuf,
    },

    /// An image could not be re-encoded as JPEG.
    #[error("Failed to encode image '{path}': {detail}")]
    ImageEncodeFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the executable or in the working directory.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2MdError {
    /// `true` for errors the pipeline recovers from by skipping one page or
    /// one image.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Pdf2MdError::PageReadFailed { .. } | Pdf2MdError::ImageDecodeFailed { .. }
        )
    }
}
