//! Document sources: the narrow boundary between the heuristics and a PDF
//! backend.
//!
//! The pipeline never touches pdfium directly. It asks a [`DocumentSource`]
//! for page geometry, per-page text blocks and image placements, and the
//! decoded pixels of one image. Two implementations ship with the crate:
//!
//! * [`pdfium::PdfiumDocument`] reads a real PDF through `pdfium-render` and
//!   reconstructs blocks with [`layout`].
//! * [`memory::MemoryDocument`] serves pages assembled in memory, which keeps
//!   every stage testable without a PDF file or the pdfium library.

pub mod layout;
pub mod memory;
pub mod pdfium;

use crate::error::Pdf2MdError;
use crate::model::{ImageElement, ImageRef, TextBlock};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Raw content of one page, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    pub blocks: Vec<TextBlock>,
    pub images: Vec<ImageElement>,
}

/// Capability set the pipeline needs from a PDF backend.
///
/// Page indices are 0-based. Implementations report failures as
/// [`Pdf2MdError::PageReadFailed`] / [`Pdf2MdError::ImageDecodeFailed`]; the
/// pipeline treats both as local and keeps going.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Height of `page` in points.
    fn page_height(&self, page: usize) -> Result<f32, Pdf2MdError>;

    /// Text blocks and image placements of `page`.
    fn page(&self, page: usize) -> Result<PageData, Pdf2MdError>;

    /// Decode the pixels of a previously reported image.
    fn decode_image(&self, image: &ImageRef) -> Result<DynamicImage, Pdf2MdError>;
}

impl<S: DocumentSource + ?Sized> DocumentSource for &S {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn page_height(&self, page: usize) -> Result<f32, Pdf2MdError> {
        (**self).page_height(page)
    }

    fn page(&self, page: usize) -> Result<PageData, Pdf2MdError> {
        (**self).page(page)
    }

    fn decode_image(&self, image: &ImageRef) -> Result<DynamicImage, Pdf2MdError> {
        (**self).decode_image(image)
    }
}
