//! In-memory [`DocumentSource`].
//!
//! Pages are assembled from already-built [`TextBlock`]s and encoded image
//! bytes. Image bytes are decoded lazily with `image::load_from_memory`, the
//! same codec path a real backend goes through, so corrupt bytes surface as
//! [`Pdf2MdError::ImageDecodeFailed`] exactly where a broken PDF stream would.

use super::{DocumentSource, PageData};
use crate::error::Pdf2MdError;
use crate::model::{BBox, ImageElement, ImageRef, TextBlock};
use image::{DynamicImage, ImageFormat};
use std::collections::HashMap;
use std::io::Cursor;

#[derive(Debug, Clone, Default)]
struct MemoryPage {
    /// `None` simulates unreadable page geometry.
    height: Option<f32>,
    blocks: Vec<TextBlock>,
    images: Vec<ImageElement>,
    unreadable: bool,
}

/// A document held entirely in memory.
///
/// # Example
/// ```rust
/// use structmd::model::{BBox, Span, TextBlock, TextLine};
/// use structmd::source::memory::MemoryDocument;
/// use structmd::source::DocumentSource;
///
/// let mut doc = MemoryDocument::new();
/// let page = doc.add_page(842.0);
/// doc.add_block(TextBlock::new(
///     page,
///     BBox::new(72.0, 200.0, 400.0, 214.0),
///     vec![TextLine::new(vec![Span::new("Hello", "Helvetica", 11.0)])],
/// ));
/// assert_eq!(doc.page_count(), 1);
/// assert_eq!(doc.page(0).unwrap().blocks.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
    image_bytes: HashMap<ImageRef, Vec<u8>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page of the given height and return its 0-based index.
    pub fn add_page(&mut self, height: f32) -> usize {
        self.pages.push(MemoryPage {
            height: Some(height),
            ..MemoryPage::default()
        });
        self.pages.len() - 1
    }

    /// Append a page whose geometry cannot be read.
    pub fn add_page_without_geometry(&mut self) -> usize {
        self.pages.push(MemoryPage::default());
        self.pages.len() - 1
    }

    /// Make every content read of `page` fail.
    pub fn mark_unreadable(&mut self, page: usize) {
        if let Some(p) = self.pages.get_mut(page) {
            p.unreadable = true;
        }
    }

    /// Add a text block to the page named by `block.page`.
    ///
    /// # Panics
    /// If the page has not been added.
    pub fn add_block(&mut self, block: TextBlock) {
        let page = block.page;
        self.pages[page].blocks.push(block);
    }

    /// Place raw image bytes on `page` with explicit pixel dimensions.
    ///
    /// The bytes are not validated here, so undecodable data can be placed
    /// on purpose.
    ///
    /// # Panics
    /// If the page has not been added.
    pub fn add_image_bytes(
        &mut self,
        page: usize,
        bbox: BBox,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    ) -> ImageRef {
        let p = &mut self.pages[page];
        let reference = ImageRef {
            page,
            object: p.blocks.len() + p.images.len(),
        };
        p.images.push(ImageElement {
            bbox,
            page,
            reference,
            width,
            height,
            smask: false,
        });
        self.image_bytes.insert(reference, bytes);
        reference
    }

    /// Place an image on `page`, stored PNG-encoded.
    pub fn add_image(
        &mut self,
        page: usize,
        bbox: BBox,
        image: &DynamicImage,
    ) -> Result<ImageRef, Pdf2MdError> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| Pdf2MdError::Internal(format!("PNG encoding failed: {e}")))?;
        Ok(self.add_image_bytes(page, bbox, image.width(), image.height(), buf))
    }

    fn get(&self, page: usize) -> Result<&MemoryPage, Pdf2MdError> {
        self.pages.get(page).ok_or_else(|| Pdf2MdError::PageReadFailed {
            page: page + 1,
            detail: format!("document has {} pages", self.pages.len()),
        })
    }
}

impl DocumentSource for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_height(&self, page: usize) -> Result<f32, Pdf2MdError> {
        self.get(page)?
            .height
            .ok_or_else(|| Pdf2MdError::PageReadFailed {
                page: page + 1,
                detail: "page geometry unavailable".into(),
            })
    }

    fn page(&self, page: usize) -> Result<PageData, Pdf2MdError> {
        let p = self.get(page)?;
        if p.unreadable {
            return Err(Pdf2MdError::PageReadFailed {
                page: page + 1,
                detail: "page content unreadable".into(),
            });
        }
        Ok(PageData {
            blocks: p.blocks.clone(),
            images: p.images.clone(),
        })
    }

    fn decode_image(&self, image: &ImageRef) -> Result<DynamicImage, Pdf2MdError> {
        let bytes = self
            .image_bytes
            .get(image)
            .ok_or_else(|| Pdf2MdError::ImageDecodeFailed {
                page: image.page + 1,
                object: image.object,
                detail: "no such image".into(),
            })?;
        image::load_from_memory(bytes).map_err(|e| Pdf2MdError::ImageDecodeFailed {
            page: image.page + 1,
            object: image.object,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn image_round_trips_through_png() {
        let mut doc = MemoryDocument::new();
        let page = doc.add_page(800.0);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])));
        let r = doc
            .add_image(page, BBox::new(0.0, 100.0, 20.0, 110.0), &img)
            .unwrap();

        let data = doc.page(page).unwrap();
        assert_eq!(data.images.len(), 1);
        assert_eq!(data.images[0].width, 20);
        assert_eq!(data.images[0].height, 10);

        let decoded = doc.decode_image(&r).unwrap();
        assert_eq!(decoded.width(), 20);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let mut doc = MemoryDocument::new();
        let page = doc.add_page(800.0);
        let r = doc.add_image_bytes(page, BBox::default(), 50, 50, b"not an image".to_vec());
        let err = doc.decode_image(&r).unwrap_err();
        assert!(matches!(err, Pdf2MdError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn missing_geometry_and_unreadable_pages_error() {
        let mut doc = MemoryDocument::new();
        let a = doc.add_page_without_geometry();
        let b = doc.add_page(500.0);
        doc.mark_unreadable(b);

        assert!(doc.page_height(a).is_err());
        assert_eq!(doc.page_height(b).unwrap(), 500.0);
        assert!(doc.page(b).unwrap_err().is_local());
        assert!(doc.page(7).is_err());
    }
}
