//! Noise filtering: drop everything on a page that is not content.
//!
//! Three kinds of noise are removed:
//!
//! * **Running headers and footers** — any element whose top edge sits in the
//!   header band or whose bottom edge sits in the footer band.
//! * **Decorative images** — tiny images (bullets, glyphs) and images with
//!   only a handful of distinct colours (rules, boxes, solid fills). An image
//!   that fails to decode is treated as decoration.
//! * **Watermarks** — see [`super::watermark`].
//!
//! Surviving elements keep their input order.

use super::watermark::WatermarkDetector;
use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use crate::model::{BBox, ImageElement, TextBlock};
use crate::source::DocumentSource;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Per-reason counts of dropped elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseReport {
    pub header_footer: usize,
    pub watermarks: usize,
    pub small_images: usize,
    pub flat_images: usize,
    pub undecodable_images: usize,
}

impl NoiseReport {
    pub fn total(&self) -> usize {
        self.header_footer
            + self.watermarks
            + self.small_images
            + self.flat_images
            + self.undecodable_images
    }

    pub fn absorb(&mut self, other: &NoiseReport) {
        self.header_footer += other.header_footer;
        self.watermarks += other.watermarks;
        self.small_images += other.small_images;
        self.flat_images += other.flat_images;
        self.undecodable_images += other.undecodable_images;
    }
}

/// Number of distinct RGBA colours in `image`, counted up to `limit + 1`.
///
/// Returns `None` when the image has more than `limit` colours.
pub fn distinct_colors(image: &DynamicImage, limit: usize) -> Option<usize> {
    let rgba = image.to_rgba8();
    let mut seen: HashSet<[u8; 4]> = HashSet::with_capacity(limit.min(64) + 1);
    for pixel in rgba.pixels() {
        if seen.insert(pixel.0) && seen.len() > limit {
            return None;
        }
    }
    Some(seen.len())
}

/// Removes headers, footers, watermarks and decorative images.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    header_ratio: f32,
    footer_ratio: f32,
    min_image_side: u32,
    max_noise_colors: usize,
    watermarks: WatermarkDetector,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        let c = ConversionConfig::default();
        Self {
            header_ratio: c.header_ratio,
            footer_ratio: c.footer_ratio,
            min_image_side: c.min_image_side,
            max_noise_colors: c.max_noise_colors,
            watermarks: WatermarkDetector::default(),
        }
    }
}

impl NoiseFilter {
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Pdf2MdError> {
        Ok(Self {
            header_ratio: config.header_ratio,
            footer_ratio: config.footer_ratio,
            min_image_side: config.min_image_side,
            max_noise_colors: config.max_noise_colors,
            watermarks: WatermarkDetector::new(&config.watermark_pattern)?,
        })
    }

    /// `true` when the box reaches into the header or footer band of a page
    /// of height `page_height`.
    pub fn in_margin(&self, bbox: &BBox, page_height: f32) -> bool {
        bbox.y0 < self.header_ratio * page_height || bbox.y1 > self.footer_ratio * page_height
    }

    /// Keep the text blocks that are neither in a margin nor a watermark.
    pub fn filter_blocks(
        &self,
        blocks: Vec<TextBlock>,
        page_height: f32,
        report: &mut NoiseReport,
    ) -> Vec<TextBlock> {
        blocks
            .into_iter()
            .filter(|block| {
                if self.in_margin(&block.bbox, page_height) {
                    report.header_footer += 1;
                    return false;
                }
                match self.watermarks.reason(block) {
                    Some(reason) => {
                        debug!(
                            "Page {}: watermark dropped ({:?}) at y0={:.1}",
                            block.page + 1,
                            reason,
                            block.bbox.y0
                        );
                        report.watermarks += 1;
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    /// Keep the images that are neither in a margin nor decorative.
    ///
    /// Pixels are fetched from `source` only for images that pass the
    /// geometric checks. An image whose size the source could not report
    /// (0x0) is decoded first and measured on its pixels.
    pub fn filter_images<S: DocumentSource + ?Sized>(
        &self,
        source: &S,
        images: Vec<ImageElement>,
        page_height: f32,
        report: &mut NoiseReport,
    ) -> Vec<ImageElement> {
        images
            .into_iter()
            .filter(|image| {
                if self.in_margin(&image.bbox, page_height) {
                    report.header_footer += 1;
                    return false;
                }
                let size_known = image.width > 0 && image.height > 0;
                if size_known && self.is_small(image.width, image.height) {
                    report.small_images += 1;
                    return false;
                }
                let pixels = match source.decode_image(&image.reference) {
                    Ok(pixels) => pixels,
                    Err(e) => {
                        debug!("Image {} dropped: {}", image.reference, e);
                        report.undecodable_images += 1;
                        return false;
                    }
                };
                if !size_known && self.is_small(pixels.width(), pixels.height()) {
                    report.small_images += 1;
                    return false;
                }
                match distinct_colors(&pixels, self.max_noise_colors) {
                    Some(n) => {
                        debug!("Image {} dropped: only {} colours", image.reference, n);
                        report.flat_images += 1;
                        false
                    }
                    None => true,
                }
            })
            .collect()
    }

    fn is_small(&self, width: u32, height: u32) -> bool {
        width <= self.min_image_side || height <= self.min_image_side
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Span, TextLine};
    use crate::source::memory::MemoryDocument;
    use image::{Rgb, RgbImage};

    fn block_at(y0: f32, y1: f32, text: &str) -> TextBlock {
        TextBlock::new(
            0,
            BBox::new(50.0, y0, 400.0, y1),
            vec![TextLine::new(vec![Span::new(text, "Helvetica", 10.0)])],
        )
    }

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn header_and_footer_bands() {
        let f = NoiseFilter::default();
        let h = 1000.0;
        assert!(f.in_margin(&BBox::new(0.0, 50.0, 10.0, 70.0), h));
        assert!(!f.in_margin(&BBox::new(0.0, 200.0, 10.0, 300.0), h));
        assert!(f.in_margin(&BBox::new(0.0, 800.0, 10.0, 950.0), h));
        assert!(!f.in_margin(&BBox::new(0.0, 120.0, 10.0, 900.0), h));
    }

    #[test]
    fn blocks_are_filtered_in_order() {
        let f = NoiseFilter::default();
        let mut report = NoiseReport::default();
        let kept = f.filter_blocks(
            vec![
                block_at(50.0, 70.0, "Running header"),
                block_at(200.0, 300.0, "First"),
                block_at(400.0, 420.0, "2024-03-01 stamp"),
                block_at(500.0, 520.0, "Second"),
                block_at(920.0, 950.0, "Page 3"),
            ],
            1000.0,
            &mut report,
        );
        let texts: Vec<&str> = kept.iter().map(|b| b.lines[0].spans[0].text.as_str()).collect();
        assert_eq!(texts, vec!["First", "Second"]);
        assert_eq!(report.header_footer, 2);
        assert_eq!(report.watermarks, 1);
    }

    #[test]
    fn small_flat_and_broken_images_are_dropped() {
        let mut doc = MemoryDocument::new();
        let page = doc.add_page(1000.0);
        let body = BBox::new(100.0, 300.0, 300.0, 500.0);

        let tiny = doc.add_image(page, body, &gradient(15, 40)).unwrap();
        let flat = doc
            .add_image(
                page,
                body,
                &DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([200, 10, 10]))),
            )
            .unwrap();
        let broken = doc.add_image_bytes(page, body, 64, 64, vec![0, 1, 2, 3]);
        let photo = doc.add_image(page, body, &gradient(64, 64)).unwrap();
        let in_header = doc
            .add_image(page, BBox::new(0.0, 10.0, 50.0, 60.0), &gradient(64, 64))
            .unwrap();

        let images = doc.page(page).unwrap().images;
        let mut report = NoiseReport::default();
        let kept = NoiseFilter::default().filter_images(&doc, images, 1000.0, &mut report);

        let refs: Vec<_> = kept.iter().map(|i| i.reference).collect();
        assert_eq!(refs, vec![photo]);
        assert!(!refs.contains(&tiny));
        assert!(!refs.contains(&flat));
        assert!(!refs.contains(&broken));
        assert!(!refs.contains(&in_header));
        assert_eq!(
            report,
            NoiseReport {
                header_footer: 1,
                watermarks: 0,
                small_images: 1,
                flat_images: 1,
                undecodable_images: 1,
            }
        );
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn color_count_stops_at_limit() {
        let four = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, y| {
            Rgb([(x % 2 * 255) as u8, (y % 2 * 255) as u8, 0])
        }));
        assert_eq!(distinct_colors(&four, 256), Some(4));
        assert_eq!(distinct_colors(&gradient(64, 64), 256), None);
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn unknown_size_is_measured_after_decoding() {
        let mut doc = MemoryDocument::new();
        let page = doc.add_page(1000.0);
        let body = BBox::new(100.0, 300.0, 300.0, 500.0);

        doc.add_image_bytes(page, body, 0, 0, vec![0xde, 0xad]);
        doc.add_image_bytes(page, body, 0, 0, png_bytes(&gradient(10, 10)));
        let photo = doc.add_image_bytes(page, body, 0, 0, png_bytes(&gradient(64, 64)));

        let images = doc.page(page).unwrap().images;
        let mut report = NoiseReport::default();
        let kept = NoiseFilter::default().filter_images(&doc, images, 1000.0, &mut report);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].reference, photo);
        assert_eq!(report.undecodable_images, 1);
        assert_eq!(report.small_images, 1);
    }

    #[test]
    fn color_threshold_above_256_is_honoured() {
        let many = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 20, |x, _| {
            Rgb([(x % 256) as u8, (x / 256) as u8, 0])
        }));
        assert_eq!(distinct_colors(&many, 1000), Some(300));

        let mut doc = MemoryDocument::new();
        let page = doc.add_page(1000.0);
        doc.add_image(page, BBox::new(100.0, 300.0, 400.0, 320.0), &many)
            .unwrap();

        let run = |max: usize| {
            let config = ConversionConfig::builder()
                .max_noise_colors(max)
                .build()
                .unwrap();
            let mut report = NoiseReport::default();
            let kept = NoiseFilter::from_config(&config).unwrap().filter_images(
                &doc,
                doc.page(page).unwrap().images,
                1000.0,
                &mut report,
            );
            (kept.len(), report.flat_images)
        };
        assert_eq!(run(1000), (0, 1));
        assert_eq!(run(299), (1, 0));
    }
}
