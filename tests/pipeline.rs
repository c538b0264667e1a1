//! Whole-pipeline tests driven through `MemoryDocument`.
//!
//! No PDF and no pdfium library are needed: pages are assembled from text
//! blocks and PNG-encoded images, then run through filtering, classification,
//! merging and rendering into a temporary output root.

use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use structmd::model::{BBox, Span, TextBlock, TextLine};
use structmd::source::memory::MemoryDocument;
use structmd::{convert_source, structure_document, ConversionConfig, Pdf2MdError, Tag};

// ── Fixtures ─────────────────────────────────────────────────────────────────

const PAGE_HEIGHT: f32 = 842.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("structmd=debug")
        .with_test_writer()
        .try_init();
}

fn text_block(page: usize, y0: f32, text: &str, font: &str, size: f32) -> TextBlock {
    TextBlock::new(
        page,
        BBox::new(72.0, y0, 520.0, y0 + size + 2.0),
        vec![TextLine::new(vec![Span::new(text, font, size)])],
    )
}

fn photo(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
        Rgb([(x * 5 % 256) as u8, (y * 9 % 256) as u8, ((x * y) % 256) as u8])
    }))
}

/// One page: heading, a paragraph cut into three blocks, a rotated stamp,
/// a photo, a caption and a list item, surrounded by a running header, a
/// footer and a tiny icon.
fn sample_document() -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    let page = doc.add_page(PAGE_HEIGHT);

    doc.add_block(text_block(page, 30.0, "ACME Corp. Internal", "Helvetica", 9.0));
    doc.add_block(text_block(page, 150.0, "1. Giới thiệu", "Arial-BoldMT", 14.0));
    doc.add_block(text_block(page, 200.0, "First part.", "ArialMT", 10.0));
    doc.add_block(text_block(page, 230.0, "Second part.", "ArialMT", 10.0));
    doc.add_block(text_block(page, 260.0, "Third part.", "ArialMT", 10.0));

    let angle = std::f32::consts::FRAC_PI_4;
    doc.add_block(
        text_block(page, 300.0, "CONFIDENTIAL", "Helvetica", 40.0).with_transform([
            angle.cos(),
            angle.sin(),
            -angle.sin(),
            angle.cos(),
            0.0,
            0.0,
        ]),
    );

    doc.add_block(text_block(page, 520.0, "Hình 1. Sơ đồ hệ thống", "ArialMT", 10.0));
    doc.add_block(text_block(page, 560.0, "• Bước một", "ArialMT", 10.0));
    doc.add_block(text_block(page, 800.0, "Trang 1/1", "Helvetica", 9.0));

    doc.add_image(page, BBox::new(100.0, 400.0, 400.0, 500.0), &photo(120, 40))
        .unwrap();
    doc.add_image(page, BBox::new(60.0, 560.0, 68.0, 568.0), &photo(10, 10))
        .unwrap();

    doc
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn sample_document_renders_expected_markdown() {
    init_tracing();
    let root = tempfile::tempdir().unwrap();
    let doc = sample_document();

    let out = convert_source(&doc, "sample", root.path(), &ConversionConfig::default()).unwrap();

    assert_eq!(
        out.markdown,
        "# sample\n\n\
         # Giới thiệu\n\n\
         First part. Second part. Third part.\n\n\
         ![](images/image1.jpg)\n\n\
         _**Hình 1.** Sơ đồ hệ thống_\n\n  \
         * Bước một\n"
    );
    assert!(!out.markdown.contains("CONFIDENTIAL"));
    assert!(!out.markdown.contains("ACME"));
    assert!(!out.markdown.contains("Trang 1/1"));

    let dir = root.path().join("extracted").join("sample");
    assert_eq!(out.output_dir, dir);
    assert_eq!(files_in(&dir), vec!["images", "main.md"]);
    assert_eq!(files_in(&dir.join("images")), vec!["image1.jpg"]);

    let saved = image::open(dir.join("images/image1.jpg")).unwrap();
    assert_eq!((saved.width(), saved.height()), (120, 40));
}

#[test]
fn stats_account_for_every_dropped_element() {
    let root = tempfile::tempdir().unwrap();
    let out = convert_source(
        &sample_document(),
        "sample",
        root.path(),
        &ConversionConfig::default(),
    )
    .unwrap();

    let stats = &out.stats;
    assert_eq!(stats.total_pages, 1);
    assert_eq!(stats.processed_pages, 1);
    assert_eq!(stats.raw_blocks, 9);
    assert_eq!(stats.raw_images, 2);
    assert_eq!(stats.noise.header_footer, 2);
    assert_eq!(stats.noise.watermarks, 1);
    assert_eq!(stats.noise.small_images, 1);
    assert_eq!(stats.elements, 5);
    assert_eq!(stats.headings, 1);
    assert_eq!(stats.paragraphs, 1);
    assert_eq!(stats.captions, 1);
    assert_eq!(stats.list_items, 1);
    assert_eq!(stats.images_saved, 1);
}

#[test]
fn paragraph_split_across_pages_is_merged() {
    let mut doc = MemoryDocument::new();
    let first = doc.add_page(PAGE_HEIGHT);
    let second = doc.add_page(PAGE_HEIGHT);
    doc.add_block(text_block(second, 150.0, "continues here.", "ArialMT", 10.0));
    doc.add_block(text_block(first, 600.0, "A sentence that", "ArialMT", 10.0));
    doc.add_block(text_block(first, 200.0, "2.1 Phạm vi", "Arial-BoldMT", 12.0));

    let extraction = structure_document(&doc, &ConversionConfig::default()).unwrap();
    let tags: Vec<Tag> = extraction.document.iter().map(|e| e.tag()).collect();
    assert_eq!(tags, vec![Tag::H2, Tag::P]);

    let text: String = extraction.document.elements[1]
        .spans()
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(text, "A sentence that continues here.");
}

#[test]
fn rerun_overwrites_previous_output() {
    let root = tempfile::tempdir().unwrap();
    let config = ConversionConfig::default();
    let first = convert_source(&sample_document(), "again", root.path(), &config).unwrap();

    let mut smaller = MemoryDocument::new();
    let page = smaller.add_page(PAGE_HEIGHT);
    smaller.add_block(text_block(page, 300.0, "Only text now.", "ArialMT", 10.0));
    let second = convert_source(&smaller, "again", root.path(), &config).unwrap();

    assert_eq!(first.markdown_path, second.markdown_path);
    assert_eq!(
        std::fs::read_to_string(&second.markdown_path).unwrap(),
        "# again\n\nOnly text now.\n"
    );
}

#[test]
fn custom_thresholds_change_what_counts_as_noise() {
    let root = tempfile::tempdir().unwrap();
    let config = ConversionConfig::builder()
        .header_ratio(0.02)
        .min_image_side(5)
        .watermark_pattern("^never$")
        .build()
        .unwrap();

    let out = convert_source(&sample_document(), "loose", root.path(), &config).unwrap();
    // The header is now body text, the icon is kept; the rotated stamp is
    // still a watermark.
    assert!(out.markdown.contains("ACME Corp. Internal"));
    assert!(!out.markdown.contains("CONFIDENTIAL"));
    assert_eq!(out.stats.images_saved, 2);
}

#[test]
fn nothing_extracted_is_an_error_without_output() {
    let root = tempfile::tempdir().unwrap();
    let mut doc = MemoryDocument::new();
    doc.add_page(PAGE_HEIGHT);

    let err = convert_source(&doc, "empty", root.path(), &ConversionConfig::default()).unwrap_err();
    assert!(matches!(err, Pdf2MdError::EmptyExtraction { ref source_name } if source_name == "empty"));
    assert!(!root.path().join("extracted").exists());
}

#[test]
fn structured_document_serializes_to_json() {
    let extraction = structure_document(&sample_document(), &ConversionConfig::default()).unwrap();
    let json = serde_json::to_value(&extraction.document).unwrap();
    let kinds: Vec<&str> = json["elements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["content"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["text", "text", "image", "text", "text"]);
    assert_eq!(json["elements"][0]["content"]["tag"], "H1");
}
