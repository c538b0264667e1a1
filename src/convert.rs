//! Conversion entry points.
//!
//! The work is split in two so each half can be driven on its own:
//!
//! * [`structure_document`] reads pages from a [`DocumentSource`], filters
//!   noise, classifies, sorts and merges. No I/O.
//! * [`render_document`] writes `main.md` and `images/` for a structured
//!   document.
//!
//! [`convert_source`] runs both; [`convert_sync`], [`convert`] and
//! [`convert_batch`] open real PDFs through pdfium first.

use crate::config::{ConversionConfig, PageSelection};
use crate::error::Pdf2MdError;
use crate::model::{ClassifiedElement, StructuredDocument};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, Extraction};
use crate::pipeline::classify::BlockClassifier;
use crate::pipeline::encode::IMAGES_DIR;
use crate::pipeline::input;
use crate::pipeline::merge;
use crate::pipeline::noise::{NoiseFilter, NoiseReport};
use crate::pipeline::render::MarkdownRenderer;
use crate::source::pdfium::{bind_pdfium, PdfiumDocument};
use crate::source::DocumentSource;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name of the Markdown file written in each output directory.
pub const MARKDOWN_FILE: &str = "main.md";

/// Filter, classify, sort and merge the selected pages of `source`.
///
/// A page whose content cannot be read is logged, reported to the progress
/// callback and recorded in [`Extraction::failed_pages`]; the rest of the
/// document is still processed.
///
/// # Errors
/// - [`Pdf2MdError::InvalidConfig`] if the watermark pattern does not compile
/// - [`Pdf2MdError::PageOutOfRange`] if the page selection matches no page
pub fn structure_document<S: DocumentSource + ?Sized>(
    source: &S,
    config: &ConversionConfig,
) -> Result<Extraction, Pdf2MdError> {
    let start = Instant::now();
    let filter = NoiseFilter::from_config(config)?;
    let classifier = BlockClassifier::default();

    // ── Step 1: Select pages ─────────────────────────────────────────────
    let total_pages = source.page_count();
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() && total_pages > 0 {
        return Err(Pdf2MdError::PageOutOfRange {
            page: first_requested(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", indices.len(), total_pages);

    // ── Step 2: Page geometry ────────────────────────────────────────────
    let page_height = if total_pages == 0 {
        config.default_page_height
    } else {
        match source.page_height(0) {
            Ok(h) if h.is_finite() && h > 0.0 => h,
            Ok(h) => {
                warn!(
                    "Page height {} is unusable, using default {}",
                    h, config.default_page_height
                );
                config.default_page_height
            }
            Err(e) => {
                warn!(
                    "Cannot read page size ({}), using default {}",
                    e, config.default_page_height
                );
                config.default_page_height
            }
        }
    };

    // ── Step 3: Read, filter and classify each page ──────────────────────
    let selected = indices.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let mut elements: Vec<ClassifiedElement> = Vec::new();
    let mut noise = NoiseReport::default();
    let mut failed_pages = Vec::new();
    let mut raw_blocks = 0;
    let mut raw_images = 0;

    for &idx in &indices {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }

        let data = match source.page(idx) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping page {}: {}", page_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                failed_pages.push(page_num);
                continue;
            }
        };
        raw_blocks += data.blocks.len();
        raw_images += data.images.len();

        let before = elements.len();
        for block in filter.filter_blocks(data.blocks, page_height, &mut noise) {
            let tag = classifier.classify(&block);
            let (bbox, page) = (block.bbox, block.page);
            elements.extend(ClassifiedElement::text(tag, block.into_spans(), bbox, page));
        }
        for image in filter.filter_images(source, data.images, page_height, &mut noise) {
            elements.push(ClassifiedElement::image(image));
        }

        let kept = elements.len() - before;
        debug!("Page {}: {} elements kept", page_num, kept);
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page_num, selected, kept);
        }
    }

    // ── Step 4: Reading order + paragraph merge ──────────────────────────
    let document = merge::build_document(elements);
    let processed_pages = selected - failed_pages.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, processed_pages);
    }

    info!(
        "Structured {} pages in {}ms: {} blocks + {} images read, {} dropped as noise, {} elements",
        processed_pages,
        start.elapsed().as_millis(),
        raw_blocks,
        raw_images,
        noise.total(),
        document.len()
    );

    Ok(Extraction {
        document,
        total_pages,
        processed_pages,
        failed_pages,
        raw_blocks,
        raw_images,
        page_height,
        noise,
    })
}

/// Write `doc` as `<out_dir>/main.md` plus `<out_dir>/images/image<N>.jpg`.
///
/// Directories are created as needed and existing files are overwritten.
/// `main.md` is written atomically (temp file + rename).
pub fn render_document<S: DocumentSource + ?Sized>(
    source: &S,
    doc: &StructuredDocument,
    title: &str,
    out_dir: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let start = Instant::now();
    let images_dir = out_dir.join(IMAGES_DIR);
    std::fs::create_dir_all(&images_dir).map_err(|source| Pdf2MdError::OutputWriteFailed {
        path: images_dir.clone(),
        source,
    })?;

    let rendered = MarkdownRenderer::new(config.jpeg_quality).render(source, doc, title, &images_dir)?;

    let markdown_path = out_dir.join(MARKDOWN_FILE);
    write_atomic(&markdown_path, &rendered.markdown)?;

    let stats = ConversionStats {
        elements: doc.len(),
        images_saved: rendered.images.len(),
        images_skipped: rendered.skipped_images,
        render_duration_ms: start.elapsed().as_millis() as u64,
        ..ConversionStats::default()
    };

    info!(
        "Wrote {} ({} images) in {}ms",
        markdown_path.display(),
        rendered.images.len(),
        stats.render_duration_ms
    );

    Ok(ConversionOutput {
        markdown: rendered.markdown,
        output_dir: out_dir.to_path_buf(),
        markdown_path,
        images: rendered.images,
        stats,
    })
}

/// Structure and render `source` into `<output_root>/extracted/<title>/`.
///
/// # Errors
/// [`Pdf2MdError::EmptyExtraction`] when nothing was read, or nothing survived
/// filtering. No directory is created in that case.
pub fn convert_source<S: DocumentSource + ?Sized>(
    source: &S,
    title: &str,
    output_root: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let total_start = Instant::now();

    let extract_start = Instant::now();
    let extraction = structure_document(source, config)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    if extraction.is_empty() || extraction.document.is_empty() {
        warn!(
            "Nothing to write for '{}': {} blocks and {} images read, {} dropped",
            title,
            extraction.raw_blocks,
            extraction.raw_images,
            extraction.noise.total()
        );
        return Err(Pdf2MdError::EmptyExtraction {
            source_name: title.to_string(),
        });
    }

    let out_dir = input::output_dir_for(output_root, title);
    let mut output = render_document(source, &extraction.document, title, &out_dir, config)?;

    let rendered = output.stats.clone();
    output.stats = ConversionStats {
        images_saved: rendered.images_saved,
        images_skipped: rendered.images_skipped,
        render_duration_ms: rendered.render_duration_ms,
        extract_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..ConversionStats::from_extraction(&extraction)
    };

    info!(
        "Conversion complete: {} -> {} ({} elements, {}ms)",
        title,
        output.output_dir.display(),
        output.stats.elements,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Convert the PDF at `input` into `<output_root>/extracted/<stem>/`.
///
/// Blocking: binds pdfium, opens the document and runs the whole pipeline on
/// the calling thread.
///
/// # Errors
/// Input problems (missing file, not a PDF, password), pdfium binding
/// failures, [`Pdf2MdError::EmptyExtraction`], and output write failures.
pub fn convert_sync(
    input: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let path = input::resolve_local(input.as_ref())?;
    info!("Starting conversion: {}", path.display());

    let pdfium = bind_pdfium()?;
    let document = PdfiumDocument::open(&pdfium, &path, config.password.as_deref())?;
    let title = input::document_stem(&path);

    convert_source(&document, &title, output_root.as_ref(), config)
}

/// Async wrapper around [`convert_sync`].
///
/// pdfium is blocking and not async-safe, so the run is moved onto
/// `tokio::task::spawn_blocking`.
pub async fn convert(
    input: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let input = input.as_ref().to_path_buf();
    let output_root = output_root.as_ref().to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_sync(&input, &output_root, &config))
        .await
        .map_err(|e| Pdf2MdError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Convert many PDFs, up to `config.concurrency` at a time.
///
/// Every input gets its own result, in input order; one failing document
/// does not affect the others. Inputs sharing a file stem would write to the
/// same `extracted/<stem>/` directory: the first one is converted and the
/// later ones fail with [`Pdf2MdError::DuplicateOutput`].
pub async fn convert_batch<I, P>(
    inputs: I,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Vec<Result<ConversionOutput, Pdf2MdError>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let output_root = output_root.as_ref();
    let inputs: Vec<PathBuf> = inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    info!(
        "Batch conversion: {} documents, concurrency {}",
        inputs.len(),
        config.concurrency
    );

    let claims = claim_output_dirs(&inputs, output_root);

    let mut results: Vec<(usize, Result<ConversionOutput, Pdf2MdError>)> =
        stream::iter(inputs.into_iter().zip(claims).enumerate().map(
            |(i, (path, claim))| async move {
                let result = match claim {
                    Ok(()) => convert(&path, output_root, config).await,
                    Err(e) => Err(e),
                };
                if let Err(ref e) = result {
                    warn!("{}: {}", path.display(), e);
                }
                (i, result)
            },
        ))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Read document metadata without converting content.
pub async fn inspect(input: impl AsRef<Path>) -> Result<DocumentMetadata, Pdf2MdError> {
    let path = input::resolve_local(input.as_ref())?;
    tokio::task::spawn_blocking(move || -> Result<DocumentMetadata, Pdf2MdError> {
        let pdfium = bind_pdfium()?;
        let document = PdfiumDocument::open(&pdfium, &path, None)?;
        Ok(document.metadata())
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Metadata task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn first_requested(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.first().copied().unwrap_or(0),
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2MdError> {
    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, contents).map_err(|source| Pdf2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        Pdf2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// One entry per input: `Err` when an earlier input maps to the same output
/// directory.
fn claim_output_dirs(inputs: &[PathBuf], output_root: &Path) -> Vec<Result<(), Pdf2MdError>> {
    let mut owners: HashMap<PathBuf, &Path> = HashMap::new();
    inputs
        .iter()
        .map(|path| {
            let output_dir = input::output_dir_for(output_root, &input::document_stem(path));
            match owners.get(&output_dir) {
                Some(first) => Err(Pdf2MdError::DuplicateOutput {
                    path: path.clone(),
                    first: first.to_path_buf(),
                    output_dir,
                }),
                None => {
                    owners.insert(output_dir, path);
                    Ok(())
                }
            }
        })
        .collect()
}
