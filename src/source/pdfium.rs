//! [`DocumentSource`] backed by pdfium through `pdfium-render`.
//!
//! pdfium is a C++ library with process-global state; every call here is
//! blocking. Async callers go through [`crate::convert::convert`], which
//! moves the whole run onto `spawn_blocking`.
//!
//! Coordinates: pdfium reports bottom-left-origin points. Everything leaving
//! this module is flipped to the top-left origin the model uses.
//!
//! Page objects are walked depth first, descending into form XObjects. An
//! object's [`ImageRef::object`] is its position in that walk.

use super::layout::{concat, group_into_blocks, map_bbox, PositionedSpan};
use super::{DocumentSource, PageData};
use crate::error::Pdf2MdError;
use crate::model::{BBox, ImageElement, ImageRef, Span, StyleFlags, Transform};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Bind to a pdfium shared library.
///
/// Resolution order:
/// 1. `PDFIUM_LIB_PATH` — explicit path to `libpdfium.{so,dylib}` / `pdfium.dll`.
/// 2. The platform library name in the current working directory.
/// 3. The system library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2MdError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        if !path.is_empty() {
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{path}: {e:?}")));
        }
    }

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// An open PDF document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    /// Open `path` with the given bindings.
    ///
    /// Password problems are reported as [`Pdf2MdError::PasswordRequired`] /
    /// [`Pdf2MdError::WrongPassword`]; anything else pdfium rejects is
    /// [`Pdf2MdError::CorruptPdf`].
    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, Pdf2MdError> {
        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    Pdf2MdError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    Pdf2MdError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                Pdf2MdError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        info!(
            "PDF loaded: {} ({} pages)",
            path.display(),
            document.pages().len()
        );

        Ok(Self { document })
    }

    /// Document information dictionary and page count.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: self.document.pages().len() as usize,
            pdf_version: format!("{:?}", self.document.version()),
        }
    }

    fn load_page(&self, page: usize) -> Result<PdfPage<'a>, Pdf2MdError> {
        let index = u16::try_from(page).map_err(|_| Pdf2MdError::PageReadFailed {
            page: page + 1,
            detail: "page index exceeds pdfium's u16 range".into(),
        })?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| Pdf2MdError::PageReadFailed {
                page: page + 1,
                detail: format!("{:?}", e),
            })
    }
}

/// Page-space box of `object`, top-left origin. `forms` is the combined
/// matrix of the form XObjects enclosing it.
fn object_bbox(
    object: &PdfPageObject,
    forms: Option<&Transform>,
    page_height: f32,
) -> Option<BBox> {
    let rect = object.bounds().ok()?.to_rect();
    let mut bbox = BBox::new(
        rect.left().value,
        rect.bottom().value,
        rect.right().value,
        rect.top().value,
    );
    if let Some(m) = forms {
        bbox = map_bbox(&bbox, m);
    }
    Some(BBox::new(
        bbox.x0,
        page_height - bbox.y1,
        bbox.x1,
        page_height - bbox.y0,
    ))
}

fn object_transform(object: &PdfPageObject, forms: Option<&Transform>) -> Option<Transform> {
    let m = object.matrix().ok()?;
    let own = [m.a(), m.b(), m.c(), m.d(), m.e(), m.f()];
    Some(match forms {
        Some(outer) => concat(&own, outer),
        None => own,
    })
}

/// Depth-first walk over `objects`, descending into form XObjects.
///
/// `visit` gets each object's walk position, the object and the combined
/// matrix of its enclosing forms. Returns `false` as soon as `visit` does.
fn walk_objects<'o>(
    objects: impl Iterator<Item = PdfPageObject<'o>>,
    forms: Option<Transform>,
    position: &mut usize,
    visit: &mut dyn FnMut(usize, &PdfPageObject<'_>, Option<&Transform>) -> bool,
) -> bool {
    for object in objects {
        let index = *position;
        *position += 1;
        if !visit(index, &object, forms.as_ref()) {
            return false;
        }
        if let Some(form) = object.as_x_object_form_object() {
            let inner = object_transform(&object, forms.as_ref()).or(forms);
            if !walk_objects(form.iter(), inner, position, visit) {
                return false;
            }
        }
    }
    true
}

/// Pixel size from the image object's metadata, without decoding. `(0, 0)`
/// when pdfium cannot report it.
fn image_size(image: &PdfPageImageObject) -> (u32, u32) {
    let width = image.width().ok().and_then(|w| u32::try_from(w).ok()).unwrap_or(0);
    let height = image.height().ok().and_then(|h| u32::try_from(h).ok()).unwrap_or(0);
    (width, height)
}

fn text_span(text: &PdfPageTextObject, transform: Option<[f32; 6]>) -> Span {
    let font = text.font();
    let mut flags = StyleFlags::empty();
    if font.is_italic() {
        flags.insert(StyleFlags::ITALIC);
    }
    if font.is_serif() {
        flags.insert(StyleFlags::SERIF);
    }
    if font.is_fixed_pitch() {
        flags.insert(StyleFlags::MONOSPACE);
    }
    if font.is_bold_reenforced() {
        flags.insert(StyleFlags::BOLD);
    }

    let mut span =
        Span::new(text.text(), font.name(), text.scaled_font_size().value).with_flags(flags);
    span.origin = transform;
    span
}

impl DocumentSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_height(&self, page: usize) -> Result<f32, Pdf2MdError> {
        Ok(self.load_page(page)?.height().value)
    }

    fn page(&self, page: usize) -> Result<PageData, Pdf2MdError> {
        let pdf_page = self.load_page(page)?;
        let height = pdf_page.height().value;

        let mut runs: Vec<PositionedSpan> = Vec::new();
        let mut images: Vec<ImageElement> = Vec::new();

        let mut position = 0;
        walk_objects(
            pdf_page.objects().iter(),
            None,
            &mut position,
            &mut |index, object, forms| {
                if object.as_x_object_form_object().is_some() {
                    return true;
                }
                let Some(bbox) = object_bbox(object, forms, height) else {
                    debug!("Page {}: object {} has no bounds, skipped", page + 1, index);
                    return true;
                };
                if let Some(text) = object.as_text_object() {
                    let span = text_span(text, object_transform(object, forms));
                    runs.push(PositionedSpan::new(span, bbox));
                } else if let Some(image) = object.as_image_object() {
                    let (width, height) = image_size(image);
                    images.push(ImageElement {
                        bbox,
                        page,
                        reference: ImageRef {
                            page,
                            object: index,
                        },
                        width,
                        height,
                        smask: false,
                    });
                }
                true
            },
        );

        let blocks = group_into_blocks(page, runs);
        debug!(
            "Page {}: {} text blocks, {} images",
            page + 1,
            blocks.len(),
            images.len()
        );
        Ok(PageData { blocks, images })
    }

    fn decode_image(&self, image: &ImageRef) -> Result<DynamicImage, Pdf2MdError> {
        let decode_err = |detail: String| Pdf2MdError::ImageDecodeFailed {
            page: image.page + 1,
            object: image.object,
            detail,
        };

        let page = self.load_page(image.page)?;
        let mut found: Option<Result<DynamicImage, Pdf2MdError>> = None;
        let mut position = 0;
        walk_objects(
            page.objects().iter(),
            None,
            &mut position,
            &mut |index, object, _| {
                if index != image.object {
                    return true;
                }
                found = Some(match object.as_image_object() {
                    Some(image_object) => image_object
                        .get_raw_image()
                        .map_err(|e| decode_err(format!("{:?}", e))),
                    None => {
                        warn!("Object {} is not an image", image);
                        Err(decode_err("not an image object".into()))
                    }
                });
                false
            },
        );
        found.unwrap_or_else(|| Err(decode_err("no such object on the page".into())))
    }
}
