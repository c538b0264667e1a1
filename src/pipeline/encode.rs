//! Image encoding: `DynamicImage` → JPEG file under `images/`.
//!
//! JPEG has no alpha channel, so transparency is dropped before encoding.
//! Pixels keep their colour values; no compositing onto a background.

use crate::error::Pdf2MdError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory (relative to the document's output directory) holding images.
pub const IMAGES_DIR: &str = "images";

/// File name of the `n`-th saved image (1-based).
pub fn image_file_name(n: usize) -> String {
    format!("image{n}.jpg")
}

/// Markdown-relative path of the `n`-th saved image.
pub fn image_link(n: usize) -> String {
    format!("{IMAGES_DIR}/{}", image_file_name(n))
}

/// Encode `img` as JPEG bytes at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    debug!(
        "Encoded {}x{} image → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}

/// Encode `img` and write it as `<images_dir>/image<n>.jpg`.
///
/// Returns the written path. The directory must already exist.
pub fn save_jpeg(
    img: &DynamicImage,
    images_dir: &Path,
    n: usize,
    quality: u8,
) -> Result<PathBuf, Pdf2MdError> {
    let path = images_dir.join(image_file_name(n));
    let bytes = encode_jpeg(img, quality).map_err(|e| Pdf2MdError::ImageEncodeFailed {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    std::fs::write(&path, bytes).map_err(|source| Pdf2MdError::OutputWriteFailed {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
