//! Input validation: make sure a user-supplied path is a readable PDF.
//!
//! pdfium reports most bad inputs as an opaque load failure. Checking for the
//! file, its permissions and the `%PDF` magic bytes first gives callers an
//! error that names the actual problem.

use crate::error::Pdf2MdError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2MdError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Pdf2MdError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let read = f.read(&mut magic).unwrap_or(0);
            if read < magic.len() || &magic != b"%PDF" {
                return Err(Pdf2MdError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2MdError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2MdError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Document title derived from the file name without its extension.
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Output directory for `source` under `output_root`:
/// `<output_root>/extracted/<stem>/`.
pub fn output_dir_for(output_root: &Path, stem: &str) -> PathBuf {
    output_root.join("extracted").join(stem)
}
