//! Input validation and image decoding.
//!
//! Paths are checked before any engine work starts so a typo surfaces as
//! `FileNotFound` instead of an opaque pdfium error. PDF inputs must start
//! with the `%PDF` magic bytes.

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Check that `path` exists and is readable.
pub fn check_readable(path: &Path) -> Result<(), CombinerError> {
    if !path.exists() {
        return Err(CombinerError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CombinerError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(CombinerError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Check that `path` is a readable file starting with `%PDF`.
pub fn check_pdf(path: &Path) -> Result<(), CombinerError> {
    check_readable(path)?;
    let mut magic = [0u8; 4];
    let read = std::fs::File::open(path).and_then(|mut f| f.read_exact(&mut magic));
    if read.is_err() || &magic != b"%PDF" {
        return Err(CombinerError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("not a PDF file (first bytes {:?})", magic),
        });
    }
    debug!("Resolved local PDF: {}", path.display());
    Ok(())
}

/// Decode an image file, applying its EXIF orientation.
pub fn load_image(path: &Path) -> Result<Bitmap, CombinerError> {
    check_readable(path)?;
    let undecodable = |detail: String| CombinerError::UndecodableImage {
        path: path.to_path_buf(),
        detail,
    };

    let mut decoder = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| undecodable(e.to_string()))?
        .into_decoder()
        .map_err(|e| undecodable(e.to_string()))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| undecodable(e.to_string()))?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| undecodable(e.to_string()))?;
    image.apply_orientation(orientation);

    debug!(
        "Decoded image {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        orientation
    );
    Bitmap::from_dynamic(image).map_err(|e| undecodable(e.to_string()))
}
