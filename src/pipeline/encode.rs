//! Image encoding: [`Bitmap`] → PNG or JPEG bytes.
//!
//! The caller picks the container explicitly through [`ImageFormat`]; the
//! [`CompressionLevel`] is a 0–100 quality figure. JPEG uses it as the
//! encoder quality. PNG is lossless, so the level only selects how hard
//! deflate works: low quality figures ask for the smallest file.

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Output container for rasterised pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

/// Largest width or height a baseline JPEG can describe.
pub const JPEG_MAX_DIMENSION: u32 = 65_535;

impl ImageFormat {
    /// Check that a `width × height` image can be written in this format.
    ///
    /// Only JPEG has a limit. Tall stitched output runs into it first: about
    /// 30 Letter pages at 200 DPI.
    pub fn check_fits(self, width: u64, height: u64) -> Result<(), CombinerError> {
        let limit = JPEG_MAX_DIMENSION as u64;
        if self == ImageFormat::Jpeg && (width > limit || height > limit) {
            return Err(CombinerError::invalid_argument(
                "format",
                format!(
                    "a {}x{} image exceeds the JPEG limit of {} px per side; \
                     use PNG, a smaller size, or one image per page",
                    width, height, limit
                ),
            ));
        }
        Ok(())
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = CombinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(CombinerError::invalid_argument(
                "format",
                format!("expected png or jpeg, got '{}'", other),
            )),
        }
    }
}

/// A validated quality figure in `0..=100`.
///
/// Out-of-range input is an error, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    pub const LOW: CompressionLevel = CompressionLevel(30);
    pub const MEDIUM: CompressionLevel = CompressionLevel(60);
    pub const HIGH: CompressionLevel = CompressionLevel(100);

    pub fn new(value: i64) -> Result<Self, CombinerError> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(CompressionLevel(v)),
            _ => Err(CombinerError::invalid_argument(
                "compression",
                format!("must be between 0 and 100, got {}", value),
            )),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// JPEG encoder quality (the encoder rejects 0).
    pub fn jpeg_quality(self) -> u8 {
        self.0.max(1)
    }

    pub fn png_compression(self) -> CompressionType {
        match self.0 {
            0..=33 => CompressionType::Best,
            34..=66 => CompressionType::Default,
            _ => CompressionType::Fast,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::HIGH
    }
}

impl TryFrom<i64> for CompressionLevel {
    type Error = CombinerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        CompressionLevel::new(value)
    }
}

impl From<CompressionLevel> for u8 {
    fn from(level: CompressionLevel) -> u8 {
        level.0
    }
}

/// Encode `bitmap` for page `page` (1-based, used in error messages).
///
/// JPEG has no alpha channel; RGBA bitmaps are flattened onto white first.
pub fn encode_bitmap(
    bitmap: &Bitmap,
    format: ImageFormat,
    level: CompressionLevel,
    page: usize,
) -> Result<Vec<u8>, CombinerError> {
    let encode_failed = |e: image::ImageError| CombinerError::EncodeFailed {
        page,
        detail: e.to_string(),
    };

    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, level.png_compression(), FilterType::Adaptive);
            encoder
                .write_image(
                    bitmap.as_bytes(),
                    bitmap.width(),
                    bitmap.height(),
                    bitmap.as_dynamic().color().into(),
                )
                .map_err(encode_failed)?;
        }
        ImageFormat::Jpeg => {
            format.check_fits(bitmap.width() as u64, bitmap.height() as u64)?;
            let opaque = bitmap.clone().flatten_onto_white();
            let encoder = JpegEncoder::new_with_quality(&mut buf, level.jpeg_quality());
            encoder
                .write_image(
                    opaque.as_bytes(),
                    opaque.width(),
                    opaque.height(),
                    opaque.as_dynamic().color().into(),
                )
                .map_err(encode_failed)?;
        }
    }

    debug!("Encoded page {} → {} bytes {}", page, buf.len(), format);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelLayout;

    #[test]
    fn compression_rejects_out_of_range() {
        assert!(CompressionLevel::new(-1).is_err());
        assert!(CompressionLevel::new(101).is_err());
        assert_eq!(CompressionLevel::new(0).unwrap().value(), 0);
        assert_eq!(CompressionLevel::new(100).unwrap(), CompressionLevel::HIGH);
    }

    #[test]
    fn compression_deserialises_with_validation() {
        let ok: CompressionLevel = serde_json::from_str("80").unwrap();
        assert_eq!(ok.value(), 80);
        assert!(serde_json::from_str::<CompressionLevel>("150").is_err());
    }

    #[test]
    fn jpeg_quality_never_zero() {
        assert_eq!(CompressionLevel::new(0).unwrap().jpeg_quality(), 1);
        assert_eq!(CompressionLevel::MEDIUM.jpeg_quality(), 60);
    }

    #[test]
    fn png_round_trips_pixels() {
        let bmp = Bitmap::from_raw(2, 1, PixelLayout::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let bytes = encode_bitmap(&bmp, ImageFormat::Png, CompressionLevel::LOW, 1).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.into_raw(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn jpeg_accepts_rgba() {
        let bmp = Bitmap::from_raw(8, 8, PixelLayout::Rgba, vec![128; 8 * 8 * 4]).unwrap();
        let bytes = encode_bitmap(&bmp, ImageFormat::Jpeg, CompressionLevel::HIGH, 1).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn jpeg_size_limit_is_actionable() {
        assert!(ImageFormat::Png.check_fits(10, 100_000).is_ok());
        assert!(ImageFormat::Jpeg.check_fits(1700, 65_535).is_ok());
        let err = ImageFormat::Jpeg.check_fits(1700, 66_000).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArguments);
        assert!(err.to_string().contains("use PNG"));

        let tall = Bitmap::from_raw(1, 70_000, PixelLayout::Rgb, vec![0; 70_000 * 3]).unwrap();
        let err = encode_bitmap(&tall, ImageFormat::Jpeg, CompressionLevel::HIGH, 1).unwrap_err();
        assert!(matches!(err, CombinerError::InvalidArgument { .. }));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("png".parse::<ImageFormat>().unwrap().extension(), "png");
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
