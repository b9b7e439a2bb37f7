//! In-memory pixel buffers passed between pipeline stages.
//!
//! A [`Bitmap`] is never mutated once built: every stage consumes or borrows
//! one and produces a fresh value. The pixel layout is fixed to 8-bit RGB or
//! RGBA so the buffer length is always `width × height × channels`.

use crate::error::CombinerError;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

/// Channel layout of a [`Bitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// 3 bytes per pixel, opaque.
    Rgb,
    /// 4 bytes per pixel, straight alpha.
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

/// A rectangular 8-bit RGB or RGBA pixel buffer with non-zero dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    // Always `ImageRgb8` or `ImageRgba8`.
    image: DynamicImage,
}

impl Bitmap {
    /// Build a bitmap from a raw, row-major pixel buffer.
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, CombinerError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * layout.channels();
        if pixels.len() != expected {
            return Err(CombinerError::InvalidBitmap {
                detail: format!(
                    "{}x{} {:?} needs {} bytes, got {}",
                    width,
                    height,
                    layout,
                    expected,
                    pixels.len()
                ),
            });
        }
        let image = match layout {
            PixelLayout::Rgb => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
            PixelLayout::Rgba => {
                RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
            }
        };
        image.map(|image| Self { image }).ok_or_else(|| CombinerError::InvalidBitmap {
            detail: format!("{}x{} buffer rejected", width, height),
        })
    }

    /// Wrap a decoded image, normalising it to RGB8 or RGBA8.
    ///
    /// Images with an alpha channel become RGBA; everything else RGB.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, CombinerError> {
        check_dimensions(image.width(), image.height())?;
        let image = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        Ok(Self { image })
    }

    /// A bitmap filled with a single opaque colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, CombinerError> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb))),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn layout(&self) -> PixelLayout {
        match self.image {
            DynamicImage::ImageRgba8(_) => PixelLayout::Rgba,
            _ => PixelLayout::Rgb,
        }
    }

    /// Raw row-major pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Composite over opaque white, dropping the alpha channel.
    ///
    /// RGB bitmaps are returned as-is.
    pub fn flatten_onto_white(self) -> Bitmap {
        let rgba = match self.image {
            DynamicImage::ImageRgba8(rgba) => rgba,
            _ => return self,
        };
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let over_white = |c: u8| -> u8 {
                let c = c as u32;
                let a = a as u32;
                ((c * a + 255 * (255 - a) + 127) / 255) as u8
            };
            Rgb([over_white(r), over_white(g), over_white(b)])
        });
        Bitmap {
            image: DynamicImage::ImageRgb8(flattened),
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), CombinerError> {
    if width == 0 || height == 0 {
        return Err(CombinerError::InvalidBitmap {
            detail: format!("dimensions must be positive, got {}x{}", width, height),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba};

    #[test]
    fn from_raw_checks_length() {
        assert!(Bitmap::from_raw(2, 2, PixelLayout::Rgb, vec![0; 12]).is_ok());
        assert!(Bitmap::from_raw(2, 2, PixelLayout::Rgba, vec![0; 12]).is_err());
        assert!(Bitmap::from_raw(0, 2, PixelLayout::Rgb, vec![]).is_err());
    }

    #[test]
    fn from_dynamic_normalises_layout() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([9])));
        let bmp = Bitmap::from_dynamic(gray).unwrap();
        assert_eq!(bmp.layout(), PixelLayout::Rgb);
        assert_eq!(bmp.as_bytes().len(), 3 * 2 * 3);
        assert_eq!(&bmp.as_bytes()[..3], &[9, 9, 9]);
    }

    #[test]
    fn flatten_transparent_becomes_white() {
        let rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        let bmp = Bitmap::from_dynamic(DynamicImage::ImageRgba8(rgba))
            .unwrap()
            .flatten_onto_white();
        assert_eq!(bmp.layout(), PixelLayout::Rgb);
        assert_eq!(bmp.as_bytes(), &[255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let bmp = Bitmap::from_dynamic(DynamicImage::ImageRgba8(rgba))
            .unwrap()
            .flatten_onto_white();
        assert_eq!(bmp.as_bytes(), &[10, 20, 30]);
    }

    #[test]
    fn flatten_half_alpha_blends() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let bmp = Bitmap::from_dynamic(DynamicImage::ImageRgba8(rgba))
            .unwrap()
            .flatten_onto_white();
        // 255 * 127 / 255 rounded
        assert_eq!(bmp.as_bytes(), &[127, 127, 127]);
    }
}
