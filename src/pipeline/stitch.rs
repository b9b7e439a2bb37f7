//! Vertical composition of page bitmaps into one tall image.
//!
//! Bitmaps are stacked top to bottom in the order given, each flush with the
//! left edge. The canvas is as wide as the widest input; the strip to the
//! right of a narrower bitmap stays opaque white. No scaling happens here:
//! callers that want uniform widths resize with [`crate::pipeline::scale`]
//! first.

use crate::bitmap::{Bitmap, PixelLayout};
use crate::error::CombinerError;
use image::imageops;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::borrow::Borrow;
use tracing::debug;

/// Stack `bitmaps` vertically.
///
/// The output is RGBA if any input is RGBA, otherwise RGB.
pub fn stitch<B: Borrow<Bitmap>>(bitmaps: &[B]) -> Result<Bitmap, CombinerError> {
    if bitmaps.is_empty() {
        return Err(CombinerError::EmptyInput {
            what: "no bitmaps to stitch".to_string(),
        });
    }

    let width = bitmaps
        .iter()
        .map(|b| b.borrow().width())
        .max()
        .unwrap_or(0);
    let height = bitmaps
        .iter()
        .try_fold(0u32, |acc, b| acc.checked_add(b.borrow().height()))
        .ok_or_else(|| CombinerError::InvalidBitmap {
            detail: "stitched height overflows u32".to_string(),
        })?;
    let has_alpha = bitmaps
        .iter()
        .any(|b| b.borrow().layout() == PixelLayout::Rgba);

    let canvas = if has_alpha {
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut y = 0i64;
        for bitmap in bitmaps {
            let bitmap = bitmap.borrow();
            match bitmap.as_dynamic() {
                DynamicImage::ImageRgba8(buf) => imageops::replace(&mut canvas, buf, 0, y),
                other => imageops::replace(&mut canvas, &other.to_rgba8(), 0, y),
            }
            y += bitmap.height() as i64;
        }
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let mut y = 0i64;
        for bitmap in bitmaps {
            let bitmap = bitmap.borrow();
            match bitmap.as_dynamic() {
                DynamicImage::ImageRgb8(buf) => imageops::replace(&mut canvas, buf, 0, y),
                other => imageops::replace(&mut canvas, &other.to_rgb8(), 0, y),
            }
            y += bitmap.height() as i64;
        }
        DynamicImage::ImageRgb8(canvas)
    };

    debug!("Stitched {} bitmaps → {}x{}", bitmaps.len(), width, height);
    Bitmap::from_dynamic(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> Bitmap {
        Bitmap::filled(w, h, [v, v, v]).unwrap()
    }

    fn pixel(b: &Bitmap, x: u32, y: u32) -> &[u8] {
        let c = b.layout().channels();
        let i = (y as usize * b.width() as usize + x as usize) * c;
        &b.as_bytes()[i..i + c]
    }

    #[test]
    fn empty_input_fails() {
        let none: [Bitmap; 0] = [];
        assert!(matches!(stitch(&none), Err(CombinerError::EmptyInput { .. })));
    }

    #[test]
    fn shape_is_max_width_sum_height() {
        let inputs = [solid(10, 3, 1), solid(4, 5, 2), solid(7, 2, 3)];
        let out = stitch(&inputs).unwrap();
        assert_eq!(out.dimensions(), (10, 10));
    }

    #[test]
    fn pages_are_placed_in_order_left_aligned() {
        let inputs = [solid(4, 2, 10), solid(2, 3, 20), solid(4, 1, 30)];
        let out = stitch(&inputs).unwrap();
        assert_eq!(pixel(&out, 0, 0), &[10, 10, 10]);
        assert_eq!(pixel(&out, 0, 2), &[20, 20, 20]);
        assert_eq!(pixel(&out, 1, 4), &[20, 20, 20]);
        // Right of the narrower second bitmap.
        assert_eq!(pixel(&out, 3, 3), &[255, 255, 255]);
        assert_eq!(pixel(&out, 3, 5), &[30, 30, 30]);
    }

    #[test]
    fn single_input_is_reproduced() {
        let b = solid(3, 3, 77);
        let out = stitch(&[&b]).unwrap();
        assert_eq!(out, b);
    }

    #[test]
    fn rgba_input_promotes_canvas() {
        let rgba = Bitmap::from_raw(1, 1, PixelLayout::Rgba, vec![1, 2, 3, 4]).unwrap();
        let out = stitch(&[solid(2, 1, 9), rgba]).unwrap();
        assert_eq!(out.layout(), PixelLayout::Rgba);
        assert_eq!(pixel(&out, 0, 1), &[1, 2, 3, 4]);
        assert_eq!(pixel(&out, 1, 1), &[255, 255, 255, 255]);
        assert_eq!(pixel(&out, 1, 0), &[9, 9, 9, 255]);
    }
}
