//! Bitmap resizing policies.
//!
//! A [`ScaleSpec`] is resolved once from the request parameters and applied
//! to every page or image of an operation. Target sizes are computed with
//! integer arithmetic and round half up on the dimension that follows the
//! aspect ratio, so the same request always produces the same pixel size.

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use image::imageops::FilterType;
use std::num::NonZeroU32;
use tracing::debug;

/// Resampling filter used for every resize.
const FILTER: FilterType = FilterType::Triangle;

/// How a bitmap should be resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleSpec {
    /// Leave the bitmap untouched.
    #[default]
    Identity,
    /// Resample to exactly this size, ignoring the source aspect ratio.
    Exact { width: NonZeroU32, height: NonZeroU32 },
    /// Fit inside the box. With `keep_aspect_ratio = false` this is `Exact`.
    MaxBox {
        max_width: NonZeroU32,
        max_height: NonZeroU32,
        keep_aspect_ratio: bool,
    },
    /// Resample to this width; height follows the aspect ratio.
    WidthOnly { width: NonZeroU32 },
}

impl ScaleSpec {
    pub fn exact(width: u32, height: u32) -> Result<Self, CombinerError> {
        Ok(ScaleSpec::Exact {
            width: positive("width", width)?,
            height: positive("height", height)?,
        })
    }

    pub fn max_box(max_width: u32, max_height: u32, keep_aspect_ratio: bool) -> Result<Self, CombinerError> {
        Ok(ScaleSpec::MaxBox {
            max_width: positive("width", max_width)?,
            max_height: positive("height", max_height)?,
            keep_aspect_ratio,
        })
    }

    pub fn width_only(width: u32) -> Result<Self, CombinerError> {
        Ok(ScaleSpec::WidthOnly {
            width: positive("width", width)?,
        })
    }

    /// Resolve the boundary `(width, height, keepAspectRatio)` triple.
    ///
    /// | width | height | keep  | result                 |
    /// |-------|--------|-------|------------------------|
    /// | 0     | 0      | any   | `Identity`             |
    /// | > 0   | > 0    | true  | `MaxBox` (keep ratio)  |
    /// | > 0   | > 0    | false | `Exact`                |
    /// | > 0   | 0      | any   | `WidthOnly`            |
    ///
    /// Negative values and a height without a width are rejected.
    pub fn from_dimensions(width: i64, height: i64, keep_aspect_ratio: bool) -> Result<Self, CombinerError> {
        let width = to_u32("width", width)?;
        let height = to_u32("height", height)?;
        match (width, height) {
            (0, 0) => Ok(ScaleSpec::Identity),
            (w, 0) => ScaleSpec::width_only(w),
            (0, _) => Err(CombinerError::invalid_argument(
                "height",
                "a height limit needs a width limit as well",
            )),
            (w, h) if keep_aspect_ratio => ScaleSpec::max_box(w, h, true),
            (w, h) => ScaleSpec::exact(w, h),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ScaleSpec::Identity)
    }

    /// Output size for a `src_width × src_height` source.
    ///
    /// `None` means the source is already conforming and must be passed
    /// through without resampling.
    pub fn target_size(&self, src_width: u32, src_height: u32) -> Result<Option<(u32, u32)>, CombinerError> {
        let (w, h) = match *self {
            ScaleSpec::Identity => return Ok(None),
            ScaleSpec::Exact { width, height }
            | ScaleSpec::MaxBox {
                max_width: width,
                max_height: height,
                keep_aspect_ratio: false,
            } => (width.get(), height.get()),
            ScaleSpec::MaxBox {
                max_width,
                max_height,
                keep_aspect_ratio: true,
            } => {
                let (max_w, max_h) = (max_width.get(), max_height.get());
                if src_width <= max_w && src_height <= max_h {
                    return Ok(None);
                }
                // Compare src_w/src_h with max_w/max_h without division.
                let img = src_width as u64 * max_h as u64;
                let boxed = max_w as u64 * src_height as u64;
                if img < boxed {
                    (round_ratio(src_width, max_h, src_height), max_h)
                } else if img > boxed {
                    (max_w, round_ratio(src_height, max_w, src_width))
                } else {
                    (max_w, max_h)
                }
            }
            ScaleSpec::WidthOnly { width } => {
                let w = width.get();
                (w, round_ratio(src_height, w, src_width))
            }
        };

        if w == 0 || h == 0 {
            return Err(CombinerError::InvalidScaleSpec {
                detail: format!(
                    "{:?} on a {}x{} source yields {}x{}",
                    self, src_width, src_height, w, h
                ),
            });
        }
        if (w, h) == (src_width, src_height) {
            return Ok(None);
        }
        Ok(Some((w, h)))
    }
}

/// Apply `spec` to `bitmap`, returning the input itself when no resize is needed.
pub fn scale(bitmap: Bitmap, spec: &ScaleSpec) -> Result<Bitmap, CombinerError> {
    let (src_w, src_h) = bitmap.dimensions();
    let Some((w, h)) = spec.target_size(src_w, src_h)? else {
        return Ok(bitmap);
    };
    let resized = bitmap.as_dynamic().resize_exact(w, h, FILTER);
    debug!("Scaled {}x{} → {}x{}", src_w, src_h, w, h);
    Bitmap::from_dynamic(resized)
}

/// `round(value * num / den)` with halves rounded up, in integer arithmetic.
fn round_ratio(value: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return 0;
    }
    let scaled = (2 * value as u64 * num as u64 + den as u64) / (2 * den as u64);
    scaled.min(u32::MAX as u64) as u32
}

fn positive(name: &str, value: u32) -> Result<NonZeroU32, CombinerError> {
    NonZeroU32::new(value).ok_or_else(|| CombinerError::invalid_argument(name, "must be greater than zero"))
}

fn to_u32(name: &str, value: i64) -> Result<u32, CombinerError> {
    u32::try_from(value)
        .map_err(|_| CombinerError::invalid_argument(name, format!("must be between 0 and {}, got {}", u32::MAX, value)))
}
