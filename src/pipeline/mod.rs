//! Pipeline stages for page rasterisation and image composition.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. The PDF engine sits behind the traits in [`document`] so the stages
//! never depend on pdfium directly.
//!
//! ## Data Flow
//!
//! ```text
//!  PDF ──▶ render ──▶ scale ──▶ encode            (one file per page)
//!                           └─▶ stitch ──▶ encode (one tall image)
//!
//!  images ──▶ input ──▶ scale ──▶ DocumentWriter  (PDF from images)
//! ```
//!
//! 1. [`input`]  — validate source paths, decode images with EXIF orientation
//! 2. [`render`] — rasterise pages at a fixed DPI onto a white background
//! 3. [`scale`]  — resize per a [`scale::ScaleSpec`]
//! 4. [`stitch`] — stack page bitmaps top to bottom
//! 5. [`encode`] — PNG / JPEG encode with a validated compression level
//!
//! [`pdfium`] is the production [`document::PdfEngine`]; it is blocking and
//! is only ever driven from `spawn_blocking`.

pub mod document;
pub mod encode;
pub mod input;
pub mod pdfium;
pub mod render;
pub mod scale;
pub mod stitch;
