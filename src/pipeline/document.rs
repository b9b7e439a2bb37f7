//! Capability traits for the PDF engine.
//!
//! The pipeline never parses PDF itself. It talks to an engine through three
//! small traits so the pdfium binding can be swapped for another backend (or
//! an in-memory fake in tests) without touching the scaling, rasterising or
//! stitching code:
//!
//! * [`Document`]       — an opened source: page count, page geometry, page rendering
//! * [`DocumentWriter`] — an output PDF under construction: append pages, save
//! * [`PdfEngine`]      — opens sources and creates writers
//!
//! Engines that hold thread-affine native state are created per operation
//! through an [`EngineProvider`] inside a blocking worker thread.

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use std::path::Path;

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// An opened, decodable paged document.
pub trait Document {
    fn page_count(&self) -> usize;

    /// Media-box size of the page at 0-based `index`.
    fn page_size(&self, index: usize) -> Result<PageSize, CombinerError>;

    /// Rasterise the page at `index` into a `width × height` pixel bitmap.
    fn render_page(&self, index: usize, width: u32, height: u32) -> Result<Bitmap, CombinerError>;
}

/// A PDF being assembled page by page.
pub trait DocumentWriter {
    /// Append one page sized to the bitmap (1 px = 1 pt) showing the bitmap.
    fn append_image_page(&mut self, bitmap: &Bitmap) -> Result<(), CombinerError>;

    /// Append every page of the PDF at `path`, in order.
    fn append_document(&mut self, path: &Path) -> Result<(), CombinerError>;

    fn page_count(&self) -> usize;

    /// Serialise the document to `path`.
    fn save(&mut self, path: &Path) -> Result<(), CombinerError>;
}

/// Factory for documents and writers.
pub trait PdfEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn Document + '_>, CombinerError>;

    /// Open `path` as a document that may be rendered from several threads.
    ///
    /// Engines whose documents are thread-affine keep the default, and the
    /// caller falls back to [`open`](Self::open) and renders sequentially.
    fn open_shared(&self, _path: &Path) -> Result<Option<Box<dyn Document + Sync + '_>>, CombinerError> {
        Ok(None)
    }

    fn create(&self) -> Result<Box<dyn DocumentWriter + '_>, CombinerError>;
}

/// Builds a [`PdfEngine`] on the worker thread that will use it.
pub trait EngineProvider: Send + Sync + 'static {
    type Engine: PdfEngine;

    fn engine(&self) -> Result<Self::Engine, CombinerError>;
}
