//! pdfium-backed [`PdfEngine`].
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not be driven from async contexts. Everything
//! here is blocking; the orchestrator calls it from `spawn_blocking` and binds
//! a fresh [`Pdfium`] instance on that worker thread via [`PdfiumProvider`].

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use crate::pipeline::document::{Document, DocumentWriter, EngineProvider, PageSize, PdfEngine};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Binds libpdfium on demand.
///
/// With no explicit path the library is looked up next to the executable's
/// working directory first, then through the system loader.
#[derive(Debug, Clone, Default)]
pub struct PdfiumProvider {
    library_path: Option<PathBuf>,
}

impl PdfiumProvider {
    /// `path` may name the library file itself or the directory holding it.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }
}

impl EngineProvider for PdfiumProvider {
    type Engine = PdfiumEngine;

    fn engine(&self) -> Result<PdfiumEngine, CombinerError> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(path.join(Pdfium::pdfium_platform_library_name()))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| CombinerError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(PdfiumEngine {
            pdfium: Pdfium::new(bindings),
        })
    }
}

/// A bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    fn load<'a>(&'a self, path: &Path) -> Result<PdfDocument<'a>, CombinerError> {
        self.pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| CombinerError::CorruptPdf {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })
    }
}

impl PdfEngine for PdfiumEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn Document + '_>, CombinerError> {
        let document = self.load(path)?;
        info!("PDF loaded: {} ({} pages)", path.display(), document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }

    fn create(&self) -> Result<Box<dyn DocumentWriter + '_>, CombinerError> {
        let document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| CombinerError::PageAppendFailed {
                detail: format!("cannot create document: {:?}", e),
            })?;
        Ok(Box::new(PdfiumWriter {
            engine: self,
            document,
        }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, CombinerError> {
        let page_index = u16::try_from(index).map_err(|_| CombinerError::RasterisationFailed {
            page: index + 1,
            detail: "page index exceeds pdfium's range".to_string(),
        })?;
        self.document
            .pages()
            .get(page_index)
            .map_err(|e| CombinerError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })
    }
}

impl Document for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, CombinerError> {
        let page = self.page(index)?;
        Ok(PageSize {
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
    }

    fn render_page(&self, index: usize, width: u32, height: u32) -> Result<Bitmap, CombinerError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new()
            .set_target_size(width as i32, height as i32)
            .set_clear_color(PdfColor::new(255, 255, 255, 255));

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| CombinerError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        Bitmap::from_dynamic(bitmap.as_image()).map_err(|e| CombinerError::RasterisationFailed {
            page: index + 1,
            detail: e.to_string(),
        })
    }
}

struct PdfiumWriter<'a> {
    engine: &'a PdfiumEngine,
    document: PdfDocument<'a>,
}

impl DocumentWriter for PdfiumWriter<'_> {
    fn append_image_page(&mut self, bitmap: &Bitmap) -> Result<(), CombinerError> {
        let append_failed = |e: PdfiumError| CombinerError::PageAppendFailed {
            detail: format!("{:?}", e),
        };

        let width = PdfPoints::new(bitmap.width() as f32);
        let height = PdfPoints::new(bitmap.height() as f32);

        let mut page = self
            .document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(width, height))
            .map_err(append_failed)?;

        let mut image_object =
            PdfPageImageObject::new(&self.document, bitmap.as_dynamic()).map_err(append_failed)?;
        image_object
            .scale(width.value, height.value)
            .map_err(append_failed)?;

        page.objects_mut()
            .add_object(PdfPageObject::Image(image_object))
            .map_err(append_failed)?;

        debug!("Appended {}x{} image page", bitmap.width(), bitmap.height());
        Ok(())
    }

    fn append_document(&mut self, path: &Path) -> Result<(), CombinerError> {
        let source = self.engine.load(path)?;
        self.document
            .pages_mut()
            .append(&source)
            .map_err(|e| CombinerError::PageAppendFailed {
                detail: format!("{}: {:?}", path.display(), e),
            })?;
        debug!("Appended {} pages from {}", source.pages().len(), path.display());
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn save(&mut self, path: &Path) -> Result<(), CombinerError> {
        self.document
            .save_to_file(path)
            .map_err(|e| CombinerError::PdfSaveFailed {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })
    }
}
