//! In-memory PDF engine for integration tests.
//!
//! A "PDF" here is a text file: the `%PDF-fake` magic line followed by a JSON
//! list of page sizes in points. Rendering fills each page with a grey level
//! derived from its index, with a transparent top row so the white background
//! policy is observable. No libpdfium is needed.

#![allow(dead_code)]

use pdf_combiner::{
    Bitmap, CombinerError, Document, DocumentWriter, EngineProvider, PageSize, PdfEngine,
    PixelLayout,
};
use std::path::{Path, PathBuf};

const MAGIC: &str = "%PDF-fake\n";

/// Grey level of page `index` in rendered output.
pub fn page_level(index: usize) -> u8 {
    (10 + index * 50 % 240) as u8
}

pub fn write_fake_pdf(path: &Path, pages: &[(f32, f32)]) {
    let body = serde_json::to_string(pages).unwrap();
    std::fs::write(path, format!("{MAGIC}{body}")).unwrap();
}

pub fn read_fake_pdf(path: &Path) -> Vec<(f32, f32)> {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(text.strip_prefix(MAGIC).unwrap()).unwrap()
}

#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    /// 0-based page index whose render fails.
    pub fail_render: Option<usize>,
    /// Offer documents that can be rendered from several threads.
    pub shared: bool,
}

impl FakeProvider {
    pub fn shared() -> Self {
        Self {
            shared: true,
            ..Self::default()
        }
    }
}

impl EngineProvider for FakeProvider {
    type Engine = FakeEngine;

    fn engine(&self) -> Result<FakeEngine, CombinerError> {
        Ok(FakeEngine {
            fail_render: self.fail_render,
            shared: self.shared,
        })
    }
}

pub struct FakeEngine {
    fail_render: Option<usize>,
    shared: bool,
}

fn load(path: &Path) -> Result<Vec<(f32, f32)>, CombinerError> {
    let corrupt = |detail: String| CombinerError::CorruptPdf {
        path: path.to_path_buf(),
        detail,
    };
    let text = std::fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
    let body = text
        .strip_prefix(MAGIC)
        .ok_or_else(|| corrupt("missing fake magic".into()))?;
    serde_json::from_str(body).map_err(|e| corrupt(e.to_string()))
}

impl PdfEngine for FakeEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn Document + '_>, CombinerError> {
        Ok(Box::new(FakeDocument {
            pages: load(path)?,
            fail_render: self.fail_render,
        }))
    }

    fn open_shared(&self, path: &Path) -> Result<Option<Box<dyn Document + Sync + '_>>, CombinerError> {
        if !self.shared {
            return Ok(None);
        }
        Ok(Some(Box::new(FakeDocument {
            pages: load(path)?,
            fail_render: self.fail_render,
        })))
    }

    fn create(&self) -> Result<Box<dyn DocumentWriter + '_>, CombinerError> {
        Ok(Box::new(FakeWriter { pages: Vec::new() }))
    }
}

pub struct FakeDocument {
    pages: Vec<(f32, f32)>,
    fail_render: Option<usize>,
}

impl Document for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, CombinerError> {
        let (width_pt, height_pt) = self.pages[index];
        Ok(PageSize {
            width_pt,
            height_pt,
        })
    }

    fn render_page(&self, index: usize, width: u32, height: u32) -> Result<Bitmap, CombinerError> {
        if self.fail_render == Some(index) {
            return Err(CombinerError::RasterisationFailed {
                page: index + 1,
                detail: "fake render failure".into(),
            });
        }
        let level = page_level(index);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            let alpha = if y == 0 { 0 } else { 255 };
            for _ in 0..width {
                pixels.extend_from_slice(&[level, level, level, alpha]);
            }
        }
        Bitmap::from_raw(width, height, PixelLayout::Rgba, pixels)
    }
}

pub struct FakeWriter {
    pages: Vec<(f32, f32)>,
}

impl DocumentWriter for FakeWriter {
    fn append_image_page(&mut self, bitmap: &Bitmap) -> Result<(), CombinerError> {
        self.pages
            .push((bitmap.width() as f32, bitmap.height() as f32));
        Ok(())
    }

    fn append_document(&mut self, path: &Path) -> Result<(), CombinerError> {
        self.pages.extend(load(path)?);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn save(&mut self, path: &Path) -> Result<(), CombinerError> {
        let body = serde_json::to_string(&self.pages)
            .map_err(|e| CombinerError::Internal(e.to_string()))?;
        std::fs::write(path, format!("{MAGIC}{body}")).map_err(|e| {
            CombinerError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}

pub fn paths(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| dir.join(n)).collect()
}
