//! PDF rasterisation: turn every page of a [`Document`] into a [`Page`].
//!
//! ## Resolution
//!
//! Each page is rendered at `page_size_pt × dpi_scale` pixels, rounded to the
//! nearest pixel. The default scale of `200 / 72` gives 200 DPI output, sharp
//! enough for text while keeping a Letter page near 1700 × 2200 px.
//!
//! ## Background
//!
//! Transparent regions are composited onto opaque white before a page leaves
//! this stage, whatever the backend produced. PNG and JPEG output otherwise
//! show black or checkerboard artefacts where the PDF had no fill.
//!
//! ## Ordering
//!
//! Pages are identified by their 0-based index, never by completion order.
//! With the `parallel` feature, [`PageRasterizer::collect_parallel`] renders
//! on a rayon pool. Pages may finish in any order but come back sorted by
//! index.

use crate::bitmap::Bitmap;
use crate::error::CombinerError;
use crate::pipeline::document::Document;
use tracing::{debug, info};

/// Scale factor giving 200 DPI output from 72-point PDF units.
pub const DEFAULT_DPI_SCALE: f32 = 200.0 / 72.0;

/// One rasterised page bound to its 0-based position in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub bitmap: Bitmap,
}

impl Page {
    /// 1-based page number for file names and messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Renders the pages of one document at a fixed resolution.
///
/// The rasterizer holds no iteration state: every call to [`pages`](Self::pages)
/// starts again from page 0, so callers can make as many passes as they need.
pub struct PageRasterizer<'d, D: Document + ?Sized> {
    document: &'d D,
    dpi_scale: f32,
}

impl<'d, D: Document + ?Sized> PageRasterizer<'d, D> {
    pub fn new(document: &'d D, dpi_scale: f32) -> Self {
        Self { document, dpi_scale }
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Render a single page.
    pub fn render(&self, index: usize) -> Result<Page, CombinerError> {
        let size = self.document.page_size(index)?;
        let width = (size.width_pt * self.dpi_scale).round();
        let height = (size.height_pt * self.dpi_scale).round();
        if !(width >= 1.0 && height >= 1.0) || width > u32::MAX as f32 || height > u32::MAX as f32 {
            return Err(CombinerError::RasterisationFailed {
                page: index + 1,
                detail: format!(
                    "page size {}x{}pt gives an unusable {}x{}px raster",
                    size.width_pt, size.height_pt, width, height
                ),
            });
        }

        let bitmap = self
            .document
            .render_page(index, width as u32, height as u32)?
            .flatten_onto_white();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            bitmap.width(),
            bitmap.height()
        );
        Ok(Page { index, bitmap })
    }

    /// Lazily render pages `0..page_count` in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = Result<Page, CombinerError>> + '_ {
        (0..self.page_count()).map(move |index| self.render(index))
    }

    /// Render every page, stopping at the first failure.
    pub fn collect(&self) -> Result<Vec<Page>, CombinerError> {
        let pages = self.pages().collect::<Result<Vec<_>, _>>()?;
        info!("Rasterised {} pages", pages.len());
        Ok(pages)
    }
}

#[cfg(feature = "parallel")]
impl<D: Document + Sync + ?Sized> PageRasterizer<'_, D> {
    /// Render every page on the current rayon pool.
    ///
    /// The returned Vec is ordered by page index whatever order the pages
    /// finished in.
    pub fn pages_parallel(&self) -> Vec<Result<Page, CombinerError>> {
        use rayon::prelude::*;

        (0..self.page_count())
            .into_par_iter()
            .map(|index| self.render(index))
            .collect()
    }

    /// Render every page on a dedicated pool of `workers` threads.
    ///
    /// When several pages fail, the one with the lowest index is reported.
    pub fn collect_parallel(&self, workers: usize) -> Result<Vec<Page>, CombinerError> {
        let workers = workers.clamp(1, self.page_count().max(1));
        if workers == 1 {
            return self.collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pdf-render-{}", i))
            .build()
            .map_err(|e| CombinerError::Internal(format!("render pool: {}", e)))?;
        let pages = pool
            .install(|| self.pages_parallel())
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        info!("Rasterised {} pages on {} workers", pages.len(), workers);
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelLayout;
    use crate::pipeline::document::PageSize;
    use std::time::Duration;

    /// Pages are solid grey with the level encoding the page index; the
    /// first row is half-transparent so white flattening is observable.
    struct FakeDoc {
        sizes: Vec<(f32, f32)>,
        fail_on: Option<usize>,
        slow_first: bool,
    }

    impl FakeDoc {
        fn new(sizes: &[(f32, f32)]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                fail_on: None,
                slow_first: false,
            }
        }
    }

    impl Document for FakeDoc {
        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn page_size(&self, index: usize) -> Result<PageSize, CombinerError> {
            let (w, h) = self.sizes[index];
            Ok(PageSize {
                width_pt: w,
                height_pt: h,
            })
        }

        fn render_page(&self, index: usize, width: u32, height: u32) -> Result<Bitmap, CombinerError> {
            if self.fail_on == Some(index) {
                return Err(CombinerError::RasterisationFailed {
                    page: index + 1,
                    detail: "broken content stream".into(),
                });
            }
            if self.slow_first && index == 0 {
                std::thread::sleep(Duration::from_millis(50));
            }
            let level = (index as u8).wrapping_mul(40);
            let mut pixels = Vec::with_capacity((width * height * 4) as usize);
            for y in 0..height {
                let alpha = if y == 0 { 0 } else { 255 };
                for _ in 0..width {
                    pixels.extend_from_slice(&[level, level, level, alpha]);
                }
            }
            Bitmap::from_raw(width, height, PixelLayout::Rgba, pixels)
        }
    }

    #[test]
    fn renders_at_dpi_scale() {
        let doc = FakeDoc::new(&[(72.0, 144.0)]);
        let page = PageRasterizer::new(&doc, DEFAULT_DPI_SCALE).render(0).unwrap();
        assert_eq!(page.bitmap.dimensions(), (200, 400));
        assert_eq!(page.number(), 1);
    }

    #[test]
    fn rounds_fractional_sizes() {
        // 612pt * 200/72 = 1700, 100.3pt * 1.0 = 100.3 → 100
        let doc = FakeDoc::new(&[(612.0, 100.3)]);
        let page = PageRasterizer::new(&doc, 1.0).render(0).unwrap();
        assert_eq!(page.bitmap.dimensions(), (612, 100));
        let page = PageRasterizer::new(&doc, DEFAULT_DPI_SCALE).render(0).unwrap();
        assert_eq!(page.bitmap.width(), 1700);
    }

    #[test]
    fn background_is_white() {
        let doc = FakeDoc::new(&[(4.0, 4.0), (4.0, 4.0)]);
        let page = PageRasterizer::new(&doc, 1.0).render(1).unwrap();
        assert_eq!(page.bitmap.layout(), PixelLayout::Rgb);
        assert_eq!(&page.bitmap.as_bytes()[..3], &[255, 255, 255]);
        let second_row = 4 * 3;
        assert_eq!(&page.bitmap.as_bytes()[second_row..second_row + 3], &[40, 40, 40]);
    }

    #[test]
    fn sequence_is_restartable() {
        let doc = FakeDoc::new(&[(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let r = PageRasterizer::new(&doc, 1.0);
        let first: Vec<usize> = r.pages().map(|p| p.unwrap().index).collect();
        let second: Vec<usize> = r.pages().map(|p| p.unwrap().index).collect();
        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn collect_aborts_on_failed_page() {
        let mut doc = FakeDoc::new(&[(2.0, 2.0), (2.0, 2.0), (2.0, 2.0)]);
        doc.fail_on = Some(1);
        let err = PageRasterizer::new(&doc, 1.0).collect().unwrap_err();
        assert!(matches!(err, CombinerError::RasterisationFailed { page: 2, .. }));
    }

    #[test]
    fn zero_sized_page_is_rejected() {
        let doc = FakeDoc::new(&[(0.0, 10.0)]);
        let err = PageRasterizer::new(&doc, 1.0).render(0).unwrap_err();
        assert!(matches!(err, CombinerError::RasterisationFailed { page: 1, .. }));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_keeps_index_order() {
        let mut doc = FakeDoc::new(&[(2.0, 2.0); 6]);
        doc.slow_first = true;
        let pages = PageRasterizer::new(&doc, 1.0).collect_parallel(4).unwrap();
        let indices: Vec<usize> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        // Second row carries the page's grey level.
        for page in &pages {
            let level = (page.index as u8).wrapping_mul(40);
            assert_eq!(page.bitmap.as_bytes()[2 * 3], level);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_reports_failed_page() {
        let mut doc = FakeDoc::new(&[(2.0, 2.0); 5]);
        doc.fail_on = Some(3);
        let err = PageRasterizer::new(&doc, 1.0).collect_parallel(3).unwrap_err();
        assert!(matches!(err, CombinerError::RasterisationFailed { page: 4, .. }));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn lowest_failed_page_wins() {
        struct TwoFailures(FakeDoc);

        impl Document for TwoFailures {
            fn page_count(&self) -> usize {
                self.0.page_count()
            }

            fn page_size(&self, index: usize) -> Result<PageSize, CombinerError> {
                self.0.page_size(index)
            }

            fn render_page(&self, index: usize, w: u32, h: u32) -> Result<Bitmap, CombinerError> {
                if index == 1 || index == 4 {
                    return Err(CombinerError::RasterisationFailed {
                        page: index + 1,
                        detail: "broken".into(),
                    });
                }
                self.0.render_page(index, w, h)
            }
        }

        let doc = TwoFailures(FakeDoc::new(&[(2.0, 2.0); 6]));
        let rasterizer = PageRasterizer::new(&doc, 1.0);
        let results = rasterizer.pages_parallel();
        assert_eq!(results.len(), 6);
        assert!(results[0].is_ok() && results[1].is_err() && results[4].is_err());
        let err = rasterizer.collect_parallel(3).unwrap_err();
        assert!(matches!(err, CombinerError::RasterisationFailed { page: 2, .. }));
    }
}
