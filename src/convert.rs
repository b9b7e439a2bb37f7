//! The three top-level operations: merge PDFs, build a PDF from images and
//! rasterise a PDF to images.
//!
//! Every operation is a linear pipeline that either succeeds with its output
//! paths or fails with the first error encountered. Engine work (open,
//! render, append, save) runs on one `spawn_blocking` thread per operation
//! because pdfium must not be driven from async contexts. Per-page scaling
//! and encoding fan out over `buffer_unordered(concurrency)` and are put back
//! in page order before anything depends on order.
//!
//! Files written before a failure are left on disk.

use crate::config::ConversionConfig;
use crate::error::CombinerError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::document::{EngineProvider, PdfEngine};
use crate::pipeline::encode::{encode_bitmap, CompressionLevel, ImageFormat};
use crate::pipeline::pdfium::PdfiumProvider;
use crate::pipeline::render::{Page, PageRasterizer};
use crate::pipeline::scale::{scale, ScaleSpec};
use crate::pipeline::{input, stitch};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters for [`Combiner::create_pdf_from_images`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImagesToPdfRequest {
    /// Images in page order.
    pub paths: Vec<PathBuf>,
    /// Exact path of the PDF to write.
    pub output_path: PathBuf,
    pub scale: ScaleSpec,
}

/// Parameters for [`Combiner::create_images_from_pdf`].
#[derive(Debug, Clone, PartialEq)]
pub struct PdfToImagesRequest {
    pub path: PathBuf,
    /// Output directory, or the exact image path when `create_one_image` is set.
    pub output_path: PathBuf,
    pub scale: ScaleSpec,
    pub compression: CompressionLevel,
    /// Stitch every page into one tall image instead of one file per page.
    pub create_one_image: bool,
}

/// Runs combiner operations against a PDF engine.
///
/// Cheap to clone; clones share the engine provider.
pub struct Combiner<P: EngineProvider = PdfiumProvider> {
    provider: Arc<P>,
    config: ConversionConfig,
}

impl<P: EngineProvider> Clone for Combiner<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
        }
    }
}

impl Combiner<PdfiumProvider> {
    /// A combiner backed by pdfium, bound per `config.pdfium_library_path`.
    pub fn new(config: ConversionConfig) -> Self {
        let provider = PdfiumProvider::new(config.pdfium_library_path.clone());
        Self::with_provider(provider, config)
    }
}

impl<P: EngineProvider> Combiner<P> {
    pub fn with_provider(provider: P, config: ConversionConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Concatenate the pages of `paths`, in order, into one PDF at `output_path`.
    ///
    /// # Errors
    /// - `EmptyInput` when `paths` is empty or the inputs hold no pages
    /// - `FileNotFound` / `CorruptPdf` naming the first unreadable input
    pub async fn merge_pdfs(
        &self,
        paths: &[PathBuf],
        output_path: &Path,
    ) -> Result<ConversionOutput, CombinerError> {
        let start = Instant::now();
        info!("Merging {} PDFs into {}", paths.len(), output_path.display());

        if paths.is_empty() {
            return Err(CombinerError::EmptyInput {
                what: "no PDF paths to merge".to_string(),
            });
        }
        for path in paths {
            input::check_pdf(path)?;
        }
        ensure_parent_dir(output_path).await?;

        let total = paths.len();
        let callback = self.config.progress_callback.clone();
        notify_start(&callback, total);

        let provider = Arc::clone(&self.provider);
        let sources = paths.to_vec();
        let output = output_path.to_path_buf();
        let engine_start = Instant::now();
        let pages = blocking("merge", move || {
            let engine = provider.engine()?;
            let mut writer = engine.create()?;
            for (i, source) in sources.iter().enumerate() {
                writer
                    .append_document(source)
                    .inspect_err(|e| notify_error(&callback, i + 1, total, e))?;
                notify_complete(&callback, i + 1, total, 0);
            }
            let pages = writer.page_count();
            if pages == 0 {
                return Err(CombinerError::EmptyInput {
                    what: "merged inputs contain no pages".to_string(),
                });
            }
            writer.save(&output)?;
            Ok(pages)
        })
        .await?;
        let engine_duration_ms = engine_start.elapsed().as_millis() as u64;

        self.finish(
            vec![output_path.to_path_buf()],
            ConversionStats {
                input_files: total,
                pages,
                engine_duration_ms,
                ..Default::default()
            },
            start,
        )
        .await
    }

    /// Build a PDF with one page per image, each page sized to the
    /// (scaled) image at 1 px = 1 pt.
    ///
    /// # Errors
    /// - `EmptyInput` when no paths are given
    /// - `FileNotFound` / `UndecodableImage` naming the first unreadable image
    pub async fn create_pdf_from_images(
        &self,
        request: &ImagesToPdfRequest,
    ) -> Result<ConversionOutput, CombinerError> {
        let start = Instant::now();
        info!(
            "Building PDF from {} images into {} ({:?})",
            request.paths.len(),
            request.output_path.display(),
            request.scale
        );

        if request.paths.is_empty() {
            return Err(CombinerError::EmptyInput {
                what: "no image paths".to_string(),
            });
        }
        for path in &request.paths {
            input::check_readable(path)?;
        }
        ensure_parent_dir(&request.output_path).await?;

        let total = request.paths.len();
        let callback = self.config.progress_callback.clone();
        notify_start(&callback, total);

        let provider = Arc::clone(&self.provider);
        let sources = request.paths.clone();
        let spec = request.scale;
        let output = request.output_path.clone();
        let engine_start = Instant::now();
        let pages = blocking("images-to-pdf", move || {
            let engine = provider.engine()?;
            let mut writer = engine.create()?;
            for (i, source) in sources.iter().enumerate() {
                notify_page_start(&callback, i + 1, total);
                let appended = input::load_image(source)
                    .and_then(|bitmap| scale(bitmap, &spec))
                    .and_then(|bitmap| writer.append_image_page(&bitmap));
                appended.inspect_err(|e| notify_error(&callback, i + 1, total, e))?;
                notify_complete(&callback, i + 1, total, 0);
            }
            writer.save(&output)?;
            Ok(writer.page_count())
        })
        .await?;
        let engine_duration_ms = engine_start.elapsed().as_millis() as u64;

        self.finish(
            vec![request.output_path.clone()],
            ConversionStats {
                input_files: total,
                pages,
                engine_duration_ms,
                ..Default::default()
            },
            start,
        )
        .await
    }

    /// Rasterise every page of a PDF and write the result as images.
    ///
    /// With `create_one_image` the scaled pages are stitched top to bottom
    /// into the single file `output_path`. Otherwise `output_path` is a
    /// directory receiving `image_1.<ext>` … `image_N.<ext>`.
    ///
    /// # Errors
    /// - `EmptyInput` when the document has no pages
    /// - `RasterisationFailed` naming the first page that could not be rendered
    /// - `InvalidScaleSpec` when the resize shrinks a page side to zero
    /// - `InvalidArgument` when a single JPEG would exceed 65535 px per side
    /// - `OutputWriteFailed` when an image cannot be written
    pub async fn create_images_from_pdf(
        &self,
        request: &PdfToImagesRequest,
    ) -> Result<ConversionOutput, CombinerError> {
        let start = Instant::now();
        let format = self.config.image_format;
        info!(
            "Rasterising {} → {} ({:?}, {}, compression {}, one image: {})",
            request.path.display(),
            request.output_path.display(),
            request.scale,
            format,
            request.compression.value(),
            request.create_one_image
        );

        input::check_pdf(&request.path)?;
        if request.create_one_image {
            ensure_parent_dir(&request.output_path).await?;
        } else {
            tokio::fs::create_dir_all(&request.output_path)
                .await
                .map_err(|e| CombinerError::OutputWriteFailed {
                    path: request.output_path.clone(),
                    source: e,
                })?;
        }

        let callback = self.config.progress_callback.clone();
        let engine_start = Instant::now();
        let pages = self.rasterise(&request.path).await?;
        let engine_duration_ms = engine_start.elapsed().as_millis() as u64;
        let total = pages.len();
        notify_start(&callback, total);

        let spec = request.scale;
        let level = request.compression;

        let (output_paths, output_bytes) = if request.create_one_image {
            let mut scaled: Vec<Page> = stream::iter(pages.into_iter().map(|page| {
                let callback = callback.clone();
                async move {
                    let number = page.number();
                    notify_page_start(&callback, number, total);
                    let result = blocking("scale", move || {
                        Ok(Page {
                            index: page.index,
                            bitmap: scale(page.bitmap, &spec)?,
                        })
                    })
                    .await;
                    match &result {
                        Ok(_) => notify_complete(&callback, number, total, 0),
                        Err(e) => notify_error(&callback, number, total, e),
                    }
                    result
                }
            }))
            .buffer_unordered(self.config.concurrency)
            .try_collect()
            .await?;
            scaled.sort_by_key(|page| page.index);

            let width = scaled.iter().map(|p| p.bitmap.width() as u64).max().unwrap_or(0);
            let height: u64 = scaled.iter().map(|p| p.bitmap.height() as u64).sum();
            format.check_fits(width, height)?;

            let bytes = blocking("stitch", move || {
                let bitmaps: Vec<_> = scaled.into_iter().map(|page| page.bitmap).collect();
                let stitched = stitch::stitch(bitmaps.as_slice())?;
                info!(
                    "Stitched {} pages into {}x{}",
                    bitmaps.len(),
                    stitched.width(),
                    stitched.height()
                );
                encode_bitmap(&stitched, format, level, 1)
            })
            .await?;
            write_file(&request.output_path, &bytes).await?;
            (vec![request.output_path.clone()], bytes.len() as u64)
        } else {
            let dir = request.output_path.clone();
            let mut written: Vec<(usize, PathBuf, usize)> =
                stream::iter(pages.into_iter().map(|page| {
                    let callback = callback.clone();
                    let path = dir.join(page_file_name(page.number(), format));
                    async move {
                        let number = page.number();
                        notify_page_start(&callback, number, total);
                        let result = encode_page_to_file(page, spec, format, level, path).await;
                        match &result {
                            Ok((_, _, bytes)) => notify_complete(&callback, number, total, *bytes),
                            Err(e) => notify_error(&callback, number, total, e),
                        }
                        result
                    }
                }))
                .buffer_unordered(self.config.concurrency)
                .try_collect()
                .await?;
            written.sort_by_key(|(index, _, _)| *index);

            let bytes: u64 = written.iter().map(|(_, _, b)| *b as u64).sum();
            (written.into_iter().map(|(_, path, _)| path).collect(), bytes)
        };

        let output_files = output_paths.len();
        self.finish(
            output_paths,
            ConversionStats {
                input_files: 1,
                pages: total,
                output_files,
                output_bytes,
                engine_duration_ms,
                ..Default::default()
            },
            start,
        )
        .await
    }

    /// Open `path` and render every page on a blocking thread.
    ///
    /// Documents the engine can share across threads are rendered on up to
    /// `concurrency` threads instead.
    async fn rasterise(&self, path: &Path) -> Result<Vec<Page>, CombinerError> {
        let provider = Arc::clone(&self.provider);
        let source = path.to_path_buf();
        let dpi_scale = self.config.dpi_scale();
        let workers = self.config.concurrency;
        let callback = self.config.progress_callback.clone();

        blocking("render", move || {
            let engine = provider.engine()?;
            #[cfg(feature = "parallel")]
            if let Some(document) = engine.open_shared(&source)? {
                let rasterizer = PageRasterizer::new(&*document, dpi_scale);
                return render_all(&source, &callback, rasterizer.page_count(), || {
                    rasterizer.collect_parallel(workers)
                });
            }
            #[cfg(not(feature = "parallel"))]
            let _ = workers;

            let document = engine.open(&source)?;
            let rasterizer = PageRasterizer::new(&*document, dpi_scale);
            render_all(&source, &callback, rasterizer.page_count(), || rasterizer.collect())
        })
        .await
    }

    /// Fill in the totals, fire the completion event and log.
    async fn finish(
        &self,
        output_paths: Vec<PathBuf>,
        mut stats: ConversionStats,
        start: Instant,
    ) -> Result<ConversionOutput, CombinerError> {
        stats.output_files = output_paths.len();
        if stats.output_bytes == 0 {
            for path in &output_paths {
                if let Ok(meta) = tokio::fs::metadata(path).await {
                    stats.output_bytes += meta.len();
                }
            }
        }
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(stats.pages, stats.output_files);
        }
        info!(
            "Done: {} pages → {} files ({} bytes) in {}ms",
            stats.pages, stats.output_files, stats.output_bytes, stats.total_duration_ms
        );

        Ok(ConversionOutput {
            output_paths,
            stats,
        })
    }
}

fn render_all(
    source: &Path,
    callback: &Option<ProgressCallback>,
    total: usize,
    render: impl FnOnce() -> Result<Vec<Page>, CombinerError>,
) -> Result<Vec<Page>, CombinerError> {
    if total == 0 {
        return Err(CombinerError::EmptyInput {
            what: format!("{} has no pages", source.display()),
        });
    }
    render().inspect_err(|e| {
        if let CombinerError::RasterisationFailed { page, .. } = e {
            notify_error(callback, *page, total, e);
        }
    })
}

/// `image_{n}.{ext}` with a 1-based page number.
pub fn page_file_name(number: usize, format: ImageFormat) -> String {
    format!("image_{}.{}", number, format.extension())
}

async fn encode_page_to_file(
    page: Page,
    spec: ScaleSpec,
    format: ImageFormat,
    level: CompressionLevel,
    path: PathBuf,
) -> Result<(usize, PathBuf, usize), CombinerError> {
    let index = page.index;
    let number = page.number();
    let bytes = blocking("encode", move || {
        let bitmap = scale(page.bitmap, &spec)?;
        encode_bitmap(&bitmap, format, level, number)
    })
    .await?;
    write_file(&path, &bytes).await?;
    Ok((index, path, bytes.len()))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CombinerError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| CombinerError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

async fn ensure_parent_dir(path: &Path) -> Result<(), CombinerError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CombinerError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        _ => Ok(()),
    }
}

/// Run `task` on the blocking pool, turning a panic into `Internal`.
async fn blocking<T, F>(stage: &'static str, task: F) -> Result<T, CombinerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CombinerError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CombinerError::Internal(format!("{} task panicked: {}", stage, e)))?
}

fn notify_start(callback: &Option<ProgressCallback>, total: usize) {
    if let Some(cb) = callback {
        cb.on_conversion_start(total);
    }
}

fn notify_page_start(callback: &Option<ProgressCallback>, page: usize, total: usize) {
    if let Some(cb) = callback {
        cb.on_page_start(page, total);
    }
}

fn notify_complete(callback: &Option<ProgressCallback>, page: usize, total: usize, bytes: usize) {
    if let Some(cb) = callback {
        cb.on_page_complete(page, total, bytes);
    }
}

fn notify_error(callback: &Option<ProgressCallback>, page: usize, total: usize, error: &CombinerError) {
    if let Some(cb) = callback {
        cb.on_page_error(page, total, &error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_one_based() {
        assert_eq!(page_file_name(1, ImageFormat::Png), "image_1.png");
        assert_eq!(page_file_name(12, ImageFormat::Jpeg), "image_12.jpg");
    }

    #[tokio::test]
    async fn parent_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/out.pdf");
        ensure_parent_dir(&out).await.unwrap();
        assert!(out.parent().unwrap().is_dir());
        ensure_parent_dir(Path::new("bare.pdf")).await.unwrap();
    }

    #[tokio::test]
    async fn blocking_panic_becomes_internal() {
        let err = blocking::<(), _>("test", || panic!("boom")).await.unwrap_err();
        assert!(matches!(err, CombinerError::Internal(_)));
    }

    #[tokio::test]
    async fn merge_without_inputs_is_empty() {
        let combiner = Combiner::new(ConversionConfig::default());
        let err = combiner
            .merge_pdfs(&[], Path::new("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CombinerError::EmptyInput { .. }));
    }
}
