//! Configuration types for the combiner.
//!
//! Operation-wide knobs live in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. Per-call parameters (paths, scale, compression)
//! travel with each request instead; see [`crate::convert`].

use crate::error::CombinerError;
use crate::pipeline::encode::ImageFormat;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Configuration shared by every operation of a [`crate::Combiner`].
///
/// # Example
/// ```rust
/// use pdf_combiner::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .render_dpi(150)
///     .concurrency(8)
///     .image_format(ImageFormat::Jpeg)
///     .build()
///     .unwrap();
/// assert_eq!(config.render_dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rasterisation DPI for PDF pages. Range: 72–600. Default: 200.
    ///
    /// A Letter page at 200 DPI is 1700 × 2200 px.
    pub render_dpi: u32,

    /// Maximum pages scaled and encoded at once. Default: 4.
    pub concurrency: usize,

    /// Container written by PDF → image conversion. Default: PNG.
    pub image_format: ImageFormat,

    /// libpdfium file or the directory containing it.
    /// If None, looks in the working directory, then asks the system loader.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            render_dpi: 200,
            concurrency: 4,
            image_format: ImageFormat::default(),
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("render_dpi", &self.render_dpi)
            .field("concurrency", &self.concurrency)
            .field("image_format", &self.image_format)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Pixels per PDF point.
    pub fn dpi_scale(&self) -> f32 {
        self.render_dpi as f32 / 72.0
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, CombinerError> {
        let c = &self.config;
        if c.render_dpi < 72 || c.render_dpi > 600 {
            return Err(CombinerError::invalid_argument(
                "render_dpi",
                format!("must be 72–600, got {}", c.render_dpi),
            ));
        }
        if c.concurrency == 0 {
            return Err(CombinerError::invalid_argument(
                "concurrency",
                "must be ≥ 1",
            ));
        }
        Ok(self.config)
    }
}
