//! # pdf-combiner
//!
//! Merge PDFs, build a PDF from images, and rasterise PDF pages to images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render   rasterise every page via pdfium (spawn_blocking), white background
//!  ├─ 2. Scale    optional resize: exact, max-box, width-only
//!  ├─ 3. Stitch   optional: stack pages into one tall image
//!  └─ 4. Encode   PNG / JPEG with a 0–100 compression level, written to disk
//!
//! images ──▶ decode (EXIF-aware) ──▶ scale ──▶ one PDF page per image
//! PDFs   ──▶ append every page, in order ──▶ one merged PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_combiner::{Combiner, CompressionLevel, ConversionConfig, PdfToImagesRequest, ScaleSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let combiner = Combiner::new(ConversionConfig::default());
//!     let output = combiner
//!         .create_images_from_pdf(&PdfToImagesRequest {
//!             path: "document.pdf".into(),
//!             output_path: "pages/".into(),
//!             scale: ScaleSpec::from_dimensions(480, 640, true)?,
//!             compression: CompressionLevel::MEDIUM,
//!             create_one_image: false,
//!         })
//!         .await?;
//!     for path in &output.output_paths {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Host applications that speak in method names and argument maps go through
//! [`Bridge`] instead, which never returns a Rust error: every failure becomes
//! a structured reply with a stable code.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-combiner` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-combiner = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bitmap;
pub mod bridge;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bitmap::{Bitmap, PixelLayout};
pub use bridge::{Bridge, BridgeReply, MethodCall};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{Combiner, ImagesToPdfRequest, PdfToImagesRequest};
pub use error::{CombinerError, ErrorKind};
pub use output::{ConversionOutput, ConversionResult, ConversionStats};
pub use pipeline::document::{Document, DocumentWriter, EngineProvider, PageSize, PdfEngine};
pub use pipeline::encode::{CompressionLevel, ImageFormat};
pub use pipeline::pdfium::PdfiumProvider;
pub use pipeline::render::{Page, PageRasterizer};
pub use pipeline::scale::ScaleSpec;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
