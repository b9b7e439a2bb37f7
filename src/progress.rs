//! Progress-callback trait for per-page events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as an operation works through its pages (or images).
//!
//! # Example
//!
//! ```rust
//! use pdf_combiner::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, output_bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, output_bytes);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each page.
///
/// Implementations must be `Send + Sync`: pages are encoded concurrently, so
/// `on_page_start`, `on_page_complete` and `on_page_error` may arrive from
/// different threads and out of page order. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is processed.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// `page_num` is 1-indexed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is finished.
    ///
    /// `output_bytes` is the encoded size for image output, or 0 when the
    /// page went into a PDF or a stitched image.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, output_bytes: usize) {
        let _ = (page_num, total_pages, output_bytes);
    }

    /// Called when a page fails. The operation aborts afterwards.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after a successful operation.
    fn on_conversion_complete(&self, total_pages: usize, output_count: usize) {
        let _ = (total_pages, output_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
