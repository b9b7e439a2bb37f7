//! Error types for the pdf-combiner library.
//!
//! Every operation fails with a single [`CombinerError`]. The variants are
//! concrete (which file, which page, what went wrong) so log lines and CLI
//! output stay actionable, while [`CombinerError::kind`] collapses them onto
//! the six-way [`ErrorKind`] taxonomy a host bridge reports to its caller.
//!
//! A failed operation never leaves a partial result behind in the returned
//! value, but files already written before the failure are not removed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-combiner library.
#[derive(Debug, Error)]
pub enum CombinerError {
    // ── Argument errors ───────────────────────────────────────────────────
    /// A boundary parameter was missing, ill-typed or out of range.
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A resize request resolved to a zero-sized target.
    #[error("Invalid scale: {detail}")]
    InvalidScaleSpec { detail: String },

    /// Nothing to work on: no input paths, or a document without pages.
    #[error("Empty input: {what}")]
    EmptyInput { what: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but is not a PDF, or pdfium could not parse it.
    #[error("PDF '{path}' cannot be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The file was read but could not be decoded as an image.
    #[error("Image '{path}' cannot be decoded: {detail}")]
    UndecodableImage { path: PathBuf, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The PDF engine failed to rasterise a page (1-based page number).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A bitmap could not be encoded to the requested format.
    #[error("Encoding page {page} failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// A raw pixel buffer did not describe a valid bitmap.
    #[error("Invalid bitmap: {detail}")]
    InvalidBitmap { detail: String },

    /// Appending a page (image or PDF) to the output document failed.
    #[error("Could not append page to output document: {detail}")]
    PageAppendFailed { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF engine could not serialise the output document.
    #[error("Failed to save PDF '{path}': {detail}")]
    PdfSaveFailed { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory containing it),\n\
or install libpdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a worker task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CombinerError {
    /// Shorthand for [`CombinerError::InvalidArgument`].
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArguments,
            Self::InvalidScaleSpec { .. } => ErrorKind::InvalidScaleSpec,
            Self::EmptyInput { .. } => ErrorKind::EmptyInput,
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::CorruptPdf { .. }
            | Self::UndecodableImage { .. } => ErrorKind::CannotReadFile,
            Self::OutputWriteFailed { .. } | Self::PdfSaveFailed { .. } => {
                ErrorKind::CannotWriteFile
            }
            Self::RasterisationFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::InvalidBitmap { .. }
            | Self::PageAppendFailed { .. }
            | Self::PdfiumBindingFailed(_)
            | Self::Internal(_) => ErrorKind::GenerationFailed,
        }
    }
}

/// Coarse error classification reported across the bridge boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or ill-typed parameters; raised before any I/O.
    InvalidArguments,
    /// Source path unreadable or undecodable.
    CannotReadFile,
    /// Destination unwritable.
    CannotWriteFile,
    /// A computed target dimension was zero.
    InvalidScaleSpec,
    /// Zero pages or zero inputs.
    EmptyInput,
    /// Encode, render or page-append failed on an otherwise valid request.
    GenerationFailed,
}

impl ErrorKind {
    /// Stable error code sent to the host application.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorKind::CannotReadFile => "CANNOT_READ_FILE",
            ErrorKind::CannotWriteFile => "CANNOT_WRITE_FILE",
            ErrorKind::InvalidScaleSpec => "INVALID_SCALE_SPEC",
            ErrorKind::EmptyInput => "EMPTY_INPUT",
            ErrorKind::GenerationFailed => "GENERATION_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
