//! Error types for the markpdfdown library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MarkPdfDownError`] is **fatal**: the conversion cannot proceed at all
//!   (empty input, unsupported file type, corrupt PDF, no images produced).
//!   Returned as `Err(MarkPdfDownError)` from the top-level `convert*`
//!   functions, and from [`crate::pipeline::llm::CompletionClient`] when it is
//!   used on its own.
//!
//! * [`PageError`] is **non-fatal**: a single page's transcription failed
//!   after every retry. The orchestrator records it inside
//!   [`crate::output::PageResult`] and contributes an empty fragment for that
//!   page instead of aborting the document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the markpdfdown library.
#[derive(Debug, Error)]
pub enum MarkPdfDownError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Zero-length input buffer or stream.
    #[error("No input data provided")]
    EmptyInput,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Neither the filename hint nor the byte signature names a supported type.
    #[error("Unsupported file type: {detail}")]
    UnsupportedType { detail: String },

    /// The document could not be opened or parsed.
    #[error("Invalid document '{path}': {detail}")]
    InvalidDocument { path: PathBuf, detail: String },

    /// The requested page range fails validation.
    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Rasterisation produced no images.
    #[error("Failed to convert file to images: {detail}")]
    RasterizationFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// A local image could not be read while preparing a completion request.
    #[error("Failed to encode image '{path}': {source}")]
    ImageEncoding {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The completion provider call failed (transport, HTTP status, bad body).
    #[error("LLM completion failed: {0}")]
    Completion(String),

    /// The provider answered but returned zero choices.
    #[error("No response from API: completion returned no choices")]
    NoResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarkPdfDownError {
    /// Whether another attempt at the same provider call could succeed.
    ///
    /// Only provider-side failures qualify; everything else is a property of
    /// the local input or configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Completion(_) | Self::NoResponse)
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page's transcription
/// was replaced by an empty fragment.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// LLM call failed after retries.
    #[error("Page {page}: LLM call failed after {attempts} attempts: {detail}")]
    LlmFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The page image could not be read for encoding.
    #[error("Page {page}: image could not be encoded: {detail}")]
    EncodeFailed { page: usize, detail: String },
}
