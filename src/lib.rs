//! # markpdfdown
//!
//! Convert PDF documents and page images to Markdown with vision-capable LLMs.
//!
//! ## Why this crate?
//!
//! Text extractors (pdftotext, pdf-extract) lose multi-column layouts,
//! formulas and tables, and get nothing at all out of scanned pages. This
//! crate rasterises each page and asks a vision model to read it the way a
//! person would, so structure survives.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes (PDF / PNG / JPEG / BMP / GIF)
//!  │
//!  ├─ 1. Detect     filename extension, else magic bytes
//!  ├─ 2. Worker     validate the page range; extract it from the PDF
//!  ├─ 3. Render     rasterise pages via pdfium (spawn_blocking)
//!  ├─ 4. Transcribe one completion call per page, with retries
//!  ├─ 5. Polish     strip a stray ```markdown wrapper
//!  └─ 6. Assemble   fragments in page order, blank line after each
//! ```
//!
//! A page whose transcription fails contributes an empty fragment; every
//! other failure aborts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use markpdfdown::{convert_from_file, Config, ConvertOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OPENAI_API_KEY, MODEL_NAME, TEMPERATURE, … from the environment
//!     let config = Config::from_env()?;
//!     let opts = ConvertOptions::default().pages(1, 3);
//!     let output = convert_from_file("document.pdf", &opts, &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} of {} pages failed", output.stats.failed_pages, output.stats.selected_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `markpdfdown` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! markpdfdown = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Config, ConfigBuilder, RasterFormat};
pub use convert::{
    convert_document, convert_from_file, convert_from_reader, convert_to_file,
    convert_to_markdown, write_atomic, ConvertOptions,
};
pub use error::{MarkPdfDownError, PageError};
pub use output::{ConversionOutput, ConversionStats, PageResult};
pub use pipeline::detect::{detect_file_type, FileType};
pub use pipeline::llm::{CompletionClient, CompletionRequest};
pub use pipeline::pages::validate_page_range;
pub use pipeline::postprocess::remove_markdown_wrap;
pub use pipeline::provider::{
    ChatRequest, ChatResponse, CompletionProvider, EdgequakeProvider, OpenAiCompatibleProvider,
};
pub use pipeline::worker::{create_worker, DocumentWorker};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
