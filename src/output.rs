//! Result types returned by the conversion entry points.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The outcome of transcribing one page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Image that was sent to the model.
    pub image_path: PathBuf,
    /// Post-processed fragment; empty when `error` is set.
    pub markdown: String,
    /// Wall-clock time spent on this page, including retries.
    pub duration_ms: u64,
    /// Why the fragment is empty, if it failed.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the input document.
    pub total_pages: usize,
    /// Pages handed to the model (the selected range).
    pub selected_pages: usize,
    /// Pages that produced a fragment.
    pub processed_pages: usize,
    /// Pages that fell back to an empty fragment.
    pub failed_pages: usize,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Fragments in page order, each followed by a blank line.
    pub markdown: String,
    /// One entry per page image, in page order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}
