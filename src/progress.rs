//! Per-page progress events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] through
//! [`crate::config::ConfigBuilder::progress_callback`] to observe a run as it
//! moves through the transcription loop. All methods default to no-ops.

use std::sync::Arc;

/// Receives events from the orchestrator's transcription loop.
///
/// With `concurrency > 1` page events can arrive from several tasks at once,
/// so implementations must synchronise their own state.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after rasterisation, with the number of page images.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before the completion request for a page is sent.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page produced a fragment.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// Called when a page's transcription failed and an empty fragment was used.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Callback that ignores every event.
#[derive(Debug, Default)]
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared handle stored in [`crate::config::Config`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
