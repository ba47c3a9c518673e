//! Page-range normalisation.
//!
//! Ranges are 1-indexed and inclusive. `end == 0` means "through the last
//! page"; an `end` past the document is clamped rather than rejected.

use crate::error::MarkPdfDownError;

/// Validate `(start, end)` against a document with `total` pages.
///
/// Returns the normalised range, guaranteed to satisfy
/// `1 <= start <= end <= total`.
pub fn validate_page_range(
    start: usize,
    end: usize,
    total: usize,
) -> Result<(usize, usize), MarkPdfDownError> {
    if start < 1 {
        return Err(MarkPdfDownError::InvalidRange(format!(
            "Start page must be >= 1, got {start}"
        )));
    }
    if start > total {
        return Err(MarkPdfDownError::InvalidRange(format!(
            "Start page {start} exceeds total pages ({total})"
        )));
    }

    let end = if end == 0 || end > total { total } else { end };

    if end < start {
        return Err(MarkPdfDownError::InvalidRange(format!(
            "End page {end} must be >= start page {start}"
        )));
    }
    Ok((start, end))
}

/// Whether `(start, end)` covers fewer pages than the whole document.
pub fn is_partial_range(start: usize, end: usize, total: usize) -> bool {
    start != 1 || end != total
}
