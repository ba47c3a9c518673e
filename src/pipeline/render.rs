//! pdfium primitives: bind, open, extract a page range, rasterise pages.
//!
//! Everything here is blocking. The `pdfium-render` crate wraps the pdfium
//! C++ library, which is CPU-bound and not async-aware; callers run these
//! functions inside `tokio::task::spawn_blocking`.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would be a
//! 9,900 × 14,000 px image. `max_pixels` caps the longest edge regardless of
//! physical size, keeping memory bounded and uploads within what vision
//! models accept.

use crate::config::{Config, RasterFormat};
use crate::error::MarkPdfDownError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How pages are rasterised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub dpi: u32,
    pub max_pixels: u32,
    pub format: RasterFormat,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_pixels: 4000,
            format: RasterFormat::Png,
        }
    }
}

impl From<&Config> for RasterOptions {
    fn from(config: &Config) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            format: config.image_format,
        }
    }
}

/// Bind to a pdfium shared library.
///
/// Search order: `PDFIUM_LIB_PATH` (file or directory), the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, MarkPdfDownError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(|p| {
            let path = PathBuf::from(p);
            if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            }
        });

    let bindings = match from_env {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| MarkPdfDownError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF; any pdfium failure means the document is unusable.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
) -> Result<PdfDocument<'a>, MarkPdfDownError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| MarkPdfDownError::InvalidDocument {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

/// Write pages `start..=end` (1-indexed) of `source` to a new PDF at `dest`.
pub fn extract_page_range(
    pdfium: &Pdfium,
    source: &PdfDocument,
    start: usize,
    end: usize,
    dest: &Path,
) -> Result<(), MarkPdfDownError> {
    let internal = |what: &str, e: PdfiumError| {
        MarkPdfDownError::Internal(format!("extract pages {start}-{end}: {what}: {e:?}"))
    };

    let mut target = pdfium
        .create_new_pdf()
        .map_err(|e| internal("create", e))?;
    let first = (start - 1) as PdfPageIndex;
    let last = (end - 1) as PdfPageIndex;
    target
        .pages_mut()
        .copy_page_range_from_document(source, first..=last, 0)
        .map_err(|e| internal("copy", e))?;
    target.save_to_file(dest).map_err(|e| internal("save", e))?;

    debug!("Extracted pages {}-{} → {}", start, end, dest.display());
    Ok(())
}

/// File name for a rendered page, zero-padded so that lexicographic order
/// equals page order for every page up to `last_page`.
pub fn page_image_name(page: usize, last_page: usize, format: RasterFormat) -> String {
    let width = last_page.to_string().len().max(4);
    format!("page_{page:0width$}.{}", format.extension())
}

/// Render pages `start..=end` (1-indexed) into `output_dir`.
///
/// All-or-nothing: the first page that fails aborts the call and no paths
/// are returned.
pub fn render_page_range(
    document: &PdfDocument,
    start: usize,
    end: usize,
    opts: &RasterOptions,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, MarkPdfDownError> {
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.dpi as f32 / 72.0)
        .set_maximum_width(opts.max_pixels as i32)
        .set_maximum_height(opts.max_pixels as i32);

    let pages = document.pages();
    let mut paths = Vec::with_capacity(end + 1 - start);

    for page_num in start..=end {
        let failed = |detail: String| MarkPdfDownError::RasterizationFailed {
            detail: format!("page {page_num}: {detail}"),
        };

        let page = pages
            .get((page_num - 1) as PdfPageIndex)
            .map_err(|e| failed(format!("{e:?}")))?;
        let image = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{e:?}")))?
            .as_image();

        let path = output_dir.join(page_image_name(page_num, end, opts.format));
        save_image(&image, &path, opts.format).map_err(|e| failed(e.to_string()))?;

        debug!(
            "Rendered page {} → {}x{} px ({})",
            page_num,
            image.width(),
            image.height(),
            path.display()
        );
        paths.push(path);
    }

    info!("Rendered {} pages at {} DPI", paths.len(), opts.dpi);
    Ok(paths)
}

fn save_image(
    image: &DynamicImage,
    path: &Path,
    format: RasterFormat,
) -> Result<(), image::ImageError> {
    match format {
        RasterFormat::Png => image.save_with_format(path, format.image_format()),
        // JPEG has no alpha channel.
        RasterFormat::Jpeg => {
            DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format.image_format())
        }
    }
}
