//! Document workers: one per input kind, same three capabilities.
//!
//! [`DocumentWorker`] is a tagged variant over [`PdfWorker`] and
//! [`ImageWorker`]; [`create_worker`] picks the variant from the file
//! extension. All methods block (pdfium, filesystem) and belong inside
//! `spawn_blocking`.

use crate::error::MarkPdfDownError;
use crate::pipeline::detect::FileType;
use crate::pipeline::pages::validate_page_range;
use crate::pipeline::render::{
    bind_pdfium, extract_page_range, open_document, render_page_range, RasterOptions,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A paged PDF with a validated page range.
///
/// pdfium documents borrow their library handle, so the worker keeps only the
/// path and reopens the file for each operation.
#[derive(Debug, Clone)]
pub struct PdfWorker {
    path: PathBuf,
    output_dir: PathBuf,
    total_pages: usize,
    start: usize,
    end: usize,
}

impl PdfWorker {
    /// Open `path`, count its pages and validate `start..=end` against them.
    pub fn new(
        path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        start: usize,
        end: usize,
    ) -> Result<Self, MarkPdfDownError> {
        let path = path.into();
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path)?;
        let total_pages = document.pages().len() as usize;
        if total_pages == 0 {
            return Err(MarkPdfDownError::InvalidDocument {
                path,
                detail: "document has no pages".into(),
            });
        }
        let (start, end) = validate_page_range(start, end, total_pages)?;
        debug!(
            "{}: {} pages, selected {}-{}",
            path.display(),
            total_pages,
            start,
            end
        );

        Ok(Self {
            path,
            output_dir: output_dir.into(),
            total_pages,
            start,
            end,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        total_pages: usize,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            path: path.into(),
            output_dir: output_dir.into(),
            total_pages,
            start,
            end,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn page_range(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the selected pages to `pages_SSSS-EEEE.pdf` in the output
    /// directory and return its path.
    ///
    /// Callers fall back to [`PdfWorker::path`] on `Err`.
    pub fn extract(&self) -> Result<PathBuf, MarkPdfDownError> {
        let dest = self
            .output_dir
            .join(format!("pages_{:04}-{:04}.pdf", self.start, self.end));
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &self.path)?;
        extract_page_range(&pdfium, &document, self.start, self.end, &dest)?;
        Ok(dest)
    }

    /// Render the selected pages into the output directory, in page order.
    pub fn rasterize(&self, opts: &RasterOptions) -> Result<Vec<PathBuf>, MarkPdfDownError> {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &self.path)?;
        render_page_range(&document, self.start, self.end, opts, &self.output_dir)
    }
}

/// A single raster image: one page, no extraction, no re-encoding.
#[derive(Debug, Clone)]
pub struct ImageWorker {
    path: PathBuf,
}

impl ImageWorker {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, MarkPdfDownError> {
        let path = path.into();
        if !path.is_file() {
            return Err(MarkPdfDownError::InvalidDocument {
                path,
                detail: "image file does not exist".into(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A worker for one input document.
#[derive(Debug, Clone)]
pub enum DocumentWorker {
    Pdf(PdfWorker),
    Image(ImageWorker),
}

impl DocumentWorker {
    pub fn total_pages(&self) -> usize {
        match self {
            DocumentWorker::Pdf(w) => w.total_pages(),
            DocumentWorker::Image(_) => 1,
        }
    }

    /// The validated `(start, end)` this worker will process.
    pub fn page_range(&self) -> (usize, usize) {
        match self {
            DocumentWorker::Pdf(w) => w.page_range(),
            DocumentWorker::Image(_) => (1, 1),
        }
    }

    pub fn input_path(&self) -> &Path {
        match self {
            DocumentWorker::Pdf(w) => w.path(),
            DocumentWorker::Image(w) => w.path(),
        }
    }

    /// Narrow the document to the selected range. Images return their own path.
    pub fn extract(&self) -> Result<PathBuf, MarkPdfDownError> {
        match self {
            DocumentWorker::Pdf(w) => w.extract(),
            DocumentWorker::Image(w) => Ok(w.path().to_path_buf()),
        }
    }

    /// Page images in page order. Images return their own path unchanged.
    pub fn rasterize(&self, opts: &RasterOptions) -> Result<Vec<PathBuf>, MarkPdfDownError> {
        match self {
            DocumentWorker::Pdf(w) => w.rasterize(opts),
            DocumentWorker::Image(w) => Ok(vec![w.path().to_path_buf()]),
        }
    }
}

/// Build the worker for `path`, chosen by extension (case-insensitive).
///
/// Image inputs ignore the page range: they always have exactly one page.
pub fn create_worker(
    path: &Path,
    output_dir: &Path,
    start: usize,
    end: usize,
) -> Result<DocumentWorker, MarkPdfDownError> {
    match FileType::from_path(path) {
        Some(FileType::Pdf) => Ok(DocumentWorker::Pdf(PdfWorker::new(
            path, output_dir, start, end,
        )?)),
        Some(_) => Ok(DocumentWorker::Image(ImageWorker::new(path)?)),
        None => Err(MarkPdfDownError::UnsupportedType {
            detail: match path.extension() {
                Some(ext) => format!(".{}", ext.to_string_lossy()),
                None => format!("'{}' has no extension", path.display()),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn image_worker_is_a_single_page_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "scan.png");
        let worker = create_worker(&path, dir.path(), 1, 0).unwrap();

        assert!(matches!(worker, DocumentWorker::Image(_)));
        assert_eq!(worker.total_pages(), 1);
        assert_eq!(worker.extract().unwrap(), path);
        assert_eq!(worker.rasterize(&RasterOptions::default()).unwrap(), vec![path]);
    }

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.PNG", "b.Jpg", "c.jpeg", "d.bmp", "e.GIF"] {
            let path = touch(dir.path(), name);
            let worker = create_worker(&path, dir.path(), 1, 0).unwrap();
            assert!(matches!(worker, DocumentWorker::Image(_)), "{name}");
        }
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let err = create_worker(&path, dir.path(), 1, 0).unwrap_err();
        assert!(matches!(err, MarkPdfDownError::UnsupportedType { .. }), "got: {err}");
        assert!(err.to_string().contains(".txt"));
    }

    #[test]
    fn missing_image_is_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_worker(&dir.path().join("gone.png"), dir.path(), 1, 0).unwrap_err();
        assert!(matches!(err, MarkPdfDownError::InvalidDocument { .. }));
    }

    #[test]
    fn corrupt_pdf_is_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();
        match create_worker(&path, dir.path(), 1, 0) {
            Err(MarkPdfDownError::PdfiumBindingFailed(_)) => {
                eprintln!("SKIP: pdfium not available");
            }
            Err(MarkPdfDownError::InvalidDocument { .. }) => {}
            other => panic!("expected InvalidDocument, got {other:?}"),
        }
    }
}
