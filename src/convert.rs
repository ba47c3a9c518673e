//! Conversion entry points and the orchestrator behind them.
//!
//! One run moves through fixed stages:
//!
//! ```text
//! bytes ─▶ type detected ─▶ worker built ─▶ [extracted] ─▶ rasterised
//!       ─▶ per-page transcribe* ─▶ assembled ─▶ [cleaned up]
//! ```
//!
//! Fatal failures abort the run and return `Err`. Two steps degrade instead:
//! a failed extraction falls back to the unextracted input, and a page whose
//! transcription fails contributes an empty fragment (recorded as a
//! [`PageError`]) so the rest of the document still comes back.

use crate::config::Config;
use crate::error::{MarkPdfDownError, PageError};
use crate::output::{ConversionOutput, ConversionStats, PageResult};
use crate::pipeline::detect::{detect_file_type, FileType};
use crate::pipeline::llm::{CompletionClient, CompletionRequest};
use crate::pipeline::pages::is_partial_range;
use crate::pipeline::postprocess::clean_fragment;
use crate::pipeline::retry::RetryError;
use crate::pipeline::render::RasterOptions;
use crate::pipeline::worker::{create_worker, DocumentWorker};
use crate::progress::ProgressCallback;
use crate::prompts::IMAGE_TO_MARKDOWN_PROMPT;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, warn};

/// Per-run options that are not part of the long-lived [`Config`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// First page, 1-indexed.
    pub start_page: usize,
    /// Last page, inclusive; `0` means the last page of the document.
    pub end_page: usize,
    /// Original file name. Its extension wins over signature sniffing.
    pub input_filename: Option<String>,
    /// Parent of this run's working directory (the system temp dir when
    /// `None`). Each run creates its own `markpdfdown-*` directory inside it.
    pub output_dir: Option<PathBuf>,
    /// Remove the run's working directory when the run finishes. An
    /// interrupted run (its future dropped) always removes it.
    pub cleanup: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            start_page: 1,
            end_page: 0,
            input_filename: None,
            output_dir: None,
            cleanup: true,
        }
    }
}

impl ConvertOptions {
    pub fn pages(mut self, start: usize, end: usize) -> Self {
        self.start_page = start;
        self.end_page = end;
        self
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.input_filename = Some(name.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// Convert document bytes to Markdown, returning per-page detail.
///
/// # Errors
/// Only fatal failures: empty input, unsupported type, unreadable document,
/// bad page range, no page images, or a configuration that cannot reach a
/// provider. Per-page completion failures are reported in
/// [`ConversionOutput::pages`] instead.
///
/// # Example
/// ```rust,no_run
/// use markpdfdown::{convert_document, Config, ConvertOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("paper.pdf")?;
/// let config = Config::from_env()?;
/// let opts = ConvertOptions::default().pages(2, 4).filename("paper.pdf");
/// let out = convert_document(&bytes, &opts, &config).await?;
/// println!("{}", out.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert_document(
    input: &[u8],
    opts: &ConvertOptions,
    config: &Config,
) -> Result<ConversionOutput, MarkPdfDownError> {
    if input.is_empty() {
        return Err(MarkPdfDownError::EmptyInput);
    }
    let file_type = resolve_file_type(input, opts.input_filename.as_deref())?;
    let client = CompletionClient::from_config(config)?;

    let work_dir = prepare_work_dir(opts.output_dir.as_deref())?;
    let result = run(input, file_type, opts, config, &client, work_dir.path()).await;

    if opts.cleanup {
        cleanup_work_dir(work_dir);
    } else {
        info!("Keeping working directory {}", work_dir.keep().display());
    }
    result
}

/// Convert document bytes and return only the assembled Markdown.
pub async fn convert_to_markdown(
    input: &[u8],
    opts: &ConvertOptions,
    config: &Config,
) -> Result<String, MarkPdfDownError> {
    Ok(convert_document(input, opts, config).await?.markdown)
}

/// Convert a file on disk. Its file name is used as the type hint.
pub async fn convert_from_file(
    path: impl AsRef<Path>,
    opts: &ConvertOptions,
    config: &Config,
) -> Result<ConversionOutput, MarkPdfDownError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MarkPdfDownError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => MarkPdfDownError::InvalidDocument {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let mut opts = opts.clone();
    if opts.input_filename.is_none() {
        opts.input_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
    }
    convert_document(&bytes, &opts, config).await
}

/// Convert everything readable from `reader` (stdin in the CLI).
///
/// No file name is available, so the type comes from the byte signature
/// unless `opts.input_filename` is set.
pub async fn convert_from_reader<R>(
    mut reader: R,
    opts: &ConvertOptions,
    config: &Config,
) -> Result<ConversionOutput, MarkPdfDownError>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| MarkPdfDownError::Internal(format!("read input: {e}")))?;
    if bytes.is_empty() {
        return Err(MarkPdfDownError::EmptyInput);
    }
    convert_document(&bytes, opts, config).await
}

/// Convert a file and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial file behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    opts: &ConvertOptions,
    config: &Config,
) -> Result<ConversionStats, MarkPdfDownError> {
    let output = convert_from_file(input_path, opts, config).await?;
    write_atomic(output_path.as_ref(), &output.markdown).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), MarkPdfDownError> {
    let write_err = |source| MarkPdfDownError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Filename extension first, then magic bytes.
///
/// A name with an extension decides the type on its own; an unknown
/// extension is unsupported even if the bytes look like a known format.
fn resolve_file_type(
    input: &[u8],
    filename: Option<&str>,
) -> Result<FileType, MarkPdfDownError> {
    if let Some(name) = filename {
        if let Some(ext) = Path::new(name).extension() {
            return FileType::from_extension(&ext.to_string_lossy()).ok_or_else(|| {
                MarkPdfDownError::UnsupportedType {
                    detail: format!(".{}", ext.to_string_lossy()),
                }
            });
        }
        debug!("Filename '{}' has no extension; sniffing bytes", name);
    }
    detect_file_type(input).ok_or_else(|| MarkPdfDownError::UnsupportedType {
        detail: match filename {
            Some(name) => format!("cannot determine the type of '{name}'"),
            None => "unrecognised file signature".into(),
        },
    })
}

/// A fresh `markpdfdown-*` directory, inside `parent` when one is given.
///
/// Only this directory is ever removed; `parent` and anything already in it
/// are left alone. Dropping the guard removes the directory.
fn prepare_work_dir(parent: Option<&Path>) -> Result<TempDir, MarkPdfDownError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("markpdfdown-");
    let dir = match parent {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|e| {
                MarkPdfDownError::Internal(format!("create {}: {e}", parent.display()))
            })?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    };
    dir.map_err(|e| MarkPdfDownError::Internal(format!("tempdir: {e}")))
}

/// Remove the run's directory; a failure is logged, never returned.
fn cleanup_work_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => debug!("Removed working directory {}", path.display()),
        Err(e) => warn!("Failed to remove working directory {}: {}", path.display(), e),
    }
}

async fn run(
    input: &[u8],
    file_type: FileType,
    opts: &ConvertOptions,
    config: &Config,
    client: &CompletionClient,
    work_dir: &Path,
) -> Result<ConversionOutput, MarkPdfDownError> {
    let total_start = Instant::now();

    let input_path = work_dir.join(format!("input{}", file_type.extension()));
    tokio::fs::write(&input_path, input)
        .await
        .map_err(|e| MarkPdfDownError::Internal(format!("write {}: {e}", input_path.display())))?;
    info!(
        "Converting {} ({} bytes) in {}",
        file_type,
        input.len(),
        work_dir.display()
    );

    // ── Worker, extraction and rasterisation (blocking) ──────────────────
    let render_start = Instant::now();
    let raster = RasterOptions::from(config);
    let (start, end) = (opts.start_page, opts.end_page);
    let dir = work_dir.to_path_buf();
    let (total_pages, first_page, images) = tokio::task::spawn_blocking(move || {
        prepare_pages(&input_path, &dir, start, end, &raster)
    })
    .await
    .map_err(|e| MarkPdfDownError::Internal(format!("Render task panicked: {e}")))??;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Prepared {} page images in {}ms", images.len(), render_duration_ms);

    // ── Per-page transcription ───────────────────────────────────────────
    let llm_start = Instant::now();
    let pages = transcribe_pages(client, config, first_page, images).await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Assembly ─────────────────────────────────────────────────────────
    let markdown = assemble(&pages);
    let failed = pages.iter().filter(|p| !p.is_success()).count();
    let stats = ConversionStats {
        total_pages,
        selected_pages: pages.len(),
        processed_pages: pages.len() - failed,
        failed_pages: failed,
        render_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {}/{} pages, {}ms total",
        stats.processed_pages, stats.selected_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        markdown,
        pages,
        stats,
    })
}

/// Build the worker, extract when the range is partial, and rasterise.
///
/// Returns `(document page count, first selected page, sorted image paths)`.
fn prepare_pages(
    input_path: &Path,
    work_dir: &Path,
    start: usize,
    end: usize,
    raster: &RasterOptions,
) -> Result<(usize, usize, Vec<PathBuf>), MarkPdfDownError> {
    let worker = create_worker(input_path, work_dir, start, end)?;
    let total = worker.total_pages();
    let (start, end) = worker.page_range();

    let render_worker = match &worker {
        DocumentWorker::Pdf(_) if is_partial_range(start, end, total) => {
            narrow_to_range(&worker, worker.extract(), work_dir)?
        }
        _ => worker.clone(),
    };

    let images = render_worker
        .rasterize(raster)
        .map_err(into_rasterization_error)?;
    Ok((total, start, collect_images(images)?))
}

/// The worker to rasterise after an extraction attempt: one over the
/// extracted file, or `worker` itself when extraction failed.
fn narrow_to_range(
    worker: &DocumentWorker,
    extracted: Result<PathBuf, MarkPdfDownError>,
    work_dir: &Path,
) -> Result<DocumentWorker, MarkPdfDownError> {
    match extracted {
        Ok(path) => {
            debug!("Extracted pages to {}", path.display());
            create_worker(&path, work_dir, 1, 0)
        }
        Err(e) => {
            warn!("Page extraction failed, rendering from the original: {}", e);
            Ok(worker.clone())
        }
    }
}

fn into_rasterization_error(e: MarkPdfDownError) -> MarkPdfDownError {
    match e {
        e @ MarkPdfDownError::RasterizationFailed { .. } => e,
        other => MarkPdfDownError::RasterizationFailed {
            detail: other.to_string(),
        },
    }
}

/// Sort page images by name; an empty set is fatal.
fn collect_images(mut images: Vec<PathBuf>) -> Result<Vec<PathBuf>, MarkPdfDownError> {
    if images.is_empty() {
        return Err(MarkPdfDownError::RasterizationFailed {
            detail: "no page images were produced".into(),
        });
    }
    images.sort();
    Ok(images)
}

/// Transcribe every image, in order, converting per-page failures into
/// empty fragments.
///
/// With `config.concurrency > 1` several calls are in flight, but `buffered`
/// yields results in input order, so the returned pages are always in page
/// order.
async fn transcribe_pages(
    client: &CompletionClient,
    config: &Config,
    first_page: usize,
    images: Vec<PathBuf>,
) -> Vec<PageResult> {
    let total = images.len();
    let callback = config.progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_conversion_start(total);
    }

    let pages: Vec<PageResult> = stream::iter(images.into_iter().enumerate().map(|(i, image)| {
        let page_num = first_page + i;
        let callback = callback.clone();
        async move {
            transcribe_page(client, config, page_num, total, image, callback.as_ref()).await
        }
    }))
    .buffered(config.concurrency.max(1))
    .collect()
    .await;

    if let Some(ref cb) = callback {
        cb.on_conversion_complete(total, pages.iter().filter(|p| p.is_success()).count());
    }
    pages
}

async fn transcribe_page(
    client: &CompletionClient,
    config: &Config,
    page_num: usize,
    total: usize,
    image: PathBuf,
    callback: Option<&ProgressCallback>,
) -> PageResult {
    if let Some(cb) = callback {
        cb.on_page_start(page_num, total);
    }
    info!("Converting page {} ({})", page_num, image.display());

    let start = Instant::now();
    let request = CompletionRequest {
        message: IMAGE_TO_MARKDOWN_PROMPT.to_string(),
        system_prompt: config.system_prompt.clone(),
        image_paths: vec![image.clone()],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    // The per-page boundary: an Err becomes an empty fragment here.
    let (markdown, page_error) = match client.try_completion(&request).await {
        Ok(raw) => (clean_fragment(&raw), None),
        Err(RetryError { error: e, attempts }) => {
            error!("Page {}: transcription failed: {}", page_num, e);
            let detail = e.to_string();
            let page_error = match e {
                MarkPdfDownError::ImageEncoding { .. } => PageError::EncodeFailed {
                    page: page_num,
                    detail,
                },
                _ => PageError::LlmFailed {
                    page: page_num,
                    attempts,
                    detail,
                },
            };
            (String::new(), Some(page_error))
        }
    };

    if let Some(cb) = callback {
        match &page_error {
            None => cb.on_page_complete(page_num, total, markdown.len()),
            Some(e) => cb.on_page_error(page_num, total, &e.to_string()),
        }
    }

    PageResult {
        page_num,
        image_path: image,
        markdown,
        duration_ms: start.elapsed().as_millis() as u64,
        error: page_error,
    }
}

/// Every fragment, failed ones included, followed by a blank line.
fn assemble(pages: &[PageResult]) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.markdown.len() + 2).sum());
    for page in pages {
        out.push_str(&page.markdown);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::provider::{ChatRequest, ChatResponse, CompletionProvider};
    use crate::pipeline::render::bind_pdfium;
    use crate::pipeline::worker::PdfWorker;
    use crate::progress::ConversionProgressCallback;
    use async_trait::async_trait;
    use pdfium_render::prelude::PdfPagePaperSize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Answers "page N" for the Nth call, failing the calls listed in `fail_on`.
    struct Counting {
        calls: Mutex<usize>,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl CompletionProvider for Counting {
        async fn complete(&self, _: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError> {
            let n = {
                let mut c = self.calls.lock().unwrap();
                *c += 1;
                *c
            };
            if self.fail_on.contains(&n) {
                Err(MarkPdfDownError::Completion(format!("call {n} failed")))
            } else {
                Ok(ChatResponse::from_text(format!("```markdown\ncall {n}\n```")))
            }
        }
    }

    fn client(fail_on: Vec<usize>, retries: u32) -> CompletionClient {
        CompletionClient::new(
            Arc::new(Counting {
                calls: Mutex::new(0),
                fail_on,
            }),
            "m",
            retries,
            Duration::ZERO,
        )
    }

    fn images(dir: &Path, n: usize) -> Vec<PathBuf> {
        (1..=n)
            .map(|i| {
                let p = dir.join(format!("page_{i:04}.png"));
                image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]))
                    .save(&p)
                    .unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn filename_extension_beats_signature() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0, 0, 0, 0];
        assert_eq!(resolve_file_type(&png, Some("scan.jpg")).unwrap(), FileType::Jpeg);
        assert_eq!(resolve_file_type(&png, None).unwrap(), FileType::Png);
        assert_eq!(resolve_file_type(&png, Some("noext")).unwrap(), FileType::Png);
        assert_eq!(resolve_file_type(&png, Some("SCAN.PNG")).unwrap(), FileType::Png);
        assert!(matches!(
            resolve_file_type(b"hello", None),
            Err(MarkPdfDownError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn unsupported_extension_is_not_sniffed() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0, 0, 0, 0];
        match resolve_file_type(&png, Some("notes.txt")) {
            Err(MarkPdfDownError::UnsupportedType { detail }) => assert_eq!(detail, ".txt"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn failed_extraction_keeps_the_original_worker() {
        let dir = tempfile::tempdir().unwrap();
        let worker = DocumentWorker::Pdf(PdfWorker::from_parts(
            dir.path().join("input.pdf"),
            dir.path(),
            10,
            2,
            3,
        ));
        let narrowed = narrow_to_range(
            &worker,
            Err(MarkPdfDownError::Internal("save failed".into())),
            dir.path(),
        )
        .unwrap();
        assert_eq!(narrowed.input_path(), dir.path().join("input.pdf"));
        assert_eq!(narrowed.total_pages(), 10);
        assert_eq!(narrowed.page_range(), (2, 3));
    }

    #[test]
    fn failed_extraction_renders_the_original_range() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("input.pdf");
        {
            let pdfium = match bind_pdfium() {
                Ok(p) => p,
                Err(e) => {
                    println!("SKIP: {e}");
                    return;
                }
            };
            let mut doc = pdfium.create_new_pdf().unwrap();
            for _ in 0..5 {
                doc.pages_mut()
                    .create_page_at_end(PdfPagePaperSize::a4())
                    .unwrap();
            }
            doc.save_to_file(&pdf).unwrap();
        }
        // A directory in the way of the extracted file makes extraction fail.
        std::fs::create_dir(dir.path().join("pages_0002-0003.pdf")).unwrap();

        let raster = RasterOptions {
            dpi: 72,
            ..RasterOptions::default()
        };
        let (total, first, images) = prepare_pages(&pdf, dir.path(), 2, 3, &raster).unwrap();
        assert_eq!((total, first), (5, 2));
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page_0002.png", "page_0003.png"]);
    }

    #[test]
    fn rasterization_errors_are_not_wrapped_twice() {
        let inner = MarkPdfDownError::RasterizationFailed {
            detail: "page 2: render failed".into(),
        };
        let msg = into_rasterization_error(inner).to_string();
        assert_eq!(msg.matches("Failed to convert file to images").count(), 1, "{msg}");

        let wrapped = into_rasterization_error(MarkPdfDownError::Internal("boom".into()));
        assert!(matches!(wrapped, MarkPdfDownError::RasterizationFailed { .. }));
    }

    #[test]
    fn collect_images_sorts_and_rejects_empty() {
        let sorted = collect_images(vec!["b/page_0002.png".into(), "b/page_0001.png".into()]).unwrap();
        assert_eq!(sorted[0], PathBuf::from("b/page_0001.png"));
        let err = collect_images(vec![]).unwrap_err();
        assert!(err.to_string().contains("Failed to convert file to images"));
    }

    #[test]
    fn assembly_keeps_separator_for_empty_fragments() {
        let page = |n: usize, md: &str| PageResult {
            page_num: n,
            image_path: PathBuf::new(),
            markdown: md.into(),
            duration_ms: 0,
            error: None,
        };
        let doc = assemble(&[page(1, "# A"), page(2, ""), page(3, "C")]);
        assert_eq!(doc, "# A\n\n\n\nC\n\n");
    }

    #[tokio::test]
    async fn one_failed_page_leaves_the_rest_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        // retry_times = 1, so call 2 is page 2's only attempt.
        let pages = transcribe_pages(&client(vec![2], 1), &config, 1, images(dir.path(), 3)).await;

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].markdown, "call 1");
        assert!(pages[1].markdown.is_empty());
        assert!(matches!(pages[1].error, Some(PageError::LlmFailed { page: 2, .. })));
        assert_eq!(pages[2].markdown, "call 3");
        assert_eq!(assemble(&pages), "call 1\n\n\n\ncall 3\n\n");
    }

    #[tokio::test]
    async fn exhausted_retries_give_empty_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let pages = transcribe_pages(&client(vec![1, 2, 3], 3), &config, 1, images(dir.path(), 1)).await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].markdown, "");
        assert!(matches!(
            pages[0].error,
            Some(PageError::LlmFailed { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn permanent_error_reports_one_attempt() {
        struct Broken;

        #[async_trait]
        impl CompletionProvider for Broken {
            async fn complete(&self, _: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError> {
                Err(MarkPdfDownError::Internal("cannot build message".into()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let client = CompletionClient::new(Arc::new(Broken), "m", 3, Duration::ZERO);
        let pages = transcribe_pages(&client, &Config::default(), 1, images(dir.path(), 1)).await;
        assert!(matches!(
            pages[0].error,
            Some(PageError::LlmFailed { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn page_numbers_start_at_first_selected_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let pages = transcribe_pages(&client(vec![], 1), &config, 3, images(dir.path(), 3)).await;
        let nums: Vec<usize> = pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn missing_image_is_an_encode_failure() {
        let config = Config::default();
        let pages = transcribe_pages(
            &client(vec![], 3),
            &config,
            1,
            vec![PathBuf::from("/no/such/page_0001.png")],
        )
        .await;
        assert!(matches!(pages[0].error, Some(PageError::EncodeFailed { page: 1, .. })));
    }

    #[tokio::test]
    async fn progress_events_are_reported() {
        #[derive(Default)]
        struct Rec(Mutex<Vec<String>>);
        impl ConversionProgressCallback for Rec {
            fn on_conversion_start(&self, total: usize) {
                self.0.lock().unwrap().push(format!("start {total}"));
            }
            fn on_page_complete(&self, page: usize, _: usize, _: usize) {
                self.0.lock().unwrap().push(format!("ok {page}"));
            }
            fn on_page_error(&self, page: usize, _: usize, _: &str) {
                self.0.lock().unwrap().push(format!("err {page}"));
            }
            fn on_conversion_complete(&self, total: usize, ok: usize) {
                self.0.lock().unwrap().push(format!("done {ok}/{total}"));
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Rec::default());
        let config = Config::builder()
            .progress_callback(rec.clone())
            .build()
            .unwrap();
        transcribe_pages(&client(vec![2], 1), &config, 1, images(dir.path(), 2)).await;

        let events = rec.0.lock().unwrap().clone();
        assert_eq!(events, vec!["start 2", "ok 1", "err 2", "done 1/2"]);
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.md");
        write_atomic(&out, "# Done\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# Done\n");
        assert!(!dir.path().join("nested/out.md.tmp").exists());
    }
}
