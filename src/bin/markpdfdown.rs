//! CLI binary for markpdfdown.
//!
//! A thin shim over the library crate: flags and environment map onto
//! `Config`, input comes from `-i` or stdin, Markdown goes to `-o` or stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use markpdfdown::{
    convert_from_file, convert_from_reader, write_atomic, Config, ConversionOutput,
    ConversionProgressCallback, ConvertOptions, ProgressCallback, RasterFormat,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar on stderr plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, _total: usize, markdown_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}  {}  {}",
            green("✓"),
            page_num,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, _total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}  {}  {}",
            red("✗"),
            page_num,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_pages.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} {} pages converted", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} pages converted ({} empty)",
                red("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # File to file
  markpdfdown -i paper.pdf -o paper.md

  # Pipe mode
  markpdfdown < scan.png > scan.md

  # Pages 3 through 5
  markpdfdown -i book.pdf -o part.md --start 3 --end 5
  markpdfdown -i book.pdf -o part.md 3 5

  # A provider other than OpenAI
  LLM_PROVIDER=anthropic markpdfdown -i paper.pdf -o paper.md --model claude-sonnet-4-20250514

ENVIRONMENT VARIABLES (also read from .env):
  OPENAI_API_KEY        API key for the OpenAI-compatible endpoint
  OPENAI_API_BASE       Endpoint root (default https://api.openai.com/v1/)
  MODEL_NAME            Model ID (fallback OPENAI_DEFAULT_MODEL, default gpt-4o)
  TEMPERATURE           Sampling temperature (default 0.3)
  MAX_TOKENS            Max output tokens per page (default 8192)
  RETRY_TIMES           Attempts per page (default 3)
  LLM_PROVIDER          Named provider: anthropic, gemini, ollama, …
  MARKPDFDOWN_DPI       Rendering DPI (default 300)
  PDFIUM_LIB_PATH       Path to libpdfium (file or directory)
  RUST_LOG              Log filter, overrides --verbose / --quiet
"#;

/// Convert PDF documents and page images to Markdown using vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "markpdfdown",
    version,
    about = "Convert PDF documents and page images to Markdown using vision LLMs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file (PDF, PNG, JPEG, BMP, GIF). Reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output Markdown file. Writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First page to convert (1-indexed).
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// Last page to convert; 0 means the last page of the document.
    #[arg(long, default_value_t = 0)]
    end: usize,

    /// Page range as positional numbers: `END` or `START END`.
    #[arg(num_args = 0..=2, value_name = "PAGE", conflicts_with_all = ["start", "end"])]
    pages: Vec<usize>,

    /// Model ID, overriding MODEL_NAME.
    #[arg(long)]
    model: Option<String>,

    /// Named provider (anthropic, gemini, ollama, …), overriding LLM_PROVIDER.
    #[arg(long)]
    provider: Option<String>,

    /// Rendering DPI (72–600), overriding MARKPDFDOWN_DPI.
    #[arg(long, value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: Option<u32>,

    /// Rasterise pages as JPEG instead of PNG.
    #[arg(long)]
    jpeg: bool,

    /// Pages transcribed at once.
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,

    /// Parent for the run's intermediate files (the system temp dir by default).
    /// Each run works in its own `markpdfdown-*` subdirectory.
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Keep the working directory after the run.
    #[arg(long)]
    keep_workdir: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// File mode needs both ends; pipe mode needs neither.
    fn check_io(&self) -> Result<()> {
        match (&self.input, &self.output) {
            (Some(_), None) => bail!("--input requires --output (or omit both to use stdin/stdout)"),
            (None, Some(_)) => bail!("--output requires --input (or omit both to use stdin/stdout)"),
            _ => Ok(()),
        }
    }

    /// `(start, end)` from the flags or the positional numbers.
    fn page_range(&self) -> Result<(usize, usize)> {
        let (start, end) = match self.pages.as_slice() {
            [] => (self.start, self.end),
            [end] => (1, *end),
            [start, end, ..] => (*start, *end),
        };
        if start < 1 {
            bail!("start page must be >= 1 (got {start})");
        }
        if end != 0 && end < start {
            bail!("end page {end} must be >= start page {start}");
        }
        Ok((start, end))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {:#}", red("error:"), e);
                ExitCode::from(1)
            }
        },
        // Dropping the run future removes its working directory.
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{}", red("interrupted"));
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    cli.check_io()?;
    let (start, end) = cli.page_range()?;
    let show_progress = !cli.quiet && !cli.no_progress;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress)?;

    let mut opts = ConvertOptions::default()
        .pages(start, end)
        .cleanup(!cli.keep_workdir);
    if let Some(ref dir) = cli.workdir {
        opts = opts.output_dir(dir.clone());
    }

    let output = match cli.input {
        Some(ref input) => convert_from_file(input, &opts, &config)
            .await
            .with_context(|| format!("Failed to convert {}", input.display()))?,
        None => convert_from_reader(tokio::io::stdin(), &opts, &config)
            .await
            .context("Failed to convert stdin (no input data received?)")?,
    };

    match cli.output {
        Some(ref path) => {
            write_atomic(path, &output.markdown)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                print_summary(&output, Some(path));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
            if !cli.quiet && !show_progress {
                print_summary(&output, None);
            }
        }
    }
    Ok(())
}

fn print_summary(output: &ConversionOutput, path: Option<&PathBuf>) {
    let stats = &output.stats;
    let mark = if stats.failed_pages == 0 { green("✔") } else { red("⚠") };
    match path {
        Some(p) => eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            mark,
            stats.processed_pages,
            stats.selected_pages,
            stats.total_duration_ms,
            bold(&p.display().to_string()),
        ),
        None => eprintln!(
            "{}  {}/{} pages  {}ms",
            mark, stats.processed_pages, stats.selected_pages, stats.total_duration_ms
        ),
    }
}

/// Environment first, then flags on top.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<Config> {
    let mut config = Config::from_env().context("Invalid configuration in environment")?;

    if let Some(ref model) = cli.model {
        config.model_name = model.clone();
    }
    if let Some(ref provider) = cli.provider {
        config.provider_name = Some(provider.clone());
    }
    if let Some(dpi) = cli.dpi {
        config.dpi = dpi;
    }
    if cli.jpeg {
        config.image_format = RasterFormat::Jpeg;
    }
    config.concurrency = cli.concurrency;
    config.progress_callback = progress;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
