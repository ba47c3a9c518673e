//! Configuration for document-to-Markdown conversion.
//!
//! Every knob lives in one [`Config`] value, built once (from the environment
//! or through [`ConfigBuilder`]) and passed by reference into the
//! orchestrator and the completion client. There is no ambient global state.

use crate::error::MarkPdfDownError;
use crate::pipeline::provider::CompletionProvider;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default vision model when neither `MODEL_NAME` nor `OPENAI_DEFAULT_MODEL` is set.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default OpenAI-compatible endpoint root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// Configuration for a conversion run.
///
/// # Example
/// ```rust
/// use markpdfdown::Config;
///
/// let config = Config::builder()
///     .model_name("gpt-4o-mini")
///     .temperature(0.2)
///     .retry_times(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry_times, 5);
/// ```
#[derive(Clone)]
pub struct Config {
    /// Model identifier sent with every completion request. Default: `gpt-4o`.
    pub model_name: String,

    /// Sampling temperature, 0.0–2.0. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    pub max_tokens: usize,

    /// Attempts per completion call (not extra retries). Default: 3.
    pub retry_times: u32,

    /// Fixed pause between attempts in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Root of the OpenAI-compatible API. Default: `https://api.openai.com/v1/`.
    pub api_base: String,

    /// Bearer token for the OpenAI-compatible API.
    pub api_key: Option<String>,

    /// Named `edgequake-llm` provider (`anthropic`, `gemini`, `ollama`, …).
    /// When set, requests go through that provider instead of the
    /// OpenAI-compatible HTTP client.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// System prompt sent as a leading message. Empty means none.
    pub system_prompt: String,

    /// Rendering DPI for PDF pages. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Cap on the longest edge of a rendered page, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// File format for rendered pages. Default: PNG.
    pub image_format: RasterFormat,

    /// Per-page completion calls in flight at once. Default: 1 (sequential).
    pub concurrency: usize,

    /// HTTP timeout for a single completion call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 8192,
            retry_times: 3,
            retry_backoff_ms: 500,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            provider_name: None,
            provider: None,
            system_prompt: String::new(),
            dpi: 300,
            max_rendered_pixels: 4000,
            image_format: RasterFormat::default(),
            concurrency: 1,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry_times", &self.retry_times)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"))
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("image_format", &self.image_format)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Config {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a configuration from process environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `MODEL_NAME` (fallback `OPENAI_DEFAULT_MODEL`) | `model_name` |
    /// | `TEMPERATURE` | `temperature` |
    /// | `MAX_TOKENS` | `max_tokens` |
    /// | `RETRY_TIMES` | `retry_times` |
    /// | `OPENAI_API_KEY` | `api_key` |
    /// | `OPENAI_API_BASE` | `api_base` |
    /// | `LLM_PROVIDER` | `provider_name` |
    /// | `MARKPDFDOWN_DPI` | `dpi` |
    ///
    /// Unset or empty variables keep their defaults. Values that do not parse,
    /// or that fail validation, are reported as
    /// [`MarkPdfDownError::InvalidConfig`].
    pub fn from_env() -> Result<Self, MarkPdfDownError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarkPdfDownError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();

        if let Some(model) = get("MODEL_NAME").or_else(|| get("OPENAI_DEFAULT_MODEL")) {
            builder = builder.model_name(model);
        }
        if let Some(t) = get("TEMPERATURE") {
            builder = builder.temperature(parse_var("TEMPERATURE", &t)?);
        }
        if let Some(n) = get("MAX_TOKENS") {
            builder = builder.max_tokens(parse_var("MAX_TOKENS", &n)?);
        }
        if let Some(n) = get("RETRY_TIMES") {
            builder = builder.retry_times(parse_var("RETRY_TIMES", &n)?);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Some(name) = get("LLM_PROVIDER") {
            builder = builder.provider_name(name);
        }
        if let Some(dpi) = get("MARKPDFDOWN_DPI") {
            builder = builder.dpi(parse_var("MARKPDFDOWN_DPI", &dpi)?);
        }

        builder.build()
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, MarkPdfDownError> {
    raw.trim()
        .parse()
        .map_err(|_| MarkPdfDownError::InvalidConfig(format!("{key}: cannot parse '{raw}'")))
}

/// Builder for [`Config`].
///
/// Setters store values as given; range checks happen once in
/// [`ConfigBuilder::build`].
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.config.model_name = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retry_times(mut self, n: u32) -> Self {
        self.config.retry_times = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn image_format(mut self, format: RasterFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<Config, MarkPdfDownError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Config {
    /// Check every range constraint. Called by [`ConfigBuilder::build`] and
    /// again by the orchestrator for configs assembled by hand.
    pub fn validate(&self) -> Result<(), MarkPdfDownError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(MarkPdfDownError::InvalidConfig(format!(
                "temperature must be within 0.0–2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(MarkPdfDownError::InvalidConfig(
                "max_tokens must be > 0".into(),
            ));
        }
        if self.retry_times == 0 {
            return Err(MarkPdfDownError::InvalidConfig(
                "retry_times must be > 0".into(),
            ));
        }
        if !(72..=600).contains(&self.dpi) {
            return Err(MarkPdfDownError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                self.dpi
            )));
        }
        if self.concurrency == 0 {
            return Err(MarkPdfDownError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(MarkPdfDownError::InvalidConfig(
                "model name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Image file format produced when rasterising PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterFormat {
    /// Lossless; keeps small print crisp. (default)
    #[default]
    Png,
    /// Smaller uploads for very large pages.
    Jpeg,
}

impl RasterFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            RasterFormat::Png => image::ImageFormat::Png,
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}
