//! Completion Client: one prompt plus zero or more page images in, text out.
//!
//! This is the only stage with network I/O. Message layout, in order:
//!
//! 1. **System message**, only when a system prompt is configured.
//! 2. **User message** whose content is the text part followed by one
//!    `image_url` part per image, in the order given.
//!
//! ## Retry Strategy
//!
//! Images are encoded once, before the first attempt. A missing file cannot
//! be fixed by trying again, so encoding errors surface immediately. The
//! provider call (and a zero-choice response) is retried up to
//! `retry_times` attempts with a fixed pause. After the last attempt the
//! error is returned to the caller; the orchestrator turns it into an empty
//! fragment, other callers see it as fatal.

use crate::config::Config;
use crate::error::MarkPdfDownError;
use crate::pipeline::encode::encode_image_file;
use crate::pipeline::provider::{
    resolve_provider, ChatMessage, ChatRequest, CompletionProvider, ContentPart,
};
use crate::pipeline::retry::{attempt, RetryError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Inputs for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub message: String,
    /// Empty means no system message is sent.
    pub system_prompt: String,
    pub image_paths: Vec<PathBuf>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_prompt: String::new(),
            image_paths: Vec::new(),
            temperature: 0.3,
            max_tokens: 8192,
        }
    }

    pub fn with_images(mut self, paths: Vec<PathBuf>) -> Self {
        self.image_paths = paths;
        self
    }
}

/// Stateless client around a [`CompletionProvider`].
///
/// Cheap to clone; safe to call concurrently for different pages.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    retry_times: u32,
    backoff: Duration,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("retry_times", &self.retry_times)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl CompletionClient {
    /// Build a client from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, MarkPdfDownError> {
        config.validate()?;
        let provider = resolve_provider(config)?;
        Ok(Self::new(
            provider,
            config.model_name.clone(),
            config.retry_times,
            Duration::from_millis(config.retry_backoff_ms),
        ))
    }

    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        retry_times: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            retry_times: retry_times.max(1),
            backoff,
        }
    }

    pub fn retry_times(&self) -> u32 {
        self.retry_times
    }

    /// Send one completion request and return the first choice's text verbatim.
    pub async fn completion(&self, req: &CompletionRequest) -> Result<String, MarkPdfDownError> {
        self.try_completion(req).await.map_err(|e| e.error)
    }

    /// Like [`CompletionClient::completion`], but a failure also carries the
    /// number of provider calls made (0 when an image could not be encoded).
    pub async fn try_completion(
        &self,
        req: &CompletionRequest,
    ) -> Result<String, RetryError<MarkPdfDownError>> {
        let chat = self
            .build_request(req)
            .await
            .map_err(|error| RetryError { error, attempts: 0 })?;

        attempt(
            self.retry_times,
            self.backoff,
            MarkPdfDownError::is_retryable,
            |n| {
                let chat = &chat;
                async move {
                    debug!(
                        "{}: attempt {} ({} images)",
                        self.provider.name(),
                        n,
                        req.image_paths.len()
                    );
                    let response = self.provider.complete(chat).await?;
                    let choice = response
                        .choices
                        .into_iter()
                        .next()
                        .ok_or(MarkPdfDownError::NoResponse)?;
                    Ok(choice.message.content.unwrap_or_default())
                }
            },
        )
        .await
    }

    async fn build_request(&self, req: &CompletionRequest) -> Result<ChatRequest, MarkPdfDownError> {
        let mut parts = Vec::with_capacity(1 + req.image_paths.len());
        parts.push(ContentPart::text(req.message.clone()));
        for path in &req.image_paths {
            parts.push(ContentPart::image(encode_image_file(path).await?));
        }

        let mut messages = Vec::with_capacity(2);
        if !req.system_prompt.is_empty() {
            messages.push(ChatMessage::system(req.system_prompt.clone()));
        }
        messages.push(ChatMessage::user_parts(parts));

        Ok(ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        })
    }
}
