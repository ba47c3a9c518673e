//! The completion provider seam.
//!
//! [`CompletionProvider`] is the one boundary between the pipeline and a
//! remote model: a chat-style multimodal request in, `{choices: [...]}` out.
//! Two implementations ship with the crate:
//!
//! * [`OpenAiCompatibleProvider`] speaks the OpenAI `/chat/completions` wire
//!   format over `reqwest`, so it works with OpenAI itself and with any
//!   compatible gateway (OpenRouter, vLLM, LM Studio, Ollama's `/v1`).
//! * [`EdgequakeProvider`] adapts any `edgequake_llm::LLMProvider`, which is
//!   how named providers such as `anthropic` or `gemini` are reached.
//!
//! Tests and embedders can supply their own implementation through
//! [`crate::config::ConfigBuilder::provider`].

use crate::config::Config;
use crate::error::MarkPdfDownError;
use async_trait::async_trait;
use edgequake_llm::{CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One part of a multimodal user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(data_uri: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: data_uri.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// A `data:<mime>;base64,<payload>` URI.
    pub url: String,
}

/// Message content: a plain string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Request body for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Response body. Only the fields the pipeline reads are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// A response carrying a single text choice.
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some(content.into()),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// `null` from the API is read as an empty transcription.
    #[serde(default)]
    pub content: Option<String>,
}

// ── Trait ────────────────────────────────────────────────────────────────

/// A chat-style multimodal completion endpoint.
///
/// Implementations must be stateless per call: the orchestrator may invoke
/// `complete` for several pages concurrently.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Pick the provider for a run.
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name`, built through `edgequake_llm`'s factory with
///    `config.model_name`; the factory reads that provider's API key from
///    the environment.
/// 3. The OpenAI-compatible HTTP client at `config.api_base`, which needs
///    `config.api_key`.
pub fn resolve_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>, MarkPdfDownError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let inner = ProviderFactory::create_llm_provider(name, &config.model_name).map_err(|e| {
            MarkPdfDownError::InvalidConfig(format!("provider '{name}' is not available: {e}"))
        })?;
        return Ok(Arc::new(EdgequakeProvider::new(name.clone(), inner)));
    }

    let key = config.api_key.as_deref().ok_or_else(|| {
        MarkPdfDownError::InvalidConfig(
            "no API key: set OPENAI_API_KEY or choose a provider with LLM_PROVIDER".into(),
        )
    })?;
    let provider = OpenAiCompatibleProvider::new(
        &config.api_base,
        key,
        Duration::from_secs(config.api_timeout_secs),
    )?;
    Ok(Arc::new(provider))
}

// ── OpenAI-compatible HTTP ───────────────────────────────────────────────

/// Provider for any endpoint implementing OpenAI's `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_base: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, MarkPdfDownError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarkPdfDownError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api_base.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {api_key}"),
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError> {
        let url = self.chat_completions_url();
        debug!("POST {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .json(request)
            .send()
            .await
            .map_err(|e| MarkPdfDownError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarkPdfDownError::Completion(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| MarkPdfDownError::Completion(format!("invalid response body: {e}")))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter over an `edgequake_llm` provider.
///
/// The model is fixed when the inner provider is created, so
/// `ChatRequest::model` is only logged here.
pub struct EdgequakeProvider {
    name: String,
    inner: Arc<dyn LLMProvider>,
}

impl EdgequakeProvider {
    pub fn new(name: impl Into<String>, inner: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

#[async_trait]
impl CompletionProvider for EdgequakeProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError> {
        let messages = request
            .messages
            .iter()
            .map(to_edgequake_message)
            .collect::<Result<Vec<_>, _>>()?;

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .inner
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| MarkPdfDownError::Completion(format!("{}: {e}", self.name)))?;

        debug!(
            "{} ({}): {} input tokens, {} output tokens",
            self.name, request.model, response.prompt_tokens, response.completion_tokens
        );
        Ok(ChatResponse::from_text(response.content))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn to_edgequake_message(
    message: &ChatMessage,
) -> Result<edgequake_llm::ChatMessage, MarkPdfDownError> {
    let (text, images) = match &message.content {
        MessageContent::Text(text) => (text.clone(), Vec::new()),
        MessageContent::Parts(parts) => {
            let mut text = String::new();
            let mut images = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text: t } => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(t);
                    }
                    ContentPart::ImageUrl { image_url } => {
                        let (mime, data) = split_data_uri(&image_url.url).ok_or_else(|| {
                            MarkPdfDownError::Internal("image part is not a base64 data URI".into())
                        })?;
                        images.push(
                            ImageData::new(data.to_string(), mime.to_string()).with_detail("high"),
                        );
                    }
                }
            }
            (text, images)
        }
    };

    Ok(match message.role {
        Role::System => edgequake_llm::ChatMessage::system(&text),
        Role::User => edgequake_llm::ChatMessage::user_with_images(&text, images),
    })
}

/// Split `data:<mime>;base64,<payload>` into `(mime, payload)`.
pub(crate) fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    Some((mime, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialises_to_openai_shape() {
        let req = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![
                ChatMessage::system("be terse"),
                ChatMessage::user_parts(vec![
                    ContentPart::text("transcribe"),
                    ContentPart::image("data:image/png;base64,AAAA"),
                ]),
            ],
            temperature: 0.3,
            max_tokens: 8192,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "gpt-4o");
        assert_eq!(v["max_tokens"], 8192);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][0]["content"], "be terse");
        let parts = &v["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "transcribe");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn response_parses_and_tolerates_null_content() {
        let r: ChatResponse =
            serde_json::from_str(r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert_eq!(r.choices.len(), 1);
        assert_eq!(r.choices[0].message.content, None);

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.choices.is_empty());

        let missing: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(missing.choices.is_empty());
    }

    #[test]
    fn data_uri_split() {
        assert_eq!(
            split_data_uri("data:image/jpeg;base64,/9j/"),
            Some(("image/jpeg", "/9j/"))
        );
        assert_eq!(split_data_uri("https://example.com/a.png"), None);
    }

    #[test]
    fn resolution_prefers_explicit_provider() {
        struct Fixed;
        #[async_trait]
        impl CompletionProvider for Fixed {
            async fn complete(&self, _: &ChatRequest) -> Result<ChatResponse, MarkPdfDownError> {
                Ok(ChatResponse::from_text("fixed"))
            }
            fn name(&self) -> &str {
                "fixed"
            }
        }

        let config = Config::builder()
            .provider(Arc::new(Fixed))
            .provider_name("definitely-not-a-provider")
            .build()
            .unwrap();
        let p = resolve_provider(&config).unwrap();
        assert_eq!(p.name(), "fixed");
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = Config::default();
        let err = resolve_provider(&config).err().unwrap();
        assert!(matches!(err, MarkPdfDownError::InvalidConfig(_)), "got: {err}");
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let p = OpenAiCompatibleProvider::new("https://api.openai.com/v1/", "k", Duration::from_secs(5))
            .unwrap();
        assert_eq!(p.chat_completions_url(), "https://api.openai.com/v1/chat/completions");
    }
}
