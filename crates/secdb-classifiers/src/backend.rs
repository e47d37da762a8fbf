//! Remote chat completion backends
//!
//! The classification client talks to the model through [`ChatBackend`].
//! Dispatcher workers obtain their own backend from a [`BackendFactory`] so
//! no transport state is shared between workers.

use async_trait::async_trait;
use reqwest::StatusCode;
use secdb_core::ChatMessage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Failure of a single chat completion attempt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// HTTP 429
    #[error("RateLimitError: {0}")]
    RateLimited(String),

    /// HTTP 5xx
    #[error("InternalServerError ({status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 400
    #[error("BadRequestError: {0}")]
    BadRequest(String),

    /// Any other non-success status
    #[error("APIError ({status}): {message}")]
    Api { status: u16, message: String },

    /// Connection, timeout, or body read failure
    #[error("TransportError: {0}")]
    Transport(String),

    /// Anything else, e.g. an undecodable success body
    #[error("UnexpectedError: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Server { .. } | Self::Transport(_) | Self::Unexpected(_)
        )
    }

    /// Short name used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::Server { .. } => "server",
            Self::BadRequest(_) => "bad_request",
            Self::Api { .. } => "api",
            Self::Transport(_) => "transport",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Map a non-success HTTP status to an error class
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            429 => Self::RateLimited(message),
            400 => Self::BadRequest(message),
            s if (500..600).contains(&s) => Self::Server { status: s, message },
            s => Self::Api { status: s, message },
        }
    }
}

/// A chat completion endpoint
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the assistant message content
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Produces one backend handle per dispatcher worker
pub trait BackendFactory: Send + Sync {
    fn connect(&self) -> Result<Box<dyn ChatBackend>, BackendError>;
}

/// Connection settings for an OpenAI-compatible chat completions API
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// API base, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Bearer token, omitted from requests when unset
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            api_key: None,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Client for `POST {base_url}/chat/completions`
pub struct OpenAiChatBackend {
    config: BackendConfig,
    endpoint: String,
    http_client: reqwest::Client,
}

impl OpenAiChatBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            config,
            endpoint,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
        };

        let mut builder = self.http_client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Backend returned error status");
            return Err(BackendError::from_status(status, body));
        }

        parse_completion_body(&body)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// Builds a fresh [`OpenAiChatBackend`] for each worker
#[derive(Debug, Clone)]
pub struct OpenAiBackendFactory {
    config: BackendConfig,
}

impl OpenAiBackendFactory {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for OpenAiBackendFactory {
    fn connect(&self) -> Result<Box<dyn ChatBackend>, BackendError> {
        Ok(Box::new(OpenAiChatBackend::new(self.config.clone())?))
    }
}

/// Extract the first choice's content from a success body.
///
/// Missing choices or null content yield an empty string.
pub fn parse_completion_body(body: &str) -> Result<String, BackendError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::Unexpected(format!("Failed to decode completion: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(BackendError::Unexpected(error.message));
    }

    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

// =============================================================================
// Wire structures
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}
