/*!
 * Client for OpenAI-compatible chat completion endpoints.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::ProviderError;
use crate::providers::{ChatMessage, ChatRequest, Provider};

/// OpenAI-compatible client
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key, empty for local servers
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Minimum delay between two requests
    throttle: Duration,
    /// When the previous request was sent
    last_request: Mutex<Option<Instant>>,
}

/// Provider routing for OpenRouter-style `provider@model` names
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProviderRouting {
    /// Providers to try, in order
    pub order: Vec<String>,
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<ChatMessage>,

    /// Temperature for generation
    temperature: f32,

    /// Maximum number of tokens to generate
    max_tokens: u32,

    /// Always false, responses are read whole
    stream: bool,

    /// Upstream provider preference
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderRouting>,
}

impl OpenAIRequest {
    /// Build the wire request, splitting `provider@model` names
    pub fn from_chat(request: ChatRequest) -> Self {
        let (model, provider) = match request.model.split_once('@') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => (
                model.to_string(),
                Some(ProviderRouting {
                    order: vec![provider.to_string()],
                }),
            ),
            _ => (request.model, None),
        };

        Self {
            model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            provider,
        }
    }

    /// Model name sent on the wire
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Provider routing, if any
    pub fn provider(&self) -> Option<&ProviderRouting> {
        self.provider.as_ref()
    }
}

/// Message of a response choice
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender
    #[serde(default)]
    pub role: String,
    /// Generated content
    #[serde(default)]
    pub content: Option<String>,
}

/// One response choice
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: OpenAIMessage,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Chat completion response body
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIResponse {
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    /// Token usage, not reported by every server
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl OpenAIResponse {
    /// Text of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Error body some servers return with a 200 status
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl OpenAI {
    /// Create a new client
    ///
    /// Fails when the HTTP client cannot be set up, e.g. without a usable TLS backend.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            throttle: Duration::ZERO,
            last_request: Mutex::new(None),
        })
    }

    /// Enforce a minimum delay between requests
    pub fn with_throttle(mut self, throttle_ms: u64) -> Self {
        self.throttle = Duration::from_millis(throttle_ms);
        self
    }

    /// Full URL of the chat completion route
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    /// Wait until the throttle delay since the previous request has passed
    async fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.throttle {
                let wait = self.throttle - elapsed;
                debug!("Throttling: waiting {:?} before next request", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Send a chat completion request
    pub async fn send(&self, request: &OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        self.wait_for_slot().await;

        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat completion error ({}): {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(error_text),
                code => ProviderError::ApiError {
                    status_code: code,
                    message: error_text,
                },
            });
        }

        let body = response.text().await.map_err(ProviderError::from_reqwest)?;
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: envelope.error.message,
            });
        }
        serde_json::from_str::<OpenAIResponse>(&body)
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let model = request.model.clone();
        let wire = OpenAIRequest::from_chat(request);
        let response = self.send(&wire).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Tokens: {} prompt, {} completion",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(ProviderError::EmptyResponse(model)),
        }
    }
}
