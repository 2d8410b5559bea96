/*!
 * Provider implementations for the remote generation service.
 *
 * - `openai`: any OpenAI-compatible `/chat/completions` endpoint (OpenAI,
 *   Ollama, LM Studio, Mistral, DeepSeek, Together, OpenRouter)
 * - `mock`: scripted provider for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Chat message object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an arbitrary role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// System instruction
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// One generation request: ordered messages, model and sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model name, optionally `provider@model`
    pub model: String,
    /// Conversation, system instruction first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Create a request with default sampling parameters
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Content of the last user turn
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// Common trait for all generation providers
///
/// Implementations only move text; retries and fallbacks are decided by the
/// caller from the returned `ProviderError`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Run one chat completion and return the generated text
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = ChatRequest::new(model, vec![ChatMessage::user("Hello")]).max_tokens(10);
        self.complete(request).await.map(|_| ())
    }
}

pub mod mock;
pub mod openai;
