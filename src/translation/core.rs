/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, which turns one
 * unit of text into its translation through a generation provider: the
 * formatting envelope is set aside, the core is sanitized and sent with the
 * context window, and the answer is cleaned and re-wrapped.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::{ChatRequest, Provider};

use super::context::ContextEntry;
use super::formatting::{sanitize_for_generation, strip_formatting_envelope};
use super::prompts::{extract_translation, PromptKind, TranslationPromptBuilder};
use super::quality::{adequacy_score, text_similarity};

/// Sources longer than this are checked for truncated answers
const BLEEDING_MIN_SOURCE_WORDS: usize = 50;

/// Usage statistics for tracking generation calls
#[derive(Debug, Clone)]
pub struct GenerationStats {
    /// Number of successful requests
    pub requests: u64,

    /// Number of failed requests
    pub failures: u64,

    /// Characters sent as unit text
    pub characters_in: u64,

    /// Characters received as translation
    pub characters_out: u64,

    /// Start time of tracking
    pub start_time: Instant,

    /// Total time spent waiting on the provider
    pub api_duration: Duration,

    /// Model name
    pub model: String,
}

impl GenerationStats {
    /// Create new empty stats for a model
    pub fn new(model: &str) -> Self {
        Self {
            requests: 0,
            failures: 0,
            characters_in: 0,
            characters_out: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            model: model.to_string(),
        }
    }

    /// Requests per minute since tracking started
    pub fn requests_per_minute(&self) -> f64 {
        let minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.requests as f64 / minutes
        } else {
            0.0
        }
    }

    /// Human readable summary
    pub fn summary(&self) -> String {
        format!(
            "Model: {} | Requests: {} ({} failed) | Characters: {} in, {} out | API time: {:.1}s | Rate: {:.1} req/min",
            self.model,
            self.requests,
            self.failures,
            self.characters_in,
            self.characters_out,
            self.api_duration.as_secs_f64(),
            self.requests_per_minute()
        )
    }
}

/// Result of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Translated text with its envelope restored
    pub text: String,
    /// Wall time of the call
    pub elapsed_ms: i64,
}

/// Whether a result looks contaminated by the context window
///
/// Two symptoms are recognised: a long source answered with a fraction of
/// its length, and a result that repeats a previous translation whose source
/// has nothing in common with the current one.
pub fn detect_context_bleeding(source: &str, result: &str, context: &[ContextEntry]) -> bool {
    let source_words = source.split_whitespace().count();
    let result_words = result.split_whitespace().count();
    if source_words > BLEEDING_MIN_SOURCE_WORDS && (result_words as f64) < source_words as f64 * 0.3 {
        return true;
    }

    context.iter().any(|entry| {
        text_similarity(result, &entry.translation) > 0.8
            && text_similarity(source, &entry.source) < 0.3
    })
}

/// Main translation service
#[derive(Debug)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Model name sent with every request
    model: String,

    /// Sampling temperature
    temperature: f32,

    /// Upper bound on generated tokens
    max_tokens: u32,

    /// Word budget for the replayed context
    max_context_words: usize,

    /// Translation or proofreading prompt
    prompt_kind: PromptKind,

    /// Usage statistics
    stats: Mutex<GenerationStats>,
}

impl TranslationService {
    /// Create a new translation service for `model`
    pub fn new(provider: Arc<dyn Provider>, model: &str) -> Self {
        Self {
            provider,
            model: model.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            max_context_words: 512,
            prompt_kind: PromptKind::Translate,
            stats: Mutex::new(GenerationStats::new(model)),
        }
    }

    /// Set the sampling parameters
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set the word budget for the replayed context
    pub fn with_max_context_words(mut self, max_context_words: usize) -> Self {
        self.max_context_words = max_context_words;
        self
    }

    /// Send units with the system prompt of `kind`
    pub fn with_prompt_kind(mut self, prompt_kind: PromptKind) -> Self {
        self.prompt_kind = prompt_kind;
        self
    }

    pub fn prompt_kind(&self) -> PromptKind {
        self.prompt_kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.provider)
    }

    /// Snapshot of the usage statistics
    pub fn stats(&self) -> GenerationStats {
        self.stats.lock().clone()
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection(&self.model).await
    }

    /// Translate one unit with the given context turns
    ///
    /// Text without a core (markers or punctuation only) is returned as is.
    pub async fn generate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context: &[ContextEntry],
    ) -> Result<Generation, TranslationError> {
        let start_time = Instant::now();
        let envelope = strip_formatting_envelope(text);
        if envelope.is_empty() {
            return Ok(Generation {
                text: text.to_string(),
                elapsed_ms: 0,
            });
        }

        let core = sanitize_for_generation(&envelope.core);
        let messages = TranslationPromptBuilder::new(source_language, target_language)
            .with_kind(self.prompt_kind)
            .with_context(context)
            .with_max_context_words(self.max_context_words)
            .build(&core);
        debug!(
            "Sending {} messages for {} -> {}: {}",
            messages.len(),
            source_language,
            target_language,
            core
        );

        let request = ChatRequest::new(self.model.as_str(), messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let result = self.provider.complete(request).await;
        let duration = start_time.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let mut stats = self.stats.lock();
                stats.failures += 1;
                stats.api_duration += duration;
                return Err(e.into());
            }
        };

        let translated = extract_translation(&response, target_language);
        if translated.is_empty() {
            self.stats.lock().failures += 1;
            return Err(TranslationError::Rejected(format!(
                "model {} returned no {} text",
                self.model, target_language
            )));
        }

        {
            let mut stats = self.stats.lock();
            stats.requests += 1;
            stats.characters_in += core.chars().count() as u64;
            stats.characters_out += translated.chars().count() as u64;
            stats.api_duration += duration;
        }

        Ok(Generation {
            text: envelope.wrap(&translated),
            elapsed_ms: i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
        })
    }

    /// Translate one unit, retrying without context when the result bleeds
    ///
    /// The retry result is kept unless it shows the same symptom, in which
    /// case the longer of the two answers wins.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context: &[ContextEntry],
    ) -> Result<Generation, TranslationError> {
        let first = self.generate(text, source_language, target_language, context).await?;
        if context.is_empty() || !detect_context_bleeding(text, &first.text, context) {
            return Ok(first);
        }

        warn!("Possible context bleeding, retrying without context: {}", first.text);
        let retry = match self.generate(text, source_language, target_language, &[]).await {
            Ok(retry) => retry,
            Err(e) => {
                warn!("Retry without context failed, keeping first result: {}", e);
                return Ok(first);
            }
        };

        if !detect_context_bleeding(text, &retry.text, &[]) {
            return Ok(retry);
        }
        if retry.text.split_whitespace().count() > first.text.split_whitespace().count() {
            Ok(retry)
        } else {
            Ok(first)
        }
    }

    /// Ask the model to rate a translation, 0 to 100
    pub async fn rate_adequacy(
        &self,
        source: &str,
        translated: &str,
        source_language: &str,
        target_language: &str,
    ) -> u8 {
        adequacy_score(
            self.provider.as_ref(),
            &self.model,
            source,
            translated,
            source_language,
            target_language,
        )
        .await
    }
}
