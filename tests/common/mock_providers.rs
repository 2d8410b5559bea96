/*!
 * Scripted provider for testing
 *
 * Answers from a dictionary keyed by the text sent for generation, so tests
 * can assert exact output. Unknown text gets `[TRANSLATED] <text>`; texts
 * registered as failing produce an API error; adequacy rating requests get
 * the configured rating.
 */

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bookwai::errors::ProviderError;
use bookwai::providers::mock::untag;
use bookwai::providers::{ChatRequest, Provider};

/// Marker of the adequacy rating system prompt
const RATER_MARKER: &str = "quality assessor";

/// Provider answering from a fixed script
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    /// Answers keyed by the text sent
    dictionary: HashMap<String, String>,
    /// Texts that fail
    failing: Arc<Mutex<HashSet<String>>>,
    /// Answer to rating requests
    rating: String,
    /// Requests received so far
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    /// Create a provider from (sent text, answer) pairs
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            dictionary: entries
                .iter()
                .map(|(source, answer)| (source.to_string(), answer.to_string()))
                .collect(),
            rating: "90".to_string(),
            ..Default::default()
        }
    }

    /// Answer rating requests with `rating`
    pub fn with_rating(mut self, rating: &str) -> Self {
        self.rating = rating.to_string();
        self
    }

    /// Make generation of `text` fail
    pub fn fail_on(&self, text: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(text.to_string());
        }
    }

    /// Let generation of `text` succeed again
    pub fn recover(&self, text: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(text);
        }
    }

    /// Translation requests received so far
    pub fn translation_requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| !Self::is_rating(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of translation requests received
    pub fn translation_count(&self) -> usize {
        self.translation_requests().len()
    }

    fn is_rating(request: &ChatRequest) -> bool {
        request
            .messages
            .first()
            .is_some_and(|m| m.content.contains(RATER_MARKER))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if Self::is_rating(&request) {
            return Ok(self.rating.clone());
        }

        let text = untag(request.last_user_message().unwrap_or_default()).to_string();
        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(&text))
            .unwrap_or(false);
        if failing {
            return Err(ProviderError::ApiError {
                status_code: 503,
                message: format!("Scripted failure for: {}", text),
            });
        }

        Ok(self
            .dictionary
            .get(&text)
            .cloned()
            .unwrap_or_else(|| format!("[TRANSLATED] {}", text)))
    }
}
