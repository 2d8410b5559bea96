/*!
 * Sliding context window for paragraph translation.
 *
 * Each language pair owns a bounded, ordered history of the most recent
 * (source, translation) pairs. The history is replayed to the model as
 * prior conversation turns so names and terms stay consistent from one
 * paragraph to the next. Windows live only in memory; a fresh run seeds
 * them from the store through [`ContextSource`].
 */

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::database::Repository;
use crate::translation::formatting::strip_formatting_envelope;
use crate::translation::quality::text_similarity;

/// Sources longer than this many words are checked for near-duplicates
const DUPLICATE_MIN_WORDS: usize = 5;

/// Word-set similarity above which a source counts as a near-duplicate
const DUPLICATE_SIMILARITY: f64 = 0.95;

/// Configuration for context window sizes.
#[derive(Debug, Clone)]
pub struct ContextWindowConfig {
    /// Maximum number of pairs kept per language pair
    pub capacity: usize,

    /// Number of stored pairs used to seed an empty window
    pub prefill_size: usize,

    /// Chapters shorter than this keep the previous chapter's window
    pub short_chapter_threshold: usize,

    /// Reduce both sides to their envelope cores before storing
    pub clean: bool,
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self::with_capacity(10)
    }
}

impl ContextWindowConfig {
    /// Config with the given capacity and the derived defaults
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            prefill_size: 3,
            short_chapter_threshold: 2 * capacity,
            clean: false,
        }
    }
}

/// One (source, translation) pair of the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Source text as sent to the model
    pub source: String,

    /// Translation as returned by the model
    pub translation: String,
}

impl ContextEntry {
    /// Create a new entry
    pub fn new(source: &str, translation: &str) -> Self {
        Self {
            source: source.to_string(),
            translation: translation.to_string(),
        }
    }

    /// Words on both sides, used for prompt budgeting
    pub fn word_count(&self) -> usize {
        self.source.split_whitespace().count() + self.translation.split_whitespace().count()
    }
}

/// Supplies previously stored pairs to seed an empty window
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Most recent usable pairs of an edition, newest first
    async fn recent_pairs(
        &self,
        source_lang: &str,
        target_lang: &str,
        edition: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<ContextEntry>>;
}

#[async_trait]
impl ContextSource for Repository {
    async fn recent_pairs(
        &self,
        source_lang: &str,
        target_lang: &str,
        edition: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<ContextEntry>> {
        let records = self
            .recent_records(source_lang, target_lang, edition, limit)
            .await?;
        Ok(records
            .iter()
            .map(|record| ContextEntry::new(&record.source_text, &record.translated_text))
            .collect())
    }
}

/// Per language pair context windows
#[derive(Debug, Clone, Default)]
pub struct ContextWindowManager {
    config: ContextWindowConfig,
    windows: HashMap<(String, String), VecDeque<ContextEntry>>,
}

impl ContextWindowManager {
    /// Create a manager with the given configuration
    pub fn new(config: ContextWindowConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ContextWindowConfig {
        &self.config
    }

    fn key(source_lang: &str, target_lang: &str) -> (String, String) {
        (source_lang.to_string(), target_lang.to_string())
    }

    /// Append a pair, evicting the oldest one past capacity
    ///
    /// Returns whether the pair was stored. Empty pairs, sources the model
    /// echoed back unchanged and near-duplicates of the newest entry are
    /// skipped.
    pub fn add(
        &mut self,
        source_lang: &str,
        target_lang: &str,
        source: &str,
        translation: &str,
        clean: bool,
    ) -> bool {
        if self.config.capacity == 0 {
            return false;
        }

        let (source, translation) = if clean {
            (
                strip_formatting_envelope(source).core,
                strip_formatting_envelope(translation).core,
            )
        } else {
            (source.trim().to_string(), translation.trim().to_string())
        };
        if source.is_empty() || translation.is_empty() {
            return false;
        }

        let long_source = source.split_whitespace().count() > DUPLICATE_MIN_WORDS;
        if long_source && text_similarity(&source, &translation) > DUPLICATE_SIMILARITY {
            debug!("Skipping context pair left untranslated");
            return false;
        }

        let window = self
            .windows
            .entry(Self::key(source_lang, target_lang))
            .or_default();

        if long_source
            && window
                .back()
                .is_some_and(|newest| text_similarity(&newest.source, &source) > DUPLICATE_SIMILARITY)
        {
            debug!("Skipping near-duplicate context pair");
            return false;
        }

        window.push_back(ContextEntry { source, translation });
        while window.len() > self.config.capacity {
            window.pop_front();
        }
        true
    }

    /// Clear the window of a language pair
    ///
    /// With `min_paragraphs` below the short-chapter threshold the window is
    /// kept, so short chapters inherit the previous chapter's context.
    /// Returns whether the window was cleared.
    pub fn reset(
        &mut self,
        source_lang: &str,
        target_lang: &str,
        min_paragraphs: Option<usize>,
    ) -> bool {
        if let Some(size) = min_paragraphs {
            if size < self.config.short_chapter_threshold {
                debug!(
                    "Keeping context for short chapter ({} < {} paragraphs)",
                    size, self.config.short_chapter_threshold
                );
                return false;
            }
        }
        self.windows.remove(&Self::key(source_lang, target_lang));
        true
    }

    /// Seed an empty window from stored translations
    ///
    /// Returns the number of pairs added. A failing source leaves the window
    /// empty; the run continues without context.
    pub async fn prefill(
        &mut self,
        source: &dyn ContextSource,
        source_lang: &str,
        target_lang: &str,
        edition: i64,
    ) -> usize {
        if !self.is_empty(source_lang, target_lang) {
            return 0;
        }

        let limit = self.config.prefill_size.min(self.config.capacity);
        if limit == 0 {
            return 0;
        }

        let pairs = match source
            .recent_pairs(source_lang, target_lang, edition, limit)
            .await
        {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("Context prefill failed, continuing without context: {:#}", e);
                return 0;
            }
        };

        let clean = self.config.clean;
        let added = pairs
            .iter()
            .rev()
            .filter(|pair| self.add(source_lang, target_lang, &pair.source, &pair.translation, clean))
            .count();
        if added > 0 {
            debug!(
                "Pre-filled {} → {} context with {} pairs",
                source_lang, target_lang, added
            );
        }
        added
    }

    /// Current pairs of a language pair, oldest first
    pub fn entries(&self, source_lang: &str, target_lang: &str) -> Vec<ContextEntry> {
        self.windows
            .get(&Self::key(source_lang, target_lang))
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return the newest pair
    pub fn pop_newest(&mut self, source_lang: &str, target_lang: &str) -> Option<ContextEntry> {
        self.windows
            .get_mut(&Self::key(source_lang, target_lang))
            .and_then(VecDeque::pop_back)
    }

    /// Number of pairs held for a language pair
    pub fn len(&self, source_lang: &str, target_lang: &str) -> usize {
        self.windows
            .get(&Self::key(source_lang, target_lang))
            .map_or(0, VecDeque::len)
    }

    /// Whether a language pair has no context yet
    pub fn is_empty(&self, source_lang: &str, target_lang: &str) -> bool {
        self.len(source_lang, target_lang) == 0
    }
}
