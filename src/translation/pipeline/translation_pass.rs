/*!
 * Translation pass for the main translation phase.
 *
 * Every unit goes through the same explicit state machine:
 *
 * `Pending → CacheCheck → (Hit → Done) | (Miss → Generating →
 * (Persisted → Done) | Reported)`
 *
 * Cached translations are reused (and re-stamped with the current
 * position), misses are generated with the pair's context window, persisted
 * and appended to the window. The pivot strategy runs two such hops through
 * an intermediate language and persists the composite result under the
 * direct pair so progress counters cover it.
 */

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::database::{LookupPolicy, RecordPosition, Repository, TranslationRecord, UNSCORED};
use crate::errors::TranslationError;
use crate::language_utils::languages_match;
use crate::translation::context::{ContextWindowConfig, ContextWindowManager};
use crate::translation::core::{Generation, TranslationService};
use crate::translation::document::Chapter;
use crate::translation::formatting::has_letters;

/// Model name recorded for units copied without generation
pub const COPY_MODEL: &str = "copy";

/// Quality score of copied units
const COPY_SCORE: i64 = 100;

/// How units travel from the source to the target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStrategy {
    /// One call, source to target
    #[default]
    Direct,
    /// Two calls through the pivot language
    Pivot,
}

impl fmt::Display for TranslationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationStrategy::Direct => write!(f, "direct"),
            TranslationStrategy::Pivot => write!(f, "pivot"),
        }
    }
}

impl FromStr for TranslationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(TranslationStrategy::Direct),
            "pivot" => Ok(TranslationStrategy::Pivot),
            _ => Err(anyhow!("Invalid translation strategy: {}", s)),
        }
    }
}

/// States of one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphState {
    Pending,
    CacheCheck,
    Hit,
    Miss,
    Generating,
    Persisted,
    Done,
    Reported,
}

impl ParagraphState {
    /// Whether no further transition can follow
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParagraphState::Done | ParagraphState::Reported)
    }
}

/// Why a unit is copied instead of translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    /// Nothing but markers, digits or punctuation
    NoLetters,
    /// Source and target are the same language
    SameLanguage,
    /// Above the configured word limit
    TooLong,
}

/// Configuration for the translation pass.
#[derive(Debug, Clone)]
pub struct TranslationPassConfig {
    /// Source language name
    pub source_language: String,

    /// Target language name
    pub target_language: String,

    /// Direct or pivot translation
    pub strategy: TranslationStrategy,

    /// Intermediate language of the pivot strategy
    pub pivot_language: String,

    /// Context window configuration
    pub window_config: ContextWindowConfig,

    /// Which editions may satisfy a cache lookup
    pub lookup_policy: LookupPolicy,

    /// Whether generated units are rated and regenerated when inadequate
    pub adequacy_check: bool,

    /// Lowest acceptable adequacy rating
    pub min_adequacy: u8,

    /// Longer units are copied through
    pub max_paragraph_words: usize,
}

impl Default for TranslationPassConfig {
    fn default() -> Self {
        Self {
            source_language: "English".to_string(),
            target_language: "Romanian".to_string(),
            strategy: TranslationStrategy::Direct,
            pivot_language: "French".to_string(),
            window_config: ContextWindowConfig::default(),
            lookup_policy: LookupPolicy::AnyEdition,
            adequacy_check: false,
            min_adequacy: 25,
            max_paragraph_words: 1000,
        }
    }
}

impl TranslationPassConfig {
    /// Create a direct configuration for a language pair.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    /// Translate through `pivot_language`.
    pub fn with_pivot(mut self, pivot_language: &str) -> Self {
        self.strategy = TranslationStrategy::Pivot;
        self.pivot_language = pivot_language.to_string();
        self
    }

    /// Rate generated units and regenerate those below `min_adequacy`.
    pub fn with_adequacy_check(mut self, min_adequacy: u8) -> Self {
        self.adequacy_check = true;
        self.min_adequacy = min_adequacy;
        self
    }

    /// Whether a unit is copied instead of translated
    pub fn passthrough(&self, text: &str) -> Option<Passthrough> {
        if !has_letters(text) {
            Some(Passthrough::NoLetters)
        } else if languages_match(&self.source_language, &self.target_language) {
            Some(Passthrough::SameLanguage)
        } else if text.split_whitespace().count() > self.max_paragraph_words {
            Some(Passthrough::TooLong)
        } else {
            None
        }
    }

    /// Distinct units of a chapter that need a stored translation
    pub fn expected_units(&self, chapter: &Chapter) -> usize {
        chapter
            .paragraphs
            .iter()
            .filter(|text| self.passthrough(text).is_none())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Language pairs whose context windows the strategy uses
    pub fn window_pairs(&self) -> Vec<(String, String)> {
        let direct = (self.source_language.clone(), self.target_language.clone());
        match self.strategy {
            TranslationStrategy::Direct => vec![direct],
            TranslationStrategy::Pivot => vec![
                direct,
                (self.source_language.clone(), self.pivot_language.clone()),
                (self.pivot_language.clone(), self.target_language.clone()),
            ],
        }
    }
}

/// What happened to one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    /// Translation, or the source text when the unit failed
    pub text: String,
    /// Model that produced the text
    pub model: String,
    pub elapsed_ms: i64,
    pub quality_score: i64,
    /// Every state the unit went through
    pub trail: Vec<ParagraphState>,
}

impl UnitOutcome {
    fn copied(text: &str) -> Self {
        Self {
            text: text.to_string(),
            model: COPY_MODEL.to_string(),
            elapsed_ms: 0,
            quality_score: COPY_SCORE,
            trail: vec![ParagraphState::Pending, ParagraphState::Done],
        }
    }

    /// Final state
    pub fn state(&self) -> ParagraphState {
        self.trail.last().copied().unwrap_or(ParagraphState::Pending)
    }

    /// Whether the unit ended successfully
    pub fn is_done(&self) -> bool {
        self.state() == ParagraphState::Done
    }

    /// Whether the translation came from the store
    pub fn is_cached(&self) -> bool {
        self.trail.contains(&ParagraphState::Hit)
    }
}

/// Statistics for a translation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationStats {
    /// Units processed
    pub units: usize,
    /// Units served from the store
    pub cache_hits: usize,
    /// Units generated
    pub generated: usize,
    /// Units copied without generation
    pub passthrough: usize,
    /// Units left in the source language
    pub failed: usize,
    /// Cached records moved to the current position
    pub restamped: usize,
    /// Store operations that failed and were skipped
    pub store_warnings: usize,
}

impl TranslationStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of units that ended with a translation.
    pub fn success_rate(&self) -> f32 {
        if self.units == 0 {
            1.0
        } else {
            (self.units - self.failed) as f32 / self.units as f32
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} units: {} cached, {} generated, {} copied, {} failed",
            self.units, self.cache_hits, self.generated, self.passthrough, self.failed
        )
    }
}

/// Result of translating one chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterResult {
    pub number: u32,
    /// Output units in chapter order, title first
    pub paragraphs: Vec<String>,
    /// Units left in the source language
    pub failed: usize,
}

/// One language hop of a unit
#[derive(Debug, Clone, Copy)]
struct Hop<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

/// Translation pass for translating chapters unit by unit.
#[derive(Debug)]
pub struct TranslationPass {
    config: TranslationPassConfig,
    windows: ContextWindowManager,
    stats: TranslationStats,
}

impl TranslationPass {
    /// Create a new translation pass with the given configuration.
    pub fn new(config: TranslationPassConfig) -> Self {
        let windows = ContextWindowManager::new(config.window_config.clone());
        Self {
            config,
            windows,
            stats: TranslationStats::new(),
        }
    }

    pub fn config(&self) -> &TranslationPassConfig {
        &self.config
    }

    pub fn stats(&self) -> &TranslationStats {
        &self.stats
    }

    /// Context windows owned by the pass
    pub fn windows(&self) -> &ContextWindowManager {
        &self.windows
    }

    /// Cached translation for a hop, re-stamped to `position` when it moved
    async fn cached(
        &mut self,
        store: &Repository,
        hop: Hop<'_>,
        position: RecordPosition,
    ) -> Option<(String, String, i64, i64)> {
        let found = store
            .lookup_with_policy(hop.text, hop.source, hop.target, self.config.lookup_policy, position.edition)
            .await;

        let cached = match found {
            Ok(cached) => cached?,
            Err(e) => {
                warn!("Translation store unavailable, treating as cache miss: {}", e);
                self.stats.store_warnings += 1;
                return None;
            }
        };

        if cached.position != position {
            match store
                .restamp(hop.text, hop.source, hop.target, &cached.model, position)
                .await
            {
                Ok(true) => self.stats.restamped += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Could not update the position of a cached translation: {}", e);
                    self.stats.store_warnings += 1;
                }
            }
        }

        debug!("Cache hit ({} -> {}): {}", hop.source, hop.target, hop.text);
        Some((
            cached.translated_text,
            cached.model,
            cached.elapsed_ms,
            cached.quality_score,
        ))
    }

    /// Persist a record, logging instead of failing
    async fn persist(&mut self, store: &Repository, record: &TranslationRecord) -> bool {
        match store.insert(record).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Translation not saved: {}", e);
                self.stats.store_warnings += 1;
                false
            }
        }
    }

    /// Generate a hop, regenerating once when the adequacy gate rejects it
    async fn generate_checked(
        &self,
        service: &TranslationService,
        hop: Hop<'_>,
    ) -> Result<(Generation, i64), TranslationError> {
        let context = self.windows.entries(hop.source, hop.target);
        let generation = service.translate(hop.text, hop.source, hop.target, &context).await?;
        if !self.config.adequacy_check {
            return Ok((generation, UNSCORED));
        }

        let score = service
            .rate_adequacy(hop.text, &generation.text, hop.source, hop.target)
            .await;
        if score >= self.config.min_adequacy {
            return Ok((generation, i64::from(score)));
        }

        warn!(
            "Adequacy {} below {}, regenerating: {}",
            score, self.config.min_adequacy, hop.text
        );
        match service.translate(hop.text, hop.source, hop.target, &context).await {
            Ok(retry) => {
                let retry_score = service
                    .rate_adequacy(hop.text, &retry.text, hop.source, hop.target)
                    .await;
                if retry_score > score {
                    Ok((retry, i64::from(retry_score)))
                } else {
                    Ok((generation, i64::from(score)))
                }
            }
            Err(e) => {
                warn!("Regeneration failed, keeping first result: {}", e);
                Ok((generation, i64::from(score)))
            }
        }
    }

    /// Run one hop through the state machine
    async fn run_hop(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        hop: Hop<'_>,
        position: RecordPosition,
    ) -> UnitOutcome {
        let mut trail = vec![ParagraphState::Pending, ParagraphState::CacheCheck];

        if let Some((text, model, elapsed_ms, quality_score)) = self.cached(store, hop, position).await {
            trail.extend([ParagraphState::Hit, ParagraphState::Done]);
            self.windows.add(hop.source, hop.target, hop.text, &text, self.config.window_config.clean);
            return UnitOutcome {
                text,
                model,
                elapsed_ms,
                quality_score,
                trail,
            };
        }

        trail.extend([ParagraphState::Miss, ParagraphState::Generating]);
        match self.generate_checked(service, hop).await {
            Ok((generation, quality_score)) => {
                let record = TranslationRecord::new(
                    hop.source,
                    hop.target,
                    hop.text,
                    &generation.text,
                    service.model(),
                )
                .at(position.edition, position.chapter, position.paragraph_index)
                .with_metrics(generation.elapsed_ms, quality_score);

                if self.persist(store, &record).await {
                    trail.push(ParagraphState::Persisted);
                }
                self.windows.add(hop.source, hop.target, hop.text, &generation.text, self.config.window_config.clean);
                trail.push(ParagraphState::Done);

                UnitOutcome {
                    text: generation.text,
                    model: service.model().to_string(),
                    elapsed_ms: generation.elapsed_ms,
                    quality_score,
                    trail,
                }
            }
            Err(e) => {
                error!(
                    "Translation failed ({} -> {}), keeping source text: {}",
                    hop.source, hop.target, e
                );
                trail.push(ParagraphState::Reported);
                UnitOutcome {
                    text: hop.text.to_string(),
                    model: service.model().to_string(),
                    elapsed_ms: 0,
                    quality_score: UNSCORED,
                    trail,
                }
            }
        }
    }

    /// Source to pivot to target, with the composite persisted directly
    async fn run_pivot(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        text: &str,
        position: RecordPosition,
    ) -> UnitOutcome {
        let source = self.config.source_language.clone();
        let target = self.config.target_language.clone();
        let pivot = self.config.pivot_language.clone();
        let direct = Hop {
            text,
            source: &source,
            target: &target,
        };

        let mut trail = vec![ParagraphState::Pending, ParagraphState::CacheCheck];
        if let Some((translated, model, elapsed_ms, quality_score)) = self.cached(store, direct, position).await {
            trail.extend([ParagraphState::Hit, ParagraphState::Done]);
            self.windows.add(&source, &target, text, &translated, self.config.window_config.clean);
            return UnitOutcome {
                text: translated,
                model,
                elapsed_ms,
                quality_score,
                trail,
            };
        }
        trail.extend([ParagraphState::Miss, ParagraphState::Generating]);

        let first = self
            .run_hop(service, store, Hop { text, source: &source, target: &pivot }, position)
            .await;
        if !first.is_done() {
            trail.push(ParagraphState::Reported);
            return UnitOutcome { text: text.to_string(), trail, ..first };
        }

        let second = self
            .run_hop(service, store, Hop { text: &first.text, source: &pivot, target: &target }, position)
            .await;
        if !second.is_done() {
            trail.push(ParagraphState::Reported);
            return UnitOutcome { text: text.to_string(), trail, ..second };
        }

        let model = format!("{}+{}", service.model(), pivot);
        let elapsed_ms = first.elapsed_ms + second.elapsed_ms;
        let quality_score = if first.quality_score >= 0 && second.quality_score >= 0 {
            first.quality_score.min(second.quality_score)
        } else {
            UNSCORED
        };

        let record = TranslationRecord::new(&source, &target, text, &second.text, &model)
            .at(position.edition, position.chapter, position.paragraph_index)
            .with_metrics(elapsed_ms, quality_score);
        if self.persist(store, &record).await {
            trail.push(ParagraphState::Persisted);
        }
        self.windows.add(&source, &target, text, &second.text, self.config.window_config.clean);
        trail.push(ParagraphState::Done);

        UnitOutcome {
            text: second.text,
            model,
            elapsed_ms,
            quality_score,
            trail,
        }
    }

    /// Translate one unit at `position`
    pub async fn translate_unit(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        text: &str,
        position: RecordPosition,
    ) -> UnitOutcome {
        self.stats.units += 1;

        if let Some(reason) = self.config.passthrough(text) {
            if reason == Passthrough::TooLong {
                warn!(
                    "Paragraph of {} words above the limit of {}, copied untranslated",
                    text.split_whitespace().count(),
                    self.config.max_paragraph_words
                );
            }
            self.stats.passthrough += 1;
            return UnitOutcome::copied(text);
        }

        let outcome = match self.config.strategy {
            TranslationStrategy::Direct => {
                let source = self.config.source_language.clone();
                let target = self.config.target_language.clone();
                let hop = Hop {
                    text,
                    source: &source,
                    target: &target,
                };
                self.run_hop(service, store, hop, position).await
            }
            TranslationStrategy::Pivot => self.run_pivot(service, store, text, position).await,
        };

        debug_assert!(outcome.state().is_terminal());
        if !outcome.is_done() {
            self.stats.failed += 1;
        } else if outcome.is_cached() {
            self.stats.cache_hits += 1;
        } else {
            self.stats.generated += 1;
        }
        outcome
    }

    /// Reset and prefill the windows before a chapter
    pub async fn prepare_context(&mut self, store: &Repository, chapter: &Chapter, edition: i64) {
        let expected = self.config.expected_units(chapter);
        for (source, target) in self.config.window_pairs() {
            self.windows.reset(&source, &target, Some(expected));
            let seeded = self.windows.prefill(store, &source, &target, edition).await;
            if seeded > 0 {
                debug!("Context {} -> {} prefilled with {} entries", source, target, seeded);
            }
        }
    }

    /// Translate every unit of a chapter in order
    ///
    /// `on_unit` is called after each unit with its index and outcome.
    pub async fn translate_chapter(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        chapter: &Chapter,
        edition: i64,
        on_unit: &mut dyn FnMut(usize, &UnitOutcome),
    ) -> ChapterResult {
        self.prepare_context(store, chapter, edition).await;

        let mut paragraphs = Vec::with_capacity(chapter.paragraphs.len());
        let mut failed = 0;
        for (index, text) in chapter.paragraphs.iter().enumerate() {
            let position = RecordPosition {
                edition,
                chapter: i64::from(chapter.number),
                paragraph_index: index as i64,
            };
            let outcome = self.translate_unit(service, store, text, position).await;
            if !outcome.is_done() {
                failed += 1;
            }
            on_unit(index, &outcome);
            paragraphs.push(outcome.text);
        }

        info!(
            "Chapter {} translated: {} units, {} failed",
            chapter.number,
            paragraphs.len(),
            failed
        );
        ChapterResult {
            number: chapter.number,
            paragraphs,
            failed,
        }
    }
}
