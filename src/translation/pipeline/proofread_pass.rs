/*!
 * Proofread pass: a second look at stored translations.
 *
 * Each unit's stored translation is sent back to the model with the
 * proofreader prompt, inside the target language. The corrected text is
 * persisted under the (target, target) pair keyed by the translation, with
 * the `<model>+proofread` model tag, so reruns skip what was already
 * corrected and the build pass can prefer it.
 */

use log::{debug, error, info, warn};

use crate::database::{RecordPosition, Repository, TranslationRecord, UNSCORED};
use crate::translation::context::ContextWindowManager;
use crate::translation::core::TranslationService;
use crate::translation::document::Chapter;

use super::translation_pass::TranslationPassConfig;

/// Suffix of the model tag of proofread records
pub const PROOFREAD_SUFFIX: &str = "proofread";

/// Model tag recorded for text proofread by `model`
pub fn proofread_model(model: &str) -> String {
    format!("{}+{}", model, PROOFREAD_SUFFIX)
}

/// Proofread version of a stored translation, if one exists
pub async fn stored_proofread(
    store: &Repository,
    config: &TranslationPassConfig,
    translated: &str,
    edition: i64,
) -> Option<String> {
    let target = &config.target_language;
    match store
        .lookup_with_policy(translated, target, target, config.lookup_policy, edition)
        .await
    {
        Ok(found) => found.map(|cached| cached.translated_text),
        Err(e) => {
            warn!("Translation store unavailable, proofread text ignored: {}", e);
            None
        }
    }
}

/// Statistics for a proofread pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProofreadStats {
    /// Units processed
    pub units: usize,
    /// Units whose correction came from the store
    pub cache_hits: usize,
    /// Units sent to the model
    pub proofread: usize,
    /// Units copied without translation
    pub passthrough: usize,
    /// Units with no stored translation to proofread
    pub missing: usize,
    /// Units whose proofreading failed; the translation stays as is
    pub failed: usize,
    /// Store operations that failed and were skipped
    pub store_warnings: usize,
}

impl ProofreadStats {
    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} units: {} cached, {} proofread, {} copied, {} untranslated, {} failed",
            self.units, self.cache_hits, self.proofread, self.passthrough, self.missing, self.failed
        )
    }
}

/// Result of proofreading one chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ProofreadChapter {
    pub number: u32,
    /// Output units in chapter order; source text where no translation exists
    pub paragraphs: Vec<String>,
    /// Units whose proofreading failed
    pub failed: usize,
}

/// Proofread pass over the stored translations of a chapter.
#[derive(Debug)]
pub struct ProofreadPass {
    config: TranslationPassConfig,
    windows: ContextWindowManager,
    stats: ProofreadStats,
}

impl ProofreadPass {
    /// Create a new proofread pass for the configured language pair.
    pub fn new(config: TranslationPassConfig) -> Self {
        let windows = ContextWindowManager::new(config.window_config.clone());
        Self {
            config,
            windows,
            stats: ProofreadStats::default(),
        }
    }

    pub fn stats(&self) -> &ProofreadStats {
        &self.stats
    }

    /// Stored translation of a source unit
    async fn stored_translation(&mut self, store: &Repository, text: &str, edition: i64) -> Option<String> {
        let found = store
            .lookup_with_policy(
                text,
                &self.config.source_language,
                &self.config.target_language,
                self.config.lookup_policy,
                edition,
            )
            .await;
        match found {
            Ok(found) => found.map(|cached| cached.translated_text),
            Err(e) => {
                warn!("Translation store unavailable, unit skipped: {}", e);
                self.stats.store_warnings += 1;
                None
            }
        }
    }

    /// Proofread one unit at `position`, returning the text to output
    pub async fn proofread_unit(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        text: &str,
        position: RecordPosition,
    ) -> String {
        self.stats.units += 1;
        if self.config.passthrough(text).is_some() {
            self.stats.passthrough += 1;
            return text.to_string();
        }

        let Some(translated) = self.stored_translation(store, text, position.edition).await else {
            self.stats.missing += 1;
            return text.to_string();
        };

        let target = self.config.target_language.clone();
        let clean = self.config.window_config.clean;

        if let Some(corrected) = stored_proofread(store, &self.config, &translated, position.edition).await {
            debug!("Proofread cache hit: {}", translated);
            self.stats.cache_hits += 1;
            self.windows.add(&target, &target, &translated, &corrected, clean);
            return corrected;
        }

        let context = self.windows.entries(&target, &target);
        match service.translate(&translated, &target, &target, &context).await {
            Ok(generation) => {
                let record = TranslationRecord::new(
                    &target,
                    &target,
                    &translated,
                    &generation.text,
                    &proofread_model(service.model()),
                )
                .at(position.edition, position.chapter, position.paragraph_index)
                .with_metrics(generation.elapsed_ms, UNSCORED);
                if let Err(e) = store.insert(&record).await {
                    warn!("Proofread text not saved: {}", e);
                    self.stats.store_warnings += 1;
                }
                self.windows.add(&target, &target, &translated, &generation.text, clean);
                self.stats.proofread += 1;
                generation.text
            }
            Err(e) => {
                error!("Proofreading failed, keeping translation: {}", e);
                self.stats.failed += 1;
                translated
            }
        }
    }

    /// Proofread every unit of a chapter in order
    ///
    /// `on_unit` is called after each unit with its index.
    pub async fn proofread_chapter(
        &mut self,
        service: &TranslationService,
        store: &Repository,
        chapter: &Chapter,
        edition: i64,
        on_unit: &mut dyn FnMut(usize),
    ) -> ProofreadChapter {
        let target = self.config.target_language.clone();
        self.windows
            .reset(&target, &target, Some(self.config.expected_units(chapter)));
        self.windows.prefill(store, &target, &target, edition).await;

        let failed_before = self.stats.failed;
        let mut paragraphs = Vec::with_capacity(chapter.paragraphs.len());
        for (index, text) in chapter.paragraphs.iter().enumerate() {
            let position = RecordPosition {
                edition,
                chapter: i64::from(chapter.number),
                paragraph_index: index as i64,
            };
            paragraphs.push(self.proofread_unit(service, store, text, position).await);
            on_unit(index);
        }

        let failed = self.stats.failed - failed_before;
        info!(
            "Chapter {} proofread: {} units, {} failed",
            chapter.number,
            paragraphs.len(),
            failed
        );
        ProofreadChapter {
            number: chapter.number,
            paragraphs,
            failed,
        }
    }
}
