/*!
 * Build pass: reassembles the translated document from the store.
 *
 * No generation happens here. Every unit is looked up; units without a
 * stored translation keep their source text, so a partial run still
 * produces a complete, readable document. A proofread version of a
 * translation replaces it when one is stored.
 */

use log::{info, warn};

use crate::database::Repository;
use crate::language_utils::language_code;
use crate::translation::document::{from_structured_markup, render_page, Chapter, DocumentPart};
use crate::translation::quality::ChapterPair;

use super::proofread_pass::stored_proofread;
use super::translation_pass::TranslationPassConfig;

/// One rebuilt chapter
#[derive(Debug, Clone)]
pub struct BuiltChapter {
    /// Rebuilt part, ready for the document sink
    pub part: DocumentPart,
    /// Units that had a stored translation, paired with their source
    pub pair: ChapterPair,
    /// Units left in the source language
    pub missing: usize,
}

/// Result of the build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub chapters: Vec<BuiltChapter>,
}

impl BuildResult {
    /// Rebuilt parts in document order
    pub fn parts(&self) -> impl Iterator<Item = &DocumentPart> {
        self.chapters.iter().map(|c| &c.part)
    }

    /// Translated pairs of every chapter
    pub fn pairs(&self) -> Vec<ChapterPair> {
        self.chapters.iter().map(|c| c.pair.clone()).collect()
    }

    /// Units left in the source language over all chapters
    pub fn missing(&self) -> usize {
        self.chapters.iter().map(|c| c.missing).sum()
    }
}

/// Build pass for reassembling chapters.
#[derive(Debug, Clone)]
pub struct BuildPass {
    config: TranslationPassConfig,
}

impl BuildPass {
    /// Create a new build pass.
    pub fn new(config: TranslationPassConfig) -> Self {
        Self { config }
    }

    /// Stored translation of every unit, source text where none exists
    async fn lookup_units(&self, store: &Repository, chapter: &Chapter, edition: i64) -> BuiltUnits {
        let mut units = BuiltUnits::default();

        for text in &chapter.paragraphs {
            if self.config.passthrough(text).is_some() {
                units.output.push(text.clone());
                continue;
            }

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
                Ok(Some(cached)) => {
                    let translated = stored_proofread(store, &self.config, &cached.translated_text, edition)
                        .await
                        .unwrap_or(cached.translated_text);
                    units.source.push(text.clone());
                    units.translated.push(translated.clone());
                    units.output.push(translated);
                }
                Ok(None) => {
                    units.missing += 1;
                    units.output.push(text.clone());
                }
                Err(e) => {
                    warn!("Translation store unavailable while building: {}", e);
                    units.missing += 1;
                    units.output.push(text.clone());
                }
            }
        }
        units
    }

    /// Render a chapter from its output units, title first
    pub fn render_chapter(&self, chapter: &Chapter, units: &[String]) -> DocumentPart {
        let body = units.iter().skip(1).cloned().collect::<Vec<_>>().join("\n\n");
        let rich = from_structured_markup(&body);

        let title = units
            .first()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or(rich.title)
            .unwrap_or_else(|| chapter.name.clone());

        let content = render_page(&title, &rich.body, &language_code(&self.config.target_language));
        DocumentPart::new(&chapter.part_id, &chapter.name, &content)
    }

    /// Rebuild every chapter from the store
    pub async fn build(&self, store: &Repository, chapters: &[Chapter], edition: i64) -> BuildResult {
        let mut result = BuildResult::default();

        for chapter in chapters {
            let units = self.lookup_units(store, chapter, edition).await;
            let part = self.render_chapter(chapter, &units.output);
            result.chapters.push(BuiltChapter {
                part,
                pair: ChapterPair::new(chapter.number, units.source, units.translated),
                missing: units.missing,
            });
        }

        info!(
            "Built {} chapters, {} units without translation",
            result.chapters.len(),
            result.missing()
        );
        result
    }
}

#[derive(Debug, Default)]
struct BuiltUnits {
    output: Vec<String>,
    source: Vec<String>,
    translated: Vec<String>,
    missing: usize,
}
