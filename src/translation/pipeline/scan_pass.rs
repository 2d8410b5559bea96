/*!
 * Scan pass: registers chapter sizes before translation.
 *
 * The number of distinct units that need a stored translation is persisted
 * per chapter, so progress and ETA can be computed from the store alone and
 * an interrupted run knows how much is left.
 */

use log::{info, warn};

use crate::database::Repository;
use crate::translation::document::Chapter;

use super::translation_pass::TranslationPassConfig;

/// Result of the scan pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Edition the sizes were registered for
    pub edition: i64,

    /// Chapters scanned
    pub chapters: usize,

    /// Units expected over all chapters
    pub expected_units: usize,

    /// Sizes that could not be stored
    pub store_warnings: usize,
}

impl ScanResult {
    /// Get a description of the scan.
    pub fn description(&self) -> String {
        format!(
            "edition {}, {} chapters, {} units to translate",
            self.edition, self.chapters, self.expected_units
        )
    }
}

/// Scan pass for registering chapter sizes.
#[derive(Debug, Clone)]
pub struct ScanPass {
    config: TranslationPassConfig,
}

impl ScanPass {
    /// Create a new scan pass.
    pub fn new(config: TranslationPassConfig) -> Self {
        Self { config }
    }

    /// Edition to work on
    ///
    /// The latest edition known to the store (translated or scanned), or the
    /// next one when `new_edition` is set or nothing exists yet.
    pub async fn resolve_edition(&self, store: &Repository, new_edition: bool) -> i64 {
        let source = &self.config.source_language;
        let target = &self.config.target_language;

        let translated = store.latest_edition(source, target).await.unwrap_or_else(|e| {
            warn!("Could not read the latest edition: {}", e);
            0
        });
        let scanned = store
            .latest_scanned_edition(source, target)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not read the latest scanned edition: {}", e);
                0
            });

        let latest = translated.max(scanned);
        if new_edition || latest == 0 {
            info!("Starting edition {}", latest + 1);
            latest + 1
        } else {
            info!("Using existing edition {}", latest);
            latest
        }
    }

    /// Register the expected unit count of every chapter
    pub async fn scan(&self, store: &Repository, chapters: &[Chapter], edition: i64) -> ScanResult {
        let mut result = ScanResult {
            edition,
            chapters: chapters.len(),
            expected_units: 0,
            store_warnings: 0,
        };

        for chapter in chapters {
            let expected = self.config.expected_units(chapter);
            result.expected_units += expected;

            if let Err(e) = store
                .set_expected_paragraphs(
                    edition,
                    i64::from(chapter.number),
                    &self.config.source_language,
                    &self.config.target_language,
                    expected as i64,
                )
                .await
            {
                warn!("Could not register the size of chapter {}: {}", chapter.number, e);
                result.store_warnings += 1;
            }
        }

        info!("Scan complete: {}", result.description());
        result
    }
}
