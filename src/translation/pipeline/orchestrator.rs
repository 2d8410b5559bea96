/*!
 * Pipeline orchestrator for coordinating translation passes.
 *
 * The orchestrator manages the three-phase translation pipeline:
 * 1. Scan Pass: chapter sizes registered for the edition
 * 2. Translation Pass: selected chapters translated unit by unit
 * 3. Build Pass: every chapter reassembled from the store
 *
 * Proofreading runs as its own phase over the latest edition, followed by
 * a build.
 */

use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::database::Repository;
use crate::translation::core::TranslationService;
use crate::translation::document::Chapter;
use crate::translation::selector::parse_chapter_selector;

use super::build_pass::{BuildPass, BuildResult};
use super::proofread_pass::{ProofreadPass, ProofreadStats};
use super::scan_pass::{ScanPass, ScanResult};
use super::translation_pass::{TranslationPass, TranslationPassConfig, TranslationStats};

/// Configuration for the translation pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Configuration shared by the passes
    pub translation_config: TranslationPassConfig,

    /// Chapters to translate, e.g. `1,3-5`; all when absent
    pub chapter_selector: Option<String>,

    /// Translate the shortest chapters first
    pub by_length: bool,

    /// Start a new edition instead of continuing the latest one
    pub new_edition: bool,

    /// Draw progress bars
    pub show_progress: bool,
}

impl PipelineConfig {
    /// Create a new pipeline configuration.
    pub fn new(translation_config: TranslationPassConfig) -> Self {
        Self {
            translation_config,
            ..Default::default()
        }
    }

    /// Restrict translation to the selected chapters.
    pub fn with_chapters(mut self, selector: Option<&str>) -> Self {
        self.chapter_selector = selector.map(str::to_string);
        self
    }

    /// Translate the shortest chapters first.
    pub fn with_by_length(mut self, by_length: bool) -> Self {
        self.by_length = by_length;
        self
    }

    /// Start a new edition.
    pub fn with_new_edition(mut self, new_edition: bool) -> Self {
        self.new_edition = new_edition;
        self
    }

    /// Enable or disable progress bars.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Phases of the translation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Chapter size registration
    Scan,
    /// Unit translation
    Translation,
    /// Correction of stored translations
    Proofread,
    /// Document reassembly
    Build,
}

/// Result of the complete pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Edition the run worked on
    pub edition: i64,

    /// Scan result
    pub scan: ScanResult,

    /// Chapters translated, in processing order
    pub translated_chapters: Vec<u32>,

    /// Translation statistics
    pub translation_stats: TranslationStats,

    /// Rebuilt document
    pub build: BuildResult,

    /// Total duration of pipeline execution
    pub duration: Duration,
}

impl PipelineResult {
    /// Get a summary of the pipeline result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("Duration: {:.2}s", self.duration.as_secs_f32()));
        parts.push(format!("Edition: {}", self.edition));
        parts.push(format!(
            "Translation: {} chapters, {}",
            self.translated_chapters.len(),
            self.translation_stats.summary()
        ));
        parts.push(format!(
            "Build: {} chapters, {} units untranslated",
            self.build.chapters.len(),
            self.build.missing()
        ));

        parts.join(" | ")
    }
}

/// Result of a proofreading run.
#[derive(Debug, Clone)]
pub struct ProofreadResult {
    /// Edition the run worked on
    pub edition: i64,

    /// Chapters proofread, in processing order
    pub proofread_chapters: Vec<u32>,

    /// Proofreading statistics
    pub stats: ProofreadStats,

    /// Rebuilt document
    pub build: BuildResult,

    /// Total duration of the run
    pub duration: Duration,
}

fn chapter_progress_bar(units: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let progress_bar = ProgressBar::new(units as u64);
    let template_result = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} paragraphs ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(template_result.progress_chars("█▓▒░"));
    progress_bar
}

/// The main translation pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    config: PipelineConfig,
    scan_pass: ScanPass,
    build_pass: BuildPass,
}

impl TranslationPipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        let scan_pass = ScanPass::new(config.translation_config.clone());
        let build_pass = BuildPass::new(config.translation_config.clone());

        Self {
            config,
            scan_pass,
            build_pass,
        }
    }

    /// Create a pipeline with default configuration for the given languages.
    pub fn for_languages(source_language: &str, target_language: &str) -> Self {
        Self::new(PipelineConfig::new(TranslationPassConfig::new(
            source_language,
            target_language,
        )))
    }

    /// Get the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Register chapter sizes for the edition the run works on
    pub async fn extract(&self, store: &Repository, chapters: &[Chapter]) -> ScanResult {
        let edition = self.scan_pass.resolve_edition(store, self.config.new_edition).await;
        self.scan_pass.scan(store, chapters, edition).await
    }

    /// Selected chapters in processing order
    ///
    /// Fails before any work when the selector is malformed.
    pub fn select_chapters<'a>(&self, chapters: &'a [Chapter]) -> Result<Vec<&'a Chapter>> {
        let available: Vec<u32> = chapters.iter().map(|c| c.number).collect();
        let numbers = parse_chapter_selector(self.config.chapter_selector.as_deref(), &available)?;

        let mut selected: Vec<&Chapter> = numbers
            .iter()
            .filter_map(|n| chapters.iter().find(|c| c.number == *n))
            .collect();

        if self.config.by_length {
            let pass_config = &self.config.translation_config;
            selected.sort_by_key(|c| (pass_config.expected_units(c), c.number));
        }
        Ok(selected)
    }

    /// Translate the selected chapters, then rebuild the whole document.
    pub async fn translate(
        &self,
        service: &TranslationService,
        store: &Repository,
        chapters: &[Chapter],
    ) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let selected = self.select_chapters(chapters)?;
        let pass_config = &self.config.translation_config;

        // Phase 1: Scan
        info!("Phase {:?}: {} chapters", PipelinePhase::Scan, chapters.len());
        let scan = self.extract(store, chapters).await;
        let edition = scan.edition;

        // Phase 2: Translation
        info!(
            "Phase {:?}: {} chapters, {} -> {} ({})",
            PipelinePhase::Translation,
            selected.len(),
            pass_config.source_language,
            pass_config.target_language,
            pass_config.strategy
        );
        let mut pass = TranslationPass::new(pass_config.clone());
        let mut translated_chapters = Vec::with_capacity(selected.len());

        for chapter in selected {
            let chapter_number = i64::from(chapter.number);
            match store
                .chapter_stats(edition, chapter_number, &pass_config.source_language, &pass_config.target_language)
                .await
            {
                Ok(stats) => info!("Chapter {}: {}", chapter.number, stats),
                Err(e) => warn!("No statistics for chapter {}: {}", chapter.number, e),
            }

            let progress_bar = chapter_progress_bar(chapter.paragraphs.len(), self.config.show_progress);
            progress_bar.set_message(format!("Chapter {}", chapter.number));

            let result = pass
                .translate_chapter(service, store, chapter, edition, &mut |_, outcome| {
                    if !outcome.is_cached() && outcome.elapsed_ms > 0 {
                        progress_bar.set_message(format!(
                            "Chapter {} ({:.1}s/paragraph)",
                            chapter.number,
                            outcome.elapsed_ms as f64 / 1000.0
                        ));
                    }
                    progress_bar.inc(1);
                })
                .await;
            progress_bar.finish_and_clear();

            if result.failed > 0 {
                warn!(
                    "Chapter {}: {} paragraphs left untranslated",
                    result.number, result.failed
                );
            }
            translated_chapters.push(result.number);
        }

        // Phase 3: Build
        info!("Phase {:?}", PipelinePhase::Build);
        let build = self.build_pass.build(store, chapters, edition).await;

        let result = PipelineResult {
            edition,
            scan,
            translated_chapters,
            translation_stats: pass.stats().clone(),
            build,
            duration: start_time.elapsed(),
        };
        info!("{}", result.summary());
        Ok(result)
    }

    /// Proofread the stored translations of the selected chapters, then rebuild.
    ///
    /// `service` should carry the proofreading prompt. Works on the latest
    /// edition; units without a stored translation are left alone.
    pub async fn proofread(
        &self,
        service: &TranslationService,
        store: &Repository,
        chapters: &[Chapter],
    ) -> Result<ProofreadResult> {
        let start_time = Instant::now();
        let selected = self.select_chapters(chapters)?;
        let pass_config = &self.config.translation_config;
        let edition = self.scan_pass.resolve_edition(store, false).await;

        info!(
            "Phase {:?}: {} chapters in {} (edition {})",
            PipelinePhase::Proofread,
            selected.len(),
            pass_config.target_language,
            edition
        );
        let mut pass = ProofreadPass::new(pass_config.clone());
        let mut proofread_chapters = Vec::with_capacity(selected.len());

        for chapter in selected {
            let progress_bar = chapter_progress_bar(chapter.paragraphs.len(), self.config.show_progress);
            progress_bar.set_message(format!("Proofreading chapter {}", chapter.number));
            let result = pass
                .proofread_chapter(service, store, chapter, edition, &mut |_| progress_bar.inc(1))
                .await;
            progress_bar.finish_and_clear();

            if result.failed > 0 {
                warn!(
                    "Chapter {}: {} paragraphs kept their unproofread translation",
                    result.number, result.failed
                );
            }
            proofread_chapters.push(result.number);
        }

        info!("Phase {:?}", PipelinePhase::Build);
        let build = self.build_pass.build(store, chapters, edition).await;

        let result = ProofreadResult {
            edition,
            proofread_chapters,
            stats: pass.stats().clone(),
            build,
            duration: start_time.elapsed(),
        };
        info!("Proofread: {}", result.stats.summary());
        Ok(result)
    }

    /// Rebuild the document from the store only
    pub async fn build(&self, store: &Repository, chapters: &[Chapter]) -> (i64, BuildResult) {
        let edition = self.scan_pass.resolve_edition(store, false).await;
        let build = self.build_pass.build(store, chapters, edition).await;
        (edition, build)
    }
}
