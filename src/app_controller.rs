use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::database::{Repository, StoreStats, TranslationRecord};
use crate::file_utils::{DirectoryDocument, DirectoryOutput, FileManager};
use crate::providers::Provider;
use crate::providers::openai::OpenAI;
use crate::translation::core::TranslationService;
use crate::translation::document::{Chapter, DocumentSink, DocumentSource, chapters_from_parts};
use crate::translation::pipeline::{
    BuildResult, PipelineConfig, PipelineResult, ProofreadResult, ScanResult, TranslationPipeline,
};
use crate::translation::prompts::PromptKind;
use crate::translation::quality::{QualityEvaluator, QualityReport};

// @module: Application controller for book translation

/// Options of one translation run
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Output directory, next to the input when unset
    pub output_dir: Option<PathBuf>,
    /// Chapter selector, e.g. `1,3-5`
    pub chapters: Option<String>,
    /// Translate the shortest chapters first
    pub by_length: bool,
    /// Start a new edition
    pub new_edition: bool,
}

/// Main application controller for book translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Generation backend
    provider: Arc<dyn Provider>,
    // @field: Translation store
    store: Repository,
    // @field: Draw progress bars
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translation = &config.translation;
        let provider = OpenAI::new(
            translation.get_endpoint(),
            translation.get_api_key(),
            translation.get_timeout_secs(),
        )
        .context("Failed to create provider client")?
        .with_throttle(translation.get_throttle_ms());

        let store_path = config.store.resolved_path()?;
        let store = Repository::open(&store_path)
            .with_context(|| format!("Failed to open translation store: {:?}", store_path))?;

        info!(
            "Using {} ({}) at {}",
            translation.provider.display_name(),
            translation.get_model(),
            translation.get_endpoint()
        );

        Ok(Self {
            config,
            provider: Arc::new(provider),
            store,
            show_progress: true,
        })
    }

    /// Create a controller around an existing provider and store
    pub fn with_components(config: Config, provider: Arc<dyn Provider>, store: Repository) -> Self {
        Self {
            config,
            provider,
            store,
            show_progress: false,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the translation store
    pub fn store(&self) -> &Repository {
        &self.store
    }

    fn translation_service(&self) -> TranslationService {
        let translation = &self.config.translation;
        TranslationService::new(self.provider.clone(), &translation.get_model())
            .with_sampling(translation.get_temperature(), translation.get_max_tokens())
            .with_max_context_words(self.config.context.max_context_words)
    }

    fn pipeline(&self, options: &TranslateOptions) -> TranslationPipeline {
        TranslationPipeline::new(
            PipelineConfig::new(self.config.pass_config())
                .with_chapters(options.chapters.as_deref())
                .with_by_length(options.by_length)
                .with_new_edition(options.new_edition)
                .with_progress(self.show_progress),
        )
    }

    /// Read the chapters of a book directory
    pub fn load_chapters(&self, input_dir: &Path) -> Result<Vec<Chapter>> {
        let document = DirectoryDocument::open(input_dir)?;
        let parts = document.parts()?;
        if parts.is_empty() {
            return Err(anyhow!("No document parts found in {:?}", input_dir));
        }
        let chapters = chapters_from_parts(&parts)?;
        info!("Loaded {} chapters from {:?}", chapters.len(), input_dir);
        Ok(chapters)
    }

    fn output_dir(&self, input_dir: &Path, output_dir: Option<&Path>) -> PathBuf {
        output_dir.map(Path::to_path_buf).unwrap_or_else(|| {
            FileManager::generate_output_dir(input_dir, &self.config.target_language)
        })
    }

    fn write_output(&self, input_dir: &Path, output_dir: &Path, build: &BuildResult) -> Result<()> {
        let mut sink = DirectoryOutput::new(output_dir)?.with_resources_from(input_dir);
        for part in build.parts() {
            sink.write_part(part)?;
        }
        sink.finish()
    }

    /// Register chapter sizes for the next translation run
    pub async fn extract(&self, input_dir: &Path, new_edition: bool) -> Result<ScanResult> {
        let chapters = self.load_chapters(input_dir)?;
        let options = TranslateOptions {
            new_edition,
            ..Default::default()
        };
        let scan = self.pipeline(&options).extract(&self.store, &chapters).await;
        info!("Success: {}", scan.description());
        Ok(scan)
    }

    /// Translate the selected chapters and write the rebuilt book
    pub async fn translate(&self, input_dir: &Path, options: TranslateOptions) -> Result<PipelineResult> {
        let chapters = self.load_chapters(input_dir)?;
        let pipeline = self.pipeline(&options);
        let service = self.translation_service();
        let result = pipeline.translate(&service, &self.store, &chapters).await?;

        let output_dir = self.output_dir(input_dir, options.output_dir.as_deref());
        self.write_output(input_dir, &output_dir, &result.build)?;

        info!("{}", service.stats().summary());
        info!(
            "Success: {:?} (in {})",
            output_dir,
            Self::format_duration(result.duration)
        );
        Ok(result)
    }

    /// Proofread the stored translation of the selected chapters and write the rebuilt book
    pub async fn proofread(&self, input_dir: &Path, options: TranslateOptions) -> Result<ProofreadResult> {
        let chapters = self.load_chapters(input_dir)?;
        let service = self.translation_service().with_prompt_kind(PromptKind::Proofread);
        let result = self.pipeline(&options).proofread(&service, &self.store, &chapters).await?;

        let output_dir = self.output_dir(input_dir, options.output_dir.as_deref());
        self.write_output(input_dir, &output_dir, &result.build)?;

        info!("{}", service.stats().summary());
        info!(
            "Success: {:?} (in {})",
            output_dir,
            Self::format_duration(result.duration)
        );
        Ok(result)
    }

    /// Rebuild the book from the store without generating anything
    pub async fn build(&self, input_dir: &Path, output_dir: Option<&Path>) -> Result<BuildResult> {
        let chapters = self.load_chapters(input_dir)?;
        let (edition, build) = self
            .pipeline(&TranslateOptions::default())
            .build(&self.store, &chapters)
            .await;

        let output_dir = self.output_dir(input_dir, output_dir);
        self.write_output(input_dir, &output_dir, &build)?;

        if build.missing() > 0 {
            warn!(
                "{} paragraphs have no stored translation and were left in {}",
                build.missing(),
                self.config.source_language
            );
        }
        info!("Success: edition {} written to {:?}", edition, output_dir);
        Ok(build)
    }

    /// Quality report over the stored translation of the latest edition
    pub async fn report(&self, input_dir: &Path) -> Result<QualityReport> {
        let chapters = self.load_chapters(input_dir)?;
        let (_, build) = self
            .pipeline(&TranslateOptions::default())
            .build(&self.store, &chapters)
            .await;

        let evaluator = QualityEvaluator::new(self.provider.clone(), &self.config.translation.get_model());
        let report = evaluator
            .generate_quality_report(
                &build.pairs(),
                &self.config.source_language,
                &self.config.target_language,
            )
            .await;
        Ok(report)
    }

    /// Stored translations whose source contains `query`
    pub async fn search(&self, query: &str) -> Result<Vec<TranslationRecord>> {
        let records = self
            .store
            .search(query, &self.config.source_language, &self.config.target_language)
            .await?;
        Ok(records)
    }

    /// Export the whole store to a CSV file
    pub async fn export_csv(&self, path: &Path) -> Result<usize> {
        let count = self
            .store
            .export_all(path)
            .await
            .with_context(|| format!("Failed to export translations to {:?}", path))?;
        Ok(count)
    }

    /// Import a CSV backup into the store
    ///
    /// The backup carries translations only; run `extract` on the book
    /// afterwards to restore chapter sizes.
    pub async fn import_csv(&self, path: &Path) -> Result<usize> {
        let count = self
            .store
            .import_all(path)
            .await
            .with_context(|| format!("Failed to import translations from {:?}", path))?;
        let stats = self.store.stats().await?;
        if count > 0 && stats.scanned_chapters == 0 {
            info!("Chapter sizes are not in the backup, run `extract` on the book to restore progress counts");
        }
        Ok(count)
    }

    /// Delete every stored translation and chapter size
    pub async fn reset(&self) -> Result<usize> {
        let deleted = self.store.reset().await?;
        Ok(deleted)
    }

    /// Store statistics
    pub async fn store_stats(&self) -> Result<StoreStats> {
        let stats = self.store.stats().await?;
        Ok(stats)
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
