// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;

use crate::app_config::{Config, LogLevel, TranslationProvider};
use crate::app_controller::{Controller, TranslateOptions};
use crate::errors::AppError;
use crate::translation::pipeline::TranslationStrategy;

mod app_config;
mod app_controller;
mod database;
mod errors;
mod file_utils;
mod language_utils;
mod providers;
mod translation;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Mistral,
    #[value(name = "deepseek")]
    DeepSeek,
    #[value(name = "lmstudio")]
    LMStudio,
    Together,
    #[value(name = "openrouter")]
    OpenRouter,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Mistral => TranslationProvider::Mistral,
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::Together => TranslationProvider::Together,
            CliTranslationProvider::OpenRouter => TranslationProvider::OpenRouter,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for TranslationStrategy to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStrategy {
    Direct,
    Pivot,
}

impl From<CliStrategy> for TranslationStrategy {
    fn from(cli_strategy: CliStrategy) -> Self {
        match cli_strategy {
            CliStrategy::Direct => TranslationStrategy::Direct,
            CliStrategy::Pivot => TranslationStrategy::Pivot,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a book and register chapter sizes for the next edition
    Extract {
        /// Book directory of XHTML parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Start a new edition instead of continuing the latest one
        #[arg(long)]
        new_edition: bool,
    },

    /// Translate selected chapters and write the translated book
    Translate(TranslateArgs),

    /// Proofread stored translations and write the corrected book
    Proofread {
        /// Book directory of XHTML parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (default: next to the input, suffixed with the target language code)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chapters to proofread, e.g. `1,3-5` (default: all)
        #[arg(short, long)]
        chapters: Option<String>,
    },

    /// Rebuild the translated book from stored translations only
    Build {
        /// Book directory of XHTML parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Quality report over the stored translation
    Report {
        /// Book directory of XHTML parts
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Search stored translations by source text
    Search {
        /// Text to look for
        query: String,
    },

    /// Export every stored translation to a CSV file
    ExportCsv {
        /// Destination file
        path: PathBuf,
    },

    /// Import stored translations from a CSV file
    ImportCsv {
        /// Backup file
        path: PathBuf,
    },

    /// Delete every stored translation
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completions for bookwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Book directory of XHTML parts
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (default: next to the input, suffixed with the target language code)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chapters to translate, e.g. "1,3-5,8"
    #[arg(short, long)]
    chapters: Option<String>,

    /// Translate the shortest chapters first
    #[arg(long)]
    by_length: bool,

    /// Start a new edition instead of continuing the latest one
    #[arg(long)]
    new_edition: bool,

    /// Pivot language (implies the pivot strategy)
    #[arg(long, value_name = "LANG")]
    pivot: Option<String>,

    /// Translation strategy
    #[arg(long, value_enum)]
    strategy: Option<CliStrategy>,
}

/// Options shared by every subcommand
#[derive(Args, Debug)]
struct GlobalArgs {
    /// Source language (name or ISO code, e.g. 'English', 'en')
    #[arg(short, long, global = true)]
    source: Option<String>,

    /// Target language (name or ISO code, e.g. 'Romanian', 'ro')
    #[arg(short, long, global = true)]
    target: Option<String>,

    /// Model name; 'provider@model' routes through OpenRouter's provider ordering
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Provider preset
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(short = 'u', long, global = true)]
    base_url: Option<String>,

    /// API key
    #[arg(short = 'k', long, env = "BOOKWAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Minimum delay between requests, in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    throttle: Option<f64>,

    /// Translation store database file
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Configuration file path
    #[arg(long = "config", value_name = "PATH", default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

/// BookwAI - book translation with AI
///
/// Translates books paragraph by paragraph through OpenAI-compatible
/// language model endpoints, keeping every translation in a local store.
#[derive(Parser, Debug)]
#[command(name = "bookwai")]
#[command(version)]
#[command(about = "AI-powered book translation tool")]
#[command(long_about = "BookwAI translates books, stored as directories of XHTML parts, paragraph by paragraph using AI providers.

EXAMPLES:
    bookwai translate book/ -s en -t ro                 # Translate the whole book
    bookwai translate book/ -c 1,3-5 -o book.ro/        # Translate chapters 1, 3, 4 and 5
    bookwai translate book/ --pivot French              # Translate through French
    bookwai -p openrouter -m deepinfra@qwen3 translate book/
    bookwai proofread book/ -c 2                        # Proofread the translation of chapter 2
    bookwai build book/ -o book.ro/                     # Rebuild from stored translations
    bookwai report book/                                # Quality report
    bookwai export-csv backup.csv                       # Back up the translation store
    bookwai completions bash > bookwai.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama     - Local Ollama server (http://localhost:11434/v1)
    openai     - OpenAI API (OPENAI_API_KEY)
    mistral    - Mistral AI API (MISTRAL_API_KEY)
    deepseek   - DeepSeek API (DEEPSEEK_API_KEY)
    lmstudio   - LM Studio local server (http://localhost:1234/v1)
    together   - Together AI API (TOGETHER_API_KEY)
    openrouter - OpenRouter API (OPENROUTER_API_KEY)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "bookwai", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = cli.global.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    let config = load_config(&cli.global, &cli.command)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

/// Load the configuration file and apply command line overrides
fn load_config(options: &GlobalArgs, command: &Commands) -> Result<Config> {
    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(provider) = options.provider {
        config.translation.provider = provider.into();
    }

    {
        let provider_config = config.translation.active_provider_config_mut();
        if let Some(model) = &options.model {
            provider_config.model = model.clone();
        }
        if let Some(base_url) = &options.base_url {
            provider_config.endpoint = base_url.clone();
        }
        if let Some(api_key) = &options.api_key {
            provider_config.api_key = api_key.clone();
        }
        if let Some(throttle) = options.throttle {
            if throttle < 0.0 {
                return Err(AppError::Config("Throttle must not be negative".to_string()).into());
            }
            provider_config.throttle_ms = (throttle * 1000.0).round() as u64;
        }
    }

    if let Some(source) = &options.source {
        config.source_language = source.clone();
    }
    if let Some(target) = &options.target {
        config.target_language = target.clone();
    }
    if let Some(db) = &options.db {
        config.store.path = Some(db.clone());
    }
    if let Some(level) = options.log_level {
        config.log_level = level.into();
    }

    if let Commands::Translate(args) = command {
        if let Some(pivot) = &args.pivot {
            config.pivot_language = pivot.clone();
            config.strategy = TranslationStrategy::Pivot;
        }
        if let Some(strategy) = args.strategy {
            config.strategy = strategy.into();
        }
    }

    config.normalize_languages()?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Extract { input, new_edition } => {
            controller.extract(&input, new_edition).await?;
        }
        Commands::Translate(args) => {
            let options = TranslateOptions {
                output_dir: args.output,
                chapters: args.chapters,
                by_length: args.by_length,
                new_edition: args.new_edition,
            };
            let result = controller.translate(&args.input, options).await?;
            if result.translation_stats.failed > 0 {
                warn!(
                    "{} paragraphs failed and were left untranslated; run again to retry them",
                    result.translation_stats.failed
                );
            }
        }
        Commands::Proofread { input, output, chapters } => {
            let options = TranslateOptions {
                output_dir: output,
                chapters,
                ..Default::default()
            };
            let result = controller.proofread(&input, options).await?;
            info!("Proofread: {}", result.stats.summary());
            if result.stats.missing > 0 {
                warn!(
                    "{} paragraphs have no stored translation; translate them before proofreading",
                    result.stats.missing
                );
            }
        }
        Commands::Build { input, output } => {
            controller.build(&input, Some(&output)).await?;
        }
        Commands::Report { input } => {
            let report = controller.report(&input).await?;
            println!("{}", report);
        }
        Commands::Search { query } => {
            let records = controller.search(&query).await?;
            for record in &records {
                println!(
                    "[{}:{}:{}] {}\n    => {}",
                    record.edition,
                    record.chapter,
                    record.paragraph_index,
                    record.source_text,
                    record.translated_text
                );
            }
            info!("{} matching translations", records.len());
        }
        Commands::ExportCsv { path } => {
            let count = controller.export_csv(&path).await?;
            info!("Success: {} translations exported to {:?}", count, path);
        }
        Commands::ImportCsv { path } => {
            let count = controller.import_csv(&path).await?;
            info!("Success: {} translations imported from {:?}", count, path);
        }
        Commands::Reset { yes } => {
            if !yes {
                return Err(AppError::Config(
                    "Refusing to delete every stored translation without --yes".to_string(),
                )
                .into());
            }
            let deleted = controller.reset().await?;
            info!("Success: {} translations deleted", deleted);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}
