use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::database::{DatabaseConnection, LookupPolicy};
use crate::language_utils::{languages_match, normalize_language_name};
use crate::translation::context::ContextWindowConfig;
use crate::translation::pipeline::{TranslationPassConfig, TranslationStrategy};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (English name or ISO 639 code)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language (English name or ISO 639 code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Intermediate language of the pivot strategy
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,

    /// Direct or pivot translation
    #[serde(default)]
    pub strategy: TranslationStrategy,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Context window settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Translation store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Quality gate settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider preset
///
/// Every preset speaks the OpenAI chat completion protocol; they differ in
/// endpoint, default model and where the API key comes from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama local server
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Mistral AI
    Mistral,
    // @provider: DeepSeek
    DeepSeek,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: Together AI
    Together,
    // @provider: OpenRouter
    OpenRouter,
}

impl TranslationProvider {
    /// All presets, in display order
    pub const ALL: [TranslationProvider; 7] = [
        Self::Ollama,
        Self::OpenAI,
        Self::Mistral,
        Self::DeepSeek,
        Self::LMStudio,
        Self::Together,
        Self::OpenRouter,
    ];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Mistral => "Mistral AI",
            Self::DeepSeek => "DeepSeek",
            Self::LMStudio => "LM Studio",
            Self::Together => "Together AI",
            Self::OpenRouter => "OpenRouter",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Mistral => "mistral".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Together => "together".to_string(),
            Self::OpenRouter => "openrouter".to_string(),
        }
    }

    // @returns: Environment variable holding the API key, none for local servers
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama | Self::LMStudio => None,
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Mistral => Some("MISTRAL_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Together => Some("TOGETHER_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
        }
    }

    // @returns: Whether the preset runs on the local machine
    pub fn is_local(&self) -> bool {
        self.api_key_env().is_none()
    }

    // @returns: Default endpoint of the preset
    pub fn default_endpoint(&self) -> String {
        match self {
            Self::Ollama => "http://localhost:11434/v1",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::DeepSeek => "https://api.deepseek.com/v1",
            Self::LMStudio => "http://localhost:1234/v1",
            Self::Together => "https://api.together.xyz/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
        .to_string()
    }

    // @returns: Default model of the preset
    pub fn default_model(&self) -> String {
        match self {
            Self::Ollama => "gemma3n:e4b",
            Self::OpenAI => "gpt-4o",
            Self::Mistral => "mistral-large-latest",
            Self::DeepSeek => "deepseek-chat",
            Self::LMStudio => "qwen2.5-72b",
            Self::Together => "openai/gpt-oss-20b",
            Self::OpenRouter => "openai/gpt-4o",
        }
        .to_string()
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "mistral" => Ok(Self::Mistral),
            "deepseek" => Ok(Self::DeepSeek),
            "lmstudio" => Ok(Self::LMStudio),
            "together" => Ok(Self::Together),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name, `provider@model` routes through OpenRouter's provider ordering
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Minimum delay between requests (milliseconds)
    #[serde(default)]
    pub throttle_ms: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: provider_type.default_model(),
            api_key: String::new(),
            endpoint: provider_type.default_endpoint(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: if provider_type.is_local() {
                default_local_timeout_secs()
            } else {
                default_timeout_secs()
            },
            throttle_ms: 0,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,
}

/// Context window settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextConfig {
    /// Pairs kept per language pair
    #[serde(default = "default_context_capacity")]
    pub capacity: usize,

    /// Stored pairs used to seed an empty window
    #[serde(default = "default_prefill_size")]
    pub prefill_size: usize,

    /// Chapters shorter than this keep the previous chapter's context
    #[serde(default = "default_short_chapter_threshold")]
    pub short_chapter_threshold: usize,

    /// Strip formatting envelopes from stored context pairs
    #[serde(default)]
    pub clean: bool,

    /// Word budget of the replayed context
    #[serde(default = "default_max_context_words")]
    pub max_context_words: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            capacity: default_context_capacity(),
            prefill_size: default_prefill_size(),
            short_chapter_threshold: default_short_chapter_threshold(),
            clean: false,
            max_context_words: default_max_context_words(),
        }
    }
}

/// Translation store settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Database file, the per-user data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Only records of the current edition satisfy a cache lookup
    #[serde(default)]
    pub edition_aware_lookup: bool,
}

impl StoreConfig {
    /// Database file to open
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_database_path(),
        }
    }

    /// Cache lookup policy derived from `edition_aware_lookup`
    pub fn lookup_policy(&self) -> LookupPolicy {
        if self.edition_aware_lookup {
            LookupPolicy::SameEdition
        } else {
            LookupPolicy::AnyEdition
        }
    }
}

/// Quality gate settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityConfig {
    /// Rate every generated unit and regenerate inadequate ones
    #[serde(default)]
    pub adequacy_check: bool,

    /// Lowest acceptable adequacy rating (0-100)
    #[serde(default = "default_min_adequacy")]
    pub min_adequacy: u8,

    /// Longer paragraphs are copied through untranslated
    #[serde(default = "default_max_paragraph_words")]
    pub max_paragraph_words: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            adequacy_check: false,
            min_adequacy: default_min_adequacy(),
            max_paragraph_words: default_max_paragraph_words(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Romanian".to_string()
}

fn default_pivot_language() -> String {
    "French".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_local_timeout_secs() -> u64 {
    // Local models on modest hardware can take minutes per paragraph
    600
}

fn default_context_capacity() -> usize {
    10
}

fn default_prefill_size() -> usize {
    3
}

fn default_short_chapter_threshold() -> usize {
    2 * default_context_capacity()
}

fn default_max_context_words() -> usize {
    512
}

fn default_min_adequacy() -> u8 {
    25
}

fn default_max_paragraph_words() -> usize {
    1000
}

impl Config {
    /// Load the configuration, writing a default file when none exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))?;
        Ok(())
    }

    /// Replace language codes with English language names
    pub fn normalize_languages(&mut self) -> Result<()> {
        self.source_language = normalize_language_name(&self.source_language)
            .context("Invalid source language")?;
        self.target_language = normalize_language_name(&self.target_language)
            .context("Invalid target language")?;
        self.pivot_language = normalize_language_name(&self.pivot_language)
            .context("Invalid pivot language")?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        normalize_language_name(&self.source_language).context("Invalid source language")?;
        normalize_language_name(&self.target_language).context("Invalid target language")?;

        if self.strategy == TranslationStrategy::Pivot {
            normalize_language_name(&self.pivot_language).context("Invalid pivot language")?;
            if languages_match(&self.pivot_language, &self.source_language)
                || languages_match(&self.pivot_language, &self.target_language)
            {
                return Err(anyhow!(
                    "Pivot language {} must differ from the source and target languages",
                    self.pivot_language
                ));
            }
        }

        let endpoint = self.translation.get_endpoint();
        url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid provider endpoint: {}", endpoint))?;

        if self.context.capacity == 0 {
            return Err(anyhow!("Context capacity must be greater than 0"));
        }

        let temperature = self.translation.get_temperature();
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                temperature
            ));
        }

        if self.quality.min_adequacy > 100 {
            return Err(anyhow!("Minimum adequacy must be at most 100"));
        }

        if !self.translation.provider.is_local() && self.translation.get_api_key().is_empty() {
            warn!(
                "No API key configured for {}; requests will likely be rejected",
                self.translation.provider.display_name()
            );
        }

        Ok(())
    }

    /// Context window settings for the translation pass
    pub fn window_config(&self) -> ContextWindowConfig {
        ContextWindowConfig {
            capacity: self.context.capacity,
            prefill_size: self.context.prefill_size,
            short_chapter_threshold: self.context.short_chapter_threshold,
            clean: self.context.clean,
        }
    }

    /// Settings of the scan, translation and build passes
    pub fn pass_config(&self) -> TranslationPassConfig {
        TranslationPassConfig {
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            strategy: self.strategy,
            pivot_language: self.pivot_language.clone(),
            window_config: self.window_config(),
            lookup_policy: self.store.lookup_policy(),
            adequacy_check: self.quality.adequacy_check,
            min_adequacy: self.quality.min_adequacy,
            max_paragraph_words: self.quality.max_paragraph_words,
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            pivot_language: default_pivot_language(),
            strategy: TranslationStrategy::default(),
            translation: TranslationConfig::default(),
            context: ContextConfig::default(),
            store: StoreConfig::default(),
            quality: QualityConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable configuration of the active provider, created from the preset when missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        self.provider.default_model()
    }

    /// Get the API key for the active provider
    ///
    /// Falls back to the preset's environment variable.
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        self.provider
            .api_key_env()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        self.provider.default_endpoint()
    }

    /// Get the sampling temperature for the active provider
    pub fn get_temperature(&self) -> f32 {
        self.get_active_provider_config()
            .map(|p| p.temperature)
            .unwrap_or_else(default_temperature)
    }

    /// Get the completion token limit for the active provider
    pub fn get_max_tokens(&self) -> u32 {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .filter(|tokens| *tokens > 0)
            .unwrap_or_else(default_max_tokens)
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the throttle delay for the active provider
    pub fn get_throttle_ms(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.throttle_ms)
            .unwrap_or_default()
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL
                .iter()
                .map(|provider| ProviderConfig::new(*provider))
                .collect(),
        }
    }
}
