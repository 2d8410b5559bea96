/*!
 * Tests for configuration loading and provider presets
 */

use bookwai::app_config::{Config, LogLevel, TranslationProvider};
use bookwai::translation::TranslationStrategy;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_loadOrCreate_withExistingFile_shouldReadOverrides() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "source_language": "English",
            "target_language": "French",
            "pivot_language": "German",
            "strategy": "pivot",
            "translation": {
                "provider": "lmstudio",
                "available_providers": [
                    { "type": "lmstudio", "model": "mistral-nemo", "throttle_ms": 250 }
                ]
            },
            "context": { "capacity": 6, "clean": true },
            "quality": { "adequacy_check": true, "min_adequacy": 40 },
            "log_level": "debug"
        }"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.strategy, TranslationStrategy::Pivot);
    assert_eq!(config.translation.provider, TranslationProvider::LMStudio);
    assert_eq!(config.translation.get_model(), "mistral-nemo");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:1234/v1");
    assert_eq!(config.translation.get_throttle_ms(), 250);
    assert_eq!(config.context.capacity, 6);
    assert_eq!(config.context.prefill_size, 3);
    assert!(config.context.clean);
    assert!(config.quality.adequacy_check);
    assert_eq!(config.quality.max_paragraph_words, 1000);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(temp_dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_save_thenLoad_shouldKeepProviderSettings() {
    let temp_dir = create_temp_dir().unwrap();
    let path = temp_dir.path().join("nested/conf.json");
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::OpenRouter;
    config.translation.active_provider_config_mut().model = "anthropic/claude-3.5-sonnet".to_string();
    config.translation.active_provider_config_mut().api_key = "secret".to_string();

    config.save(&path).unwrap();
    let loaded = Config::load_or_create(&path).unwrap();

    assert_eq!(loaded.translation.provider, TranslationProvider::OpenRouter);
    assert_eq!(loaded.translation.get_model(), "anthropic/claude-3.5-sonnet");
    assert_eq!(loaded.translation.get_api_key(), "secret");
    assert_eq!(loaded.translation.get_endpoint(), "https://openrouter.ai/api/v1");
}

#[test]
fn test_providerPresets_shouldSeparateLocalAndRemote() {
    assert!(TranslationProvider::Ollama.is_local());
    assert!(TranslationProvider::LMStudio.is_local());
    assert!(!TranslationProvider::OpenAI.is_local());
    assert_eq!(TranslationProvider::DeepSeek.api_key_env(), Some("DEEPSEEK_API_KEY"));
    assert_eq!(TranslationProvider::Together.default_model(), "openai/gpt-oss-20b");
    assert_eq!(TranslationProvider::Mistral.display_name(), "Mistral AI");
}

#[test]
fn test_defaultPresets_shouldUseLongerTimeoutLocally() {
    let config = Config::default();
    let translation = &config.translation;

    let ollama = translation
        .get_provider_config(&TranslationProvider::Ollama)
        .unwrap();
    let openai = translation
        .get_provider_config(&TranslationProvider::OpenAI)
        .unwrap();

    assert_eq!(ollama.timeout_secs, 600);
    assert_eq!(openai.timeout_secs, 120);
    assert_eq!(translation.get_temperature(), 0.2);
}

#[test]
fn test_validate_withRemoteProviderWithoutKey_shouldOnlyWarn() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Mistral;
    config.translation.active_provider_config_mut().api_key.clear();

    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withInvalidLanguage_shouldFail() {
    let mut config = Config::default();
    config.target_language = "12$".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_logLevel_shouldMapToFilter() {
    assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
}
