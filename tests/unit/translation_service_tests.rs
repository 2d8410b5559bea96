/*!
 * Tests for the translation service and the per-unit translation pass
 */

use std::sync::Arc;

use bookwai::database::{RecordPosition, Repository};
use bookwai::providers::mock::MockProvider;
use bookwai::translation::context::ContextEntry;
use bookwai::translation::pipeline::{ParagraphState, TranslationPass, TranslationPassConfig, COPY_MODEL};
use bookwai::translation::TranslationService;

use crate::common::mock_providers::ScriptedProvider;

fn position(paragraph_index: i64) -> RecordPosition {
    RecordPosition {
        edition: 1,
        chapter: 1,
        paragraph_index,
    }
}

#[tokio::test]
async fn test_translate_withContext_shouldReplayPriorTurns() {
    let provider = MockProvider::working();
    let service = TranslationService::new(Arc::new(provider.clone()), "mock");
    let context = vec![
        ContextEntry::new("Helena smiled.", "Helena sourit."),
        ContextEntry::new("Marcus frowned.", "Marcus fronça les sourcils."),
    ];

    let result = service
        .translate("She left.", "English", "French", &context)
        .await
        .unwrap();

    assert_eq!(result.text, "[TRANSLATED] She left.");
    let request = &provider.requests()[0];
    let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user", "assistant", "user"]);
    assert_eq!(request.messages[1].content, "<english>Helena smiled.</english>");
    assert_eq!(request.messages[2].content, "<french>Helena sourit.</french>");
    assert_eq!(request.last_user_message(), Some("<english>She left</english>"));
}

#[tokio::test]
async fn test_translate_withFailingProvider_shouldCountFailure() {
    let service = TranslationService::new(Arc::new(MockProvider::failing()), "mock");

    let result = service.translate("She left.", "English", "French", &[]).await;

    assert!(result.is_err());
    let stats = service.stats();
    assert_eq!(stats.requests, 0);
    assert_eq!(stats.failures, 1);
}

#[tokio::test]
async fn test_stats_shouldCountCharactersOfCores() {
    let provider = ScriptedProvider::new(&[("Morning", "Le Matin")]);
    let service = TranslationService::new(Arc::new(provider), "mock");

    service.translate("# Morning", "English", "French", &[]).await.unwrap();

    let stats = service.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.characters_in, 7);
    assert_eq!(stats.characters_out, 8);
    assert!(stats.summary().contains("mock"));
}

#[tokio::test]
async fn test_translateUnit_shouldPersistThenServeFromStore() {
    let provider = ScriptedProvider::new(&[("The rain stopped", "La pluie cessa")]);
    let service = TranslationService::new(Arc::new(provider.clone()), "mock");
    let store = Repository::new_in_memory().unwrap();
    let mut pass = TranslationPass::new(TranslationPassConfig::new("English", "French"));

    let first = pass
        .translate_unit(&service, &store, "The rain stopped.", position(3))
        .await;
    let second = pass
        .translate_unit(&service, &store, "The rain stopped.", position(3))
        .await;

    assert_eq!(first.text, "La pluie cessa.");
    assert!(first.trail.contains(&ParagraphState::Persisted));
    assert!(second.is_cached());
    assert_eq!(second.text, "La pluie cessa.");
    assert_eq!(provider.translation_count(), 1);
    assert_eq!(pass.stats().generated, 1);
    assert_eq!(pass.stats().cache_hits, 1);
}

#[tokio::test]
async fn test_translateUnit_withFailure_shouldKeepSourceAndPersistNothing() {
    let service = TranslationService::new(Arc::new(MockProvider::failing()), "mock");
    let store = Repository::new_in_memory().unwrap();
    let mut pass = TranslationPass::new(TranslationPassConfig::new("English", "French"));

    let outcome = pass
        .translate_unit(&service, &store, "She left.", position(1))
        .await;

    assert_eq!(outcome.text, "She left.");
    assert_eq!(outcome.state(), ParagraphState::Reported);
    assert_eq!(pass.stats().failed, 1);
    assert!(store.lookup("She left.", "English", "French").await.unwrap().is_none());
}

#[tokio::test]
async fn test_translateUnit_withSameLanguage_shouldCopyWithoutRequest() {
    let provider = MockProvider::working();
    let service = TranslationService::new(Arc::new(provider.clone()), "mock");
    let store = Repository::new_in_memory().unwrap();
    let mut pass = TranslationPass::new(TranslationPassConfig::new("English", "en"));

    let outcome = pass
        .translate_unit(&service, &store, "She left.", position(1))
        .await;

    assert_eq!(outcome.text, "She left.");
    assert_eq!(outcome.model, COPY_MODEL);
    assert_eq!(outcome.quality_score, 100);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(store.stats().await.unwrap().record_count, 0);
}

#[tokio::test]
async fn test_translateUnit_withLowAdequacy_shouldRegenerateOnce() {
    let provider = ScriptedProvider::new(&[]).with_rating("10");
    let service = TranslationService::new(Arc::new(provider.clone()), "mock");
    let store = Repository::new_in_memory().unwrap();
    let mut pass = TranslationPass::new(
        TranslationPassConfig::new("English", "French").with_adequacy_check(50),
    );

    let outcome = pass
        .translate_unit(&service, &store, "She left.", position(1))
        .await;

    assert!(outcome.is_done());
    assert_eq!(outcome.quality_score, 10);
    assert_eq!(provider.translation_count(), 2);
}
