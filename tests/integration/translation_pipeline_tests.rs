/*!
 * End-to-end tests of the translation pipeline through the controller
 */

use std::sync::Arc;

use bookwai::app_config::Config;
use bookwai::app_controller::{Controller, TranslateOptions};
use bookwai::database::Repository;
use bookwai::file_utils::FileManager;
use bookwai::translation::TranslationStrategy;

use crate::common::mock_providers::ScriptedProvider;
use crate::common::{create_temp_dir, create_test_book, init_test_logging, sample_dictionary};

fn english_to_french() -> Config {
    let mut config = Config::default();
    config.source_language = "English".to_string();
    config.target_language = "French".to_string();
    config.pivot_language = "German".to_string();
    config
}

fn controller(provider: &ScriptedProvider, config: Config) -> Controller {
    let store = Repository::new_in_memory().unwrap();
    Controller::with_components(config, Arc::new(provider.clone()), store)
}

#[tokio::test]
async fn test_translate_shouldWriteTranslatedBookWithResources() {
    init_test_logging();
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    let result = controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(output.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.edition, 1);
    assert_eq!(result.translated_chapters, vec![1, 2]);
    assert_eq!(result.translation_stats.generated, 7);
    assert_eq!(result.translation_stats.passthrough, 1);
    assert_eq!(result.build.missing(), 0);

    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<title>La Tempête</title>"));
    assert!(chapter_one.contains("<h1>La Tempête</h1>"));
    assert!(chapter_one.contains("<p>Il faisait une nuit <strong>sombre</strong>.</p>"));
    assert!(chapter_one.contains("<p>Helena attendait près de la porte.</p>"));
    assert!(chapter_one.contains("<p>1914</p>"));
    assert!(chapter_one.contains("lang=\"fr\""));

    let chapter_two = FileManager::read_to_string(output.join("text/ch02.xhtml")).unwrap();
    assert!(chapter_two.contains("<h1>Le Matin</h1>"));
    assert!(chapter_two.contains("<p>La pluie cessa.</p>"));

    assert!(FileManager::file_exists(output.join("style.css")));
}

#[tokio::test]
async fn test_translate_withoutOutputDir_shouldWriteNextToInput() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    controller.translate(&book, TranslateOptions::default()).await.unwrap();

    assert!(FileManager::file_exists(temp_dir.path().join("book.fr/text/ch01.xhtml")));
}

#[tokio::test]
async fn test_translate_rerun_shouldNotSendNewRequests() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());
    let options = TranslateOptions {
        output_dir: Some(output.clone()),
        ..Default::default()
    };

    controller.translate(&book, options.clone()).await.unwrap();
    let first_run_requests = provider.translation_count();
    let rerun = controller.translate(&book, options).await.unwrap();

    assert_eq!(first_run_requests, 7);
    assert_eq!(provider.translation_count(), first_run_requests);
    assert_eq!(rerun.edition, 1);
    assert_eq!(rerun.translation_stats.cache_hits, 7);
    assert_eq!(rerun.translation_stats.generated, 0);
}

#[tokio::test]
async fn test_translate_withFailingUnit_shouldKeepSourceAndRecoverOnRerun() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::new(&sample_dictionary());
    provider.fail_on("Helena waited by the door");
    let controller = controller(&provider, english_to_french());
    let options = TranslateOptions {
        output_dir: Some(output.clone()),
        ..Default::default()
    };

    let first = controller.translate(&book, options.clone()).await.unwrap();

    assert_eq!(first.translation_stats.failed, 1);
    assert_eq!(first.build.missing(), 1);
    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<p>Helena waited by the door.</p>"));
    assert_eq!(
        controller
            .store()
            .count_untranslated(1, 1, "English", "French")
            .await
            .unwrap(),
        1
    );

    provider.recover("Helena waited by the door");
    let requests_before = provider.translation_count();
    let second = controller.translate(&book, options).await.unwrap();

    assert_eq!(provider.translation_count(), requests_before + 1);
    assert_eq!(second.translation_stats.generated, 1);
    assert_eq!(second.build.missing(), 0);
    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<p>Helena attendait près de la porte.</p>"));
}

#[tokio::test]
async fn test_translate_withSelector_shouldOnlyTranslateSelectedChapters() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    let result = controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(output.clone()),
                chapters: Some("2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.translated_chapters, vec![2]);
    assert_eq!(provider.translation_count(), 3);
    assert_eq!(result.build.missing(), 4);

    // Unselected chapters are still rebuilt, in the source language
    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<h1>The Storm</h1>"));
    let chapter_two = FileManager::read_to_string(output.join("text/ch02.xhtml")).unwrap();
    assert!(chapter_two.contains("<p>La pluie cessa.</p>"));
}

#[tokio::test]
async fn test_translate_withMalformedSelector_shouldFailBeforeAnyRequest() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    let result = controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(temp_dir.path().join("out")),
                chapters: Some("1,two".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(result.is_err());
    assert_eq!(provider.translation_count(), 0);
    assert!(!FileManager::dir_exists(temp_dir.path().join("out")));
}

#[tokio::test]
async fn test_translate_byLength_shouldStartWithShortestChapter() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    let result = controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(temp_dir.path().join("out")),
                by_length: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.translated_chapters, vec![2, 1]);
}

#[tokio::test]
async fn test_translate_withNewEdition_shouldReuseStoredTranslations() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());

    controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(output.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let second = controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(output),
                new_edition: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(second.edition, 2);
    assert_eq!(provider.translation_count(), 7);
    assert_eq!(second.translation_stats.cache_hits, 7);
    assert_eq!(second.translation_stats.restamped, 7);
    assert_eq!(
        controller
            .store()
            .count_untranslated(2, 1, "English", "French")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_translate_withPivot_shouldPersistEveryHop() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&[
        ("The rain stopped", "Der Regen hörte auf"),
        ("Der Regen hörte auf", "La pluie cessa"),
    ]);
    let mut config = english_to_french();
    config.strategy = TranslationStrategy::Pivot;
    let controller = controller(&provider, config);

    controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(temp_dir.path().join("out")),
                chapters: Some("2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let store = controller.store();
    let first_hop = store
        .lookup("The rain stopped.", "English", "German")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first_hop.translated_text, "Der Regen hörte auf.");
    let second_hop = store
        .lookup("Der Regen hörte auf.", "German", "French")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second_hop.translated_text, "La pluie cessa.");
    let composite = store
        .lookup("The rain stopped.", "English", "French")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(composite.translated_text, "La pluie cessa.");
    assert_eq!(composite.model, format!("{}+German", controller.config().translation.get_model()));
}

#[tokio::test]
async fn test_translate_withAdequacyCheck_shouldStoreRating() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary()).with_rating("85");
    let mut config = english_to_french();
    config.quality.adequacy_check = true;
    let controller = controller(&provider, config);

    controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(temp_dir.path().join("out")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = controller
        .store()
        .lookup("The rain stopped.", "English", "French")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quality_score, 85);
    assert_eq!(provider.translation_count(), 7);
}

#[tokio::test]
async fn test_proofread_shouldCorrectSelectedChaptersAndKeepOthers() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let mut entries = sample_dictionary();
    entries.push(("La Tempête", "La Grande Tempête"));
    entries.push(("Helena attendait près de la porte", "Helena attendait devant la porte"));
    let provider = ScriptedProvider::new(&entries);
    let controller = controller(&provider, english_to_french());
    let options = TranslateOptions {
        output_dir: Some(output.clone()),
        ..Default::default()
    };
    controller.translate(&book, options.clone()).await.unwrap();
    let requests_after_translation = provider.translation_count();

    let result = controller
        .proofread(
            &book,
            TranslateOptions {
                chapters: Some("1".to_string()),
                ..options.clone()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.proofread_chapters, vec![1]);
    assert_eq!(result.stats.proofread, 4);
    assert_eq!(result.stats.passthrough, 1);
    assert_eq!(result.stats.missing, 0);
    assert_eq!(provider.translation_count(), requests_after_translation + 4);

    let last_request = provider.translation_requests().pop().unwrap();
    assert!(last_request.messages[0].content.contains("proofreader"));

    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<title>La Grande Tempête</title>"));
    assert!(chapter_one.contains("<h1>La Grande Tempête</h1>"));
    assert!(chapter_one.contains("<p>Helena attendait devant la porte.</p>"));
    let chapter_two = FileManager::read_to_string(output.join("text/ch02.xhtml")).unwrap();
    assert!(chapter_two.contains("<p>La pluie cessa.</p>"));

    let stored = controller
        .store()
        .lookup("Helena attendait près de la porte.", "French", "French")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.translated_text, "Helena attendait devant la porte.");
    assert_eq!(
        stored.model,
        format!("{}+proofread", controller.config().translation.get_model())
    );
}

#[tokio::test]
async fn test_proofread_rerun_shouldServeCorrectionsFromStore() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider, english_to_french());
    let options = TranslateOptions {
        output_dir: Some(temp_dir.path().join("out")),
        ..Default::default()
    };
    controller.translate(&book, options.clone()).await.unwrap();
    controller.proofread(&book, options.clone()).await.unwrap();
    let requests = provider.translation_count();

    let rerun = controller.proofread(&book, options).await.unwrap();

    assert_eq!(provider.translation_count(), requests);
    assert_eq!(rerun.stats.cache_hits, 7);
    assert_eq!(rerun.stats.proofread, 0);
    assert_eq!(rerun.build.missing(), 0);
}
