/*!
 * Full controller lifecycle: extract, translate, build, report, search, reset
 */

use std::sync::Arc;

use bookwai::app_config::Config;
use bookwai::app_controller::{Controller, TranslateOptions};
use bookwai::database::Repository;
use bookwai::file_utils::FileManager;

use crate::common::mock_providers::ScriptedProvider;
use crate::common::{create_temp_dir, create_test_book, sample_dictionary};

fn english_to_french() -> Config {
    let mut config = Config::default();
    config.source_language = "English".to_string();
    config.target_language = "French".to_string();
    config
}

fn controller(provider: &ScriptedProvider) -> Controller {
    let store = Repository::new_in_memory().unwrap();
    Controller::with_components(english_to_french(), Arc::new(provider.clone()), store)
}

#[test]
fn test_withConfig_shouldOpenStoreAtConfiguredPath() {
    let temp_dir = create_temp_dir().unwrap();
    let db_path = temp_dir.path().join("store/translations.db");
    let mut config = english_to_french();
    config.store.path = Some(db_path.clone());

    let controller = Controller::with_config(config).unwrap();

    assert_eq!(controller.config().target_language, "French");
    assert!(FileManager::file_exists(&db_path));
}

#[test]
fn test_loadChapters_shouldNumberPartsInReadingOrder() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let controller = controller(&ScriptedProvider::default());

    let chapters = controller.load_chapters(&book).unwrap();

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].number, 1);
    assert_eq!(chapters[0].part_id, "text/ch01.xhtml");
    assert_eq!(
        chapters[0].paragraphs,
        vec![
            "The Storm",
            "# The Storm",
            "It was a **dark** night.",
            "Helena waited by the door.",
            "1914",
        ]
    );
    assert_eq!(chapters[1].title(), "Morning");
}

#[test]
fn test_loadChapters_withEmptyDirectory_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let controller = controller(&ScriptedProvider::default());

    assert!(controller.load_chapters(temp_dir.path()).is_err());
    assert!(controller.load_chapters(&temp_dir.path().join("missing")).is_err());
}

#[tokio::test]
async fn test_extract_shouldRegisterDistinctUnitCounts() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::default();
    let controller = controller(&provider);

    let scan = controller.extract(&book, false).await.unwrap();

    assert_eq!(scan.edition, 1);
    assert_eq!(scan.chapters, 2);
    assert_eq!(scan.expected_units, 7);
    let store = controller.store();
    assert_eq!(store.expected_paragraphs(1, 1, "English", "French").await.unwrap(), Some(4));
    assert_eq!(store.expected_paragraphs(1, 2, "English", "French").await.unwrap(), Some(3));
    assert_eq!(store.count_untranslated(1, 1, "English", "French").await.unwrap(), 4);
    assert_eq!(provider.translation_count(), 0);

    let again = controller.extract(&book, false).await.unwrap();
    assert_eq!(again.edition, 1);
    let next = controller.extract(&book, true).await.unwrap();
    assert_eq!(next.edition, 2);
}

#[tokio::test]
async fn test_build_withEmptyStore_shouldKeepSourceText() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let output = temp_dir.path().join("out");
    let provider = ScriptedProvider::default();
    let controller = controller(&provider);

    let build = controller.build(&book, Some(&output)).await.unwrap();

    assert_eq!(build.missing(), 7);
    assert_eq!(provider.translation_count(), 0);
    let chapter_one = FileManager::read_to_string(output.join("text/ch01.xhtml")).unwrap();
    assert!(chapter_one.contains("<title>The Storm</title>"));
    assert!(chapter_one.contains("<p>It was a <strong>dark</strong> night.</p>"));
    assert!(FileManager::file_exists(output.join("style.css")));
}

#[tokio::test]
async fn test_build_afterTranslate_shouldMatchTranslatedOutput() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider);
    controller
        .translate(
            &book,
            TranslateOptions {
                output_dir: Some(temp_dir.path().join("translated")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let rebuilt = temp_dir.path().join("rebuilt");
    let build = controller.build(&book, Some(&rebuilt)).await.unwrap();

    assert_eq!(build.missing(), 0);
    assert_eq!(
        FileManager::read_to_string(rebuilt.join("text/ch02.xhtml")).unwrap(),
        FileManager::read_to_string(temp_dir.path().join("translated/text/ch02.xhtml")).unwrap()
    );
}

#[tokio::test]
async fn test_report_shouldScoreEveryChapter() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary()).with_rating("90");
    let controller = controller(&provider);
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

    let report = controller.report(&book).await.unwrap();

    assert_eq!(report.chapters.len(), 2);
    assert_eq!(report.chapters[0].adequacy, Some(90));
    assert_eq!(report.average_adequacy(), Some(90.0));
    assert!(report.overall <= 100);
    assert!(report.to_string().contains("Overall:"));
}

#[tokio::test]
async fn test_search_shouldFindStoredTranslations() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider);
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

    let found = controller.search("RAIN").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].source_text, "The rain stopped.");
    assert_eq!(found[0].translated_text, "La pluie cessa.");
    assert_eq!(found[0].chapter, 2);
    assert!(controller.search("nothing like this").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_shouldEmptyTheStore() {
    let temp_dir = create_temp_dir().unwrap();
    let book = create_test_book(temp_dir.path()).unwrap();
    let provider = ScriptedProvider::new(&sample_dictionary());
    let controller = controller(&provider);
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
    assert_eq!(controller.store_stats().await.unwrap().record_count, 7);

    let deleted = controller.reset().await.unwrap();

    assert_eq!(deleted, 7);
    let stats = controller.store_stats().await.unwrap();
    assert_eq!(stats.record_count, 0);
    assert_eq!(stats.scanned_chapters, 0);
}

#[test]
fn test_storeStats_onFreshStore_shouldBeEmpty() {
    let controller = controller(&ScriptedProvider::default());

    let stats = tokio_test::block_on(async { controller.store_stats().await }).unwrap();

    assert_eq!(stats.record_count, 0);
    assert_eq!(stats.language_pairs, 0);
    assert_eq!(stats.scanned_chapters, 0);
}
