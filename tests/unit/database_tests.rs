/*!
 * Tests for the persistent translation store
 */

use bookwai::database::{LookupPolicy, RecordPosition, Repository, TranslationRecord};
use bookwai::errors::StoreError;

use crate::common::{create_temp_dir, create_test_file};

fn record(source: &str, translated: &str) -> TranslationRecord {
    TranslationRecord::new("English", "French", source, translated, "gemma3n:e4b")
}

#[tokio::test]
async fn test_openOnDisk_shouldPersistAcrossConnections() {
    let temp_dir = create_temp_dir().unwrap();
    let path = temp_dir.path().join("store.db");

    {
        let store = Repository::open(&path).unwrap();
        store
            .insert(&record("The rain stopped.", "La pluie cessa.").with_metrics(1200, 80))
            .await
            .unwrap();
    }
    let reopened = Repository::open(&path).unwrap();

    let hit = reopened
        .lookup("The rain stopped.", "English", "French")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.translated_text, "La pluie cessa.");
    assert_eq!(hit.elapsed_ms, 1200);
    assert_eq!(hit.quality_score, 80);
}

#[tokio::test]
async fn test_lookup_shouldMatchExactSourceOnly() {
    let store = Repository::new_in_memory().unwrap();
    store.insert(&record("Morning", "Le Matin")).await.unwrap();

    assert!(store.lookup("Morning", "English", "French").await.unwrap().is_some());
    assert!(store.lookup("morning", "English", "French").await.unwrap().is_none());
    assert!(store.lookup("Morning ", "English", "French").await.unwrap().is_none());
    assert!(store.lookup("Morning", "French", "English").await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookupWithPolicy_shouldHonorEdition() {
    let store = Repository::new_in_memory().unwrap();
    store.insert(&record("Morning", "Le Matin").at(1, 2, 0)).await.unwrap();

    let any = store
        .lookup_with_policy("Morning", "English", "French", LookupPolicy::AnyEdition, 2)
        .await
        .unwrap();
    let same = store
        .lookup_with_policy("Morning", "English", "French", LookupPolicy::SameEdition, 2)
        .await
        .unwrap();

    assert_eq!(
        any.unwrap().position,
        RecordPosition {
            edition: 1,
            chapter: 2,
            paragraph_index: 0
        }
    );
    assert!(same.is_none());
}

#[tokio::test]
async fn test_progress_shouldFollowScanAndInserts() {
    let store = Repository::new_in_memory().unwrap();
    store.set_expected_paragraphs(1, 1, "English", "French", 3).await.unwrap();
    store.insert(&record("A.", "A.").at(1, 1, 1).with_metrics(100, -1)).await.unwrap();
    store.insert(&record("B.", "B.").at(1, 1, 2).with_metrics(300, -1)).await.unwrap();

    assert_eq!(store.count_total(1, 1, "English", "French").await.unwrap(), 2);
    assert_eq!(store.count_untranslated(1, 1, "English", "French").await.unwrap(), 1);

    let stats = store.chapter_stats(1, 1, "English", "French").await.unwrap();
    assert_eq!(stats.avg_elapsed_ms, 200.0);
    assert_eq!(stats.total_elapsed_ms, 400.0);
    assert_eq!(stats.estimated_remaining_ms, 200.0);

    // Re-scanning replaces the expected count
    store.set_expected_paragraphs(1, 1, "English", "French", 2).await.unwrap();
    assert_eq!(store.count_untranslated(1, 1, "English", "French").await.unwrap(), 0);
}

#[tokio::test]
async fn test_editions_shouldTrackTranslatedAndScanned() {
    let store = Repository::new_in_memory().unwrap();
    assert_eq!(store.latest_edition("English", "French").await.unwrap(), 0);

    store.insert(&record("A.", "A.").at(2, 1, 1)).await.unwrap();
    store.set_expected_paragraphs(3, 1, "English", "French", 5).await.unwrap();

    assert_eq!(store.latest_edition("English", "French").await.unwrap(), 2);
    assert_eq!(store.latest_scanned_edition("English", "French").await.unwrap(), 3);
    assert_eq!(store.latest_edition("English", "German").await.unwrap(), 0);
}

#[tokio::test]
async fn test_chaptersList_byLength_shouldPutShortChaptersFirst() {
    let store = Repository::new_in_memory().unwrap();
    let layout = [(1, 3), (2, 1), (3, 2)];
    for (chapter, units) in layout {
        for index in 0..units {
            let source = format!("Chapter {} unit {}.", chapter, index);
            store
                .insert(&record(&source, "x").at(1, chapter, index))
                .await
                .unwrap();
        }
    }

    assert_eq!(
        store.chapters_list("English", "French", 1, false).await.unwrap(),
        vec![1, 2, 3]
    );
    assert_eq!(
        store.chapters_list("English", "French", 1, true).await.unwrap(),
        vec![2, 3, 1]
    );
}

#[tokio::test]
async fn test_exportAll_withEmptyStore_shouldWriteHeaderOnly() {
    let temp_dir = create_temp_dir().unwrap();
    let path = temp_dir.path().join("empty.csv");
    let store = Repository::new_in_memory().unwrap();

    let count = store.export_all(&path).await.unwrap();

    assert_eq!(count, 0);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("edition,chapter,paragraph_index,source_lang,source_text"));
}

#[tokio::test]
async fn test_exportImport_shouldKeepMultilineText() {
    let temp_dir = create_temp_dir().unwrap();
    let path = temp_dir.path().join("backup.csv");
    let store = Repository::new_in_memory().unwrap();
    store
        .insert(&record("\"Wait,\" she said.\nThen silence.", "« Attends », dit-elle.\nPuis le silence."))
        .await
        .unwrap();

    store.export_all(&path).await.unwrap();
    let restored = Repository::new_in_memory().unwrap();
    restored.import_all(&path).await.unwrap();

    assert_eq!(restored.all_records().await.unwrap(), store.all_records().await.unwrap());
}

#[tokio::test]
async fn test_importAll_withMissingColumn_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(temp_dir.path(), "bad.csv", "source_text,translated_text\nA,B\n").unwrap();
    let store = Repository::new_in_memory().unwrap();

    let error = store.import_all(&path).await.unwrap_err();

    assert!(matches!(error, StoreError::ImportFormat { row: 0, .. }));
}

#[tokio::test]
async fn test_stats_shouldCountRecordsPairsAndChapters() {
    let store = Repository::new_in_memory().unwrap();
    store.insert(&record("A.", "A.")).await.unwrap();
    store
        .insert(&TranslationRecord::new("English", "German", "A.", "A.", "m"))
        .await
        .unwrap();
    store.set_expected_paragraphs(1, 1, "English", "French", 1).await.unwrap();

    let stats = store.stats().await.unwrap();

    assert_eq!(stats.record_count, 2);
    assert_eq!(stats.language_pairs, 2);
    assert_eq!(stats.scanned_chapters, 1);
}
