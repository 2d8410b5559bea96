/*!
 * Tests for the per language pair context windows
 */

use async_trait::async_trait;

use bookwai::database::{Repository, TranslationRecord};
use bookwai::translation::context::{
    ContextEntry, ContextSource, ContextWindowConfig, ContextWindowManager,
};

/// Source that always fails
struct UnavailableSource;

#[async_trait]
impl ContextSource for UnavailableSource {
    async fn recent_pairs(
        &self,
        _source_lang: &str,
        _target_lang: &str,
        _edition: i64,
        _limit: usize,
    ) -> anyhow::Result<Vec<ContextEntry>> {
        Err(anyhow::anyhow!("store offline"))
    }
}

#[test]
fn test_window_shouldKeepMostRecentPairsOldestFirst() {
    let mut windows = ContextWindowManager::new(ContextWindowConfig::with_capacity(2));

    windows.add("English", "French", "One.", "Un.", false);
    windows.add("English", "French", "Two.", "Deux.", false);
    windows.add("English", "French", "Three.", "Trois.", false);

    assert_eq!(
        windows.entries("English", "French"),
        vec![ContextEntry::new("Two.", "Deux."), ContextEntry::new("Three.", "Trois.")]
    );
    assert!(windows.is_empty("English", "German"));
}

#[test]
fn test_reset_withShortChapter_shouldInheritPreviousContext() {
    let mut windows = ContextWindowManager::new(ContextWindowConfig::with_capacity(5));
    windows.add("English", "French", "Marcus smiled.", "Marcus sourit.", false);

    assert!(!windows.reset("English", "French", Some(3)));
    assert_eq!(windows.len("English", "French"), 1);

    assert!(windows.reset("English", "French", Some(10)));
    assert!(windows.is_empty("English", "French"));
}

#[test]
fn test_add_withCleanMode_shouldDropMarkers() {
    let mut windows = ContextWindowManager::new(ContextWindowConfig::with_capacity(3));

    windows.add("English", "French", "## **The Storm**", "## **La Tempête**", true);

    assert_eq!(
        windows.entries("English", "French"),
        vec![ContextEntry::new("The Storm", "La Tempête")]
    );
}

#[tokio::test]
async fn test_prefill_fromStore_shouldUseOnlyTranslatedRecordsOfEdition() {
    let store = Repository::new_in_memory().unwrap();
    let records = [
        TranslationRecord::new("English", "French", "Old edition.", "Vieille édition.", "m").at(1, 1, 1),
        TranslationRecord::new("English", "French", "First.", "Premier.", "m").at(2, 1, 1),
        TranslationRecord::new("English", "French", "Helena", "Helena", "m").at(2, 1, 2),
        TranslationRecord::new("English", "French", "Second.", "Deuxième.", "m").at(2, 1, 3),
    ];
    for record in &records {
        store.insert(record).await.unwrap();
    }
    let mut windows = ContextWindowManager::new(ContextWindowConfig::with_capacity(10));

    let added = windows.prefill(&store, "English", "French", 2).await;

    assert_eq!(added, 2);
    assert_eq!(
        windows.entries("English", "French"),
        vec![ContextEntry::new("First.", "Premier."), ContextEntry::new("Second.", "Deuxième.")]
    );
}

#[tokio::test]
async fn test_prefill_withUnavailableSource_shouldContinueWithoutContext() {
    let mut windows = ContextWindowManager::new(ContextWindowConfig::with_capacity(4));

    let added = windows.prefill(&UnavailableSource, "English", "French", 1).await;

    assert_eq!(added, 0);
    assert!(windows.is_empty("English", "French"));
}

#[test]
fn test_entryWordCount_shouldCountBothSides() {
    assert_eq!(ContextEntry::new("It was dark.", "Il faisait noir.").word_count(), 6);
}
