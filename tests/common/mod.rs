/*!
 * Common test utilities for the bookwai test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Re-export the mock providers module
pub mod mock_providers;

/// First chapter of the sample book
pub const CHAPTER_ONE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>The Storm</title><link rel="stylesheet" href="../style.css"/></head>
<body>
<h1>The Storm</h1>
<p>It was a <b>dark</b> night.</p>
<p>Helena waited by the door.</p>
<p>1914</p>
</body>
</html>"#;

/// Second chapter of the sample book
pub const CHAPTER_TWO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Morning</title></head>
<body>
<h1>Morning</h1>
<p>The rain stopped.</p>
</body>
</html>"#;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a two-chapter book directory with a stylesheet
pub fn create_test_book(dir: &Path) -> Result<PathBuf> {
    let book = dir.join("book");
    create_test_file(&book, "text/ch01.xhtml", CHAPTER_ONE)?;
    create_test_file(&book, "text/ch02.xhtml", CHAPTER_TWO)?;
    create_test_file(&book, "style.css", "p { margin: 0 }")?;
    Ok(book)
}

/// English to French translations of every core in the sample book
pub fn sample_dictionary() -> Vec<(&'static str, &'static str)> {
    vec![
        ("The Storm", "La Tempête"),
        ("It was a **dark** night", "Il faisait une nuit **sombre**"),
        ("Helena waited by the door", "Helena attendait près de la porte"),
        ("Morning", "Le Matin"),
        ("The rain stopped", "La pluie cessa"),
    ]
}

/// Route library logs to the test output, once per process
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
