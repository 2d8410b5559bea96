/*!
 * Tests for the error types
 */

use std::io;

use bookwai::errors::{AppError, ProviderError, SelectorError, StoreError, TranslationError};
use bookwai::translation::selector::parse_chapter_selector;

#[test]
fn test_providerError_display_shouldIncludeStatus() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "rate limited".to_string(),
    };

    assert_eq!(error.to_string(), "API responded with error: 429 - rate limited");
    assert_eq!(
        ProviderError::EmptyResponse("gpt-4o".to_string()).to_string(),
        "Empty response from model gpt-4o"
    );
}

#[test]
fn test_storeError_fromRusqlite_shouldBeUnavailable() {
    let error: StoreError = rusqlite::Error::QueryReturnedNoRows.into();

    assert!(matches!(error, StoreError::Unavailable(_)));
}

#[test]
fn test_storeError_importFormat_shouldNameRow() {
    let error = StoreError::ImportFormat {
        row: 4,
        message: "edition must be positive, got 0".to_string(),
    };

    assert_eq!(error.to_string(), "Invalid backup row 4: edition must be positive, got 0");
}

#[test]
fn test_selectorError_shouldComeFromParser() {
    let error = parse_chapter_selector(Some("3-1"), &[1, 2, 3]).unwrap_err();

    let SelectorError::Parse { token, .. } = &error;
    assert_eq!(token, "3-1");
    assert!(error.to_string().contains("'3-1'"));
}

#[test]
fn test_appError_conversions_shouldWrapSources() {
    let from_provider: AppError = ProviderError::ConnectionError("refused".to_string()).into();
    let from_store: AppError = StoreError::Backup("disk full".to_string()).into();
    let from_io: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    let from_translation: AppError =
        TranslationError::Rejected("answer in the wrong language".to_string()).into();

    assert!(matches!(from_provider, AppError::Provider(_)));
    assert!(matches!(from_store, AppError::Store(_)));
    assert!(matches!(from_io, AppError::File(_)));
    assert_eq!(
        from_translation.to_string(),
        "Translation error: Rejected translation: answer in the wrong language"
    );
}

#[test]
fn test_translationError_fromProvider_shouldKeepMessage() {
    let error: TranslationError = ProviderError::AuthenticationError("bad key".to_string()).into();

    assert_eq!(error.to_string(), "Provider error: Authentication error: bad key");
}
