/*!
 * Tests for language name and code handling
 */

use bookwai::language_utils::{
    find_language, language_code, language_tag, languages_match, normalize_language_name,
};

#[test]
fn test_normalizeLanguageName_shouldAcceptCodesAndNames() {
    assert_eq!(normalize_language_name("fr").unwrap(), "French");
    assert_eq!(normalize_language_name("deu").unwrap(), "German");
    assert_eq!(normalize_language_name("  italian ").unwrap(), "Italian");
}

#[test]
fn test_normalizeLanguageName_shouldRejectEmptyAndSymbols() {
    assert!(normalize_language_name("").is_err());
    assert!(normalize_language_name("   ").is_err());
    assert!(normalize_language_name("fr_FR!").is_err());
}

#[test]
fn test_languageCode_shouldFallBackToUnd() {
    assert_eq!(language_code("French"), "fr");
    assert_eq!(language_code("ja"), "ja");
    assert_eq!(language_code("Elvish Tongue"), "und");
}

#[test]
fn test_languageTag_shouldBeUsableAsXmlName() {
    assert_eq!(language_tag("English"), "english");
    assert_eq!(language_tag(" Old  Norse "), "old_norse");
}

#[test]
fn test_languagesMatch_shouldIgnoreForm() {
    assert!(languages_match("en", "English"));
    assert!(languages_match("GERMAN", "de"));
    assert!(!languages_match("French", "German"));
    assert!(find_language("it").is_some());
}
