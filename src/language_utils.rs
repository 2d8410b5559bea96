/*!
 * Language utilities.
 *
 * The store and the prompts work with English language names ("French",
 * "German"); users may type ISO 639-1, ISO 639-2/T, ISO 639-2/B codes or
 * names. These helpers normalize all of them to the name form.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"), // French
    ("ger", "deu"), // German
    ("dut", "nld"), // Dutch
    ("gre", "ell"), // Greek
    ("chi", "zho"), // Chinese
    ("cze", "ces"), // Czech
    ("ice", "isl"), // Icelandic
    ("alb", "sqi"), // Albanian
    ("arm", "hye"), // Armenian
    ("baq", "eus"), // Basque
    ("bur", "mya"), // Burmese
    ("per", "fas"), // Persian
    ("geo", "kat"), // Georgian
    ("may", "msa"), // Malay
    ("mac", "mkd"), // Macedonian
    ("rum", "ron"), // Romanian
    ("slo", "slk"), // Slovak
    ("wel", "cym"), // Welsh
];

/// Find the language denoted by a code
fn language_from_code(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => {
            let terminology = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == code)
                .map_or(code.as_str(), |&(_, terminology)| terminology);
            Language::from_639_3(terminology)
        }
        _ => None,
    }
}

/// Find the language denoted by an English name, ignoring case
fn language_from_name(name: &str) -> Option<Language> {
    let name = name.trim();
    Language::from_name(name).or_else(|| {
        let mut chars = name.chars();
        let title_case = chars
            .next()
            .map(|first| first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>())?;
        Language::from_name(&title_case)
    })
}

/// Find a language from a code or an English name
pub fn find_language(input: &str) -> Option<Language> {
    language_from_code(input).or_else(|| language_from_name(input))
}

/// Normalize a language code or name to the English language name
///
/// Unknown names made of letters and spaces are accepted as typed, so
/// languages missing from the ISO tables can still be used.
pub fn normalize_language_name(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Language must not be empty"));
    }

    if let Some(language) = find_language(trimmed) {
        return Ok(language.to_name().to_string());
    }

    if trimmed.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-') {
        return Ok(trimmed.to_string());
    }

    Err(anyhow!("Invalid language: {}", input))
}

/// Short code for a language, for document metadata
///
/// Prefers ISO 639-1 and falls back to ISO 639-3; unknown languages get "und".
pub fn language_code(input: &str) -> String {
    match find_language(input) {
        Some(language) => language
            .to_639_1()
            .unwrap_or_else(|| language.to_639_3())
            .to_string(),
        None => "und".to_string(),
    }
}

/// Tag name wrapping text of a language in prompts, e.g. `english`
pub fn language_tag(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Check if two codes or names denote the same language
pub fn languages_match(first: &str, second: &str) -> bool {
    match (normalize_language_name(first), normalize_language_name(second)) {
        (Ok(a), Ok(b)) => a.eq_ignore_ascii_case(&b),
        _ => false,
    }
}
