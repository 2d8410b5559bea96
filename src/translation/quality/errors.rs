/*!
 * Detection of common translation errors.
 *
 * Four heuristic families are counted per paragraph pair:
 * - untranslated segments: significant source words left verbatim
 * - repeated phrases: near-identical sentences in the translation
 * - formatting issues: unbalanced sigils and unclosed tags
 * - potential mistranslations: length anomalies and filler-word floods
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;

static SENTENCE_SPLIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?…]+").unwrap());

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*?(/?)>").unwrap());

/// Paired sigils that must appear an even number of times
const PAIRED_SIGILS: &[&str] = &["**", "__", "~~", "`"];

/// Filler words whose flood hints at a degenerate answer
const FILLER_WORDS: &[&str] = &[
    "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "by",
];

/// Source words shorter than this are not checked for being left untranslated
const SIGNIFICANT_WORD_CHARS: usize = 4;

/// Word-set similarity between two texts (Jaccard index over lowercase words)
pub fn text_similarity(first: &str, second: &str) -> f64 {
    let first: HashSet<String> = first.split_whitespace().map(str::to_lowercase).collect();
    let second: HashSet<String> = second.split_whitespace().map(str::to_lowercase).collect();
    if first.is_empty() || second.is_empty() {
        return 0.0;
    }
    let common = first.intersection(&second).count();
    let union = first.union(&second).count();
    common as f64 / union as f64
}

/// Errors found in one or more paragraph pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    /// Source words left verbatim in the translation, lowercase
    pub untranslated_segments: Vec<String>,
    pub repeated_phrases: usize,
    pub formatting_issues: usize,
    pub potential_mistranslations: usize,
}

impl ErrorReport {
    /// Sum of all categories
    pub fn total(&self) -> usize {
        self.untranslated_segments.len()
            + self.repeated_phrases
            + self.formatting_issues
            + self.potential_mistranslations
    }

    /// Whether nothing was detected
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for ErrorReport {
    fn add_assign(&mut self, other: Self) {
        for segment in other.untranslated_segments {
            if !self.untranslated_segments.contains(&segment) {
                self.untranslated_segments.push(segment);
            }
        }
        self.repeated_phrases += other.repeated_phrases;
        self.formatting_issues += other.formatting_issues;
        self.potential_mistranslations += other.potential_mistranslations;
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "untranslated: {}, repeated: {}, formatting: {}, mistranslations: {}",
            self.untranslated_segments.len(),
            self.repeated_phrases,
            self.formatting_issues,
            self.potential_mistranslations
        )
    }
}

fn lowercase_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Significant source words found verbatim in the translation, in source order
fn find_untranslated(source: &str, translated: &str) -> Vec<String> {
    let translated_words: HashSet<String> = lowercase_words(translated).collect();

    let mut segments: Vec<String> = Vec::new();
    for word in source
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() >= SIGNIFICANT_WORD_CHARS)
        // proper nouns are expected to survive translation
        .filter(|word| !word.chars().next().is_some_and(char::is_uppercase))
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
    {
        if translated_words.contains(&word) && !segments.contains(&word) {
            segments.push(word);
        }
    }
    segments
}

fn count_repeated_phrases(translated: &str) -> usize {
    let sentences: Vec<&str> = SENTENCE_SPLIT_REGEX
        .split(translated)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut repeated = 0;
    for (i, first) in sentences.iter().enumerate() {
        for second in &sentences[i + 1..] {
            if text_similarity(first, second) > 0.8 {
                repeated += 1;
            }
        }
    }
    repeated
}

fn count_formatting_issues(translated: &str) -> usize {
    let mut issues = PAIRED_SIGILS
        .iter()
        .filter(|sigil| translated.matches(**sigil).count() % 2 != 0)
        .count();

    let single_stars = translated.replace("**", "").matches('*').count();
    if single_stars % 2 != 0 {
        issues += 1;
    }

    let mut open_tags: Vec<String> = Vec::new();
    let mut closed_tags: Vec<String> = Vec::new();
    for caps in HTML_TAG_REGEX.captures_iter(translated) {
        let name = caps[2].to_lowercase();
        if &caps[1] == "/" {
            closed_tags.push(name);
        } else if &caps[3] != "/" {
            open_tags.push(name);
        }
    }
    for name in open_tags {
        match closed_tags.iter().position(|closed| *closed == name) {
            Some(index) => {
                closed_tags.swap_remove(index);
            }
            None => issues += 1,
        }
    }
    issues
}

fn count_mistranslations(source: &str, translated: &str) -> usize {
    let source_words = source.split_whitespace().count();
    let translated_words = translated.split_whitespace().count();
    let mut issues = 0;

    if source_words > 10 && (translated_words as f64) < source_words as f64 * 0.3 {
        issues += 1;
    }
    if source_words > 0 && source_words < 5 && translated_words > source_words * 5 {
        issues += 1;
    }

    if translated_words >= 5 {
        let words: Vec<String> = lowercase_words(translated).collect();
        let flooded = FILLER_WORDS.iter().any(|filler| {
            let count = words.iter().filter(|w| w.as_str() == *filler).count();
            count as f64 > translated_words as f64 * 0.3
        });
        if flooded {
            issues += 1;
        }
    }
    issues
}

/// Detect common errors in one translated paragraph
pub fn detect_translation_errors(source: &str, translated: &str, source_lang: &str) -> ErrorReport {
    let report = ErrorReport {
        untranslated_segments: find_untranslated(source, translated),
        repeated_phrases: count_repeated_phrases(translated),
        formatting_issues: count_formatting_issues(translated),
        potential_mistranslations: count_mistranslations(source, translated),
    };
    if !report.is_clean() {
        debug!("Possible issues translating from {}: {}", source_lang, report);
    }
    report
}
