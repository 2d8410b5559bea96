/*!
 * Terminology consistency across a translated document.
 *
 * Capitalized source terms that show up in several paragraphs are tracked;
 * for each occurrence the rendering in the paired translation is located
 * (kept verbatim, replaced by a similar-length capitalized word, or
 * missing). A term is consistent when every occurrence is rendered the
 * same way.
 */

use std::collections::{HashMap, HashSet};

use super::metrics::ChapterPair;

/// Terms shorter than this are not tracked
const MIN_TERM_CHARS: usize = 4;

const SENTENCE_END: &[char] = &['.', '!', '?', ':', '…'];

/// How a tracked term was rendered in one translated paragraph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rendering {
    /// Kept as in the source
    Verbatim,
    /// Replaced by this capitalized word
    Similar(String),
    /// Not found
    Missing,
}

/// Consistency details for one tracked term
#[derive(Debug, Clone, PartialEq)]
pub struct TermConsistency {
    pub term: String,
    /// Renderings in occurrence order
    pub renderings: Vec<Rendering>,
}

impl TermConsistency {
    /// Whether every occurrence is rendered the same way
    pub fn is_consistent(&self) -> bool {
        self.renderings.windows(2).all(|pair| pair[0] == pair[1])
    }
}

fn clean_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphabetic())
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(|c: char| matches!(c, '"' | '\'' | '”' | '’' | '»' | ')' | '*' | '_'))
        .ends_with(SENTENCE_END)
}

/// Capitalized words that do not start a sentence
///
/// Sentence-initial words are capitalized by grammar, not because they are
/// names, so they are skipped.
pub fn capitalized_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut sentence_start = true;

    for raw in text.split_whitespace() {
        let word = clean_word(raw);
        if !word.is_empty() {
            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            if capitalized && !sentence_start {
                words.push(word.to_string());
            }
            sentence_start = false;
        }
        if ends_sentence(raw) {
            sentence_start = true;
        }
    }
    words
}

/// Candidate terms of a source paragraph
pub fn extract_terms(text: &str) -> HashSet<String> {
    capitalized_words(text)
        .into_iter()
        .filter(|word| word.chars().count() >= MIN_TERM_CHARS && word.chars().all(char::is_alphabetic))
        .collect()
}

/// Find a capitalized word of similar length in a translation
///
/// Words listed in `excluded` are never returned.
pub fn find_similar_name(name: &str, text: &str, excluded: &HashSet<String>) -> Option<String> {
    let name_len = name.chars().count();
    let tolerance = (name_len / 3).max(1);

    capitalized_words(text)
        .into_iter()
        .filter(|word| !excluded.contains(word))
        .find(|word| word.chars().count().abs_diff(name_len) <= tolerance)
}

/// Locate the rendering of `term` in a translated paragraph
///
/// Words equal to other terms of the same source paragraph are not
/// considered as renderings of `term`.
pub fn rendering_of(term: &str, translated: &str, paragraph_terms: &HashSet<String>) -> Rendering {
    let verbatim = translated
        .split_whitespace()
        .map(clean_word)
        .any(|word| word == term);
    if verbatim {
        return Rendering::Verbatim;
    }

    find_similar_name(term, translated, paragraph_terms).map_or(Rendering::Missing, Rendering::Similar)
}

/// Track every term that occurs in at least two paragraphs
pub fn track_terms(chapters: &[ChapterPair]) -> Vec<TermConsistency> {
    let mut order: Vec<String> = Vec::new();
    let mut renderings: HashMap<String, Vec<Rendering>> = HashMap::new();

    for chapter in chapters {
        for (source, translated) in chapter.pairs() {
            let paragraph_terms = extract_terms(source);
            let mut terms: Vec<&String> = paragraph_terms.iter().collect();
            terms.sort();
            for term in terms {
                let rendering = rendering_of(term, translated, &paragraph_terms);
                renderings
                    .entry(term.to_string())
                    .or_insert_with(|| {
                        order.push(term.clone());
                        Vec::new()
                    })
                    .push(rendering);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|term| {
            let found = renderings.remove(&term)?;
            (found.len() >= 2).then_some(TermConsistency {
                term,
                renderings: found,
            })
        })
        .collect()
}

/// Share of tracked terms rendered consistently, 0 to 100
///
/// A document without repeated terms is fully consistent.
pub fn consistency_score(chapters: &[ChapterPair]) -> u8 {
    let tracked = track_terms(chapters);
    if tracked.is_empty() {
        return 100;
    }
    let consistent = tracked.iter().filter(|t| t.is_consistent()).count();
    ((consistent as f64 / tracked.len() as f64) * 100.0).round() as u8
}
