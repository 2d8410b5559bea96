/*!
 * Quality metrics for translation assessment.
 *
 * Provides quantitative scoring across three dimensions:
 * - Fluency: sentence rhythm, word repetition and signs of garbled output
 * - Adequacy: meaning preserved, rated by the model on sampled paragraphs
 * - Consistency: terminology rendered the same way across the document
 *
 * All scores are integers from 0 to 100.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::providers::Provider;

use super::adequacy::{adequacy_score, lexical_adequacy};
use super::consistency::consistency_score;
use super::errors::{detect_translation_errors, ErrorReport};

static SENTENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?…]+[.!?…]*").unwrap());

/// Content words shorter than this are ignored by the dominant word check
const CONTENT_WORD_CHARS: usize = 4;

/// Texts with fewer words are not checked for a dominant word
const DOMINANT_WORD_MIN_WORDS: usize = 10;

/// Texts with at least this many words must end with punctuation
const TERMINAL_PUNCTUATION_MIN_WORDS: usize = 30;

/// Source and translated paragraphs of one chapter, paired by position
#[derive(Debug, Clone, Default)]
pub struct ChapterPair {
    pub number: u32,
    pub source: Vec<String>,
    pub translated: Vec<String>,
}

impl ChapterPair {
    pub fn new(number: u32, source: Vec<String>, translated: Vec<String>) -> Self {
        Self {
            number,
            source,
            translated,
        }
    }

    /// Paragraph pairs; extra paragraphs on either side are ignored
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.source
            .iter()
            .zip(self.translated.iter())
            .map(|(source, translated)| (source.as_str(), translated.as_str()))
    }

    /// The whole translated chapter as one text
    pub fn translated_text(&self) -> String {
        self.translated.join("\n\n")
    }
}

fn sentence_lengths(text: &str) -> Vec<usize> {
    SENTENCE_REGEX
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().count())
        .filter(|&words| words > 0)
        .collect()
}

fn variance_penalty(text: &str) -> f64 {
    let lengths = sentence_lengths(text);
    if lengths.len() < 2 {
        return 0.0;
    }
    let mean = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    let variance = lengths
        .iter()
        .map(|&len| (len as f64 - mean).powi(2))
        .sum::<f64>()
        / lengths.len() as f64;
    (variance / 10.0).min(30.0)
}

fn repetition_penalty(words: &[String]) -> f64 {
    let repeats = words
        .windows(2)
        .filter(|pair| pair[0] == pair[1])
        .count();
    (repeats as f64 * 10.0).min(30.0)
}

fn dominant_word_penalty(words: &[String]) -> f64 {
    if words.len() < DOMINANT_WORD_MIN_WORDS {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words.iter().filter(|w| w.chars().count() >= CONTENT_WORD_CHARS) {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }
    let Some(&top) = counts.values().max() else {
        return 0.0;
    };
    let ratio = top as f64 / words.len() as f64;
    ((ratio - 0.2) * 100.0).clamp(0.0, 30.0)
}

fn garbled_penalty(text: &str, word_count: usize) -> f64 {
    let replacement_chars = text.matches('\u{FFFD}').count();
    let mut penalty = (replacement_chars as f64 * 20.0).min(40.0);

    let ends_cleanly = text
        .trim_end()
        .trim_end_matches(|c: char| matches!(c, '"' | '\'' | '”' | '’' | '»' | ')' | '*' | '_' | '`' | '~'))
        .ends_with(|c: char| matches!(c, '.' | '!' | '?' | '…' | ':' | ';'));
    if word_count >= TERMINAL_PUNCTUATION_MIN_WORDS && !ends_cleanly {
        penalty += 10.0;
    }
    penalty
}

/// Fluency of a translated text, 0 to 100
///
/// Starts from 100 and subtracts bounded penalties for uneven sentence
/// lengths, consecutive repeated words, one word dominating the text,
/// replacement characters and a long text cut off before its final
/// punctuation.
pub fn fluency_score(text: &str) -> u8 {
    let text = text.trim();
    if text.is_empty() {
        return 100;
    }

    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    let penalty = variance_penalty(text)
        + repetition_penalty(&words)
        + dominant_word_penalty(&words)
        + garbled_penalty(text, words.len());

    (100.0 - penalty).clamp(0.0, 100.0).round() as u8
}

/// Quality scores of one chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterQuality {
    pub number: u32,
    pub fluency: u8,
    /// Only set for sampled chapters
    pub adequacy: Option<u8>,
    pub errors: ErrorReport,
}

/// Quality report over a translated document
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub chapters: Vec<ChapterQuality>,
    pub consistency: u8,
    pub errors: ErrorReport,
    pub overall: u8,
}

impl QualityReport {
    /// Assemble a report and compute the overall score
    pub fn new(chapters: Vec<ChapterQuality>, consistency: u8) -> Self {
        let mut errors = ErrorReport::default();
        for chapter in &chapters {
            errors += chapter.errors.clone();
        }

        let mut report = Self {
            chapters,
            consistency,
            errors,
            overall: 0,
        };
        report.overall = report.compute_overall();
        report
    }

    /// Average fluency over all chapters
    pub fn average_fluency(&self) -> Option<f64> {
        if self.chapters.is_empty() {
            return None;
        }
        let sum: u32 = self.chapters.iter().map(|c| u32::from(c.fluency)).sum();
        Some(f64::from(sum) / self.chapters.len() as f64)
    }

    /// Average adequacy over sampled chapters
    pub fn average_adequacy(&self) -> Option<f64> {
        let sampled: Vec<u8> = self.chapters.iter().filter_map(|c| c.adequacy).collect();
        if sampled.is_empty() {
            return None;
        }
        let sum: u32 = sampled.iter().map(|&a| u32::from(a)).sum();
        Some(f64::from(sum) / sampled.len() as f64)
    }

    fn compute_overall(&self) -> u8 {
        let fluency = self.average_fluency().unwrap_or(100.0);
        let consistency = f64::from(self.consistency);
        let overall = match self.average_adequacy() {
            Some(adequacy) => 0.4 * fluency + 0.4 * adequacy + 0.2 * consistency,
            None => 0.8 * fluency + 0.2 * consistency,
        };
        overall.clamp(0.0, 100.0).round() as u8
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quality report ({} chapters)", self.chapters.len())?;
        for chapter in &self.chapters {
            write!(f, "  Chapter {:>3}: fluency {:>3}", chapter.number, chapter.fluency)?;
            if let Some(adequacy) = chapter.adequacy {
                write!(f, ", adequacy {:>3}", adequacy)?;
            }
            writeln!(f, ", issues {}", chapter.errors.total())?;
        }
        if let Some(fluency) = self.average_fluency() {
            writeln!(f, "Fluency:     {:.1}", fluency)?;
        }
        match self.average_adequacy() {
            Some(adequacy) => writeln!(f, "Adequacy:    {:.1}", adequacy)?,
            None => writeln!(f, "Adequacy:    not sampled")?,
        }
        writeln!(f, "Consistency: {}", self.consistency)?;
        writeln!(f, "Errors:      {}", self.errors)?;
        write!(f, "Overall:     {}", self.overall)
    }
}

/// Builds quality reports, optionally asking a model to rate adequacy
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    provider: Option<Arc<dyn Provider>>,
    model: String,
    adequacy_samples: usize,
}

impl Default for QualityEvaluator {
    fn default() -> Self {
        Self::heuristic()
    }
}

impl QualityEvaluator {
    /// Evaluator rating adequacy with `provider` on up to 5 chapters
    pub fn new(provider: Arc<dyn Provider>, model: &str) -> Self {
        Self {
            provider: Some(provider),
            model: model.to_string(),
            adequacy_samples: 5,
        }
    }

    /// Evaluator without a model; adequacy uses the lexical estimate
    pub fn heuristic() -> Self {
        Self {
            provider: None,
            model: String::new(),
            adequacy_samples: 5,
        }
    }

    /// Number of chapters whose adequacy is sampled
    pub fn with_adequacy_samples(mut self, samples: usize) -> Self {
        self.adequacy_samples = samples;
        self
    }

    async fn sample_adequacy(
        &self,
        chapter: &ChapterPair,
        source_lang: &str,
        target_lang: &str,
    ) -> Option<u8> {
        // the longest paragraph carries the most meaning to lose
        let (source, translated) = chapter
            .pairs()
            .filter(|(_, translated)| !translated.trim().is_empty())
            .max_by_key(|(source, _)| source.len())?;

        let score = match &self.provider {
            Some(provider) => {
                adequacy_score(
                    provider.as_ref(),
                    &self.model,
                    source,
                    translated,
                    source_lang,
                    target_lang,
                )
                .await
            }
            None => lexical_adequacy(source, translated),
        };
        debug!("Chapter {} adequacy sample: {}", chapter.number, score);
        Some(score)
    }

    /// Score every chapter, sample adequacy and measure consistency
    pub async fn generate_quality_report(
        &self,
        chapters: &[ChapterPair],
        source_lang: &str,
        target_lang: &str,
    ) -> QualityReport {
        let mut scored = Vec::with_capacity(chapters.len());

        for (position, chapter) in chapters.iter().enumerate() {
            let mut errors = ErrorReport::default();
            for (source, translated) in chapter.pairs() {
                errors += detect_translation_errors(source, translated, source_lang);
            }

            let adequacy = if position < self.adequacy_samples {
                self.sample_adequacy(chapter, source_lang, target_lang).await
            } else {
                None
            };

            scored.push(ChapterQuality {
                number: chapter.number,
                fluency: fluency_score(&chapter.translated_text()),
                adequacy,
                errors,
            });
        }

        let report = QualityReport::new(scored, consistency_score(chapters));
        info!(
            "Quality report {} -> {}: overall {} over {} chapters",
            source_lang,
            target_lang,
            report.overall,
            report.chapters.len()
        );
        report
    }
}
