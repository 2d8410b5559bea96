/*!
 * Translation store entity models.
 *
 * `TranslationRecord` maps one-to-one onto a `translations` row and onto a
 * row of the CSV backup file, so the same serde derive serves both.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality score stored for records that were never scored
pub const UNSCORED: i64 = -1;

/// Cache lookup policy with respect to editions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Any edition may satisfy a lookup
    #[default]
    AnyEdition,
    /// Only records of the current edition satisfy a lookup
    SameEdition,
}

impl fmt::Display for LookupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupPolicy::AnyEdition => write!(f, "any_edition"),
            LookupPolicy::SameEdition => write!(f, "same_edition"),
        }
    }
}

impl std::str::FromStr for LookupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any_edition" | "any" => Ok(LookupPolicy::AnyEdition),
            "same_edition" | "same" => Ok(LookupPolicy::SameEdition),
            _ => Err(anyhow::anyhow!("Invalid lookup policy: {}", s)),
        }
    }
}

/// One persisted unit of translation work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Translation run version
    pub edition: i64,
    /// 1-based chapter ordinal
    pub chapter: i64,
    /// 0-based position in the chapter, 0 being the chapter title
    pub paragraph_index: i64,
    /// Source language name
    pub source_lang: String,
    /// Verbatim source unit
    pub source_text: String,
    /// Target language name
    pub target_lang: String,
    /// Generated translation
    pub translated_text: String,
    /// Generation latency in milliseconds
    pub elapsed_ms: i64,
    /// 0-100, or -1 when unscored
    pub quality_score: i64,
    /// Model that produced the translation
    pub model: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl TranslationRecord {
    /// Create a new record stamped with the current time
    pub fn new(
        source_lang: &str,
        target_lang: &str,
        source_text: &str,
        translated_text: &str,
        model: &str,
    ) -> Self {
        Self {
            edition: 1,
            chapter: 1,
            paragraph_index: 0,
            source_lang: source_lang.to_string(),
            source_text: source_text.to_string(),
            target_lang: target_lang.to_string(),
            translated_text: translated_text.to_string(),
            elapsed_ms: 0,
            quality_score: UNSCORED,
            model: model.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Set the positional attributes
    pub fn at(mut self, edition: i64, chapter: i64, paragraph_index: i64) -> Self {
        self.edition = edition;
        self.chapter = chapter;
        self.paragraph_index = paragraph_index;
        self
    }

    /// Set generation latency and quality score
    pub fn with_metrics(mut self, elapsed_ms: i64, quality_score: i64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self.quality_score = quality_score;
        self
    }

    /// Check the attribute ranges a stored record must satisfy
    pub fn validate(&self) -> Result<(), String> {
        if self.edition < 1 {
            return Err(format!("edition must be positive, got {}", self.edition));
        }
        if self.chapter < 0 || self.paragraph_index < 0 {
            return Err("chapter and paragraph_index must not be negative".to_string());
        }
        if self.source_lang.trim().is_empty() || self.target_lang.trim().is_empty() {
            return Err("source_lang and target_lang are required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model is required".to_string());
        }
        if self.quality_score != UNSCORED && !(0..=100).contains(&self.quality_score) {
            return Err(format!("quality_score out of range: {}", self.quality_score));
        }
        if self.elapsed_ms < 0 {
            return Err(format!("elapsed_ms must not be negative, got {}", self.elapsed_ms));
        }
        Ok(())
    }

    /// Position of the record inside its document run
    pub fn position(&self) -> RecordPosition {
        RecordPosition {
            edition: self.edition,
            chapter: self.chapter,
            paragraph_index: self.paragraph_index,
        }
    }
}

/// Where a record was last produced or reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPosition {
    pub edition: i64,
    pub chapter: i64,
    pub paragraph_index: i64,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTranslation {
    /// Stored translation
    pub translated_text: String,
    /// Latency of the original generation
    pub elapsed_ms: i64,
    /// Stored quality score
    pub quality_score: i64,
    /// Model that produced it
    pub model: String,
    /// Position the record currently carries
    pub position: RecordPosition,
}

/// Timing statistics for a chapter scope
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChapterStats {
    /// Average generation time over timed records
    pub avg_elapsed_ms: f64,
    /// Sum of generation time over timed records
    pub total_elapsed_ms: f64,
    /// Average multiplied by the untranslated count
    pub estimated_remaining_ms: f64,
}

impl fmt::Display for ChapterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg {:.1}s, total {:.1}s, remaining ~{:.1}s",
            self.avg_elapsed_ms / 1000.0,
            self.total_elapsed_ms / 1000.0,
            self.estimated_remaining_ms / 1000.0
        )
    }
}

/// Summary of the store contents
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of translation records
    pub record_count: i64,
    /// Number of distinct language pairs
    pub language_pairs: i64,
    /// Number of chapters with a recorded size
    pub scanned_chapters: i64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Records: {}, Language pairs: {}, Scanned chapters: {}",
            self.record_count, self.language_pairs, self.scanned_chapters
        )
    }
}
