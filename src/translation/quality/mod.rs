/*!
 * Quality assessment for translated documents.
 *
 * This module provides:
 * - **Metrics**: fluency scoring and the document quality report
 * - **Adequacy**: model-rated meaning preservation with a lexical fallback
 * - **Consistency**: terminology stability across chapters
 * - **Errors**: heuristic detection of common translation mistakes
 */

pub mod adequacy;
pub mod consistency;
pub mod errors;
pub mod metrics;

// Re-export main types
pub use adequacy::{adequacy_score, lexical_adequacy, parse_rating};
pub use consistency::{consistency_score, track_terms, Rendering, TermConsistency};
pub use errors::{detect_translation_errors, text_similarity, ErrorReport};
pub use metrics::{fluency_score, ChapterPair, ChapterQuality, QualityEvaluator, QualityReport};
