/*!
 * Prompt engineering for paragraph translation.
 *
 * This module provides:
 * - The literary translator, proofreader and adequacy rater system prompts
 * - Message construction with language tags and a context word budget
 * - Extraction of the translation from raw model answers
 */

pub mod templates;

// Re-export main types
pub use templates::{
    adequacy_messages, extract_translation, wrap_in_tag, PromptKind, PromptTemplate,
    TranslationPromptBuilder,
};
