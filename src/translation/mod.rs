/*!
 * Translation service for book translation using AI providers.
 *
 * This module contains the core functionality for translating books
 * paragraph by paragraph. It is split into several submodules:
 *
 * - `core`: Generation of one unit, context bleeding detection and statistics
 * - `context`: Sliding context windows per language pair
 * - `document`: Structural text codec and the document model
 * - `formatting`: Formatting envelopes and input sanitizing
 * - `pipeline`: Scan, translation and build passes and their orchestrator
 * - `prompts`: Prompt templates and builders for translation
 * - `quality`: Fluency, adequacy, consistency and error heuristics
 * - `selector`: Chapter selector parsing and paragraph splitting
 */

// Re-export main types for easier usage
pub use self::core::TranslationService;
pub use self::pipeline::{PipelineConfig, TranslationPipeline, TranslationStrategy};

// Re-export document model types
pub use self::document::{Chapter, DocumentPart, DocumentSink, DocumentSource};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod context;
pub mod core;
pub mod document;
pub mod formatting;
pub mod pipeline;
pub mod prompts;
pub mod quality;
pub mod selector;
