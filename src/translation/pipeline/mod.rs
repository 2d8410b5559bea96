/*!
 * Translation pipeline for book translation.
 *
 * The pipeline processes documents through three phases:
 * 1. **Scan Pass**: Register the expected unit count of every chapter
 * 2. **Translation Pass**: Translate units through the store and the context window
 * 3. **Build Pass**: Reassemble the translated document from the store
 *
 * An optional **Proofread Pass** sends stored translations back to the model
 * for correction; the build pass prefers the corrected text when present.
 */

pub mod build_pass;
pub mod orchestrator;
pub mod proofread_pass;
pub mod scan_pass;
pub mod translation_pass;

// Re-export types used externally
pub use build_pass::{BuildPass, BuildResult, BuiltChapter};
pub use orchestrator::{
    PipelineConfig, PipelinePhase, PipelineResult, ProofreadResult, TranslationPipeline,
};
pub use proofread_pass::{
    proofread_model, stored_proofread, ProofreadChapter, ProofreadPass, ProofreadStats,
    PROOFREAD_SUFFIX,
};
pub use scan_pass::{ScanPass, ScanResult};
pub use translation_pass::{
    ChapterResult, ParagraphState, Passthrough, TranslationPass, TranslationPassConfig,
    TranslationStats, TranslationStrategy, UnitOutcome, COPY_MODEL,
};
