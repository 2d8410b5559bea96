/*!
 * Context management for paragraph translation.
 *
 * Recent (source, translation) pairs are kept per language pair and replayed
 * to the model so terminology and names stay consistent across a chapter.
 */

pub mod window;

// Re-export main types
pub use window::{ContextEntry, ContextSource, ContextWindowConfig, ContextWindowManager};
