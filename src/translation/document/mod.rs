/*!
 * Structural text codec.
 *
 * Two-way mapping between rich text parts (XHTML) and line-oriented
 * structured markup:
 * - `html`: rich text to markup, with the span rule table for generic containers
 * - `markdown`: markup back to rich text with fixed sigil precedence
 * - `model`: parts, chapters, blocks and the document source/sink seams
 */

pub mod html;
pub mod markdown;
pub mod model;

pub use html::{document_title, to_structured_markup};
pub use markdown::{from_structured_markup, render_page, RichText};
pub use model::{
    chapters_from_parts, Block, BlockKind, Chapter, DocumentPart, DocumentSink, DocumentSource,
    InlineEffect, SPAN_RULES,
};
