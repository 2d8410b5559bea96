/*!
 * Core document model types for book translation.
 *
 * A book arrives as ordered `DocumentPart`s (one XHTML file per part). Each
 * part becomes a `Chapter`: its title pseudo-paragraph at index 0 followed
 * by the blank-line separated paragraphs of its structured markup.
 */

use serde::{Deserialize, Serialize};

use super::html::{document_title, to_structured_markup};
use crate::translation::selector::split_paragraphs;

/// One part of a document container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPart {
    /// Stable identifier (relative path inside the container)
    pub id: String,
    /// Display name
    pub name: String,
    /// Rich text (XHTML) content
    pub content: String,
}

impl DocumentPart {
    /// Create a new part
    pub fn new(id: &str, name: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        }
    }
}

/// Supplies the ordered parts of a document
pub trait DocumentSource {
    /// All parts, in reading order
    fn parts(&self) -> anyhow::Result<Vec<DocumentPart>>;
}

/// Accepts rebuilt parts and produces the translated document
pub trait DocumentSink {
    /// Write one rebuilt part
    fn write_part(&mut self, part: &DocumentPart) -> anyhow::Result<()>;

    /// Called once after the last part
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Block-level element kinds the codec understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Heading, level 1 to 6
    Heading(u8),
    /// Bullet list item
    Bullet,
    /// Plain paragraph
    Paragraph,
}

impl BlockKind {
    /// Structured markup marker for this kind
    pub fn marker(&self) -> String {
        match self {
            BlockKind::Heading(level) => format!("{} ", "#".repeat((*level).clamp(1, 6) as usize)),
            BlockKind::Bullet => "- ".to_string(),
            BlockKind::Paragraph => String::new(),
        }
    }
}

/// A block of text with its inline sigils already applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    /// Render as one line of structured markup
    pub fn to_markup(&self) -> String {
        format!("{}{}", self.kind.marker(), self.text)
    }
}

/// Inline visual effects and their sigils
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineEffect {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Monospace,
}

impl InlineEffect {
    /// Paired sigil used in structured markup
    pub fn sigil(&self) -> &'static str {
        match self {
            InlineEffect::Bold => "**",
            InlineEffect::Italic => "*",
            InlineEffect::Underline => "__",
            InlineEffect::Strikethrough => "~~",
            InlineEffect::Monospace => "`",
        }
    }

    /// Rich text tag used when expanding the sigil
    pub fn tag(&self) -> &'static str {
        match self {
            InlineEffect::Bold => "strong",
            InlineEffect::Italic => "em",
            InlineEffect::Underline => "u",
            InlineEffect::Strikethrough => "del",
            InlineEffect::Monospace => "code",
        }
    }

    /// Effect carried by an inline tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "b" | "strong" => Some(InlineEffect::Bold),
            "i" | "em" | "var" | "dfn" => Some(InlineEffect::Italic),
            "u" | "ins" => Some(InlineEffect::Underline),
            "s" | "strike" | "del" => Some(InlineEffect::Strikethrough),
            "code" | "tt" | "kbd" | "samp" => Some(InlineEffect::Monospace),
            _ => None,
        }
    }

    /// Effect declared by a generic container's style/class attributes
    ///
    /// Rules are evaluated in table order; the first keyword hit wins.
    pub fn from_declaration(style: &str, class: &str) -> Option<Self> {
        let declared = format!("{} {}", style, class).to_lowercase().replace(' ', "");
        if declared.is_empty() {
            return None;
        }
        SPAN_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| declared.contains(k)))
            .map(|(_, effect)| *effect)
    }
}

/// Keyword → effect table for span-like containers, in precedence order
pub static SPAN_RULES: &[(&[&str], InlineEffect)] = &[
    (
        &[
            "bold",
            "strong",
            "font-weight:600",
            "font-weight:700",
            "font-weight:800",
            "font-weight:900",
        ],
        InlineEffect::Bold,
    ),
    (&["italic", "oblique", "emphasis"], InlineEffect::Italic),
    (&["underline"], InlineEffect::Underline),
    (&["line-through", "strikethrough", "strike"], InlineEffect::Strikethrough),
    (&["monospace", "courier", "code"], InlineEffect::Monospace),
];

/// Tags that start a new block in structured markup
pub const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "div", "th", "td", "blockquote", "cite",
    "section", "article", "figcaption", "pre", "dt", "dd",
];

/// Tags dropped together with their content
pub const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "noscript", "template"];

/// A document part prepared for translation
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    /// 1-based chapter ordinal
    pub number: u32,
    /// The part it came from
    pub part_id: String,
    /// Part display name
    pub name: String,
    /// Index 0 is the title, the rest are markup paragraphs
    pub paragraphs: Vec<String>,
}

impl Chapter {
    /// Convert a part into its title and markup paragraphs
    pub fn from_part(number: u32, part: &DocumentPart) -> anyhow::Result<Self> {
        let markup = to_structured_markup(&part.content)?;
        let title = document_title(&part.content)?.unwrap_or_default();

        let mut paragraphs = Vec::with_capacity(16);
        paragraphs.push(title);
        paragraphs.extend(split_paragraphs(&markup));

        Ok(Self {
            number,
            part_id: part.id.clone(),
            name: part.name.clone(),
            paragraphs,
        })
    }

    /// Chapter title pseudo-paragraph
    pub fn title(&self) -> &str {
        self.paragraphs.first().map(String::as_str).unwrap_or("")
    }

    /// Body paragraphs joined back into structured markup
    pub fn body_markup(&self) -> String {
        self.paragraphs.iter().skip(1).cloned().collect::<Vec<_>>().join("\n\n")
    }
}

/// Turn every part into a chapter, numbered from 1 in reading order
pub fn chapters_from_parts(parts: &[DocumentPart]) -> anyhow::Result<Vec<Chapter>> {
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| Chapter::from_part(i as u32 + 1, part))
        .collect()
}
