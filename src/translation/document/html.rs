/*!
 * Rich text (XHTML) to structured markup.
 *
 * The part is parsed with html5ever and walked depth first. Block elements
 * flush one markup line each; inline elements and declared spans wrap their
 * text in sigils. Anything under script/style/head is ignored.
 */

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::model::{Block, BlockKind, InlineEffect, BLOCK_TAGS, SKIPPED_TAGS};

fn parse(html: &str) -> anyhow::Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to parse rich text: {:?}", e))
}

fn attribute(handle: &Handle, wanted: &str) -> String {
    match handle.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == wanted)
            .map(|attr| attr.value.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Collects blocks while walking the tree
struct BlockCollector {
    blocks: Vec<Block>,
    current: String,
    kinds: Vec<BlockKind>,
}

impl BlockCollector {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current: String::new(),
            kinds: Vec::new(),
        }
    }

    fn current_kind(&self) -> BlockKind {
        self.kinds.last().copied().unwrap_or(BlockKind::Paragraph)
    }

    fn flush(&mut self) {
        let text = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        self.current.clear();
        if !text.is_empty() {
            self.blocks.push(Block {
                kind: self.current_kind(),
                text,
            });
        }
    }

    fn walk(&mut self, handle: &Handle) {
        match handle.data {
            NodeData::Document => self.walk_children(handle),
            NodeData::Text { ref contents } => self.current.push_str(&contents.borrow()),
            NodeData::Element { ref name, .. } => {
                let tag = name.local.as_ref().to_ascii_lowercase();
                self.walk_element(handle, &tag);
            }
            _ => {}
        }
    }

    fn walk_children(&mut self, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn walk_element(&mut self, handle: &Handle, tag: &str) {
        if SKIPPED_TAGS.contains(&tag) {
            return;
        }

        if tag == "br" || tag == "hr" {
            self.flush();
            return;
        }

        if BLOCK_TAGS.contains(&tag) {
            self.flush();
            let kind = match (heading_level(tag), tag) {
                (Some(level), _) => BlockKind::Heading(level),
                (None, "li") => BlockKind::Bullet,
                // paragraphs nested in list items or headings keep the outer kind
                _ => self.current_kind(),
            };
            self.kinds.push(kind);
            self.walk_children(handle);
            self.flush();
            self.kinds.pop();
            return;
        }

        let effect = InlineEffect::from_tag(tag).or_else(|| {
            if tag == "span" || tag == "font" {
                InlineEffect::from_declaration(
                    &attribute(handle, "style"),
                    &attribute(handle, "class"),
                )
            } else {
                None
            }
        });

        match effect {
            Some(effect) => {
                let outer = std::mem::take(&mut self.current);
                self.walk_children(handle);
                let inner = std::mem::replace(&mut self.current, outer);
                self.push_wrapped(&inner, effect);
            }
            None => self.walk_children(handle),
        }
    }

    /// Wrap inline text in sigils, keeping surrounding whitespace outside
    fn push_wrapped(&mut self, inner: &str, effect: InlineEffect) {
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            self.current.push_str(inner);
            return;
        }
        let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        if inner.starts_with(char::is_whitespace) {
            self.current.push(' ');
        }
        let sigil = effect.sigil();
        self.current.push_str(sigil);
        self.current.push_str(&collapsed);
        self.current.push_str(sigil);
        if inner.ends_with(char::is_whitespace) {
            self.current.push(' ');
        }
    }
}

/// Extract the blocks of a rich text unit
pub fn to_blocks(html: &str) -> anyhow::Result<Vec<Block>> {
    let dom = parse(html)?;
    let mut collector = BlockCollector::new();
    collector.walk(&dom.document);
    collector.flush();
    Ok(collector.blocks)
}

/// Convert rich text to structured markup, one line per block
pub fn to_structured_markup(html: &str) -> anyhow::Result<String> {
    Ok(to_blocks(html)?
        .iter()
        .map(Block::to_markup)
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn find_element(handle: &Handle, wanted: &dyn Fn(&str) -> bool) -> Option<Handle> {
    if let NodeData::Element { ref name, .. } = handle.data {
        if wanted(&name.local.as_ref().to_ascii_lowercase()) {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, wanted))
}

fn text_content(handle: &Handle, out: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { ref name, .. }
            if matches!(name.local.as_ref(), "script" | "style") => {}
        _ => {
            for child in handle.children.borrow().iter() {
                text_content(child, out);
            }
        }
    }
}

/// Title of a rich text unit: `<title>` first, else the first heading
pub fn document_title(html: &str) -> anyhow::Result<Option<String>> {
    let dom = parse(html)?;

    let title = [
        find_element(&dom.document, &|tag: &str| tag == "title"),
        find_element(&dom.document, &|tag: &str| heading_level(tag).is_some()),
    ]
    .into_iter()
    .flatten()
    .map(|node| {
        let mut text = String::new();
        text_content(&node, &mut text);
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    })
    .find(|text| !text.is_empty());

    Ok(title)
}
