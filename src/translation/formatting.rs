/*!
 * Envelope handling for translated lines.
 *
 * A markup line such as `## **Chapter One:**` carries structure the model
 * must never touch. `strip_formatting_envelope` splits it into the leading
 * markers, the semantic core and the trailing sigils/punctuation; only the
 * core is sent for generation and the envelope is put back afterwards.
 *
 * `remove_tagged_block` excises whole tagged regions (script, style, think
 * blocks, pseudo-instructions) from text before and after generation.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Quote marks are part of the sentence, not of its envelope
const QUOTE_CHARS: &[char] = &['"', '\'', '“', '”', '‘', '’', '«', '»', '„', '‚', '‹', '›'];

/// Tags removed from every unit before it is sent for generation
pub const UNSAFE_TAGS: &[&str] = &["script", "style", "instructions", "system", "think"];

/// Collapses runs of horizontal whitespace left behind by removed blocks
static EXTRA_SPACES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// A line split into its structural envelope and semantic core
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Bare text to translate
    pub core: String,
    /// Leading markers, opening sigils and whitespace
    pub prefix: String,
    /// Closing sigils, trailing punctuation and whitespace
    pub suffix: String,
}

impl Envelope {
    /// Whether there is anything left to translate
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Reattach the envelope around a (translated) core
    ///
    /// Models sometimes echo the markers back; an already wrapped core is
    /// not wrapped a second time.
    pub fn wrap(&self, core: &str) -> String {
        let core = core.trim();
        let prefix_mark = self.prefix.trim();
        let suffix_mark = self.suffix.trim();

        let starts_wrapped = !prefix_mark.is_empty() && core.starts_with(prefix_mark);
        let ends_wrapped = !suffix_mark.is_empty() && core.ends_with(suffix_mark);

        match (starts_wrapped, ends_wrapped) {
            (true, true) => core.to_string(),
            (true, false) => format!("{}{}", core, self.suffix),
            (false, true) => format!("{}{}", self.prefix, core),
            (false, false) => format!("{}{}{}", self.prefix, core, self.suffix),
        }
    }
}

fn is_core_char(c: char) -> bool {
    c.is_alphabetic() || QUOTE_CHARS.contains(&c)
}

/// Split a line into prefix, core and suffix
///
/// `prefix + core + suffix` always equals the input. Text without any
/// letter ends up entirely in the prefix.
pub fn strip_formatting_envelope(text: &str) -> Envelope {
    let Some(start) = text.char_indices().find(|(_, c)| is_core_char(*c)).map(|(i, _)| i) else {
        return Envelope {
            core: String::new(),
            prefix: text.to_string(),
            suffix: String::new(),
        };
    };

    let end = text
        .char_indices()
        .rev()
        .find(|(_, c)| is_core_char(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());

    Envelope {
        core: text[start..end].to_string(),
        prefix: text[..start].to_string(),
        suffix: text[end..].to_string(),
    }
}

/// Whether the text contains at least one letter
pub fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// Remove a tag and everything it encloses, including self-closing forms
///
/// `None` passes through; an empty tag name leaves the text untouched.
pub fn remove_tagged_block(text: Option<&str>, tag: &str) -> Option<String> {
    let text = text?;
    let tag = tag.trim();
    if tag.is_empty() {
        return Some(text.to_string());
    }

    let name = regex::escape(tag);
    let block = Regex::new(&format!(r"(?is)<{name}\b[^>]*>.*?</{name}\s*>"));
    let single = Regex::new(&format!(r"(?i)<{name}\b[^>]*/?>|</{name}\s*>"));

    match (block, single) {
        (Ok(block), Ok(single)) => {
            let without_blocks = block.replace_all(text, "");
            Some(single.replace_all(&without_blocks, "").into_owned())
        }
        _ => Some(text.to_string()),
    }
}

/// Remove every unsafe tagged block from a unit of text
pub fn sanitize_for_generation(text: &str) -> String {
    let mut result = text.to_string();
    for tag in UNSAFE_TAGS {
        if let Some(cleaned) = remove_tagged_block(Some(&result), tag) {
            result = cleaned;
        }
    }
    if result.len() != text.len() {
        result = EXTRA_SPACES_REGEX.replace_all(result.trim(), " ").into_owned();
    }
    result
}
