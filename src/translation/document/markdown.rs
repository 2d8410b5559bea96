/*!
 * Structured markup back to rich text.
 *
 * Lines are classified by their leading marker (longest heading marker
 * first, then bullets, else paragraph). Inline sigils are expanded with a
 * fixed precedence so overlapping sigils always nest the same way, and
 * monospace spans are emitted verbatim without further scanning.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{BlockKind, InlineEffect};

static MONOSPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Non-monospace inline rules, in expansion order
static INLINE_RULES: Lazy<Vec<(Regex, InlineEffect)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"~~([^~]+)~~").unwrap(), InlineEffect::Strikethrough),
        (Regex::new(r"\*\*(.+?)\*\*").unwrap(), InlineEffect::Bold),
        (Regex::new(r"\*([^*]+)\*").unwrap(), InlineEffect::Italic),
        (Regex::new(r"__([^_]+)__").unwrap(), InlineEffect::Underline),
    ]
});

/// Rich text produced from structured markup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichText {
    /// Plain text of the first heading, if any
    pub title: Option<String>,
    /// Body fragment (block elements only)
    pub body: String,
}

/// Escape text for use in XHTML content and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Classify a markup line by its leading marker
pub fn classify_line(line: &str) -> (BlockKind, &str) {
    for level in (1..=6u8).rev() {
        let marker = BlockKind::Heading(level).marker();
        if let Some(rest) = line.strip_prefix(marker.as_str()) {
            return (BlockKind::Heading(level), rest);
        }
    }
    if let Some(rest) = line.strip_prefix("- ") {
        return (BlockKind::Bullet, rest);
    }
    (BlockKind::Paragraph, line)
}

fn expand_segment(text: &str) -> String {
    INLINE_RULES.iter().fold(text.to_string(), |acc, (regex, effect)| {
        let tag = effect.tag();
        regex
            .replace_all(&acc, format!("<{tag}>${{1}}</{tag}>").as_str())
            .into_owned()
    })
}

/// Expand inline sigils of one line into tags
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let mut html = String::with_capacity(escaped.len() + 16);
    let mut last = 0;

    for caps in MONOSPACE_REGEX.captures_iter(&escaped) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        html.push_str(&expand_segment(&escaped[last..whole.start()]));
        html.push_str("<code>");
        html.push_str(code.as_str());
        html.push_str("</code>");
        last = whole.end();
    }
    html.push_str(&expand_segment(&escaped[last..]));
    html
}

/// Remove inline sigils, keeping their content
pub fn plain_inline(text: &str) -> String {
    let without_code = MONOSPACE_REGEX.replace_all(text, "${1}").into_owned();
    INLINE_RULES.iter().fold(without_code, |acc, (regex, _)| {
        regex.replace_all(&acc, "${1}").into_owned()
    })
}

/// Convert structured markup into rich text
pub fn from_structured_markup(text: &str) -> RichText {
    let mut body = String::with_capacity(text.len() * 2);
    let mut title = None;
    let mut in_list = false;

    for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
        let (kind, content) = classify_line(line);

        if in_list && kind != BlockKind::Bullet {
            body.push_str("</ul>\n");
            in_list = false;
        }

        let inner = render_inline(content.trim());
        match kind {
            BlockKind::Heading(level) => {
                if title.is_none() {
                    title = Some(plain_inline(content.trim()));
                }
                body.push_str(&format!("<h{level}>{inner}</h{level}>\n"));
            }
            BlockKind::Bullet => {
                if !in_list {
                    body.push_str("<ul>\n");
                    in_list = true;
                }
                body.push_str(&format!("<li>{inner}</li>\n"));
            }
            BlockKind::Paragraph => body.push_str(&format!("<p>{inner}</p>\n")),
        }
    }
    if in_list {
        body.push_str("</ul>\n");
    }

    RichText { title, body }
}

/// Wrap a body fragment into a complete XHTML page
pub fn render_page(title: &str, body: &str, language_code: &str) -> String {
    let lang = escape_html(language_code);
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\" lang=\"{lang}\">\n\
         <head>\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}
