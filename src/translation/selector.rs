/*!
 * Chapter selection and paragraph chunking.
 */

use crate::errors::SelectorError;

/// Parse a chapter selector such as `1,3-5,8-10`
///
/// Tokens keep their encountered order and chapters missing from
/// `available` are dropped. `None` selects every available chapter and an
/// empty string selects none.
pub fn parse_chapter_selector(
    selector: Option<&str>,
    available: &[u32],
) -> Result<Vec<u32>, SelectorError> {
    let Some(selector) = selector else {
        return Ok(available.to_vec());
    };

    let mut selected = Vec::new();
    for token in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        for chapter in parse_token(token)? {
            if available.contains(&chapter) && !selected.contains(&chapter) {
                selected.push(chapter);
            }
        }
    }
    Ok(selected)
}

fn parse_number(token: &str, part: &str) -> Result<u32, SelectorError> {
    part.trim().parse::<u32>().map_err(|_| SelectorError::Parse {
        token: token.to_string(),
        reason: format!("'{}' is not a chapter number", part.trim()),
    })
}

fn parse_token(token: &str) -> Result<std::ops::RangeInclusive<u32>, SelectorError> {
    match token.split_once('-') {
        Some((start, end)) => {
            let start = parse_number(token, start)?;
            let end = parse_number(token, end)?;
            if start > end {
                return Err(SelectorError::Parse {
                    token: token.to_string(),
                    reason: "range start is after its end".to_string(),
                });
            }
            Ok(start..=end)
        }
        None => {
            let chapter = parse_number(token, token)?;
            Ok(chapter..=chapter)
        }
    }
}

/// Split structured markup into paragraphs on blank lines
///
/// Empty paragraphs are dropped; they carry no text to translate.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}
