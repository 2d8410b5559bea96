/*!
 * Adequacy scoring: how much of the source meaning survived.
 *
 * The generation service is asked to rate the pair; when it fails or answers
 * with something that is not a number, a lexical estimate is used instead.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::providers::{ChatRequest, Provider};
use crate::translation::formatting::remove_tagged_block;
use crate::translation::prompts::adequacy_messages;

use super::errors::text_similarity;

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Lexical adequacy estimate, 0 to 100
///
/// Combines the word count ratio (30 points), word overlap (50 points) and
/// the character count ratio (20 points). An empty side scores 0.
pub fn lexical_adequacy(source: &str, translated: &str) -> u8 {
    let source = source.trim();
    let translated = translated.trim();
    if source.is_empty() || translated.is_empty() {
        return 0;
    }

    let ratio = |a: usize, b: usize| -> f64 {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        if high == 0 { 0.0 } else { low as f64 / high as f64 }
    };

    let word_ratio = ratio(
        source.split_whitespace().count(),
        translated.split_whitespace().count(),
    );
    let char_ratio = ratio(source.chars().count(), translated.chars().count());
    let overlap = text_similarity(source, translated);

    let score = 30.0 * word_ratio + 50.0 * overlap + 20.0 * char_ratio;
    score.clamp(0.0, 100.0).round() as u8
}

/// Read a 0-100 rating out of a model answer
pub fn parse_rating(response: &str) -> Option<u8> {
    let cleaned = remove_tagged_block(Some(response), "think")?;
    let digits = INTEGER_REGEX.find(&cleaned)?;
    let value: u64 = digits.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

/// Ask the model to rate a translation, falling back to the lexical estimate
pub async fn adequacy_score(
    provider: &dyn Provider,
    model: &str,
    source: &str,
    translated: &str,
    source_lang: &str,
    target_lang: &str,
) -> u8 {
    let request = ChatRequest::new(
        model,
        adequacy_messages(source, translated, source_lang, target_lang),
    )
    .temperature(0.0)
    .max_tokens(16);

    match provider.complete(request).await {
        Ok(response) => match parse_rating(&response) {
            Some(score) => score,
            None => {
                debug!("Unparsable adequacy rating: {:?}", response);
                lexical_adequacy(source, translated)
            }
        },
        Err(e) => {
            warn!("Adequacy rating failed, using lexical estimate: {}", e);
            lexical_adequacy(source, translated)
        }
    }
}
