/*!
 * Tests for the rich text <-> structured markup codec and chapter loading
 */

use bookwai::translation::document::{
    chapters_from_parts, document_title, from_structured_markup, render_page, to_structured_markup,
    Chapter, DocumentPart,
};
use bookwai::translation::formatting::strip_formatting_envelope;

use crate::common::{CHAPTER_ONE, CHAPTER_TWO};

#[test]
fn test_toStructuredMarkup_withSampleChapter_shouldKeepBlocksAndBold() {
    let markup = to_structured_markup(CHAPTER_ONE).unwrap();

    assert_eq!(
        markup,
        "# The Storm\n\nIt was a **dark** night.\n\nHelena waited by the door.\n\n1914"
    );
}

#[test]
fn test_documentTitle_withSampleChapter_shouldUseTitleElement() {
    assert_eq!(document_title(CHAPTER_TWO).unwrap(), Some("Morning".to_string()));
}

#[test]
fn test_chapterFromPart_shouldPutTitleFirst() {
    let part = DocumentPart::new("text/ch01.xhtml", "ch01.xhtml", CHAPTER_ONE);

    let chapter = Chapter::from_part(1, &part).unwrap();

    assert_eq!(chapter.title(), "The Storm");
    assert_eq!(chapter.paragraphs.len(), 5);
    assert_eq!(
        chapter.body_markup(),
        "# The Storm\n\nIt was a **dark** night.\n\nHelena waited by the door.\n\n1914"
    );
}

#[test]
fn test_chapterFromPart_withoutAnyTitle_shouldUseEmptyTitle() {
    let part = DocumentPart::new("p.xhtml", "p.xhtml", "<html><body><p>Only text.</p></body></html>");

    let chapter = Chapter::from_part(3, &part).unwrap();

    assert_eq!(chapter.paragraphs, vec!["", "Only text."]);
}

#[test]
fn test_chaptersFromParts_shouldNumberFromOne() {
    let parts = vec![
        DocumentPart::new("a.xhtml", "a.xhtml", CHAPTER_ONE),
        DocumentPart::new("b.xhtml", "b.xhtml", CHAPTER_TWO),
    ];

    let chapters = chapters_from_parts(&parts).unwrap();

    let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(chapters[1].part_id, "b.xhtml");
}

#[test]
fn test_renderedPage_shouldParseBackToSameMarkup() {
    let markup = "# La Tempête\n\nIl faisait une nuit **sombre**.\n\n- un\n\n- deux\n\nFin & suite";

    let rich = from_structured_markup(markup);
    let page = render_page(rich.title.as_deref().unwrap_or_default(), &rich.body, "fr");

    assert_eq!(document_title(&page).unwrap(), Some("La Tempête".to_string()));
    assert_eq!(to_structured_markup(&page).unwrap(), markup);
}

#[test]
fn test_envelope_shouldSplitMarkupParagraphs() {
    let heading = strip_formatting_envelope("# The Storm");
    let sentence = strip_formatting_envelope("It was a **dark** night.");
    let number = strip_formatting_envelope("1914");

    assert_eq!((heading.prefix.as_str(), heading.core.as_str()), ("# ", "The Storm"));
    assert_eq!(sentence.core, "It was a **dark** night");
    assert_eq!(sentence.suffix, ".");
    assert!(number.is_empty());
    assert_eq!(sentence.wrap("Il faisait une nuit **sombre**"), "Il faisait une nuit **sombre**.");
}
