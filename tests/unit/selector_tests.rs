/*!
 * Tests for chapter selection and paragraph splitting
 */

use bookwai::errors::SelectorError;
use bookwai::translation::selector::{parse_chapter_selector, split_paragraphs};

const BOOK: [u32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

#[test]
fn test_parseChapterSelector_withMixedTokens_shouldExpandRanges() {
    assert_eq!(
        parse_chapter_selector(Some("1,3-5,8-10"), &BOOK).unwrap(),
        vec![1, 3, 4, 5, 8, 9, 10]
    );
}

#[test]
fn test_parseChapterSelector_shouldTolerateSpacesAndDuplicates() {
    assert_eq!(
        parse_chapter_selector(Some(" 2 , 2-3 ,, 1 "), &BOOK).unwrap(),
        vec![2, 3, 1]
    );
}

#[test]
fn test_parseChapterSelector_withRangePastEnd_shouldClipToAvailable() {
    assert_eq!(parse_chapter_selector(Some("9-40"), &BOOK).unwrap(), vec![9, 10]);
    assert!(parse_chapter_selector(Some("11"), &BOOK).unwrap().is_empty());
}

#[test]
fn test_parseChapterSelector_withBadTokens_shouldReportToken() {
    for bad in ["x", "1-", "-3", "4-2", "1.5", "1-2-3"] {
        let error = parse_chapter_selector(Some(bad), &BOOK).unwrap_err();
        let SelectorError::Parse { token, .. } = error;
        assert_eq!(token, bad);
    }
}

#[test]
fn test_splitParagraphs_shouldDropEmptyBlocks() {
    let paragraphs = split_paragraphs("\n\n# Title\n\n\n\nFirst line\nsecond line  \n\n   \n\nLast");

    assert_eq!(paragraphs, vec!["# Title", "First line\nsecond line", "Last"]);
}
