//! Word-at-cursor analysis.
//!
//! Only the current line up to the cursor is examined:
//!
//! - HTML: the line ends in an unclosed tag opener, `<` followed by zero or
//!   more ASCII letters.
//! - CSS: the line is just optional indentation plus letters/hyphens (start
//!   of a declaration), or letters/hyphens right after a `;` with optional
//!   whitespace (next declaration on the same line).
//!
//! Offsets are byte offsets into the buffer.

use super::suggestions::Grammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    HtmlTag,
    CssProperty,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAtCursor {
    pub word: String,
    pub kind: WordKind,
    /// Where `word` begins; the span `[start, cursor)` is what a completion
    /// replaces.
    pub start: usize,
}

impl WordAtCursor {
    fn none(cursor: usize) -> Self {
        Self {
            word: String::new(),
            kind: WordKind::None,
            start: cursor,
        }
    }
}

/// Clamp `cursor` into `text` and back onto a char boundary.
pub fn clamp_cursor(text: &str, cursor: usize) -> usize {
    let mut c = cursor.min(text.len());
    while !text.is_char_boundary(c) {
        c -= 1;
    }
    c
}

pub fn word_at_cursor(text: &str, cursor: usize, grammar: Grammar) -> WordAtCursor {
    let cursor = clamp_cursor(text, cursor);
    let before = &text[..cursor];
    let line = before.rsplit('\n').next().unwrap_or("");

    let matched = match grammar {
        Grammar::Html => html_tag_word(line).map(|w| (w, WordKind::HtmlTag)),
        Grammar::Css => css_property_word(line).map(|w| (w, WordKind::CssProperty)),
    };

    match matched {
        Some((word, kind)) => WordAtCursor {
            word: word.to_string(),
            kind,
            start: cursor - word.len(),
        },
        None => WordAtCursor::none(cursor),
    }
}

/// Trailing run of bytes satisfying `pred`; all callers use ASCII predicates.
fn trailing_run(line: &str, pred: impl Fn(u8) -> bool) -> &str {
    let keep = line.bytes().rev().take_while(|b| pred(*b)).count();
    &line[line.len() - keep..]
}

fn is_css_ident(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'-'
}

/// `<([A-Za-z]*)$`
fn html_tag_word(line: &str) -> Option<&str> {
    let word = trailing_run(line, |b| b.is_ascii_alphabetic());
    let rest = &line[..line.len() - word.len()];
    rest.ends_with('<').then_some(word)
}

/// `^\s*([A-Za-z-]+)$` or `;\s*([A-Za-z-]+)$`
fn css_property_word(line: &str) -> Option<&str> {
    let word = trailing_run(line, is_css_ident);
    if word.is_empty() {
        return None;
    }
    let rest = line[..line.len() - word.len()].trim_end_matches(|c: char| c.is_whitespace());
    (rest.is_empty() || rest.ends_with(';')).then_some(word)
}
