//! Inline autocomplete popup state.

use super::cursor::{WordAtCursor, WordKind};
use super::suggestions::{prefix_matches, Grammar, Suggestion};
use crate::keys::{Key, KeyCombo, KeyOutcome};

pub const DEFAULT_MAX_SUGGESTIONS: usize = 8;

/// A buffer replacement plus where the caret goes once it is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub cursor: usize,
}

/// Result of routing a key through the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupKey {
    /// Popup hidden; the key was not ours.
    Ignored,
    /// Navigation or dismissal; buffer untouched.
    Consumed,
    /// The selected suggestion was accepted.
    Accepted(Suggestion),
}

impl PopupKey {
    pub fn outcome(&self) -> KeyOutcome {
        match self {
            PopupKey::Ignored => KeyOutcome::Ignored,
            _ => KeyOutcome::Consumed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Autocomplete {
    suggestions: Vec<Suggestion>,
    selected: usize,
    visible: bool,
    /// Span the popup was opened for.
    start: usize,
    cursor: usize,
    grammar: Grammar,
    limit: usize,
}

impl Default for Autocomplete {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUGGESTIONS)
    }
}

impl Autocomplete {
    pub fn new(limit: usize) -> Self {
        Self {
            suggestions: Vec::new(),
            selected: 0,
            visible: false,
            start: 0,
            cursor: 0,
            grammar: Grammar::Html,
            limit: limit.max(1),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Suggestion> {
        self.visible.then(|| self.suggestions.get(self.selected)).flatten()
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.suggestions.clear();
        self.selected = 0;
    }

    /// Refresh the popup for the analyzed word at `cursor`.
    pub fn update(&mut self, analysis: &WordAtCursor, cursor: usize) {
        let grammar = match analysis.kind {
            WordKind::HtmlTag => Grammar::Html,
            WordKind::CssProperty => Grammar::Css,
            WordKind::None => {
                self.hide();
                return;
            }
        };
        self.start = analysis.start;
        self.cursor = cursor;
        self.filter(&analysis.word, grammar);
    }

    /// Show the prefix matches for `word`, or hide when there are none.
    pub fn filter(&mut self, word: &str, grammar: Grammar) {
        self.grammar = grammar;
        self.suggestions = prefix_matches(grammar, word, self.limit);
        self.selected = 0;
        self.visible = !self.suggestions.is_empty();
    }

    /// Arrow navigation, accept on Tab/Enter, dismiss on Escape.
    pub fn handle_key(&mut self, key: &KeyCombo) -> PopupKey {
        if !self.visible || key.has_modifier() || (key.shift && key.key == Key::Tab) {
            return PopupKey::Ignored;
        }
        let last = self.suggestions.len().saturating_sub(1);
        match key.key {
            Key::ArrowDown => {
                self.selected = (self.selected + 1).min(last);
                PopupKey::Consumed
            }
            Key::ArrowUp => {
                self.selected = self.selected.saturating_sub(1);
                PopupKey::Consumed
            }
            Key::Tab | Key::Enter => match self.suggestions.get(self.selected).copied() {
                Some(s) => {
                    self.hide();
                    PopupKey::Accepted(s)
                }
                None => {
                    self.hide();
                    PopupKey::Consumed
                }
            },
            Key::Escape => {
                self.hide();
                PopupKey::Consumed
            }
            _ => PopupKey::Ignored,
        }
    }

    /// Apply `suggestion` to `text` over the span the popup was opened for.
    pub fn apply_to(&self, text: &str, suggestion: &Suggestion) -> Edit {
        apply(text, self.start, self.cursor, suggestion, self.grammar)
    }
}

/// Replace `[start, cursor)` with the snippet and place the caret.
///
/// HTML snippets carry their own `<`, so the opener typed before the word is
/// absorbed into the replaced span. The caret lands just after the first `>`
/// so content goes inside the opened tag.
/// CSS: on the first `;` so the value goes before the terminator.
pub fn apply(
    text: &str,
    start: usize,
    cursor: usize,
    suggestion: &Suggestion,
    grammar: Grammar,
) -> Edit {
    let cursor = super::cursor::clamp_cursor(text, cursor);
    let mut start = super::cursor::clamp_cursor(text, start.min(cursor));
    let snippet = suggestion.snippet;
    if grammar == Grammar::Html && snippet.starts_with('<') && text[..start].ends_with('<') {
        start -= 1;
    }

    let mut out = String::with_capacity(text.len() + snippet.len());
    out.push_str(&text[..start]);
    out.push_str(snippet);
    out.push_str(&text[cursor..]);

    let offset = match grammar {
        Grammar::Html => snippet.find('>').map(|i| i + 1),
        Grammar::Css => snippet.find(';'),
    }
    .unwrap_or(snippet.len());

    Edit {
        text: out,
        cursor: start + offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::cursor::word_at_cursor;
    use crate::editor::suggestions::{CSS_PROPERTIES, HTML_TAGS};

    fn popup_for(text: &str, grammar: Grammar) -> Autocomplete {
        let mut ac = Autocomplete::default();
        ac.update(&word_at_cursor(text, text.len(), grammar), text.len());
        ac
    }

    fn names(ac: &Autocomplete) -> Vec<&'static str> {
        ac.suggestions().iter().map(|s| s.prefix).collect()
    }

    #[test]
    fn div_snippet_places_cursor_inside_tag() {
        let div = HTML_TAGS.iter().find(|s| s.prefix == "div").unwrap();
        let edit = apply("<di", 1, 3, div, Grammar::Html);
        assert_eq!(edit.text, "<div></div>");
        assert_eq!(edit.cursor, 5);
    }

    #[test]
    fn css_snippet_places_cursor_before_semicolon() {
        let color = CSS_PROPERTIES.iter().find(|s| s.prefix == "color").unwrap();
        let edit = apply("p {\n  col\n}", 6, 9, color, Grammar::Css);
        assert_eq!(edit.text, "p {\n  color: ;\n}");
        assert_eq!(&edit.text[edit.cursor..edit.cursor + 1], ";");
        assert_eq!(edit.cursor, 13);
    }

    #[test]
    fn apply_keeps_text_after_cursor() {
        let p = HTML_TAGS.iter().find(|s| s.prefix == "p").unwrap();
        let edit = apply("<body><p\n</body>", 7, 8, p, Grammar::Html);
        assert_eq!(edit.text, "<body><p></p>\n</body>");
        assert_eq!(edit.cursor, 9);
    }

    #[test]
    fn h_shows_headings_in_table_order() {
        let ac = popup_for("<h", Grammar::Html);
        assert!(ac.is_visible());
        assert_eq!(names(&ac), ["h1", "h2", "h3", "h4", "h5", "h6", "header"]);
        assert_eq!(ac.selected_index(), 0);
    }

    #[test]
    fn bare_angle_bracket_shows_nothing() {
        let ac = popup_for("<", Grammar::Html);
        assert!(!ac.is_visible());
        assert!(ac.suggestions().is_empty());
    }

    #[test]
    fn closed_tag_shows_nothing() {
        assert!(!popup_for("<h1>", Grammar::Html).is_visible());
    }

    #[test]
    fn no_match_hides() {
        assert!(!popup_for("<zz", Grammar::Html).is_visible());
    }

    #[test]
    fn popup_never_exceeds_limit() {
        let mut ac = Autocomplete::new(3);
        ac.filter("b", Grammar::Css);
        assert_eq!(ac.suggestions().len(), 3);
    }

    #[test]
    fn arrows_clamp_selection() {
        let mut ac = popup_for("<h", Grammar::Html);
        let up = KeyCombo::plain(Key::ArrowUp);
        let down = KeyCombo::plain(Key::ArrowDown);

        assert_eq!(ac.handle_key(&up), PopupKey::Consumed);
        assert_eq!(ac.selected_index(), 0);

        for _ in 0..20 {
            ac.handle_key(&down);
        }
        assert_eq!(ac.selected_index(), 6);
        ac.handle_key(&up);
        assert_eq!(ac.selected_index(), 5);
    }

    #[test]
    fn enter_accepts_selected_and_hides() {
        let mut ac = popup_for("<h", Grammar::Html);
        ac.handle_key(&KeyCombo::plain(Key::ArrowDown));
        let got = ac.handle_key(&KeyCombo::plain(Key::Enter));
        assert_eq!(got, PopupKey::Accepted(HTML_TAGS[9]));
        assert!(!ac.is_visible());
    }

    #[test]
    fn tab_accepts_like_enter() {
        let mut ac = popup_for("  back", Grammar::Css);
        match ac.handle_key(&KeyCombo::plain(Key::Tab)) {
            PopupKey::Accepted(s) => assert_eq!(s.prefix, "background"),
            other => panic!("expected accept, got {other:?}"),
        }
    }

    #[test]
    fn shift_tab_leaves_popup_open() {
        let mut ac = popup_for("  back", Grammar::Css);
        let got = ac.handle_key(&KeyCombo::plain(Key::Tab).with_shift());
        assert_eq!(got, PopupKey::Ignored);
        assert!(ac.is_visible());
        assert_eq!(ac.selected().map(|s| s.prefix), Some("background"));
    }

    #[test]
    fn escape_hides_without_applying() {
        let mut ac = popup_for("<d", Grammar::Html);
        assert_eq!(ac.handle_key(&KeyCombo::plain(Key::Escape)), PopupKey::Consumed);
        assert!(!ac.is_visible());
    }

    #[test]
    fn keys_pass_through_when_hidden() {
        let mut ac = Autocomplete::default();
        let got = ac.handle_key(&KeyCombo::plain(Key::Enter));
        assert_eq!(got, PopupKey::Ignored);
        assert_eq!(got.outcome(), KeyOutcome::Ignored);
    }

    #[test]
    fn ordinary_chars_are_not_intercepted() {
        let mut ac = popup_for("<d", Grammar::Html);
        assert_eq!(ac.handle_key(&KeyCombo::plain(Key::Char('i'))), PopupKey::Ignored);
        assert!(ac.is_visible());
    }

    #[test]
    fn apply_to_uses_recorded_span() {
        let text = "<section>\n  <art";
        let mut ac = popup_for(text, Grammar::Html);
        let PopupKey::Accepted(s) = ac.handle_key(&KeyCombo::plain(Key::Enter)) else {
            panic!("expected accept");
        };
        let edit = ac.apply_to(text, &s);
        assert_eq!(edit.text, "<section>\n  <article></article>");
        assert_eq!(edit.cursor, "<section>\n  <article>".len());
    }
}
