//! Two-buffer code editor model with inline autocomplete.
//!
//! The editor owns the HTML and CSS buffers, which one is active, the caret
//! in the active buffer, and the popup. It does no I/O; every mutating call
//! reports whether buffer text changed so the caller can schedule a save.

pub mod autocomplete;
pub mod cursor;
pub mod suggestions;

use serde::{Deserialize, Serialize};

use crate::keys::{Key, KeyCombo, KeyOutcome};
use crate::models::SavedSubmission;
use autocomplete::{Autocomplete, PopupKey};
use cursor::{clamp_cursor, word_at_cursor};
pub use suggestions::Grammar;

/// Inserted by a plain Tab when no popup is open.
pub const INDENT: &str = "  ";

/// Which buffer is displayed and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Html,
    Css,
}

impl ActiveTab {
    pub fn grammar(self) -> Grammar {
        match self {
            ActiveTab::Html => Grammar::Html,
            ActiveTab::Css => Grammar::Css,
        }
    }
}

/// The two source buffers. Both are always saved together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffers {
    pub html: String,
    pub css: String,
}

impl Buffers {
    pub fn get(&self, tab: ActiveTab) -> &str {
        match tab {
            ActiveTab::Html => &self.html,
            ActiveTab::Css => &self.css,
        }
    }

    fn get_mut(&mut self, tab: ActiveTab) -> &mut String {
        match tab {
            ActiveTab::Html => &mut self.html,
            ActiveTab::Css => &mut self.css,
        }
    }
}

impl From<SavedSubmission> for Buffers {
    fn from(s: SavedSubmission) -> Self {
        Buffers {
            html: s.html_code,
            css: s.css_code,
        }
    }
}

/// Outcome of feeding one event to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorResponse {
    pub key: KeyOutcome,
    /// Buffer text changed; schedule an autosave.
    pub changed: bool,
}

impl EditorResponse {
    const IGNORED: Self = Self {
        key: KeyOutcome::Ignored,
        changed: false,
    };

    const CONSUMED: Self = Self {
        key: KeyOutcome::Consumed,
        changed: false,
    };

    const EDITED: Self = Self {
        key: KeyOutcome::Consumed,
        changed: true,
    };
}

#[derive(Debug, Clone)]
pub struct Editor {
    buffers: Buffers,
    tab: ActiveTab,
    cursor: usize,
    popup: Autocomplete,
    read_only: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(autocomplete::DEFAULT_MAX_SUGGESTIONS)
    }
}

impl Editor {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            buffers: Buffers::default(),
            tab: ActiveTab::Html,
            cursor: 0,
            popup: Autocomplete::new(max_suggestions),
            read_only: false,
        }
    }

    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    /// Replace both buffers, e.g. when hydrating a prior submission.
    pub fn load(&mut self, buffers: Buffers) {
        self.buffers = buffers;
        self.cursor = self.active_text().len();
        self.popup.hide();
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.tab
    }

    pub fn active_text(&self) -> &str {
        self.buffers.get(self.tab)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn popup(&self) -> &Autocomplete {
        &self.popup
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Disable or re-enable editing. Going read-only closes the popup.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only {
            self.popup.hide();
        }
    }

    /// Show the other buffer; the hidden one is left as is.
    pub fn switch_tab(&mut self, tab: ActiveTab) {
        if tab == self.tab {
            return;
        }
        self.tab = tab;
        self.cursor = self.active_text().len();
        self.popup.hide();
    }

    /// The host's textarea changed: take its full text and caret.
    pub fn input(&mut self, text: &str, cursor: usize) -> EditorResponse {
        if self.read_only {
            return EditorResponse::IGNORED;
        }
        let changed = self.active_text() != text;
        if changed {
            *self.buffers.get_mut(self.tab) = text.to_string();
        }
        self.cursor = clamp_cursor(text, cursor);
        self.refresh_popup();
        EditorResponse {
            key: KeyOutcome::Ignored,
            changed,
        }
    }

    /// Move the caret without changing text (click, arrow keys).
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = clamp_cursor(self.active_text(), cursor);
        self.popup.hide();
    }

    /// Key-down before the textarea applies it.
    pub fn key(&mut self, key: &KeyCombo) -> EditorResponse {
        if self.read_only {
            return EditorResponse::IGNORED;
        }
        match self.popup.handle_key(key) {
            PopupKey::Accepted(s) => {
                let edit = self.popup.apply_to(self.active_text(), &s);
                // Text first, then the caret, so the caret indexes the new text.
                *self.buffers.get_mut(self.tab) = edit.text;
                self.cursor = edit.cursor;
                EditorResponse::EDITED
            }
            PopupKey::Consumed => EditorResponse::CONSUMED,
            PopupKey::Ignored if key.key == Key::Tab && !key.has_modifier() && !key.shift => {
                self.insert_at_cursor(INDENT);
                EditorResponse::EDITED
            }
            PopupKey::Ignored => EditorResponse::IGNORED,
        }
    }

    fn insert_at_cursor(&mut self, s: &str) {
        let at = clamp_cursor(self.active_text(), self.cursor);
        self.buffers.get_mut(self.tab).insert_str(at, s);
        self.cursor = at + s.len();
        self.popup.hide();
    }

    fn refresh_popup(&mut self) {
        let analysis = word_at_cursor(self.active_text(), self.cursor, self.tab.grammar());
        self.popup.update(&analysis, self.cursor);
    }
}
