//! Key events as delivered by the host UI.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Backspace,
    /// Anything else, by its DOM `key` name.
    Named(String),
}

/// A key press together with the modifier state at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyCombo {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    pub fn meta(key: Key) -> Self {
        Self {
            meta: true,
            ..Self::plain(key)
        }
    }

    pub fn alt(key: Key) -> Self {
        Self {
            alt: true,
            ..Self::plain(key)
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }

    /// Whether this is the given letter, ignoring case.
    pub fn is_letter(&self, letter: char) -> bool {
        matches!(self.key, Key::Char(c) if c.eq_ignore_ascii_case(&letter))
    }
}

impl From<Key> for KeyCombo {
    fn from(key: Key) -> Self {
        KeyCombo::plain(key)
    }
}

/// What the host must do with the native event after we handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Handled here; call `preventDefault` and stop propagation.
    Consumed,
    /// Let the default editing behaviour run.
    Ignored,
}

impl KeyOutcome {
    pub fn is_consumed(self) -> bool {
        self == KeyOutcome::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_letter_ignores_case() {
        assert!(KeyCombo::ctrl(Key::Char('T')).is_letter('t'));
        assert!(!KeyCombo::ctrl(Key::Tab).is_letter('t'));
    }

    #[test]
    fn plain_has_no_modifier() {
        assert!(!KeyCombo::plain(Key::Enter).has_modifier());
        assert!(KeyCombo::alt(Key::Tab).has_modifier());
        assert!(!KeyCombo::plain(Key::Tab).with_shift().has_modifier());
    }

    #[test]
    fn deserializes_with_default_modifiers() {
        let k: KeyCombo = serde_json::from_str(r#"{"key":{"Char":"w"},"meta":true}"#).unwrap();
        assert_eq!(k, KeyCombo::meta(Key::Char('w')));
    }
}
