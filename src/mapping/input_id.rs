//! Normalised identifiers for physical keys and pointer buttons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking a pointing-device button.
pub const POINTER_PREFIX: &str = "pointer:";

/// Older configuration documents used `mouse:left`.
const LEGACY_POINTER_PREFIX: &str = "mouse:";

/// Key tokens understood by the input backends.
pub const KNOWN_KEYS: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "f1",
    "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "space", "enter", "tab",
    "backspace", "escape", "esc", "up", "down", "left", "right", "home", "end", "page up",
    "page down", "insert", "delete", "shift", "left shift", "right shift", "ctrl",
    "left ctrl", "right ctrl", "alt", "left alt", "right alt", "caps lock", "'", ";", ",", ".",
    "/", "\\", "-", "=", "[", "]", "`",
];

/// Physical identifier of a key or pointer button.
///
/// Always stored in normalised form: trimmed, lower-case, `return` aliased to
/// `enter` and the legacy `mouse:` prefix rewritten to `pointer:`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct InputId(String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl PointerButton {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "left" => Some(PointerButton::Left),
            "right" => Some(PointerButton::Right),
            "middle" => Some(PointerButton::Middle),
            "x1" => Some(PointerButton::X1),
            "x2" => Some(PointerButton::X2),
            _ => None,
        }
    }
}

/// What an [`InputId`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind<'a> {
    /// Empty binding, never pressed
    Unbound,
    Key(&'a str),
    Pointer(PointerButton),
    /// `pointer:<something we do not know>`, never pressed
    UnknownPointer(&'a str),
}

impl InputId {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let aliased = match lowered.as_str() {
            "return" => "enter".to_string(),
            _ => lowered,
        };
        let normalised = match aliased.strip_prefix(LEGACY_POINTER_PREFIX) {
            Some(button) => format!("{POINTER_PREFIX}{button}"),
            None => aliased,
        };
        InputId(normalised)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> InputKind<'_> {
        if self.0.is_empty() {
            return InputKind::Unbound;
        }
        match self.0.strip_prefix(POINTER_PREFIX) {
            Some(button) => match PointerButton::from_token(button) {
                Some(button) => InputKind::Pointer(button),
                None => InputKind::UnknownPointer(button),
            },
            None => InputKind::Key(&self.0),
        }
    }

    /// True when the identifier names a key the backends know about.
    pub fn is_known(&self) -> bool {
        match self.kind() {
            InputKind::Unbound | InputKind::Pointer(_) => true,
            InputKind::UnknownPointer(_) => false,
            InputKind::Key(key) => KNOWN_KEYS.contains(&key),
        }
    }
}

impl From<String> for InputId {
    fn from(raw: String) -> Self {
        InputId::parse(&raw)
    }
}

impl From<&str> for InputId {
    fn from(raw: &str) -> Self {
        InputId::parse(raw)
    }
}

impl From<InputId> for String {
    fn from(id: InputId) -> Self {
        id.0
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
