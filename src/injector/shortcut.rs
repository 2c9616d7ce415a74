//! Paste shortcut parsing
//!
//! Parses chord strings like `ctrl+v`, `cmd+v` or `ctrl+shift+v` into the
//! key sequence the host injector presses to paste.

use std::fmt;
use std::str::FromStr;

/// Modifier keys that can be held while pressing the paste key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl Modifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Shift => "shift",
            Modifier::Alt => "alt",
            Modifier::Meta => "cmd",
        }
    }
}

/// A modifier chord ending in a single character key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteShortcut {
    modifiers: Vec<Modifier>,
    key: char,
}

impl PasteShortcut {
    pub fn new(modifiers: Vec<Modifier>, key: char) -> Self {
        Self { modifiers, key }
    }

    /// Modifiers in press order
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> char {
        self.key
    }

    /// Platform paste chord: `cmd+v` on macOS, `ctrl+v` elsewhere
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(vec![Modifier::Meta], 'v')
        } else {
            Self::new(vec![Modifier::Ctrl], 'v')
        }
    }
}

impl Default for PasteShortcut {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for PasteShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.as_str())?;
        }
        write!(f, "{}", self.key)
    }
}

/// Errors from parsing a shortcut string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortcutError {
    #[error("empty shortcut")]
    Empty,
    #[error("multiple keys in shortcut: {0}")]
    MultipleKeys(String),
    #[error("no key found in shortcut: {0}")]
    MissingKey(String),
    #[error("unsupported key `{0}` (expected a single character)")]
    UnsupportedKey(String),
}

impl FromStr for PasteShortcut {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShortcutError::Empty);
        }

        let mut modifiers = Vec::new();
        let mut key = None;

        for part in s.split('+') {
            let part = part.trim().to_lowercase();
            let modifier = match part.as_str() {
                "ctrl" | "control" => Modifier::Ctrl,
                "shift" => Modifier::Shift,
                "alt" | "option" | "opt" => Modifier::Alt,
                "cmd" | "meta" | "super" | "win" => Modifier::Meta,
                _ => {
                    if key.is_some() {
                        return Err(ShortcutError::MultipleKeys(s.to_string()));
                    }
                    let mut chars = part.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => key = Some(c),
                        _ => return Err(ShortcutError::UnsupportedKey(part)),
                    }
                    continue;
                }
            };
            if !modifiers.contains(&modifier) {
                modifiers.push(modifier);
            }
        }

        let key = key.ok_or_else(|| ShortcutError::MissingKey(s.to_string()))?;
        Ok(Self { modifiers, key })
    }
}
