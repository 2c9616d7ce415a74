//! Input injection: making text and keys appear at the host's focused input
//!
//! The rest of the crate only talks to [`InputInjector`]. Two implementations
//! exist: [`HostInjector`] drives the real keyboard and clipboard, and
//! [`MemoryInjector`] records actions in memory for dry runs and tests.

mod clipboard;
mod host;
mod memory;
mod shortcut;

pub use clipboard::{
    paste_via_clipboard, ClipboardAccess, ClipboardContent, ClipboardGuard, ClipboardImage,
    MemoryClipboard, SystemClipboard,
};
pub use host::HostInjector;
pub use memory::{InjectedAction, MemoryInjector};
pub use shortcut::{Modifier, PasteShortcut, ShortcutError};

use std::fmt;
use std::str::FromStr;

/// Arrow key direction for caret movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(()),
        }
    }
}

/// Failure to simulate input on the host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error("failed to initialize keyboard injection: {0}")]
    Init(String),

    #[error("failed to simulate {action}: {reason}")]
    Keyboard { action: &'static str, reason: String },

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// The text was pasted but the previous clipboard content is lost
    #[error("pasted, but failed to restore the clipboard: {0}")]
    ClipboardNotRestored(String),

    /// Backspace failed after some presses went through
    #[error("backspace failed after {deleted} of {requested} presses: {reason}")]
    PartialDelete {
        deleted: usize,
        requested: usize,
        reason: String,
    },
}

impl InjectError {
    /// Whether the input reached the host despite the error
    pub fn input_delivered(&self) -> bool {
        matches!(self, InjectError::ClipboardNotRestored(_))
    }

    /// Backspace presses that went through before the failure
    pub fn deleted(&self) -> usize {
        match self {
            InjectError::PartialDelete { deleted, .. } => *deleted,
            _ => 0,
        }
    }
}

/// Capability to reproduce input at the host's current focus.
///
/// Implementations have no view of the target application's text; every
/// call is "blind".
pub trait InputInjector: Send {
    /// Make `text` appear as if pasted. The system clipboard must hold its
    /// previous contents again once this returns, whether or not it succeeded.
    fn paste(&mut self, text: &str) -> Result<(), InjectError>;

    fn press_enter(&mut self) -> Result<(), InjectError>;

    fn press_arrow(&mut self, direction: Direction) -> Result<(), InjectError>;

    /// Press Backspace `count` times. Zero is a no-op.
    ///
    /// A failure after at least one press is [`InjectError::PartialDelete`].
    fn delete_backward(&mut self, count: usize) -> Result<(), InjectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("left".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!("UP".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(" down ".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!("right".parse::<Direction>(), Ok(Direction::Right));
    }

    #[test]
    fn test_direction_parse_unknown() {
        assert!("sideways".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_error_progress() {
        let partial = InjectError::PartialDelete {
            deleted: 2,
            requested: 5,
            reason: "gone".to_string(),
        };
        assert_eq!(partial.deleted(), 2);
        assert!(!partial.input_delivered());
        assert_eq!(InjectError::Init("x".into()).deleted(), 0);
        assert!(InjectError::ClipboardNotRestored("x".into()).input_delivered());
    }

    #[test]
    fn test_direction_display_roundtrips() {
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            assert_eq!(dir.to_string().parse::<Direction>(), Ok(dir));
        }
    }
}
