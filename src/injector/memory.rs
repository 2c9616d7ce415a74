//! In-memory injector for dry runs and tests
//!
//! Keeps a log of every action plus a simulated "focused document": pastes
//! append at the end, Enter appends a newline and Backspace removes the last
//! character. Clones share state, so a test can keep a handle while a
//! session owns the injector.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::clipboard::{
    paste_via_clipboard, ClipboardAccess, ClipboardContent, MemoryClipboard,
};
use super::{Direction, InjectError, InputInjector};

/// One call made against the injector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedAction {
    Paste(String),
    Enter,
    Arrow(Direction),
    DeleteBackward(usize),
}

#[derive(Debug, Default)]
struct MemoryState {
    actions: Vec<InjectedAction>,
    clipboard: MemoryClipboard,
    document: String,
    fail_next: bool,
    fail_delete_after: Option<usize>,
}

impl MemoryState {
    fn check_failure(&mut self, action: &'static str) -> Result<(), InjectError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(InjectError::Keyboard {
                action,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryInjector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `text` on the simulated clipboard
    pub fn with_clipboard(text: &str) -> Self {
        Self::with_clipboard_content(ClipboardContent::Text(text.to_owned()))
    }

    pub fn with_clipboard_content(content: ClipboardContent) -> Self {
        let injector = Self::new();
        injector.lock().clipboard = MemoryClipboard::holding(content);
        injector
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next injector call fail after any clipboard swap has started
    pub fn fail_next(&self) {
        self.lock().fail_next = true;
    }

    /// Make the next `delete_backward` stop after `presses` Backspaces
    pub fn fail_delete_after(&self, presses: usize) {
        self.lock().fail_delete_after = Some(presses);
    }

    /// Make the next paste lose the previous clipboard content
    pub fn fail_clipboard_restore(&self) {
        self.lock().clipboard.fail_next_restore();
    }

    pub fn actions(&self) -> Vec<InjectedAction> {
        self.lock().actions.clone()
    }

    /// Text the simulated focused input currently holds
    pub fn document(&self) -> String {
        self.lock().document.clone()
    }

    /// Text on the simulated clipboard
    pub fn clipboard(&self) -> Option<String> {
        self.lock().clipboard.text().map(str::to_owned)
    }

    pub fn clipboard_content(&self) -> ClipboardContent {
        self.lock().clipboard.content().clone()
    }

    /// Total Backspace presses across all delete calls
    pub fn deleted_count(&self) -> usize {
        self.lock()
            .actions
            .iter()
            .map(|a| match a {
                InjectedAction::DeleteBackward(n) => *n,
                _ => 0,
            })
            .sum()
    }
}

impl InputInjector for MemoryInjector {
    fn paste(&mut self, text: &str) -> Result<(), InjectError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        // The "application" reads whatever is on the clipboard mid-paste
        let mut pasted = None;
        let result = paste_via_clipboard(&mut state.clipboard, text, |clipboard| {
            if std::mem::take(&mut state.fail_next) {
                return Err(InjectError::Keyboard {
                    action: "paste",
                    reason: "simulated failure".to_string(),
                });
            }
            pasted = clipboard.get_text()?;
            Ok(())
        });

        let delivered = match &result {
            Ok(()) => true,
            Err(e) => e.input_delivered(),
        };
        if delivered {
            let pasted = pasted.unwrap_or_default();
            state.document.push_str(&pasted);
            state.actions.push(InjectedAction::Paste(pasted));
            tracing::info!("dry-run: paste {:?}", text);
        }
        result
    }

    fn press_enter(&mut self) -> Result<(), InjectError> {
        let mut state = self.lock();
        state.check_failure("enter")?;
        state.document.push('\n');
        state.actions.push(InjectedAction::Enter);
        tracing::info!("dry-run: enter");
        Ok(())
    }

    fn press_arrow(&mut self, direction: Direction) -> Result<(), InjectError> {
        let mut state = self.lock();
        state.check_failure("arrow key")?;
        state.actions.push(InjectedAction::Arrow(direction));
        tracing::info!("dry-run: arrow {}", direction);
        Ok(())
    }

    fn delete_backward(&mut self, count: usize) -> Result<(), InjectError> {
        let mut state = self.lock();
        state.check_failure("backspace")?;

        let limit = state.fail_delete_after.take();
        let presses = limit.map_or(count, |limit| limit.min(count));
        for _ in 0..presses {
            state.document.pop();
        }
        state.actions.push(InjectedAction::DeleteBackward(presses));
        tracing::info!("dry-run: backspace x{}", presses);

        match limit {
            Some(_) if presses < count => Err(InjectError::PartialDelete {
                deleted: presses,
                requested: count,
                reason: "simulated failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}
