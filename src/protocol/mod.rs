//! Request handling shared by every client connection
//!
//! A [`Session`] owns the rule engine, the undo slot and the injector. Each
//! handler holds the session lock for its whole record-then-inject (or
//! read-reverse-clear) sequence, so concurrent requests can never pair a
//! record with the wrong dispatched input.

pub mod wire;

pub use wire::{MoveCursorRequest, Reply, SendTextRequest};

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::history::{UndoError, UndoHistory};
use crate::injector::{Direction, InjectError, InputInjector};
use crate::rules::RuleEngine;

/// A client action, already decoded from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendText(String),
    SendEnter,
    /// Raw direction string as sent by the client
    MoveCursor(String),
    Undo,
}

/// Why a request failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("no operation to undo")]
    NoHistory,

    #[error(transparent)]
    Injector(#[from] InjectError),
}

impl From<UndoError> for ProtocolError {
    fn from(e: UndoError) -> Self {
        match e {
            UndoError::NoHistory => ProtocolError::NoHistory,
            UndoError::Injector(e) => ProtocolError::Injector(e),
        }
    }
}

impl ProtocolError {
    pub fn to_reply(&self) -> Reply {
        Reply::failed(self.to_string())
    }
}

struct SessionState {
    history: UndoHistory,
    injector: Box<dyn InputInjector>,
}

/// Process-wide request handler
pub struct Session {
    rules: RuleEngine,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(rules: RuleEngine, injector: Box<dyn InputInjector>) -> Self {
        Self {
            rules,
            state: Mutex::new(SessionState {
                history: UndoHistory::new(),
                injector,
            }),
        }
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    // Poison is ignored: the slot is plain data, valid between any two statements
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an undo would currently do something
    pub fn can_undo(&self) -> bool {
        self.lock().history.can_undo()
    }

    /// Transform and paste `text`. Blank text is accepted and ignored.
    pub fn send_text(&self, text: &str) -> Result<(), ProtocolError> {
        let raw = text.trim();
        if raw.is_empty() {
            tracing::debug!("Ignoring empty text");
            return Ok(());
        }

        let transformed = self.rules.apply(raw);

        let mut guard = self.lock();
        let SessionState { history, injector } = &mut *guard;
        let previous = history.record_text(raw);
        if let Err(e) = injector.paste(&transformed) {
            // The text is in the document, so it stays undoable
            if !e.input_delivered() {
                history.restore(previous);
            }
            tracing::warn!("Failed to paste text: {}", e);
            return Err(e.into());
        }

        tracing::info!("Sent text: {:?} → {:?}", raw, transformed);
        Ok(())
    }

    pub fn send_enter(&self) -> Result<(), ProtocolError> {
        let mut guard = self.lock();
        let SessionState { history, injector } = &mut *guard;
        let previous = history.record_enter();
        if let Err(e) = injector.press_enter() {
            history.restore(previous);
            tracing::warn!("Failed to press enter: {}", e);
            return Err(e.into());
        }

        tracing::info!("Sent enter");
        Ok(())
    }

    /// Press an arrow key and forget the undo record.
    ///
    /// Unknown directions are accepted and do nothing at all.
    pub fn move_cursor(&self, direction: &str) -> Result<(), ProtocolError> {
        let Ok(direction) = direction.parse::<Direction>() else {
            tracing::debug!("Ignoring unknown cursor direction {:?}", direction);
            return Ok(());
        };

        let mut guard = self.lock();
        let SessionState { history, injector } = &mut *guard;
        injector.press_arrow(direction).inspect_err(|e| {
            tracing::warn!("Failed to move cursor {}: {}", direction, e);
        })?;

        // The caret moved, so "the last N chars before it" are no longer ours
        if history.invalidate() {
            tracing::debug!("Cursor moved, undo record discarded");
        }
        tracing::info!("Moved cursor {}", direction);
        Ok(())
    }

    /// Reverse the last operation, returning the content to give back to the client
    pub fn undo(&self) -> Result<String, ProtocolError> {
        let mut guard = self.lock();
        let SessionState { history, injector } = &mut *guard;
        let content = history
            .undo(&self.rules, &mut **injector)
            .inspect_err(|e| match e {
                UndoError::NoHistory => tracing::debug!("Undo requested with no history"),
                UndoError::Injector(e) => tracing::warn!("Failed to undo: {}", e),
            })?;

        tracing::info!("Undid last operation, restoring {:?}", content);
        Ok(content)
    }

    /// Dispatch an action and build the reply body
    pub fn handle(&self, action: Action) -> Result<Reply, ProtocolError> {
        match action {
            Action::SendText(text) => self.send_text(&text).map(|()| Reply::ok()),
            Action::SendEnter => self.send_enter().map(|()| Reply::ok()),
            Action::MoveCursor(direction) => self.move_cursor(&direction).map(|()| Reply::ok()),
            Action::Undo => self.undo().map(Reply::recovered),
        }
    }
}
