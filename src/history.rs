//! Single-slot undo for dispatched input.
//!
//! We cannot see the target application's text, so an operation is reversed
//! blind: Backspace once per character it inserted. Only the most recent
//! operation is remembered, and moving the caret forgets it.

use crate::injector::{InjectError, InputInjector};
use crate::rules::RuleEngine;

/// The last operation sent to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Text pasted after rule substitution. `raw` is what the client sent.
    TextInsert { raw: String },
    /// A single Enter key press
    LineBreak,
}

impl Operation {
    /// Backspace presses needed to reverse this operation.
    ///
    /// For text this is the length of the *transformed* text, since that is
    /// what actually reached the host.
    pub fn deletions(&self, rules: &RuleEngine) -> usize {
        match self {
            Operation::TextInsert { raw } => rules.applied_len(raw),
            Operation::LineBreak => 1,
        }
    }

    /// What the client gets back to refill its input box
    pub fn recovered_content(&self) -> &str {
        match self {
            Operation::TextInsert { raw } => raw,
            Operation::LineBreak => "",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::TextInsert { .. } => "text",
            Operation::LineBreak => "enter",
        }
    }
}

/// Why an undo did not happen
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UndoError {
    #[error("no operation to undo")]
    NoHistory,

    #[error(transparent)]
    Injector(#[from] InjectError),
}

/// Slot contents replaced by a `record_*` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replaced {
    last: Option<Operation>,
    reversed: usize,
}

impl Replaced {
    pub fn operation(&self) -> Option<&Operation> {
        self.last.as_ref()
    }
}

/// Holds at most one pending [`Operation`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoHistory {
    last: Option<Operation>,
    /// Backspaces already pressed for `last` by an undo that failed partway
    reversed: usize,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn replace(&mut self, op: Operation) -> Replaced {
        Replaced {
            last: self.last.replace(op),
            reversed: std::mem::take(&mut self.reversed),
        }
    }

    /// Remember a text insert, replacing any pending record.
    /// Returns what it replaced.
    pub fn record_text(&mut self, raw: impl Into<String>) -> Replaced {
        self.replace(Operation::TextInsert { raw: raw.into() })
    }

    /// Remember an Enter press, replacing any pending record.
    /// Returns what it replaced.
    pub fn record_enter(&mut self) -> Replaced {
        self.replace(Operation::LineBreak)
    }

    /// Put back what `record_*` replaced, used when dispatch failed
    pub fn restore(&mut self, previous: Replaced) {
        self.last = previous.last;
        self.reversed = previous.reversed;
    }

    /// Forget the pending record without reversing it.
    /// Returns whether there was one.
    pub fn invalidate(&mut self) -> bool {
        self.reversed = 0;
        self.last.take().is_some()
    }

    /// Backspaces the next undo will press
    pub fn remaining_deletions(&self, rules: &RuleEngine) -> usize {
        self.last
            .as_ref()
            .map_or(0, |op| op.deletions(rules).saturating_sub(self.reversed))
    }

    pub fn pending(&self) -> Option<&Operation> {
        self.last.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.last.is_some()
    }

    /// Reverse the pending operation through `injector` and clear it.
    ///
    /// Returns the content the client should restore. With nothing pending,
    /// fails with [`UndoError::NoHistory`] and changes nothing. If the
    /// injector fails the record is kept, minus any Backspaces that went
    /// through, so a retry deletes only what is left.
    pub fn undo(
        &mut self,
        rules: &RuleEngine,
        injector: &mut dyn InputInjector,
    ) -> Result<String, UndoError> {
        let deletions = self.remaining_deletions(rules);
        let op = self.last.as_ref().ok_or(UndoError::NoHistory)?;

        if let Err(e) = injector.delete_backward(deletions) {
            self.reversed += e.deleted();
            return Err(e.into());
        }

        tracing::debug!("Undid {} operation with {} deletion(s)", op.kind(), deletions);
        let content = op.recovered_content().to_owned();
        self.last = None;
        self.reversed = 0;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::{InjectedAction, MemoryInjector};
    use crate::rules::ReplacementRule;

    fn shouting_rules() -> RuleEngine {
        RuleEngine::new(vec![
            ReplacementRule::compile("hello", "HELLO").unwrap(),
            ReplacementRule::compile("$", "!!!").unwrap(),
        ])
    }

    #[test]
    fn test_new_history_is_idle() {
        let history = UndoHistory::new();
        assert!(!history.can_undo());
        assert_eq!(history.pending(), None);
    }

    #[test]
    fn test_text_deletions_use_transformed_length() {
        let op = Operation::TextInsert {
            raw: "hello".to_string(),
        };
        assert_eq!(op.deletions(&RuleEngine::empty()), 5);
        assert_eq!(op.deletions(&shouting_rules()), 8);
    }

    #[test]
    fn test_line_break_is_one_deletion() {
        assert_eq!(Operation::LineBreak.deletions(&shouting_rules()), 1);
        assert_eq!(Operation::LineBreak.recovered_content(), "");
    }

    #[test]
    fn test_record_overwrites() {
        let mut history = UndoHistory::new();
        assert_eq!(history.record_text("a").operation(), None);
        let previous = history.record_text("b");

        assert_eq!(
            previous.operation(),
            Some(&Operation::TextInsert { raw: "a".into() })
        );
        assert_eq!(
            history.pending(),
            Some(&Operation::TextInsert { raw: "b".into() })
        );
    }

    #[test]
    fn test_restore_rolls_back() {
        let mut history = UndoHistory::new();
        history.record_enter();
        let previous = history.record_text("oops");
        history.restore(previous);
        assert_eq!(history.pending(), Some(&Operation::LineBreak));
    }

    #[test]
    fn test_invalidate_discards() {
        let mut history = UndoHistory::new();
        history.record_text("a");
        assert!(history.invalidate());
        assert!(!history.can_undo());
        assert!(!history.invalidate());
    }

    #[test]
    fn test_undo_text() {
        let rules = shouting_rules();
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        history.record_text("hello");

        let content = history.undo(&rules, &mut injector).unwrap();

        assert_eq!(content, "hello");
        assert_eq!(injector.actions(), vec![InjectedAction::DeleteBackward(8)]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_enter() {
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        history.record_enter();

        let content = history.undo(&RuleEngine::empty(), &mut injector).unwrap();

        assert_eq!(content, "");
        assert_eq!(injector.actions(), vec![InjectedAction::DeleteBackward(1)]);
    }

    #[test]
    fn test_undo_when_idle() {
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();

        let err = history.undo(&RuleEngine::empty(), &mut injector).unwrap_err();

        assert_eq!(err, UndoError::NoHistory);
        assert!(injector.actions().is_empty());
    }

    #[test]
    fn test_undo_text_that_transforms_to_nothing() {
        let rules = RuleEngine::new(vec![ReplacementRule::compile("x", "").unwrap()]);
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        history.record_text("xxx");

        assert_eq!(history.undo(&rules, &mut injector).unwrap(), "xxx");
        assert_eq!(injector.deleted_count(), 0);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_failed_undo_keeps_record() {
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        history.record_enter();
        injector.fail_next();

        let err = history.undo(&RuleEngine::empty(), &mut injector).unwrap_err();

        assert!(matches!(err, UndoError::Injector(_)));
        assert!(history.can_undo());
    }

    #[test]
    fn test_retry_after_partial_undo_deletes_the_rest() {
        let rules = RuleEngine::empty();
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        injector.paste("before hello").unwrap();
        history.record_text("hello");
        injector.fail_delete_after(2);

        let err = history.undo(&rules, &mut injector).unwrap_err();
        assert!(matches!(err, UndoError::Injector(_)));
        assert_eq!(history.remaining_deletions(&rules), 3);

        assert_eq!(history.undo(&rules, &mut injector).unwrap(), "hello");
        assert_eq!(injector.document(), "before ");
        assert_eq!(injector.deleted_count(), 5);
        assert_eq!(history.remaining_deletions(&rules), 0);
    }

    #[test]
    fn test_restore_keeps_partial_progress() {
        let rules = RuleEngine::empty();
        let mut injector = MemoryInjector::new();
        let mut history = UndoHistory::new();
        history.record_text("hello");
        injector.fail_delete_after(3);
        let _ = history.undo(&rules, &mut injector);

        let previous = history.record_enter();
        assert_eq!(history.remaining_deletions(&rules), 1);
        history.restore(previous);

        assert_eq!(history.remaining_deletions(&rules), 2);
    }
}
