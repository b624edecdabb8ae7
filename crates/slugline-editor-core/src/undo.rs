//! Scene-level undo.
//!
//! A transaction is recorded as the whole scene before and after it ran;
//! undoing restores the earlier snapshot wholesale.

use std::collections::VecDeque;

use smol_str::SmolStr;

use crate::element::ElementType;

/// Undo/redo over whatever an implementor records as one transaction.
///
/// `undo` and `redo` return false when there is nothing to step to.
pub trait UndoManager {
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
    fn undo(&mut self) -> bool;
    fn redo(&mut self) -> bool;
    fn clear_history(&mut self);
}

/// The content of a scene at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneSnapshot {
    elements: Vec<(ElementType, SmolStr)>,
}

impl SceneSnapshot {
    pub fn new(elements: Vec<(ElementType, SmolStr)>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[(ElementType, SmolStr)] {
        &self.elements
    }
}

/// A recorded transaction: the scene before and after it ran.
#[derive(Debug, Clone)]
struct Transaction {
    before: SceneSnapshot,
    after: SceneSnapshot,
}

/// Bounded undo/redo history of scene transactions.
#[derive(Debug, Clone)]
pub struct UndoStack {
    done: VecDeque<Transaction>,
    undone: Vec<Transaction>,
    max_steps: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100)
    }
}

impl UndoStack {
    pub fn new(max_steps: usize) -> Self {
        Self {
            done: VecDeque::new(),
            undone: Vec::new(),
            max_steps,
        }
    }

    /// Record a finished transaction. Clears the redo stack.
    pub fn record(&mut self, before: SceneSnapshot, after: SceneSnapshot) {
        self.undone.clear();
        self.done.push_back(Transaction { before, after });
        if self.done.len() > self.max_steps {
            self.done.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Pop the newest transaction; returns the state to restore.
    pub fn undo(&mut self) -> Option<SceneSnapshot> {
        let tx = self.done.pop_back()?;
        let state = tx.before.clone();
        self.undone.push(tx);
        Some(state)
    }

    /// Re-apply the most recently undone transaction; returns the state to restore.
    pub fn redo(&mut self) -> Option<SceneSnapshot> {
        let tx = self.undone.pop()?;
        let state = tx.after.clone();
        self.done.push_back(tx);
        Some(state)
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(texts: &[&str]) -> SceneSnapshot {
        SceneSnapshot::new(
            texts
                .iter()
                .map(|t| (ElementType::Action, SmolStr::new(t)))
                .collect(),
        )
    }

    #[test]
    fn test_undo_then_redo() {
        let mut stack = UndoStack::new(10);
        stack.record(snap(&["a"]), snap(&["a", "b"]));

        assert_eq!(stack.undo(), Some(snap(&["a"])));
        assert!(!stack.can_undo());
        assert_eq!(stack.redo(), Some(snap(&["a", "b"])));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut stack = UndoStack::new(10);
        stack.record(snap(&[]), snap(&["a"]));
        stack.undo();
        assert!(stack.can_redo());

        stack.record(snap(&[]), snap(&["b"]));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_steps() {
        let mut stack = UndoStack::new(2);
        stack.record(snap(&[]), snap(&["a"]));
        stack.record(snap(&["a"]), snap(&["a", "b"]));
        stack.record(snap(&["a", "b"]), snap(&["a", "b", "c"]));

        assert!(stack.undo().is_some());
        assert!(stack.undo().is_some());
        // The oldest was evicted.
        assert!(stack.undo().is_none());
    }
}
