//! This module provides [UndoManager], bounded undo/redo stacks of
//! [WrappedOperation]s. Stack entries are *inverse* operations, each
//! valid against the current document; [UndoManager::transform] keeps
//! them valid as remote operations arrive.

use crate::error::OtResult;
use crate::wrapped::{OperationMeta, WrappedOperation};

/// Default bound on the undo stack depth.
pub const DEFAULT_MAX_ITEMS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UndoState {
    Normal,
    Undoing,
    Redoing,
}

/// Bounded undo/redo stacks. `add` routes a newly recorded inverse to
/// the stack the current state calls for; `perform_undo` /
/// `perform_redo` pop an entry, stash its own inverse on the opposite
/// stack, and hand the entry to the caller for application.
#[derive(Debug, Clone)]
pub struct UndoManager<M> {
    max_items: usize,
    state: UndoState,
    /// The first `add` after an undo or redo must not compose into the
    /// entry that crossed the undo boundary.
    dont_compose: bool,
    undo_stack: Vec<WrappedOperation<M>>,
    redo_stack: Vec<WrappedOperation<M>>,
}

impl<M: OperationMeta> Default for UndoManager<M> {
    fn default() -> Self {
        UndoManager::new(DEFAULT_MAX_ITEMS)
    }
}

impl<M: OperationMeta> UndoManager<M> {
    /// `max_items` bounds both stacks; the oldest entry is evicted
    /// when the bound is exceeded.
    pub fn new(max_items: usize) -> UndoManager<M> {
        UndoManager {
            max_items,
            state: UndoState::Normal,
            dont_compose: false,
            undo_stack: vec![],
            redo_stack: vec![],
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn push_bounded(stack: &mut Vec<WrappedOperation<M>>, op: WrappedOperation<M>, max: usize) {
        if stack.len() == max {
            stack.remove(0);
        }
        stack.push(op);
    }

    /// Record the inverse of a just-applied operation. In the normal
    /// state this pushes to the undo stack (clearing the redo stack)
    /// or, when `compose_with_last` is set, merges into the top entry;
    /// during an undo or redo it routes to the opposite stack instead,
    /// and the redo stack survives.
    pub fn add(&mut self, op: WrappedOperation<M>, compose_with_last: bool) -> OtResult<()> {
        match self.state {
            UndoState::Undoing => {
                Self::push_bounded(&mut self.redo_stack, op, self.max_items);
                self.dont_compose = true;
            }
            UndoState::Redoing => {
                Self::push_bounded(&mut self.undo_stack, op, self.max_items);
                self.dont_compose = true;
            }
            UndoState::Normal => {
                let compose_target = if !self.dont_compose && compose_with_last {
                    self.undo_stack.last()
                } else {
                    None
                };
                if let Some(last) = compose_target {
                    // Entries are inverses: undoing applies the new
                    // inverse first, then the one recorded before it.
                    // Compose before mutating so a failure leaves the
                    // stack as it was.
                    let composed = op.compose(last)?;
                    self.undo_stack.pop();
                    self.undo_stack.push(composed);
                } else {
                    Self::push_bounded(&mut self.undo_stack, op, self.max_items);
                }
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Rebase both stacks against a remote operation. Entries are
    /// processed newest first, threading the transformed remote
    /// operation down the stack; entries that transform into no-ops are
    /// dropped.
    pub fn transform(&mut self, operation: &WrappedOperation<M>) -> OtResult<()> {
        let undo = Self::transform_stack(&self.undo_stack, operation)?;
        let redo = Self::transform_stack(&self.redo_stack, operation)?;
        self.undo_stack = undo;
        self.redo_stack = redo;
        Ok(())
    }

    fn transform_stack(
        stack: &[WrappedOperation<M>],
        operation: &WrappedOperation<M>,
    ) -> OtResult<Vec<WrappedOperation<M>>> {
        let mut remote = operation.clone();
        let mut result = Vec::with_capacity(stack.len());
        for entry in stack.iter().rev() {
            let (entry_prime, remote_prime) = WrappedOperation::transform(entry, &remote)?;
            if !entry_prime.operation.is_noop() {
                result.push(entry_prime);
            }
            remote = remote_prime;
        }
        result.reverse();
        Ok(result)
    }

    /// Pop the most recent non-noop undo entry, push its inverse (the
    /// redo operation) to the redo stack, and pass it to `apply`, which
    /// must apply it to the document. `document` is the current text,
    /// which the entry applies to. Returns false if there was nothing
    /// to undo.
    pub fn perform_undo<F>(&mut self, document: &str, apply: F) -> OtResult<bool>
    where
        F: FnOnce(&WrappedOperation<M>),
    {
        log::debug!("perform_undo, stack depth {}", self.undo_stack.len());
        while let Some(entry) = self.undo_stack.pop() {
            if entry.operation.is_noop() {
                continue;
            }
            self.state = UndoState::Undoing;
            let result = self.add(entry.invert(document), false);
            self.state = UndoState::Normal;
            result?;
            apply(&entry);
            return Ok(true);
        }
        Ok(false)
    }

    /// Mirror of [perform_undo](Self::perform_undo) for the redo stack.
    pub fn perform_redo<F>(&mut self, document: &str, apply: F) -> OtResult<bool>
    where
        F: FnOnce(&WrappedOperation<M>),
    {
        log::debug!("perform_redo, stack depth {}", self.redo_stack.len());
        while let Some(entry) = self.redo_stack.pop() {
            if entry.operation.is_noop() {
                continue;
            }
            self.state = UndoState::Redoing;
            let result = self.add(entry.invert(document), false);
            self.state = UndoState::Normal;
            result?;
            apply(&entry);
            return Ok(true);
        }
        Ok(false)
    }
}

// *** Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OtError;
    use crate::operation::TextOperation;

    type Op = WrappedOperation<()>;

    fn ins_at(pos: usize, text: &str, base: usize) -> Op {
        let mut op = TextOperation::new();
        op.retain(pos).insert(text).retain(base - pos);
        WrappedOperation::new(op, ())
    }

    /// Apply an edit, record its inverse, return the new document.
    fn edit(undo: &mut UndoManager<()>, doc: &str, op: &Op, compose: bool) -> String {
        undo.add(op.invert(doc), compose).unwrap();
        op.apply(doc).unwrap()
    }

    #[test]
    fn three_composed_inserts_undo_in_one_step() {
        let mut undo: UndoManager<()> = UndoManager::default();
        let mut doc = "go".to_string();

        // Type "od!" one character at a time, within the compose
        // window.
        for (pos, ch) in [(2, "o"), (3, "d"), (4, "!")] {
            let op = ins_at(pos, ch, doc.chars().count());
            doc = edit(&mut undo, &doc, &op, true);
        }
        assert_eq!(doc, "good!");

        // One entry on the stack, one undo restores the original.
        let mut undone = None;
        assert!(undo.perform_undo(&doc, |op| undone = Some(op.clone())).unwrap());
        doc = undone.unwrap().apply(&doc).unwrap();
        assert_eq!(doc, "go");
        assert!(!undo.can_undo());

        // Redo reapplies it exactly.
        let mut redone = None;
        assert!(undo.perform_redo(&doc, |op| redone = Some(op.clone())).unwrap());
        doc = redone.unwrap().apply(&doc).unwrap();
        assert_eq!(doc, "good!");
    }

    #[test]
    fn undo_then_redo_round_trip() {
        let mut undo: UndoManager<()> = UndoManager::default();
        let mut doc = "abc".to_string();

        let op = ins_at(3, "d", 3);
        doc = edit(&mut undo, &doc, &op, false);
        assert_eq!(doc, "abcd");

        let mut popped = None;
        undo.perform_undo(&doc, |op| popped = Some(op.clone())).unwrap();
        doc = popped.unwrap().apply(&doc).unwrap();
        assert_eq!(doc, "abc");
        assert!(undo.can_redo());

        let mut popped = None;
        undo.perform_redo(&doc, |op| popped = Some(op.clone())).unwrap();
        doc = popped.unwrap().apply(&doc).unwrap();
        assert_eq!(doc, "abcd");
        // The undo entry is back.
        assert!(undo.can_undo());
        assert!(!undo.can_redo());
    }

    #[test]
    fn new_edit_clears_redo_stack() {
        let mut undo: UndoManager<()> = UndoManager::default();
        let mut doc = "x".to_string();

        doc = edit(&mut undo, &doc, &ins_at(1, "y", 1), false);
        let mut popped = None;
        undo.perform_undo(&doc, |op| popped = Some(op.clone())).unwrap();
        doc = popped.unwrap().apply(&doc).unwrap();
        assert!(undo.can_redo());

        // An original edit after an undo forfeits the redo.
        edit(&mut undo, &doc, &ins_at(1, "z", 1), false);
        assert!(!undo.can_redo());
    }

    #[test]
    fn eviction_keeps_the_newest_entries() {
        let mut undo: UndoManager<()> = UndoManager::new(2);
        let mut doc = String::new();

        for i in 0..4 {
            let op = ins_at(i, "a", i);
            doc = edit(&mut undo, &doc, &op, false);
        }
        // Depth is bounded: only two undos are possible.
        let mut count = 0;
        loop {
            let mut popped = None;
            if !undo
                .perform_undo(&doc, |op| popped = Some(op.clone()))
                .unwrap()
            {
                break;
            }
            doc = popped.unwrap().apply(&doc).unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
        assert_eq!(doc, "aa");
    }

    #[test]
    fn add_compose_failure_keeps_existing_entry() {
        let mut undo: UndoManager<()> = UndoManager::default();
        let mut doc = "ab".to_string();

        doc = edit(&mut undo, &doc, &ins_at(2, "c", 2), false);
        assert_eq!(doc, "abc");

        // An inverse recorded against the wrong document length can't
        // compose with the top entry.
        let bogus = ins_at(0, "x", 9);
        assert!(matches!(
            undo.add(bogus, true),
            Err(OtError::LengthMismatch { .. })
        ));

        // The earlier entry survives and still undoes the edit.
        assert!(undo.can_undo());
        let mut popped = None;
        undo.perform_undo(&doc, |op| popped = Some(op.clone())).unwrap();
        assert_eq!(popped.unwrap().apply(&doc).unwrap(), "ab");
    }

    #[test]
    fn transform_rebases_stack_entries() {
        let mut undo: UndoManager<()> = UndoManager::default();
        let mut doc = "ab".to_string();

        // Local edit: insert "X" at 1.
        let local = ins_at(1, "X", 2);
        doc = edit(&mut undo, &doc, &local, false);
        assert_eq!(doc, "aXb");

        // Remote edit arrives: insert "yy" at 0.
        let remote = ins_at(0, "yy", 3);
        undo.transform(&remote).unwrap();
        doc = remote.apply(&doc).unwrap();
        assert_eq!(doc, "yyaXb");

        // Undo now removes "X" at its shifted position.
        let mut popped = None;
        undo.perform_undo(&doc, |op| popped = Some(op.clone())).unwrap();
        doc = popped.unwrap().apply(&doc).unwrap();
        assert_eq!(doc, "yyab");
    }
}
