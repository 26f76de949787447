//! Undo/redo support
//!
//! Field mutations produce [`UndoableOperation`]s while the owning data
//! set's [`UndoStack`] is recording, which is the case only inside a
//! compound operation that is not suspended.

mod guard;
mod operations;
mod stack;

pub use guard::{UndoSuspender, UndoableTransaction};
pub use operations::{SimpleValueChangeOperation, TargetChangedRedoOperation, TargetChangedUndoOperation};
pub use stack::UndoStack;

use crate::error::Result;

/// A reversible change.
///
/// `undo` is called to revert the change and `redo` to apply it again.
/// Many operations are symmetric swaps, so `redo` defaults to `undo`.
pub trait UndoableOperation {
    /// Text shown to the user
    fn display_name(&self) -> String {
        "Undoable operation".to_string()
    }

    /// Revert the change.
    fn undo(&mut self) -> Result<()>;

    /// Re-apply the change.
    fn redo(&mut self) -> Result<()> {
        self.undo()
    }
}

/// A group of operations undone and redone as one step.
pub struct CompoundOperation {
    display_name: String,
    operations: Vec<Box<dyn UndoableOperation>>,
}

impl CompoundOperation {
    /// Create an empty compound operation.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            operations: Vec::new(),
        }
    }

    /// Append a sub-operation.
    pub fn add_operation(&mut self, operation: Box<dyn UndoableOperation>) {
        self.operations.push(operation);
    }

    /// Whether the compound holds any sub-operation.
    pub fn is_significant(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Number of sub-operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether there are no sub-operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop all sub-operations.
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub(crate) fn take_operations(&mut self) -> Vec<Box<dyn UndoableOperation>> {
        std::mem::take(&mut self.operations)
    }
}

impl UndoableOperation for CompoundOperation {
    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn undo(&mut self) -> Result<()> {
        for operation in self.operations.iter_mut().rev() {
            operation.undo()?;
        }
        Ok(())
    }

    fn redo(&mut self) -> Result<()> {
        for operation in self.operations.iter_mut() {
            operation.redo()?;
        }
        Ok(())
    }
}
