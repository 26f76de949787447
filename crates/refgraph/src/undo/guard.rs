//! RAII guards for suspending recording and for transactions

use super::UndoStack;

/// Suspends undo recording while alive.
///
/// # Example
///
/// ```
/// use refgraph::UndoStack;
///
/// let stack = UndoStack::default();
/// stack.begin_compound_operation("Edit");
/// {
///     let _guard = refgraph::UndoSuspender::new(&stack);
///     assert!(!stack.is_recording());
/// }
/// assert!(stack.is_recording());
/// stack.end_compound_operation(true);
/// ```
pub struct UndoSuspender<'a> {
    stack: &'a UndoStack,
}

impl<'a> UndoSuspender<'a> {
    /// Suspend recording on `stack` until the guard is dropped.
    pub fn new(stack: &'a UndoStack) -> Self {
        stack.suspend();
        Self { stack }
    }
}

impl<'a> Drop for UndoSuspender<'a> {
    fn drop(&mut self) {
        self.stack.resume();
    }
}

impl<'a> std::ops::Deref for UndoSuspender<'a> {
    type Target = UndoStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

/// Opens a compound operation and rolls it back on drop unless committed.
///
/// # Example
///
/// ```
/// use refgraph::{UndoStack, UndoableTransaction};
///
/// let stack = UndoStack::default();
/// {
///     let transaction = UndoableTransaction::new(&stack, "Edit");
///     assert!(transaction.is_recording());
///     // changes made here are rolled back, no commit() call
/// }
/// assert!(!stack.is_recording());
/// assert_eq!(stack.count(), 0);
/// ```
pub struct UndoableTransaction<'a> {
    stack: &'a UndoStack,
    committed: bool,
}

impl<'a> UndoableTransaction<'a> {
    /// Open a compound operation named `display_name`.
    pub fn new(stack: &'a UndoStack, display_name: impl Into<String>) -> Self {
        stack.begin_compound_operation(display_name);
        Self {
            stack,
            committed: false,
        }
    }

    /// Close the compound operation and keep its changes.
    pub fn commit(mut self) {
        self.committed = true;
        self.stack.end_compound_operation(true);
    }
}

impl<'a> Drop for UndoableTransaction<'a> {
    fn drop(&mut self) {
        if !self.committed {
            self.stack.end_compound_operation(false);
        }
    }
}

impl<'a> std::ops::Deref for UndoableTransaction<'a> {
    type Target = UndoStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}
