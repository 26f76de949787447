//! The undo stack

use std::cell::{Cell, RefCell};
use std::fmt;

use tracing::{debug, warn};

use super::{CompoundOperation, UndoableOperation};
use crate::error::Result;

/// Records undoable operations and replays them.
///
/// Operations pushed while a compound operation is open are collected into
/// it; closing the outermost compound puts it on the stack as one step.
/// Undone steps stay available for redo until the next push.
pub struct UndoStack {
    operations: RefCell<Vec<Box<dyn UndoableOperation>>>,
    compound_stack: RefCell<Vec<CompoundOperation>>,
    /// Number of operations currently applied
    applied: Cell<usize>,
    /// Value of `applied` at the clean state, `None` if unreachable
    clean: Cell<Option<usize>>,
    suspend_count: Cell<usize>,
    undoing: Cell<bool>,
    redoing: Cell<bool>,
    undo_limit: Cell<Option<usize>>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(Some(20))
    }
}

impl UndoStack {
    /// Create an empty stack keeping at most `undo_limit` steps.
    pub fn new(undo_limit: Option<usize>) -> Self {
        Self {
            operations: RefCell::new(Vec::new()),
            compound_stack: RefCell::new(Vec::new()),
            applied: Cell::new(0),
            clean: Cell::new(Some(0)),
            suspend_count: Cell::new(0),
            undoing: Cell::new(false),
            redoing: Cell::new(false),
            undo_limit: Cell::new(undo_limit),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Recording
    // ═══════════════════════════════════════════════════════════════════

    /// Whether field changes are currently recorded.
    pub fn is_recording(&self) -> bool {
        !self.is_suspended() && !self.compound_stack.borrow().is_empty()
    }

    /// Whether recording is suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspend_count.get() > 0
    }

    /// Suspend recording. Calls nest; see [`UndoSuspender`](super::UndoSuspender).
    pub fn suspend(&self) {
        self.suspend_count.set(self.suspend_count.get() + 1);
    }

    /// Undo one [`suspend`](Self::suspend) call.
    pub fn resume(&self) {
        let count = self.suspend_count.get();
        assert!(count > 0, "resume() without matching suspend()");
        self.suspend_count.set(count - 1);
    }

    /// Whether an undo is in progress.
    pub fn is_undoing(&self) -> bool {
        self.undoing.get()
    }

    /// Whether a redo is in progress.
    pub fn is_redoing(&self) -> bool {
        self.redoing.get()
    }

    /// Whether an undo or redo is in progress.
    pub fn is_undoing_or_redoing(&self) -> bool {
        self.is_undoing() || self.is_redoing()
    }

    /// Open a compound operation. Compounds nest.
    pub fn begin_compound_operation(&self, display_name: impl Into<String>) {
        assert!(
            !self.is_undoing_or_redoing(),
            "cannot record an operation while undoing or redoing"
        );
        let display_name = display_name.into();
        debug!(name = %display_name, "begin compound operation");
        self.compound_stack
            .borrow_mut()
            .push(CompoundOperation::new(display_name));
    }

    /// Close the innermost compound operation.
    ///
    /// With `commit` the compound is pushed as one step, unless it is empty
    /// or recording is suspended. Without `commit` its operations are undone
    /// and discarded.
    pub fn end_compound_operation(&self, commit: bool) {
        assert!(
            !self.is_undoing_or_redoing(),
            "cannot record an operation while undoing or redoing"
        );
        assert!(
            !self.compound_stack.borrow().is_empty(),
            "end_compound_operation() without begin_compound_operation()"
        );

        if !commit {
            self.reset_current_compound_operation();
            let discarded = self.compound_stack.borrow_mut().pop();
            self.discard(discarded);
            debug!("rolled back compound operation");
            return;
        }

        let Some(compound) = self.compound_stack.borrow_mut().pop() else {
            return;
        };
        if self.is_suspended() || !compound.is_significant() {
            debug!(name = %compound.display_name(), "discarding empty compound operation");
            self.discard(Some(compound));
            return;
        }
        self.push(Box::new(compound));
    }

    /// Undo everything recorded so far in the innermost compound operation
    /// and empty it. The compound stays open.
    pub fn reset_current_compound_operation(&self) {
        assert!(
            !self.is_undoing_or_redoing(),
            "cannot reset an operation while undoing or redoing"
        );
        let mut operations = {
            let mut compounds = self.compound_stack.borrow_mut();
            let Some(current) = compounds.last_mut() else {
                panic!("reset_current_compound_operation() without begin_compound_operation()");
            };
            current.take_operations()
        };

        self.suspend();
        self.undoing.set(true);
        let mut result = Ok(());
        for operation in operations.iter_mut().rev() {
            result = operation.undo();
            if result.is_err() {
                break;
            }
        }
        self.undoing.set(false);
        self.resume();

        if let Err(err) = result {
            warn!(error = %err, "failed to roll back compound operation");
        }
        self.discard(operations);
    }

    /// Record an operation.
    ///
    /// Goes into the innermost open compound operation, or directly onto the
    /// stack if none is open. Discards all undone steps.
    pub fn push(&self, operation: Box<dyn UndoableOperation>) {
        assert!(
            !self.is_undoing_or_redoing(),
            "cannot record an operation while undoing or redoing"
        );
        assert!(!self.is_suspended(), "undo stack is not recording");

        let applied = self.applied.get();
        let redo_history = self.operations.borrow_mut().split_off(applied);
        if self.clean.get().is_some_and(|clean| clean > applied) {
            self.clean.set(None);
        }

        let top_level = match self.compound_stack.borrow_mut().last_mut() {
            Some(current) => {
                current.add_operation(operation);
                None
            }
            None => Some(operation),
        };
        if let Some(operation) = top_level {
            debug!(name = %operation.display_name(), index = applied, "push undo operation");
            self.operations.borrow_mut().push(operation);
            self.applied.set(applied + 1);
            self.limit_undo_stack();
        }
        self.discard(redo_history);
    }

    fn limit_undo_stack(&self) {
        let Some(limit) = self.undo_limit.get() else {
            return;
        };
        let count = self.count();
        if count <= limit {
            return;
        }
        let n = count - limit;
        if self.applied.get() >= n {
            let dropped: Vec<_> = self.operations.borrow_mut().drain(..n).collect();
            self.applied.set(self.applied.get() - n);
            self.clean.set(self.clean.get().and_then(|clean| clean.checked_sub(n)));
            debug!(dropped = n, "undo limit reached");
            self.discard(dropped);
        }
    }

    /// Drop operations with recording suspended, after all borrows are released.
    fn discard<T>(&self, value: T) {
        self.suspend();
        drop(value);
        self.resume();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Replay
    // ═══════════════════════════════════════════════════════════════════

    /// Whether there is a step to undo.
    pub fn can_undo(&self) -> bool {
        self.applied.get() > 0
    }

    /// Whether there is a step to redo.
    pub fn can_redo(&self) -> bool {
        self.applied.get() < self.count()
    }

    /// Undo the last applied step.
    ///
    /// A failing operation is logged and reported, and the stack position
    /// moves anyway. Panics if a compound operation is open.
    pub fn undo(&self) -> Result<()> {
        assert!(
            self.compound_stack.borrow().is_empty(),
            "cannot undo while a compound operation is open"
        );
        assert!(!self.is_undoing_or_redoing());
        if !self.can_undo() {
            return Ok(());
        }

        let index = self.applied.get() - 1;
        let mut operation = self.operations.borrow_mut().remove(index);
        debug!(name = %operation.display_name(), index, "undo");

        self.undoing.set(true);
        self.suspend();
        let result = operation.undo();
        self.undoing.set(false);
        self.resume();

        if let Err(err) = &result {
            warn!(name = %operation.display_name(), error = %err, "undo failed");
        }
        self.operations.borrow_mut().insert(index, operation);
        self.applied.set(index);
        result
    }

    /// Redo the last undone step.
    ///
    /// A failing operation is logged and reported, and the stack position
    /// moves anyway. Panics if a compound operation is open.
    pub fn redo(&self) -> Result<()> {
        assert!(
            self.compound_stack.borrow().is_empty(),
            "cannot redo while a compound operation is open"
        );
        assert!(!self.is_undoing_or_redoing());
        if !self.can_redo() {
            return Ok(());
        }

        let index = self.applied.get();
        let mut operation = self.operations.borrow_mut().remove(index);
        debug!(name = %operation.display_name(), index, "redo");

        self.redoing.set(true);
        self.suspend();
        let result = operation.redo();
        self.redoing.set(false);
        self.resume();

        if let Err(err) = &result {
            warn!(name = %operation.display_name(), error = %err, "redo failed");
        }
        self.operations.borrow_mut().insert(index, operation);
        self.applied.set(index + 1);
        result
    }

    /// Name of the step [`undo`](Self::undo) would revert.
    pub fn undo_text(&self) -> Option<String> {
        let index = self.applied.get().checked_sub(1)?;
        self.operations.borrow().get(index).map(|op| op.display_name())
    }

    /// Name of the step [`redo`](Self::redo) would re-apply.
    pub fn redo_text(&self) -> Option<String> {
        self.operations
            .borrow()
            .get(self.applied.get())
            .map(|op| op.display_name())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Position and Clean State
    // ═══════════════════════════════════════════════════════════════════

    /// Index of the last applied step, `None` if none is applied.
    pub fn index(&self) -> Option<usize> {
        self.applied.get().checked_sub(1)
    }

    /// Number of steps on the stack, applied or undone.
    pub fn count(&self) -> usize {
        self.operations.borrow().len()
    }

    /// Whether the stack is at the position last marked clean.
    pub fn is_clean(&self) -> bool {
        self.clean.get() == Some(self.applied.get())
    }

    /// Mark the current position as clean.
    pub fn set_clean(&self) {
        self.clean.set(Some(self.applied.get()));
    }

    /// Mark the stack as dirty until the next [`set_clean`](Self::set_clean).
    pub fn set_dirty(&self) {
        self.clean.set(None);
    }

    /// Maximum number of steps kept, `None` for no limit.
    pub fn undo_limit(&self) -> Option<usize> {
        self.undo_limit.get()
    }

    /// Change the maximum number of steps kept.
    pub fn set_undo_limit(&self, limit: Option<usize>) {
        self.undo_limit.set(limit);
        self.limit_undo_stack();
    }

    /// Drop all steps and open compound operations.
    pub fn clear(&self) {
        let operations = std::mem::take(&mut *self.operations.borrow_mut());
        let compounds = std::mem::take(&mut *self.compound_stack.borrow_mut());
        self.applied.set(0);
        self.clean.set(Some(0));
        debug!("undo stack cleared");
        self.discard((operations, compounds));
    }

    /// Run `f` and record it as one step named `display_name`, if it succeeds.
    ///
    /// On error all changes made by `f` are rolled back.
    pub fn transaction<R>(
        &self,
        display_name: impl Into<String>,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let transaction = super::UndoableTransaction::new(self, display_name);
        let result = f()?;
        transaction.commit();
        Ok(result)
    }

    /// Record a change made through a getter/setter pair, if recording.
    pub fn record_value_change<O: ?Sized + 'static, V: 'static>(
        &self,
        object: crate::object::OORef<O>,
        getter: fn(&O) -> V,
        setter: fn(&O, V),
    ) {
        if self.is_recording() {
            self.push(Box::new(super::SimpleValueChangeOperation::new(
                object, getter, setter,
            )));
        }
    }
}

impl fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack")
            .field("count", &self.count())
            .field("index", &self.index())
            .field("open_compounds", &self.compound_stack.borrow().len())
            .field("suspend_count", &self.suspend_count.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Counter {
        value: Rc<Cell<i32>>,
        delta: i32,
    }

    impl UndoableOperation for Counter {
        fn display_name(&self) -> String {
            format!("Add {}", self.delta)
        }

        fn undo(&mut self) -> Result<()> {
            self.value.set(self.value.get() - self.delta);
            Ok(())
        }

        fn redo(&mut self) -> Result<()> {
            self.value.set(self.value.get() + self.delta);
            Ok(())
        }
    }

    fn apply(stack: &UndoStack, value: &Rc<Cell<i32>>, delta: i32) {
        value.set(value.get() + delta);
        stack.push(Box::new(Counter {
            value: value.clone(),
            delta,
        }));
    }

    #[test]
    fn test_not_recording_outside_compound() {
        let stack = UndoStack::default();
        assert!(!stack.is_recording());
        stack.begin_compound_operation("Edit");
        assert!(stack.is_recording());
        stack.suspend();
        assert!(!stack.is_recording());
        stack.resume();
        stack.end_compound_operation(true);
        assert_eq!(stack.count(), 0);
    }

    #[test]
    fn test_undo_redo_steps() {
        let stack = UndoStack::default();
        let value = Rc::new(Cell::new(0));

        stack.begin_compound_operation("First");
        apply(&stack, &value, 1);
        apply(&stack, &value, 2);
        stack.end_compound_operation(true);

        stack.begin_compound_operation("Second");
        apply(&stack, &value, 10);
        stack.end_compound_operation(true);

        assert_eq!(stack.count(), 2);
        assert_eq!(stack.undo_text().as_deref(), Some("Second"));

        stack.undo().unwrap();
        assert_eq!(value.get(), 3);
        stack.undo().unwrap();
        assert_eq!(value.get(), 0);
        assert!(!stack.can_undo());

        stack.redo().unwrap();
        assert_eq!(value.get(), 3);
        assert_eq!(stack.redo_text().as_deref(), Some("Second"));
    }

    #[test]
    fn test_rollback_without_commit() {
        let stack = UndoStack::default();
        let value = Rc::new(Cell::new(5));

        stack.begin_compound_operation("Aborted");
        apply(&stack, &value, 7);
        stack.end_compound_operation(false);

        assert_eq!(value.get(), 5);
        assert_eq!(stack.count(), 0);
    }

    #[test]
    fn test_push_discards_redo_history() {
        let stack = UndoStack::default();
        let value = Rc::new(Cell::new(0));

        for delta in [1, 2] {
            stack.begin_compound_operation("Step");
            apply(&stack, &value, delta);
            stack.end_compound_operation(true);
        }
        stack.undo().unwrap();
        assert!(stack.can_redo());

        stack.begin_compound_operation("Step");
        apply(&stack, &value, 5);
        stack.end_compound_operation(true);
        assert!(!stack.can_redo());
        assert_eq!(stack.count(), 2);
    }

    #[test]
    fn test_undo_limit() {
        let stack = UndoStack::new(Some(2));
        let value = Rc::new(Cell::new(0));
        for delta in [1, 2, 3] {
            stack.begin_compound_operation("Step");
            apply(&stack, &value, delta);
            stack.end_compound_operation(true);
        }
        assert_eq!(stack.count(), 2);
        assert_eq!(stack.index(), Some(1));
    }

    #[test]
    fn test_clean_state() {
        let stack = UndoStack::default();
        let value = Rc::new(Cell::new(0));
        assert!(stack.is_clean());

        stack.begin_compound_operation("Step");
        apply(&stack, &value, 1);
        stack.end_compound_operation(true);
        assert!(!stack.is_clean());

        stack.set_clean();
        assert!(stack.is_clean());
        stack.undo().unwrap();
        assert!(!stack.is_clean());
        stack.redo().unwrap();
        assert!(stack.is_clean());

        stack.set_dirty();
        assert!(!stack.is_clean());
    }
}
