//! Generic undo records

use super::UndoableOperation;
use crate::error::Result;
use crate::object::OORef;
use crate::reference::{RefTarget, RefTargetExt, ReferenceEventType};

/// Restores a value through a getter/setter pair.
///
/// Captures the current value on creation; undo and redo swap it with the
/// object's current value.
pub struct SimpleValueChangeOperation<O: ?Sized + 'static, V: 'static> {
    object: OORef<O>,
    value: V,
    getter: fn(&O) -> V,
    setter: fn(&O, V),
}

impl<O: ?Sized + 'static, V: 'static> SimpleValueChangeOperation<O, V> {
    /// Capture the current value of `object`.
    pub fn new(object: OORef<O>, getter: fn(&O) -> V, setter: fn(&O, V)) -> Self {
        let value = getter(&object);
        Self {
            object,
            value,
            getter,
            setter,
        }
    }
}

impl<O: ?Sized + 'static, V: 'static> UndoableOperation for SimpleValueChangeOperation<O, V> {
    fn display_name(&self) -> String {
        "Change value".to_string()
    }

    fn undo(&mut self) -> Result<()> {
        let current = (self.getter)(&self.object);
        let previous = std::mem::replace(&mut self.value, current);
        (self.setter)(&self.object, previous);
        Ok(())
    }
}

/// Sends `TargetChanged` from a target when undone.
///
/// Push it before a sequence of changes whose own records do not notify.
pub struct TargetChangedUndoOperation {
    target: OORef<dyn RefTarget>,
}

impl TargetChangedUndoOperation {
    /// Create the record for `target`.
    pub fn new(target: OORef<dyn RefTarget>) -> Self {
        Self { target }
    }
}

impl UndoableOperation for TargetChangedUndoOperation {
    fn undo(&mut self) -> Result<()> {
        self.target.notify_dependents(ReferenceEventType::TargetChanged);
        Ok(())
    }

    fn redo(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sends `TargetChanged` from a target when redone.
///
/// Push it after a sequence of changes whose own records do not notify.
pub struct TargetChangedRedoOperation {
    target: OORef<dyn RefTarget>,
}

impl TargetChangedRedoOperation {
    /// Create the record for `target`.
    pub fn new(target: OORef<dyn RefTarget>) -> Self {
        Self { target }
    }
}

impl UndoableOperation for TargetChangedRedoOperation {
    fn undo(&mut self) -> Result<()> {
        Ok(())
    }

    fn redo(&mut self) -> Result<()> {
        self.target.notify_dependents(ReferenceEventType::TargetChanged);
        Ok(())
    }
}
