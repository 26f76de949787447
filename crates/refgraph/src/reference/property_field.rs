//! Plain value fields with undo and change notification

use std::cell::{Ref, RefCell};
use std::fmt;

use super::descriptor::PropertyFieldDescriptor;
use super::event::ReferenceEventType;
use super::ref_maker::RefMaker;
use super::ref_target::RefTargetExt;
use crate::error::Result;
use crate::object::OORef;
use crate::undo::UndoableOperation;
use crate::value::{PropertyValue, Value};

/// Type-erased access to a property field, used by generic code.
pub trait PropertyFieldBase {
    /// Descriptor of the field
    fn descriptor(&self) -> &'static PropertyFieldDescriptor;

    /// Current value as a [`Value`].
    fn value(&self) -> Value;

    /// Assign from a [`Value`], with undo recording and notification.
    ///
    /// Fails with a type error if the value does not match the field type.
    fn set_value(&self, owner: &dyn RefMaker, value: &Value) -> Result<()>;

    /// Assign without undo recording and return the previous value.
    ///
    /// Change notifications are still sent.
    fn replace_value(&self, owner: &dyn RefMaker, value: &Value) -> Result<Value>;
}

/// A field storing one value of type `T`.
pub struct PropertyField<T: PropertyValue> {
    descriptor: &'static PropertyFieldDescriptor,
    value: RefCell<T>,
}

impl<T: PropertyValue> PropertyField<T> {
    /// Create a field holding `initial`.
    pub fn new(descriptor: &'static PropertyFieldDescriptor, initial: T) -> Self {
        debug_assert!(!descriptor.is_reference_field());
        Self {
            descriptor,
            value: RefCell::new(initial),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Assign a new value.
    ///
    /// Does nothing if the value is unchanged. Otherwise records an undo
    /// operation when the owner's undo stack is recording, stores the value
    /// and notifies the owner and its dependents.
    pub fn set(&self, owner: &dyn RefMaker, value: T) {
        self.set_with_event(owner, value, None);
    }

    /// Like [`set`](Self::set), additionally broadcasting `extra` from the owner.
    pub fn set_with_event(&self, owner: &dyn RefMaker, value: T, extra: Option<ReferenceEventType>) {
        debug_assert!(self.belongs_to(owner), "property field used with a foreign owner");
        if *self.value.borrow() == value {
            return;
        }

        if self.descriptor.automatic_undo() {
            if let Some(dataset) = owner.core().dataset() {
                let stack = dataset.undo_stack();
                if stack.is_recording() {
                    if let Some(owner_ref) = owner.core().self_ref() {
                        let old = self.value.borrow().to_value();
                        stack.push(Box::new(PropertyChangeOperation::new(
                            owner_ref,
                            self.descriptor,
                            old,
                        )));
                    }
                }
            }
        }

        let old = self.value.replace(value);
        drop(old);
        self.value_changed(owner, extra);
    }

    fn value_changed(&self, owner: &dyn RefMaker, extra: Option<ReferenceEventType>) {
        owner.property_changed(self.descriptor);
        if let Some(target) = owner.as_ref_target() {
            if self.descriptor.should_generate_change_event() {
                target.notify_dependents(ReferenceEventType::TargetChanged);
            }
            if let Some(kind) = extra {
                target.notify_dependents(kind);
            }
        }
    }

    fn belongs_to(&self, owner: &dyn RefMaker) -> bool {
        let field = self.descriptor.property_field(owner);
        std::ptr::eq(
            field as *const dyn PropertyFieldBase as *const (),
            self as *const Self as *const (),
        )
    }
}

impl<T: PropertyValue> PropertyFieldBase for PropertyField<T> {
    fn descriptor(&self) -> &'static PropertyFieldDescriptor {
        self.descriptor
    }

    fn value(&self) -> Value {
        self.value.borrow().to_value()
    }

    fn set_value(&self, owner: &dyn RefMaker, value: &Value) -> Result<()> {
        let value = T::from_value(value)?;
        self.set(owner, value);
        Ok(())
    }

    fn replace_value(&self, owner: &dyn RefMaker, value: &Value) -> Result<Value> {
        let value = T::from_value(value)?;
        let old = self.value.replace(value);
        self.value_changed(owner, None);
        Ok(old.to_value())
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for PropertyField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyField")
            .field("field", self.descriptor)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

/// Undo record of a property change. Undo and redo both swap the stored
/// value with the current one.
struct PropertyChangeOperation {
    owner: OORef<dyn RefMaker>,
    descriptor: &'static PropertyFieldDescriptor,
    value: Value,
}

impl PropertyChangeOperation {
    fn new(
        owner: OORef<dyn RefMaker>,
        descriptor: &'static PropertyFieldDescriptor,
        value: Value,
    ) -> Self {
        Self {
            owner,
            descriptor,
            value,
        }
    }
}

impl UndoableOperation for PropertyChangeOperation {
    fn display_name(&self) -> String {
        format!("Change {}", self.descriptor.display_name())
    }

    fn undo(&mut self) -> Result<()> {
        let owner: &dyn RefMaker = &*self.owner;
        let field = self.descriptor.property_field(owner);
        self.value = field.replace_value(owner, &self.value)?;
        Ok(())
    }
}
