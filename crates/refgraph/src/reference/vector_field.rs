//! Vector reference fields

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use tracing::trace;

use super::descriptor::PropertyFieldDescriptor;
use super::event::{ReferenceEvent, ReferenceEventType};
use super::ref_maker::RefMaker;
use super::ref_target::{RefTarget, RefTargetExt};
use super::reference_field::{
    bind_dependent, check_cycle, check_target_class, check_target_filter,
    generate_target_changed_event, unbind_dependent, TargetFilter,
};
use crate::error::Result;
use crate::object::{OORef, ObjectId};
use crate::undo::UndoableOperation;

/// Untyped storage of an ordered list of targets.
///
/// The same target may occur at several positions. The owner is listed
/// once in the target's dependents no matter how many edges it holds.
pub struct VectorReferenceFieldBase {
    descriptor: &'static PropertyFieldDescriptor,
    filter: Option<TargetFilter>,
    targets: RefCell<Vec<OORef<dyn RefTarget>>>,
}

impl VectorReferenceFieldBase {
    /// Create an empty field.
    pub fn new(descriptor: &'static PropertyFieldDescriptor) -> Self {
        Self::with_filter(descriptor, None)
    }

    fn with_filter(descriptor: &'static PropertyFieldDescriptor, filter: Option<TargetFilter>) -> Self {
        assert!(
            descriptor.is_vector(),
            "descriptor '{}' does not describe a vector reference field",
            descriptor.identifier()
        );
        Self {
            descriptor,
            filter,
            targets: RefCell::new(Vec::new()),
        }
    }

    /// Descriptor of the field
    pub fn descriptor(&self) -> &'static PropertyFieldDescriptor {
        self.descriptor
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.targets.borrow().len()
    }

    /// Whether the field has no entries.
    pub fn is_empty(&self) -> bool {
        self.targets.borrow().is_empty()
    }

    /// Target at `index`
    pub fn get(&self, index: usize) -> Option<OORef<dyn RefTarget>> {
        self.targets.borrow().get(index).cloned()
    }

    /// Copy of all entries
    pub fn targets(&self) -> Vec<OORef<dyn RefTarget>> {
        self.targets.borrow().clone()
    }

    /// Whether `id` occurs at any position.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.targets.borrow().iter().any(|t| t.id() == id)
    }

    /// Fail with `IncompatibleTarget` if the field cannot hold `target`.
    pub(crate) fn check_target(&self, target: &OORef<dyn RefTarget>) -> Result<()> {
        check_target_class(self.descriptor, target)?;
        check_target_filter(self.descriptor, self.filter, target)
    }

    /// First position of `id` at or after `from`.
    pub fn index_of(&self, id: ObjectId, from: usize) -> Option<usize> {
        self.targets
            .borrow()
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, t)| t.id() == id)
            .map(|(i, _)| i)
    }

    /// Insert `target` before `index`, or append if `index` is `None` or
    /// past the end. Returns the position the target ended up at.
    ///
    /// Fails without modifying anything if the target's class is
    /// incompatible with the field or the insertion would close a cycle.
    pub fn insert(
        &self,
        owner: &dyn RefMaker,
        target: OORef<dyn RefTarget>,
        index: Option<usize>,
    ) -> Result<usize> {
        self.check_target(&target)?;
        let recording = self.recording(owner);

        let index = self.add_reference(owner, target.clone(), index, false)?;
        if recording {
            self.push_undo(
                owner,
                VectorOperation::Insert,
                None,
                index,
            );
        }
        self.notify_inserted(owner, target, index);
        Ok(index)
    }

    /// Append `target`. Returns its position.
    pub fn push(&self, owner: &dyn RefMaker, target: OORef<dyn RefTarget>) -> Result<usize> {
        self.insert(owner, target, None)
    }

    /// Remove and return the entry at `index`.
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&self, owner: &dyn RefMaker, index: usize) -> OORef<dyn RefTarget> {
        let recording = self.recording(owner);
        let target = self.remove_reference(owner, index, false);
        if recording {
            self.push_undo(
                owner,
                VectorOperation::Remove,
                Some(target.clone()),
                index,
            );
        }
        self.notify_removed(owner, target.clone(), index);
        target
    }

    /// Remove all entries, one at a time from the front.
    pub fn clear(&self, owner: &dyn RefMaker) {
        while !self.is_empty() {
            self.remove(owner, 0);
        }
    }

    /// Replace all entries with `targets`.
    pub fn set_targets(
        &self,
        owner: &dyn RefMaker,
        targets: impl IntoIterator<Item = OORef<dyn RefTarget>>,
    ) -> Result<()> {
        self.clear(owner);
        for target in targets {
            self.push(owner, target)?;
        }
        Ok(())
    }

    fn recording(&self, owner: &dyn RefMaker) -> bool {
        self.descriptor.automatic_undo()
            && owner
                .core()
                .dataset()
                .is_some_and(|ds| ds.undo_stack().is_recording())
    }

    fn push_undo(
        &self,
        owner: &dyn RefMaker,
        kind: VectorOperation,
        target: Option<OORef<dyn RefTarget>>,
        index: usize,
    ) {
        if let (Some(dataset), Some(owner_ref)) = (owner.core().dataset(), owner.core().self_ref()) {
            dataset.undo_stack().push(Box::new(VectorReferenceOperation {
                kind,
                owner: owner_ref,
                descriptor: self.descriptor,
                target,
                index,
            }));
        }
    }

    pub(crate) fn add_reference(
        &self,
        owner: &dyn RefMaker,
        target: OORef<dyn RefTarget>,
        index: Option<usize>,
        notify: bool,
    ) -> Result<usize> {
        check_cycle(owner, &target)?;

        let index = {
            let mut targets = self.targets.borrow_mut();
            let index = match index {
                Some(i) if i <= targets.len() => i,
                _ => targets.len(),
            };
            targets.insert(index, target.clone());
            index
        };
        trace!(field = self.descriptor.identifier(), index, target = ?target.id(), "reference inserted");
        bind_dependent(owner, &target);

        if notify {
            self.notify_inserted(owner, target, index);
        }
        Ok(index)
    }

    pub(crate) fn remove_reference(
        &self,
        owner: &dyn RefMaker,
        index: usize,
        notify: bool,
    ) -> OORef<dyn RefTarget> {
        let target = {
            let mut targets = self.targets.borrow_mut();
            assert!(
                index < targets.len(),
                "index {} out of range for field '{}' of length {}",
                index,
                self.descriptor.identifier(),
                targets.len()
            );
            targets.remove(index)
        };
        trace!(field = self.descriptor.identifier(), index, target = ?target.id(), "reference removed");
        unbind_dependent(owner, &target);

        if notify {
            self.notify_removed(owner, target.clone(), index);
        }
        target
    }

    fn notify_inserted(&self, owner: &dyn RefMaker, target: OORef<dyn RefTarget>, index: usize) {
        owner.reference_inserted(self.descriptor, &target, index);
        if let Some(sender) = owner.core().self_target() {
            let event = ReferenceEvent::reference_field(
                ReferenceEventType::ReferenceAdded,
                sender.clone(),
                self.descriptor,
                None,
                Some(target),
                Some(index),
            );
            sender.notify_dependents_event(&event);
        }
        generate_target_changed_event(owner, self.descriptor);
    }

    fn notify_removed(&self, owner: &dyn RefMaker, target: OORef<dyn RefTarget>, index: usize) {
        owner.reference_removed(self.descriptor, &target, index);
        if let Some(sender) = owner.core().self_target() {
            let event = ReferenceEvent::reference_field(
                ReferenceEventType::ReferenceRemoved,
                sender.clone(),
                self.descriptor,
                Some(target),
                None,
                Some(index),
            );
            sender.notify_dependents_event(&event);
        }
        generate_target_changed_event(owner, self.descriptor);
    }
}

impl Drop for VectorReferenceFieldBase {
    fn drop(&mut self) {
        let targets = std::mem::take(self.targets.get_mut());
        for target in &targets {
            target.core().prune_dependents();
        }
    }
}

impl fmt::Debug for VectorReferenceFieldBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ObjectId> = self.targets.borrow().iter().map(|t| t.id()).collect();
        f.debug_struct("VectorReferenceField")
            .field("field", self.descriptor)
            .field("targets", &ids)
            .finish()
    }
}

/// A vector reference field whose targets are of type `T`.
pub struct VectorReferenceField<T: RefTarget> {
    base: VectorReferenceFieldBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RefTarget> VectorReferenceField<T> {
    /// Create an empty field.
    pub fn new(descriptor: &'static PropertyFieldDescriptor) -> Self {
        Self {
            base: VectorReferenceFieldBase::with_filter(descriptor, Some(TargetFilter::of::<T>())),
            _marker: PhantomData,
        }
    }

    /// Typed entry at `index`
    pub fn at(&self, index: usize) -> Option<OORef<T>> {
        self.base.get(index).and_then(|t| t.downcast::<T>())
    }

    /// Typed copy of all entries. Has [`len`](VectorReferenceFieldBase::len)
    /// elements, since only objects of type `T` are ever stored.
    pub fn to_vec(&self) -> Vec<OORef<T>> {
        self.base
            .targets()
            .iter()
            .filter_map(|t| t.downcast::<T>())
            .collect()
    }

    /// Insert a typed target. See [`VectorReferenceFieldBase::insert`].
    pub fn insert_at(
        &self,
        owner: &dyn RefMaker,
        target: &OORef<T>,
        index: Option<usize>,
    ) -> Result<usize> {
        self.base.insert(owner, target.to_target(), index)
    }

    /// Append a typed target.
    pub fn push_back(&self, owner: &dyn RefMaker, target: &OORef<T>) -> Result<usize> {
        self.base.insert(owner, target.to_target(), None)
    }

    /// Untyped view of the field
    pub fn base(&self) -> &VectorReferenceFieldBase {
        &self.base
    }
}

impl<T: RefTarget> Deref for VectorReferenceField<T> {
    type Target = VectorReferenceFieldBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<T: RefTarget> fmt::Debug for VectorReferenceField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VectorOperation {
    Insert,
    Remove,
}

/// Undo record of a vector insertion or removal.
///
/// While the entry is in the field `target` is `None`; while it is out,
/// the record owns it. `index` is the exact position used originally.
struct VectorReferenceOperation {
    kind: VectorOperation,
    owner: OORef<dyn RefMaker>,
    descriptor: &'static PropertyFieldDescriptor,
    target: Option<OORef<dyn RefTarget>>,
    index: usize,
}

impl VectorReferenceOperation {
    fn take_out(&mut self) {
        let owner: &dyn RefMaker = &*self.owner;
        let field = self.descriptor.vector_field(owner);
        self.target = Some(field.remove_reference(owner, self.index, true));
    }

    fn put_back(&mut self) -> Result<()> {
        let owner: &dyn RefMaker = &*self.owner;
        let field = self.descriptor.vector_field(owner);
        if let Some(target) = self.target.take() {
            match field.add_reference(owner, target.clone(), Some(self.index), true) {
                Ok(index) => self.index = index,
                Err(err) => {
                    self.target = Some(target);
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

impl UndoableOperation for VectorReferenceOperation {
    fn display_name(&self) -> String {
        match self.kind {
            VectorOperation::Insert => format!("Insert into {}", self.descriptor.display_name()),
            VectorOperation::Remove => format!("Remove from {}", self.descriptor.display_name()),
        }
    }

    fn undo(&mut self) -> Result<()> {
        match self.kind {
            VectorOperation::Insert => {
                self.take_out();
                Ok(())
            }
            VectorOperation::Remove => self.put_back(),
        }
    }

    fn redo(&mut self) -> Result<()> {
        match self.kind {
            VectorOperation::Insert => self.put_back(),
            VectorOperation::Remove => {
                self.take_out();
                Ok(())
            }
        }
    }
}
