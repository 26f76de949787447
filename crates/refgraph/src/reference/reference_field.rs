//! Single reference fields

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use tracing::trace;

use super::descriptor::PropertyFieldDescriptor;
use super::event::{ReferenceEvent, ReferenceEventType};
use super::ref_maker::{RefMaker, RefMakerExt};
use super::ref_target::{RefTarget, RefTargetExt};
use crate::error::{RefGraphError, Result};
use crate::object::{OORef, ObjectId, WeakRef};
use crate::undo::UndoableOperation;

enum Edge {
    Strong(OORef<dyn RefTarget>),
    Weak(WeakRef<dyn RefTarget>),
}

impl Edge {
    fn upgrade(&self) -> Option<OORef<dyn RefTarget>> {
        match self {
            Edge::Strong(target) => Some(target.clone()),
            Edge::Weak(weak) => weak.upgrade(),
        }
    }
}

/// Untyped storage of a field referencing zero or one target.
///
/// Strong fields keep their target alive and register the owner in the
/// target's dependents list. Fields flagged `WEAK_REF` hold a non-owning
/// pointer, stay out of the dependents list and read as empty once the
/// target has been destroyed.
pub struct SingleReferenceFieldBase {
    descriptor: &'static PropertyFieldDescriptor,
    filter: Option<TargetFilter>,
    edge: RefCell<Option<Edge>>,
}

impl SingleReferenceFieldBase {
    /// Create an empty field.
    pub fn new(descriptor: &'static PropertyFieldDescriptor) -> Self {
        Self::with_filter(descriptor, None)
    }

    fn with_filter(descriptor: &'static PropertyFieldDescriptor, filter: Option<TargetFilter>) -> Self {
        assert!(
            descriptor.is_reference_field() && !descriptor.is_vector(),
            "descriptor '{}' does not describe a single reference field",
            descriptor.identifier()
        );
        Self {
            descriptor,
            filter,
            edge: RefCell::new(None),
        }
    }

    /// Descriptor of the field
    pub fn descriptor(&self) -> &'static PropertyFieldDescriptor {
        self.descriptor
    }

    /// Current target
    pub fn target(&self) -> Option<OORef<dyn RefTarget>> {
        self.edge.borrow().as_ref().and_then(Edge::upgrade)
    }

    /// Identity of the current target
    pub fn target_id(&self) -> Option<ObjectId> {
        self.target().map(|t| t.id())
    }

    /// Whether the field holds no (live) target.
    pub fn is_empty(&self) -> bool {
        self.target().is_none()
    }

    /// Fail with `IncompatibleTarget` if the field cannot hold `target`.
    pub(crate) fn check_target(&self, target: &OORef<dyn RefTarget>) -> Result<()> {
        check_target_class(self.descriptor, target)?;
        check_target_filter(self.descriptor, self.filter, target)
    }

    pub(crate) fn holds_strong(&self, id: ObjectId) -> bool {
        matches!(&*self.edge.borrow(), Some(Edge::Strong(t)) if t.id() == id)
    }

    /// Assign a new target.
    ///
    /// Does nothing if `target` is the current target. Fails without
    /// modifying anything if the target's class is incompatible with the
    /// field or the assignment would close a cycle.
    pub fn set_target(
        &self,
        owner: &dyn RefMaker,
        target: Option<OORef<dyn RefTarget>>,
    ) -> Result<()> {
        if self.target_id() == target.as_ref().map(|t| t.id()) {
            return Ok(());
        }
        if let Some(target) = &target {
            self.check_target(target)?;
        }

        let recording = self.descriptor.automatic_undo()
            && owner
                .core()
                .dataset()
                .is_some_and(|ds| ds.undo_stack().is_recording());

        let mut inactive = target;
        self.swap_reference(owner, &mut inactive, false)?;
        let old = inactive.clone();

        if recording {
            if let (Some(dataset), Some(owner_ref)) = (owner.core().dataset(), owner.core().self_ref()) {
                dataset.undo_stack().push(Box::new(SetReferenceOperation {
                    owner: owner_ref,
                    descriptor: self.descriptor,
                    inactive,
                }));
            }
        }

        self.notify_replaced(owner, old, self.target());
        Ok(())
    }

    /// Exchange the stored target with `inactive`.
    ///
    /// Updates the dependents lists of both targets and, if requested,
    /// sends the replacement notifications.
    pub(crate) fn swap_reference(
        &self,
        owner: &dyn RefMaker,
        inactive: &mut Option<OORef<dyn RefTarget>>,
        notify: bool,
    ) -> Result<()> {
        let weak = self.descriptor.is_weak();
        if let (false, Some(incoming)) = (weak, inactive.as_ref()) {
            check_cycle(owner, incoming)?;
        }

        let incoming = inactive.take().map(|target| {
            if weak {
                Edge::Weak(OORef::downgrade(&target))
            } else {
                Edge::Strong(target)
            }
        });
        let previous = self.edge.replace(incoming);
        let old = previous.as_ref().and_then(Edge::upgrade);
        drop(previous);
        let new = self.target();

        trace!(
            field = self.descriptor.identifier(),
            old = ?old.as_ref().map(|t| t.id()),
            new = ?new.as_ref().map(|t| t.id()),
            "reference swapped"
        );

        if !weak {
            if let Some(old) = &old {
                unbind_dependent(owner, old);
            }
            if let Some(new) = &new {
                bind_dependent(owner, new);
            }
        }

        *inactive = old.clone();
        if notify {
            self.notify_replaced(owner, old, new);
        }
        Ok(())
    }

    fn notify_replaced(
        &self,
        owner: &dyn RefMaker,
        old: Option<OORef<dyn RefTarget>>,
        new: Option<OORef<dyn RefTarget>>,
    ) {
        owner.reference_replaced(self.descriptor, old.as_ref(), new.as_ref());
        if let Some(sender) = owner.core().self_target() {
            let event = ReferenceEvent::reference_field(
                ReferenceEventType::ReferenceChanged,
                sender.clone(),
                self.descriptor,
                old,
                new,
                None,
            );
            sender.notify_dependents_event(&event);
        }
        generate_target_changed_event(owner, self.descriptor);
    }
}

impl Drop for SingleReferenceFieldBase {
    fn drop(&mut self) {
        if let Some(Edge::Strong(target)) = self.edge.get_mut().take() {
            target.core().prune_dependents();
        }
    }
}

impl fmt::Debug for SingleReferenceFieldBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleReferenceField")
            .field("field", self.descriptor)
            .field("target", &self.target_id())
            .finish()
    }
}

/// A single reference field whose targets are of type `T`.
pub struct ReferenceField<T: RefTarget> {
    base: SingleReferenceFieldBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RefTarget> ReferenceField<T> {
    /// Create an empty field.
    pub fn new(descriptor: &'static PropertyFieldDescriptor) -> Self {
        Self {
            base: SingleReferenceFieldBase::with_filter(descriptor, Some(TargetFilter::of::<T>())),
            _marker: PhantomData,
        }
    }

    /// Current target
    ///
    /// Only objects of type `T` are ever stored, so this is `None` exactly
    /// when the field is empty.
    pub fn get(&self) -> Option<OORef<T>> {
        self.base.target().and_then(|t| t.downcast::<T>())
    }

    /// Assign a new target. See [`SingleReferenceFieldBase::set_target`].
    pub fn set(&self, owner: &dyn RefMaker, target: Option<&OORef<T>>) -> Result<()> {
        self.base.set_target(owner, target.map(OORef::to_target))
    }

    /// Untyped view of the field
    pub fn base(&self) -> &SingleReferenceFieldBase {
        &self.base
    }
}

impl<T: RefTarget> Deref for ReferenceField<T> {
    type Target = SingleReferenceFieldBase;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<T: RefTarget> fmt::Debug for ReferenceField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}

/// Undo record of a reference assignment. Holds the target that is not
/// currently stored in the field; undo and redo swap it back in.
struct SetReferenceOperation {
    owner: OORef<dyn RefMaker>,
    descriptor: &'static PropertyFieldDescriptor,
    inactive: Option<OORef<dyn RefTarget>>,
}

impl UndoableOperation for SetReferenceOperation {
    fn display_name(&self) -> String {
        format!("Set {}", self.descriptor.display_name())
    }

    fn undo(&mut self) -> Result<()> {
        let owner: &dyn RefMaker = &*self.owner;
        self.descriptor
            .single_field(owner)
            .swap_reference(owner, &mut self.inactive, true)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Shared edge bookkeeping
// ═══════════════════════════════════════════════════════════════════

pub(crate) fn check_target_class(
    descriptor: &'static PropertyFieldDescriptor,
    target: &OORef<dyn RefTarget>,
) -> Result<()> {
    let Some(expected) = descriptor.target_class() else {
        return Ok(());
    };
    if target.oo_type().is_derived_from(expected) {
        Ok(())
    } else {
        Err(RefGraphError::IncompatibleTarget {
            field: descriptor.identifier().to_string(),
            expected: expected.name().to_string(),
            got: target.oo_type().name().to_string(),
        })
    }
}

/// Restricts a typed field to targets whose concrete type is `T`.
///
/// The class check alone admits subclasses implemented by other structs,
/// which the typed accessors could not hand out.
#[derive(Clone, Copy)]
pub(crate) struct TargetFilter {
    type_name: &'static str,
    accepts: fn(&OORef<dyn RefTarget>) -> bool,
}

impl TargetFilter {
    pub(crate) fn of<T: RefTarget>() -> Self {
        fn accepts<T: RefTarget>(target: &OORef<dyn RefTarget>) -> bool {
            target.downcast::<T>().is_some()
        }
        let full = std::any::type_name::<T>();
        Self {
            type_name: full.rsplit("::").next().unwrap_or(full),
            accepts: accepts::<T>,
        }
    }
}

pub(crate) fn check_target_filter(
    descriptor: &'static PropertyFieldDescriptor,
    filter: Option<TargetFilter>,
    target: &OORef<dyn RefTarget>,
) -> Result<()> {
    match filter {
        Some(filter) if !(filter.accepts)(target) => Err(RefGraphError::IncompatibleTarget {
            field: descriptor.identifier().to_string(),
            expected: filter.type_name.to_string(),
            got: target.oo_type().name().to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_cycle(owner: &dyn RefMaker, target: &OORef<dyn RefTarget>) -> Result<()> {
    if owner.is_referenced_by(target.id()) {
        Err(RefGraphError::CyclicReference {
            maker: owner.oo_type().name().to_string(),
            target: target.oo_type().name().to_string(),
        })
    } else {
        Ok(())
    }
}

/// Register `owner` with `target` after an edge was added.
pub(crate) fn bind_dependent(owner: &dyn RefMaker, target: &OORef<dyn RefTarget>) {
    target.core().add_dependent(owner.core().weak_self());
}

/// Unregister `owner` from `target` after an edge was removed, unless
/// another strong edge from `owner` to `target` remains.
pub(crate) fn unbind_dependent(owner: &dyn RefMaker, target: &OORef<dyn RefTarget>) {
    let owner_id = owner.core().id();
    debug_assert!(target.core().dependents().contains(owner_id));
    if !owner.has_strong_reference_to(target.id()) {
        target.core().remove_dependent(owner_id);
    }
}

/// Raise `TargetChanged` on the owner if the field allows it.
pub(crate) fn generate_target_changed_event(
    owner: &dyn RefMaker,
    descriptor: &'static PropertyFieldDescriptor,
) {
    if !descriptor.should_generate_change_event() {
        return;
    }
    if let Some(target) = owner.as_ref_target() {
        target.notify_dependents(ReferenceEventType::TargetChanged);
    }
}
