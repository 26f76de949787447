//! Objects that hold references: the field-owner role of a graph node

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::trace;

use super::descriptor::{FieldKind, PropertyFieldDescriptor};
use super::event::{ReferenceEvent, ReferenceEventType};
use super::ref_target::{RefTarget, RefTargetExt};
use super::reference_field::SingleReferenceFieldBase;
use super::vector_field::VectorReferenceFieldBase;
use crate::error::Result;
use crate::object::{OORef, ObjectBase, ObjectId};
use crate::undo::UndoSuspender;
use crate::value::Value;

/// An object that declares fields and can reference targets.
///
/// Implementors override the hooks below to react to changes. The generic
/// field operations live in [`RefMakerExt`], which every `RefMaker` gets
/// automatically.
pub trait RefMaker: ObjectBase {
    /// Called for every event a referenced target sends.
    ///
    /// `source` is the target this object references; the event's sender
    /// may be further down the dependency chain. Returning `false` stops
    /// the event from being passed on to this object's own dependents.
    fn reference_event(&self, source: &OORef<dyn RefTarget>, event: &ReferenceEvent) -> bool {
        let _ = (source, event);
        true
    }

    /// Called after a single reference field was reassigned.
    fn reference_replaced(
        &self,
        field: &'static PropertyFieldDescriptor,
        old_target: Option<&OORef<dyn RefTarget>>,
        new_target: Option<&OORef<dyn RefTarget>>,
    ) {
        let _ = (field, old_target, new_target);
    }

    /// Called after a target was inserted into a vector reference field.
    fn reference_inserted(
        &self,
        field: &'static PropertyFieldDescriptor,
        target: &OORef<dyn RefTarget>,
        index: usize,
    ) {
        let _ = (field, target, index);
    }

    /// Called after a target was removed from a vector reference field.
    fn reference_removed(
        &self,
        field: &'static PropertyFieldDescriptor,
        target: &OORef<dyn RefTarget>,
        index: usize,
    ) {
        let _ = (field, target, index);
    }

    /// Called after a property field changed its value.
    fn property_changed(&self, field: &'static PropertyFieldDescriptor) {
        let _ = field;
    }

    /// Data outside the field system to include when the object is saved.
    fn save_extra_data(&self) -> Option<Value> {
        None
    }

    /// Restore data written by [`save_extra_data`](Self::save_extra_data).
    fn load_extra_data(&self, data: &Value) -> Result<()> {
        let _ = data;
        Ok(())
    }
}

/// Generic, descriptor-driven operations available on every [`RefMaker`].
pub trait RefMakerExt: RefMaker {
    // ═══════════════════════════════════════════════════════════════════
    // Generic Field Access
    // ═══════════════════════════════════════════════════════════════════

    /// Look up a field of this object's class by identifier.
    fn find_field(&self, identifier: &str) -> Result<&'static PropertyFieldDescriptor> {
        self.oo_type().field(identifier)
    }

    /// Read a property field.
    fn property_field_value(&self, field: &'static PropertyFieldDescriptor) -> Value {
        field.property_field(self.as_ref_maker()).value()
    }

    /// Write a property field, with undo recording and notification.
    fn set_property_field_value(
        &self,
        field: &'static PropertyFieldDescriptor,
        value: &Value,
    ) -> Result<()> {
        let owner = self.as_ref_maker();
        field.property_field(owner).set_value(owner, value)
    }

    /// Read a property field by identifier.
    fn property_value(&self, identifier: &str) -> Result<Value> {
        let field = self.find_field(identifier)?;
        Ok(self.property_field_value(field))
    }

    /// Write a property field by identifier.
    fn set_property_value(&self, identifier: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.find_field(identifier)?;
        self.set_property_field_value(field, &value.into())
    }

    /// Single reference field storage.
    fn reference_field(&self, field: &'static PropertyFieldDescriptor) -> &SingleReferenceFieldBase {
        field.single_field(self.as_ref_maker())
    }

    /// Vector reference field storage.
    fn vector_reference_field(
        &self,
        field: &'static PropertyFieldDescriptor,
    ) -> &VectorReferenceFieldBase {
        field.vector_field(self.as_ref_maker())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reference Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Whether any reference field, strong or weak, holds `target`.
    fn has_reference_to(&self, target: ObjectId) -> bool {
        let owner = self.as_ref_maker();
        owner.oo_type().all_fields().into_iter().any(|field| match field.kind() {
            FieldKind::Property(_) => false,
            FieldKind::Reference { .. } => field.single_field(owner).target_id() == Some(target),
            FieldKind::Vector { .. } => field.vector_field(owner).contains(target),
        })
    }

    /// Whether any strong reference field holds `target`.
    ///
    /// Exactly the objects for which this is true appear in the target's
    /// dependents list.
    fn has_strong_reference_to(&self, target: ObjectId) -> bool {
        let owner = self.as_ref_maker();
        owner.oo_type().all_fields().into_iter().any(|field| match field.kind() {
            FieldKind::Property(_) => false,
            FieldKind::Reference { .. } => field.single_field(owner).holds_strong(target),
            FieldKind::Vector { .. } => field.vector_field(owner).contains(target),
        })
    }

    /// Whether the object `maker` depends on this object, directly or
    /// through a chain of references. An object counts as depending on
    /// itself. Always `false` for objects that are not targets.
    fn is_referenced_by(&self, maker: ObjectId) -> bool {
        if self.as_ref_target().is_none() {
            return false;
        }
        let core = self.core();
        if core.id() == maker {
            return true;
        }

        let mut visited = HashSet::new();
        visited.insert(core.id());
        let mut stack = core.dependents().snapshot();
        while let Some(dependent) = stack.pop() {
            let id = dependent.core().id();
            if id == maker {
                return true;
            }
            if visited.insert(id) {
                stack.extend(dependent.core().dependents().snapshot());
            }
        }
        false
    }

    /// All targets reachable by following reference fields outward.
    fn all_dependencies(&self) -> IndexSet<OORef<dyn RefTarget>> {
        let mut result = IndexSet::new();
        let mut stack = direct_targets(self.as_ref_maker());
        stack.reverse();
        while let Some(target) = stack.pop() {
            if result.insert(target.clone()) {
                let mut next = direct_targets(target.as_ref_maker());
                next.reverse();
                stack.extend(next);
            }
        }
        result
    }

    // ═══════════════════════════════════════════════════════════════════
    // Bulk Reference Edits
    // ═══════════════════════════════════════════════════════════════════

    /// Remove every edge to `target` from all reference fields.
    ///
    /// Vector entries are removed from the highest index down.
    fn clear_references_to(&self, target: ObjectId) {
        let owner = self.as_ref_maker();
        for field in owner.oo_type().all_fields() {
            match field.kind() {
                FieldKind::Property(_) => {}
                FieldKind::Reference { .. } => {
                    let single = field.single_field(owner);
                    if single.target_id() == Some(target) {
                        // Clearing a field never fails.
                        let _ = single.set_target(owner, None);
                    }
                }
                FieldKind::Vector { .. } => {
                    let vector = field.vector_field(owner);
                    for index in (0..vector.len()).rev() {
                        if vector.get(index).is_some_and(|t| t.id() == target) {
                            vector.remove(owner, index);
                        }
                    }
                }
            }
        }
    }

    /// Redirect every edge to `old` to `new`, keeping vector positions.
    ///
    /// All strong edges are checked for type and cycles first; on error
    /// nothing is changed.
    fn replace_references_to(&self, old: ObjectId, new: Option<&OORef<dyn RefTarget>>) -> Result<()> {
        let owner = self.as_ref_maker();
        let fields = owner.oo_type().all_fields();

        if let Some(new) = new {
            for field in &fields {
                let holds_old = match field.kind() {
                    FieldKind::Property(_) => false,
                    FieldKind::Reference { .. } => {
                        let single = field.single_field(owner);
                        let holds_old = single.target_id() == Some(old);
                        if holds_old {
                            single.check_target(new)?;
                        }
                        holds_old
                    }
                    FieldKind::Vector { .. } => {
                        let vector = field.vector_field(owner);
                        let holds_old = vector.contains(old);
                        if holds_old {
                            vector.check_target(new)?;
                        }
                        holds_old
                    }
                };
                if holds_old && !field.is_weak() {
                    super::reference_field::check_cycle(owner, new)?;
                }
            }
        }

        for field in fields {
            match field.kind() {
                FieldKind::Property(_) => {}
                FieldKind::Reference { .. } => {
                    let single = field.single_field(owner);
                    if single.target_id() == Some(old) {
                        single.set_target(owner, new.cloned())?;
                    }
                }
                FieldKind::Vector { .. } => {
                    let vector = field.vector_field(owner);
                    for index in (0..vector.len()).rev() {
                        if vector.get(index).is_some_and(|t| t.id() == old) {
                            vector.remove(owner, index);
                            if let Some(new) = new {
                                vector.insert(owner, new.clone(), Some(index))?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Empty one reference field.
    fn clear_reference_field(&self, field: &'static PropertyFieldDescriptor) {
        let owner = self.as_ref_maker();
        match field.kind() {
            FieldKind::Property(_) => panic!("field '{}' is not a reference field", field.identifier()),
            FieldKind::Reference { .. } => {
                let _ = field.single_field(owner).set_target(owner, None);
            }
            FieldKind::Vector { .. } => field.vector_field(owner).clear(owner),
        }
    }

    /// Empty all reference fields.
    fn clear_all_references(&self) {
        let owner = self.as_ref_maker();
        for field in owner.oo_type().all_fields() {
            if field.is_reference_field() {
                owner.clear_reference_field(field);
            }
        }
    }

    /// Detach the object from the graph ahead of its destruction.
    ///
    /// Targets first broadcast `TargetDeleted` so that dependents drop
    /// their references. Then all outgoing references are released without
    /// undo recording.
    fn auto_delete_object(&self) {
        if let Some(target) = self.as_ref_target() {
            target.delete_reference_object();
        }
        let dataset = self.core().dataset();
        let _suspender = dataset.as_ref().map(|ds| UndoSuspender::new(ds.undo_stack()));
        self.clear_all_references();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Notification Dispatch
    // ═══════════════════════════════════════════════════════════════════

    /// Deliver an event sent by the referenced target `source`.
    ///
    /// Calls [`RefMaker::reference_event`]. `TargetDeleted` additionally
    /// clears all references to `source` and is never passed on. Any other
    /// event is passed on to this object's own dependents if the hook
    /// returned `true` and this object is a target. Returns whether the
    /// event was passed on.
    fn process_target_notification(
        &self,
        source: &OORef<dyn RefTarget>,
        event: &ReferenceEvent,
    ) -> bool {
        let owner = self.as_ref_maker();
        trace!(
            receiver = owner.oo_type().name(),
            kind = ?event.kind(),
            sender = event.sender().oo_type().name(),
            "processing target notification"
        );

        if event.kind() == ReferenceEventType::TargetDeleted {
            owner.reference_event(source, event);
            owner.clear_references_to(source.id());
            return false;
        }

        if !owner.reference_event(source, event) {
            return false;
        }
        match owner.as_ref_target() {
            Some(target) => {
                target.notify_dependents_event(event);
                true
            }
            None => false,
        }
    }
}

impl<T: RefMaker + ?Sized> RefMakerExt for T {}

fn direct_targets(owner: &dyn RefMaker) -> Vec<OORef<dyn RefTarget>> {
    let mut targets = Vec::new();
    for field in owner.oo_type().all_fields() {
        match field.kind() {
            FieldKind::Property(_) => {}
            FieldKind::Reference { .. } => targets.extend(field.single_field(owner).target()),
            FieldKind::Vector { .. } => targets.extend(field.vector_field(owner).targets()),
        }
    }
    targets
}
