//! Objects that can be referenced: the target role of a graph node

use std::collections::HashSet;

use tracing::{debug, trace};

use super::clone_helper::CloneHelper;
use super::descriptor::{FieldKind, PropertyFieldFlags};
use super::event::{ReferenceEvent, ReferenceEventType};
use super::ref_maker::{RefMaker, RefMakerExt};
use crate::error::{RefGraphError, Result};
use crate::object::{OORef, ObjectId};

/// A [`RefMaker`] that other objects can reference.
pub trait RefTarget: RefMaker {
    /// Create a copy of this object.
    ///
    /// The default implementation instantiates the class through its
    /// factory and copies every declared field with [`clone_fields`].
    /// Overrides call [`clone_fields`] first and then copy data kept
    /// outside the field system. Reference fields must go through `helper`
    /// so that each source object is cloned at most once.
    fn clone_object(&self, deep_copy: bool, helper: &mut CloneHelper) -> Result<OORef<dyn RefTarget>> {
        clone_fields(self.as_ref_maker(), deep_copy, helper)
    }

    /// Title shown to the user. Defaults to the class name.
    fn object_title(&self) -> String {
        self.oo_type().name().to_string()
    }
}

/// Notification and dependents operations available on every [`RefTarget`].
pub trait RefTargetExt: RefTarget {
    /// Strong handles to all objects that reference this target, in the
    /// order they started referencing it.
    fn dependents(&self) -> Vec<OORef<dyn RefMaker>> {
        self.core().dependents().snapshot()
    }

    /// Whether `maker` is one of the direct dependents.
    fn has_dependent(&self, maker: ObjectId) -> bool {
        self.core().dependents().contains(maker)
    }

    /// Send an event of the given kind to all dependents.
    fn notify_dependents(&self, kind: ReferenceEventType) {
        if let Some(sender) = self.core().self_target() {
            sender.notify_dependents_event(&ReferenceEvent::new(kind, sender.clone()));
        }
    }

    /// Send `event` to all dependents.
    ///
    /// The dependents list is copied before delivery, so recipients may
    /// add or drop references while handling the event.
    fn notify_dependents_event(&self, event: &ReferenceEvent) {
        let Some(this) = self.core().self_target() else {
            return;
        };
        let recipients = self.core().dependents().snapshot();
        if recipients.is_empty() {
            return;
        }

        let trace_enabled = self
            .core()
            .dataset()
            .is_some_and(|ds| ds.config().trace_notifications);
        for dependent in recipients {
            if trace_enabled {
                trace!(
                    sender = event.sender().oo_type().name(),
                    via = this.oo_type().name(),
                    receiver = dependent.oo_type().name(),
                    kind = ?event.kind(),
                    "delivering notification"
                );
            }
            dependent.process_target_notification(&this, event);
        }
    }

    /// Visit every object that depends on this target, directly or
    /// indirectly. Each object is visited once.
    fn visit_dependents(&self, mut visitor: impl FnMut(&OORef<dyn RefMaker>)) {
        let mut visited = HashSet::new();
        let mut stack = self.dependents();
        stack.reverse();
        while let Some(dependent) = stack.pop() {
            if !visited.insert(dependent.id()) {
                continue;
            }
            visitor(&dependent);
            let mut next = dependent.core().dependents().snapshot();
            next.reverse();
            stack.extend(next);
        }
    }

    /// Announce the deletion of this target.
    ///
    /// Broadcasts `TargetDeleted`; every dependent clears its references to
    /// this object. Once the caller drops its own handles the object is
    /// destroyed.
    fn delete_reference_object(&self) {
        debug!(class = self.oo_type().name(), "deleting reference target");
        self.notify_dependents(ReferenceEventType::TargetDeleted);
    }
}

impl<T: RefTarget + ?Sized> RefTargetExt for T {}

/// Instantiate the class of `source` and copy all of its fields.
///
/// Property values are copied as is. Reference targets are copied
/// according to the field's clone flags: `NEVER_CLONE_TARGET` shares the
/// target, `ALWAYS_CLONE` clones it, `ALWAYS_DEEP_COPY` deep-clones it, and
/// otherwise `deep_copy` decides. Weak references are always shared.
pub fn clone_fields(
    source: &dyn RefMaker,
    deep_copy: bool,
    helper: &mut CloneHelper,
) -> Result<OORef<dyn RefTarget>> {
    let dataset = source.core().dataset().ok_or(RefGraphError::DataSetReleased)?;
    let class = source.oo_type();
    let clone = class.create_instance(&dataset)?;
    let dest = clone.as_ref_maker();

    for field in class.all_fields() {
        match field.kind() {
            FieldKind::Property(_) => {
                dest.set_property_field_value(field, &source.property_field_value(field))?;
            }
            FieldKind::Reference { .. } => {
                let target = field.single_field(source).target();
                let copied = if field.is_weak() {
                    target
                } else {
                    copy_field_target(field.flags(), target.as_ref(), deep_copy, helper)?
                };
                field.single_field(dest).set_target(dest, copied)?;
            }
            FieldKind::Vector { .. } => {
                let dest_field = field.vector_field(dest);
                dest_field.clear(dest);
                for target in field.vector_field(source).targets() {
                    if let Some(copied) =
                        copy_field_target(field.flags(), Some(&target), deep_copy, helper)?
                    {
                        dest_field.push(dest, copied)?;
                    }
                }
            }
        }
    }
    Ok(clone)
}

fn copy_field_target(
    flags: PropertyFieldFlags,
    target: Option<&OORef<dyn RefTarget>>,
    deep_copy: bool,
    helper: &mut CloneHelper,
) -> Result<Option<OORef<dyn RefTarget>>> {
    if flags.contains(PropertyFieldFlags::NEVER_CLONE_TARGET) {
        Ok(target.cloned())
    } else if flags.contains(PropertyFieldFlags::ALWAYS_CLONE) {
        helper.clone_object(target, deep_copy)
    } else if flags.contains(PropertyFieldFlags::ALWAYS_DEEP_COPY) {
        helper.clone_object(target, true)
    } else {
        helper.copy_reference(target, deep_copy)
    }
}
