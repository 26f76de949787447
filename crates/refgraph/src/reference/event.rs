//! Notification events sent from targets to their dependents

use std::fmt;

use super::descriptor::PropertyFieldDescriptor;
use super::ref_target::RefTarget;
use crate::object::OORef;

/// Kind of a [`ReferenceEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceEventType {
    /// The sender's state changed
    TargetChanged,
    /// The sender is being deleted; dependents drop their references to it
    TargetDeleted,
    /// A single reference field of the sender was reassigned
    ReferenceChanged,
    /// A target was inserted into a vector reference field of the sender
    ReferenceAdded,
    /// A target was removed from a vector reference field of the sender
    ReferenceRemoved,
    /// The sender's display title changed
    TitleChanged,
    /// Application-defined event kind
    Custom(u32),
}

impl ReferenceEventType {
    /// Whether this kind carries field information.
    pub fn is_reference_field_event(self) -> bool {
        matches!(
            self,
            Self::ReferenceChanged | Self::ReferenceAdded | Self::ReferenceRemoved
        )
    }
}

/// A notification broadcast by a target to its dependents.
///
/// Events are passed up the dependency chain unchanged: the sender stays
/// the object that originally raised the event, while the `source` argument
/// of [`RefMaker::reference_event`](super::RefMaker::reference_event) is the
/// immediate target the recipient references.
#[derive(Clone)]
pub struct ReferenceEvent {
    kind: ReferenceEventType,
    sender: OORef<dyn RefTarget>,
    field: Option<&'static PropertyFieldDescriptor>,
    old_target: Option<OORef<dyn RefTarget>>,
    new_target: Option<OORef<dyn RefTarget>>,
    index: Option<usize>,
}

impl ReferenceEvent {
    /// Create a plain event.
    pub fn new(kind: ReferenceEventType, sender: OORef<dyn RefTarget>) -> Self {
        Self {
            kind,
            sender,
            field: None,
            old_target: None,
            new_target: None,
            index: None,
        }
    }

    /// Create an event describing a change to one of the sender's reference fields.
    pub fn reference_field(
        kind: ReferenceEventType,
        sender: OORef<dyn RefTarget>,
        field: &'static PropertyFieldDescriptor,
        old_target: Option<OORef<dyn RefTarget>>,
        new_target: Option<OORef<dyn RefTarget>>,
        index: Option<usize>,
    ) -> Self {
        debug_assert!(kind.is_reference_field_event());
        Self {
            kind,
            sender,
            field: Some(field),
            old_target,
            new_target,
            index,
        }
    }

    /// Event kind
    pub fn kind(&self) -> ReferenceEventType {
        self.kind
    }

    /// Object that raised the event
    pub fn sender(&self) -> &OORef<dyn RefTarget> {
        &self.sender
    }

    /// Reference field that changed
    pub fn field(&self) -> Option<&'static PropertyFieldDescriptor> {
        self.field
    }

    /// Previous target of the changed field
    pub fn old_target(&self) -> Option<&OORef<dyn RefTarget>> {
        self.old_target.as_ref()
    }

    /// New target of the changed field
    pub fn new_target(&self) -> Option<&OORef<dyn RefTarget>> {
        self.new_target.as_ref()
    }

    /// Position within a vector reference field
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl fmt::Debug for ReferenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ReferenceEvent");
        s.field("kind", &self.kind)
            .field("sender", &self.sender.oo_type().name());
        if let Some(field) = self.field {
            s.field("field", &field.identifier());
        }
        if let Some(index) = self.index {
            s.field("index", &index);
        }
        s.finish()
    }
}
