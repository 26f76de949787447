//! The reference graph: fields, makers, targets and notifications
//!
//! A [`RefMaker`] owns fields described by static
//! [`PropertyFieldDescriptor`]s. Reference fields point at [`RefTarget`]s,
//! which keep a list of the makers depending on them and broadcast
//! [`ReferenceEvent`]s to that list when something changes.

mod clone_helper;
mod descriptor;
mod event;
mod property_field;
mod ref_maker;
mod ref_target;
mod reference_field;
mod vector_field;

pub use clone_helper::CloneHelper;
pub use descriptor::{
    owner_cast, FieldKind, PropertyAccessFn, PropertyFieldDescriptor, PropertyFieldFlags,
    SingleAccessFn, VectorAccessFn,
};
pub use event::{ReferenceEvent, ReferenceEventType};
pub use property_field::{PropertyField, PropertyFieldBase};
pub use ref_maker::{RefMaker, RefMakerExt};
pub use ref_target::{clone_fields, RefTarget, RefTargetExt};
pub use reference_field::{ReferenceField, SingleReferenceFieldBase};
pub use vector_field::{VectorReferenceField, VectorReferenceFieldBase};
