//! # Refgraph
//!
//! A reference graph engine for document object models.
//!
//! Objects declare named fields through static descriptors: plain
//! properties, or references to other objects. The engine tracks which
//! objects depend on which, forwards change notifications along those
//! dependencies, records field changes for undo/redo, clones sub-graphs
//! while preserving shared structure, and saves graphs to JSON.
//!
//! ## Architecture
//!
//! - **Handles**: [`OORef`] strong handles; reverse edges are weak
//! - **Classes**: a static [`ObjectType`] per class lists its [`PropertyFieldDescriptor`]s
//! - **Fields**: [`PropertyField`], [`ReferenceField`], [`VectorReferenceField`]
//! - **Graph nodes**: [`RefMaker`] owns fields, [`RefTarget`] can be referenced
//! - **Undo**: the [`DataSet`]'s [`UndoStack`] records field changes
//! - **Streams**: [`ObjectSaveStream`] / [`ObjectLoadStream`]
//!
//! The graph is single-threaded: objects are `Rc`-allocated and use
//! interior mutability.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod object;
pub mod reference;
pub mod stream;
pub mod undo;
pub mod value;

// Re-export main types
pub use context::{DataSet, DataSetConfig};
pub use error::{RefGraphError, Result};
pub use object::{
    DependentsList, FactoryFn, OORef, ObjectBase, ObjectClass, ObjectCore, ObjectId, ObjectType,
    WeakRef, REF_MAKER_TYPE, REF_TARGET_TYPE,
};
pub use reference::{
    clone_fields, owner_cast, CloneHelper, FieldKind, PropertyField, PropertyFieldBase,
    PropertyFieldDescriptor, PropertyFieldFlags, RefMaker, RefMakerExt, RefTarget, RefTargetExt,
    ReferenceEvent, ReferenceEventType, ReferenceField, SingleReferenceFieldBase,
    VectorReferenceField, VectorReferenceFieldBase,
};
pub use stream::{
    ObjectLoadStream, ObjectSaveStream, SerializedGraph, SerializedObject, SerializedReference,
};
pub use undo::{
    CompoundOperation, SimpleValueChangeOperation, TargetChangedRedoOperation,
    TargetChangedUndoOperation, UndoStack, UndoSuspender, UndoableOperation, UndoableTransaction,
};
pub use value::{PropertyValue, Value};

/// Refgraph version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
