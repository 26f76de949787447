//! Error types for object graph operations

use thiserror::Error;

use crate::value::Value;

/// Main error type for refgraph operations.
///
/// These are the recoverable failures a caller is expected to handle.
/// Contract violations (duplicate field identifiers, corrupt dependents
/// lists, mismatched descriptors) panic instead.
#[derive(Error, Debug)]
pub enum RefGraphError {
    /// Assigning the reference would make the graph cyclic
    #[error("Cyclic reference error: {maker} cannot reference {target}")]
    CyclicReference {
        /// Class of the object holding the reference field
        maker: String,
        /// Class of the object that would have been referenced
        target: String,
    },

    /// The class has no factory and cannot be instantiated for cloning
    #[error("Object of class {class} is not cloneable")]
    NotCloneable {
        /// Class name
        class: String,
    },

    /// A clone override produced an object of the wrong class
    #[error("Clone of class {class} returned an incompatible object of class {got}")]
    InvalidClone {
        /// Class of the source object
        class: String,
        /// Class of the returned object
        got: String,
    },

    /// No field with the given identifier exists in the class or its ancestors
    #[error("Class {class} has no field named '{identifier}'")]
    FieldNotFound {
        /// Class that was searched
        class: String,
        /// Requested identifier
        identifier: String,
    },

    /// Type mismatch between a dynamic value and a property field
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type received
        got: String,
    },

    /// Reference target is not derived from the field's target class
    #[error("Cannot store object of class {got} in reference field '{field}' of type {expected}")]
    IncompatibleTarget {
        /// Field identifier
        field: String,
        /// Target class required by the field
        expected: String,
        /// Class of the offered object
        got: String,
    },

    /// The owning data set has already been released
    #[error("The data set owning this object no longer exists")]
    DataSetReleased,

    /// Malformed serialized object graph
    #[error("Stream error: {0}")]
    Stream(String),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RefGraphError {
    /// Build a type error describing a value that could not be converted.
    pub fn type_mismatch(expected: impl Into<String>, got: &Value) -> Self {
        RefGraphError::TypeError {
            expected: expected.into(),
            got: type_name(got).to_string(),
        }
    }
}

/// Result type alias for refgraph operations
pub type Result<T> = std::result::Result<T, RefGraphError>;

/// Get a human-readable type name for a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Unit => "()",
        Value::Bool(_) => "bool",
        Value::I32(_) => "i32",
        Value::I64(_) => "i64",
        Value::U32(_) => "u32",
        Value::U64(_) => "u64",
        Value::Usize(_) => "usize",
        Value::F32(_) => "f32",
        Value::F64(_) => "f64",
        Value::String(_) => "String",
        Value::Vec(_) => "Vec",
        Value::Option(_) => "Option",
    }
}
