//! Dynamically typed values for generic property access

mod display;
mod float;
mod impls;
mod property;

pub use property::PropertyValue;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Runtime value representation used wherever a property is accessed
/// without knowing its static type.
///
/// Generic accessors on [`RefMaker`](crate::RefMaker), undo records and the
/// object stream all move property contents around as `Value`s. Typed
/// fields convert through [`PropertyValue`].
///
/// Values are organized into two tiers:
/// - Tier 1: Inline primitives (no allocation)
/// - Tier 2: Heap-allocated compound types (Arc-wrapped)
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Tier 1: Inline Primitives
    // ═══════════════════════════════════════════════════════════════════
    /// The unit type `()`
    Unit,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),

    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// Pointer-sized unsigned integer
    Usize(usize),

    /// 32-bit floating point
    F32(#[serde(with = "float::f32_repr")] f32),
    /// 64-bit floating point
    F64(#[serde(with = "float::f64_repr")] f64),

    // ═══════════════════════════════════════════════════════════════════
    // Tier 2: Heap-Allocated Compound Types
    // ═══════════════════════════════════════════════════════════════════
    /// Heap-allocated string
    String(Arc<String>),

    /// Homogeneous list of values
    Vec(Arc<Vec<Value>>),

    /// Optional value
    Option(Arc<Option<Value>>),
}
