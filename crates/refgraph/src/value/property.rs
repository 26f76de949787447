//! Conversion between typed property values and [`Value`]

use std::sync::Arc;

use super::Value;
use crate::error::{RefGraphError, Result};

/// A type that can be stored in a [`PropertyField`](crate::PropertyField).
///
/// Conversion from a [`Value`] only accepts lossless matches. Anything that
/// would truncate or reinterpret the value is reported as a type error.
pub trait PropertyValue: Clone + PartialEq + 'static {
    /// Name used in type error messages
    const TYPE_NAME: &'static str;

    /// Convert into the dynamic representation.
    fn to_value(&self) -> Value;

    /// Convert back from the dynamic representation.
    fn from_value(value: &Value) -> Result<Self>;
}

macro_rules! primitive_property_value {
    ($ty:ty, $name:literal, $($variant:ident => $conv:expr),+) => {
        impl PropertyValue for $ty {
            const TYPE_NAME: &'static str = $name;

            fn to_value(&self) -> Value {
                Value::from(*self)
            }

            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    $(Value::$variant(n) => Ok($conv(*n)),)+
                    other => Err(RefGraphError::type_mismatch($name, other)),
                }
            }
        }
    };
}

primitive_property_value!(bool, "bool", Bool => |b: bool| b);
primitive_property_value!(i32, "i32", I32 => |n: i32| n);
primitive_property_value!(i64, "i64", I64 => |n: i64| n, I32 => |n: i32| n as i64, U32 => |n: u32| n as i64);
primitive_property_value!(u32, "u32", U32 => |n: u32| n);
primitive_property_value!(u64, "u64", U64 => |n: u64| n, U32 => |n: u32| n as u64);
primitive_property_value!(usize, "usize", Usize => |n: usize| n);
primitive_property_value!(f32, "f32", F32 => |n: f32| n);
primitive_property_value!(f64, "f64", F64 => |n: f64| n, F32 => |n: f32| n as f64);

impl PropertyValue for String {
    const TYPE_NAME: &'static str = "String";

    fn to_value(&self) -> Value {
        Value::String(Arc::new(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.as_ref().clone()),
            other => Err(RefGraphError::type_mismatch("String", other)),
        }
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {
    const TYPE_NAME: &'static str = "Vec";

    fn to_value(&self) -> Value {
        Value::vec(self.iter().map(PropertyValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Vec(items) => items.iter().map(T::from_value).collect(),
            other => Err(RefGraphError::type_mismatch("Vec", other)),
        }
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    const TYPE_NAME: &'static str = "Option";

    fn to_value(&self) -> Value {
        Value::Option(Arc::new(self.as_ref().map(PropertyValue::to_value)))
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Option(opt) => opt.as_ref().as_ref().map(T::from_value).transpose(),
            other => Err(RefGraphError::type_mismatch("Option", other)),
        }
    }
}
