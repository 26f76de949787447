//! Value trait implementations: constructors, predicates, extractors, From traits

use std::sync::Arc;

use super::*;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Create a vec value
    pub fn vec(items: Vec<Value>) -> Self {
        Value::Vec(Arc::new(items))
    }

    /// Create Some(value)
    pub fn some(value: Value) -> Self {
        Value::Option(Arc::new(Some(value)))
    }

    /// Create None
    pub fn none() -> Self {
        Value::Option(Arc::new(None))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════
    /// Check if value is unit type
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Check if value is boolean
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Check if value is any integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::I32(_) | Value::I64(_) | Value::U32(_) | Value::U64(_) | Value::Usize(_)
        )
    }

    /// Check if value is any float type
    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    /// Check if value is numeric (integer or float)
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Check if value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors (return Option for safe access)
    // ═══════════════════════════════════════════════════════════════════
    /// Extract boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract as i64 (converts from integer types that fit)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(n) => Some(*n as i64),
            Value::I64(n) => Some(*n),
            Value::U32(n) => Some(*n as i64),
            Value::U64(n) => (*n).try_into().ok(),
            Value::Usize(n) => (*n).try_into().ok(),
            _ => None,
        }
    }

    /// Extract as usize (converts from non-negative integer types)
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Value::Usize(n) => Some(*n),
            Value::U32(n) => Some(*n as usize),
            Value::U64(n) => (*n).try_into().ok(),
            Value::I32(n) if *n >= 0 => Some(*n as usize),
            Value::I64(n) if *n >= 0 => (*n).try_into().ok(),
            _ => None,
        }
    }

    /// Extract as f64 (converts from f32)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(n) => Some(*n as f64),
            Value::F64(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract vec as slice
    pub fn as_vec(&self) -> Option<&[Value]> {
        match self {
            Value::Vec(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Trait Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::I64(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::U32(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::U64(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Usize(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::F32(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::F64(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::new(s))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::new(s.to_string()))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Vec(Arc::new(v.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        Value::Option(Arc::new(opt.map(Into::into)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_constructor() {
        let v = Value::string("hello");
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_is_integer() {
        assert!(Value::I32(1).is_integer());
        assert!(Value::Usize(1).is_integer());
        assert!(!Value::F64(1.0).is_integer());
    }

    #[test]
    fn test_as_i64_rejects_overflowing_u64() {
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::U64(7).as_i64(), Some(7));
    }

    #[test]
    fn test_as_usize_rejects_negative() {
        assert_eq!(Value::I32(-1).as_usize(), None);
        assert_eq!(Value::I64(3).as_usize(), Some(3));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(2.5f64)), Value::some(Value::F64(2.5)));
        assert_eq!(Value::from(None::<f64>), Value::none());
    }

    #[test]
    fn test_from_vec() {
        let v = Value::from(vec![1i32, 2, 3]);
        assert_eq!(v.as_vec().map(|s| s.len()), Some(3));
    }
}
