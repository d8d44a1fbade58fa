//! Dynamically typed runtime values
//!
//! Residual overload resolution happens at invocation time, against the
//! concrete types of the actual arguments. A [`Value`] therefore carries
//! the [`TypeKey`] of its runtime type next to its payload; dispatch only
//! ever inspects the key.

use crate::types::TypeKey;

/// Payload carried by a runtime value
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// No payload
    Unit,
    /// Boolean payload
    Bool(bool),
    /// Integer payload
    Int(i64),
    /// Floating point payload
    Float(f64),
    /// String payload
    Str(String),
    /// Array payload (also the shape of a packed varargs list)
    Array(Vec<Value>),
}

/// A runtime value: a payload tagged with the key of its runtime type
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    ty: TypeKey,
    payload: Payload,
}

impl Value {
    /// Create a value of the given runtime type
    pub fn new(ty: TypeKey, payload: Payload) -> Self {
        Self { ty, payload }
    }

    /// Create a unit value
    pub fn unit(ty: TypeKey) -> Self {
        Self::new(ty, Payload::Unit)
    }

    /// Create an integer value
    pub fn int(ty: TypeKey, value: i64) -> Self {
        Self::new(ty, Payload::Int(value))
    }

    /// Create a string value
    pub fn str(ty: TypeKey, value: impl Into<String>) -> Self {
        Self::new(ty, Payload::Str(value.into()))
    }

    /// Create an array value over the given element type; the value's own
    /// type is the element type's array type
    pub fn array(elem: &TypeKey, items: Vec<Value>) -> Self {
        Self::new(elem.array_of(), Payload::Array(items))
    }

    /// Key of this value's runtime type
    pub fn type_key(&self) -> &TypeKey {
        &self.ty
    }

    /// The raw payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Extract an integer payload
    pub fn as_int(&self) -> Option<i64> {
        match &self.payload {
            Payload::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Extract a string payload
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Extract an array payload
    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::Array(items) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::LoaderScope;

    #[test]
    fn test_value_accessors() {
        let scope = LoaderScope::bootstrap();
        let int = TypeKey::new("int", &scope);
        let string = TypeKey::new("String", &scope);

        let v = Value::int(int.clone(), 42);
        assert_eq!(v.type_key(), &int);
        assert_eq!(v.as_int(), Some(42));
        assert_eq!(v.as_str(), None);

        let s = Value::str(string.clone(), "hello");
        assert_eq!(s.as_str(), Some("hello"));
        assert_eq!(s.type_key(), &string);
    }

    #[test]
    fn test_array_value_type() {
        let scope = LoaderScope::bootstrap();
        let int = TypeKey::new("int", &scope);

        let arr = Value::array(&int, vec![Value::int(int.clone(), 1), Value::int(int.clone(), 2)]);
        assert_eq!(arr.type_key(), &int.array_of());
        assert_eq!(arr.as_array().map(<[Value]>::len), Some(2));
    }
}
