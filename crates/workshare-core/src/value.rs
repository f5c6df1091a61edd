//! Dynamic value types for replicated data

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamic value that can be stored under a key and sent over a channel
///
/// Serializes as plain JSON (`null`, `true`, `4`, `"England"`, `[..]`,
/// `{..}`), which is also the form it takes inside snapshots and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// List of values
    List(Vec<Value>),
    /// Map of string keys to values
    Map(ValueMap),
}

/// A map of string keys to dynamic values
///
/// Uses IndexMap to preserve insertion order (useful for deterministic serialization)
pub type ValueMap = IndexMap<String, Value>;

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get this value as a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Check whether this value survives serialization unchanged
    ///
    /// NaN and the infinities have no JSON form and come out as `null`.
    pub fn is_representable(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(list) => list.iter().all(Value::is_representable),
            Value::Map(map) => map.values().all(Value::is_representable),
            _ => true,
        }
    }
}

/// Compact JSON, the same text a value has on the wire
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! int_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(i: $ty) -> Self {
                    Value::Int(i64::from(i))
                }
            }
        )*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Self {
        Value::List(vec.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(2.5).as_float(), Some(2.5));
        assert_eq!(Value::Int(42).as_float(), Some(42.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
    }

    #[test]
    fn test_value_json_is_untagged() {
        let mut map = ValueMap::new();
        map.insert("a".into(), Value::Int(1));
        map.insert("b".into(), vec!["x", "y"].into());
        let value = Value::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"a":1,"b":["x","y"]}"#);

        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_value_json_number_kinds() {
        assert_eq!(serde_json::from_str::<Value>("4").unwrap(), Value::Int(4));
        assert_eq!(serde_json::from_str::<Value>("4.5").unwrap(), Value::Float(4.5));
        assert_eq!(serde_json::from_str::<Value>("null").unwrap(), Value::Null);
    }

    #[test]
    fn test_non_finite_floats_are_not_representable() {
        assert!(Value::Float(1.0).is_representable());
        assert!(!Value::Float(f64::NAN).is_representable());
        assert!(!Value::from(vec![Value::Float(f64::INFINITY)]).is_representable());

        // serde_json writes them as null
        assert_eq!(serde_json::to_string(&Value::Float(f64::NAN)).unwrap(), "null");
    }

    #[test]
    fn test_display_is_json() {
        let mut map = ValueMap::new();
        map.insert("value".into(), "England".into());
        map.insert("n".into(), vec![1, 2].into());
        assert_eq!(Value::Map(map).to_string(), r#"{"value":"England","n":[1,2]}"#);
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "null");
    }

    #[test]
    fn test_value_from() {
        let _: Value = true.into();
        let _: Value = 42i64.into();
        assert_eq!(Value::from(7u8), Value::Int(7));
        let _: Value = 3.5f64.into();
        let _: Value = "hello".into();
        let _: Value = vec![1i64, 2, 3].into();
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
