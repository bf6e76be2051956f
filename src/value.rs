//! Values produced by controller stages and exposed to renderers.
//!
//! Every stage returns a [`Data`] mapping (ordered, string-keyed). Values nest
//! freely: a hash may hold arrays which hold hashes, and so on.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// An ordered mapping of string keys to values.
pub type Data = IndexMap<String, Value>;

/// A value held in a stage result or in the merged result data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicitly null
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
    /// Array value
    Array(Vec<Value>),
    /// Hash value (ordered)
    Hash(Data),
}

impl Value {
    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
        }
    }

    /// Arrays and hashes are composite; everything else is a scalar.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Hash(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_hash(&self) -> Option<&Data> {
        match self {
            Value::Hash(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up one level down.
    ///
    /// Hashes are indexed by key, arrays by a key that parses as a
    /// non-negative integer. Anything else yields `None`.
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Hash(data) => data.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Walk nested values following `keys` in order.
    ///
    /// Stops at the first key that is absent at the current level and returns
    /// `None`; a missing key and a stored `Null` are not distinguished by callers.
    pub fn lookup<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        keys.iter()
            .try_fold(self, |current, key| current.child(key.as_ref()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, val) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Hash(data) => {
                write!(f, "{{")?;
                for (i, (key, val)) in data.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", key, val)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Hash(data) => {
                let mut map = serializer.serialize_map(Some(data.len()))?;
                for (key, val) in data {
                    map.serialize_entry(key, val)?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Hash(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Value::Hash(data)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nested() -> Value {
        let inner: Data = IndexMap::from([("b".to_string(), Value::from(5))]);
        let list = Value::Array(vec![Value::from("zero"), Value::from("one")]);
        Value::Hash(IndexMap::from([
            ("a".to_string(), Value::Hash(inner)),
            ("list".to_string(), list),
        ]))
    }

    #[test]
    fn test_lookup_nested() {
        assert_eq!(nested().lookup(&["a", "b"]), Some(&Value::Int(5)));
    }

    #[test]
    fn test_lookup_missing_key_short_circuits() {
        assert_eq!(nested().lookup(&["a", "z"]), None);
        assert_eq!(nested().lookup(&["a", "b", "c"]), None);
    }

    #[test]
    fn test_lookup_array_index() {
        assert_eq!(nested().lookup(&["list", "1"]), Some(&Value::from("one")));
        assert_eq!(nested().lookup(&["list", "x"]), None);
    }

    #[test]
    fn test_lookup_no_keys_is_identity() {
        let value = nested();
        let empty: [&str; 0] = [];
        assert_eq!(value.lookup(&empty), Some(&value));
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from("x").to_string(), "x");
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(true).to_string(), "true");
    }

    #[test]
    fn test_serialize_preserves_order() {
        let json = serde_json::to_string(&nested()).unwrap();
        assert_eq!(json, r#"{"a":{"b":5},"list":["zero","one"]}"#);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(serde_json::json!({"n": 1, "f": 1.5, "s": [null]}));
        assert_eq!(value.lookup(&["n"]), Some(&Value::Int(1)));
        assert_eq!(value.lookup(&["f"]), Some(&Value::Float(1.5)));
        assert_eq!(value.lookup(&["s", "0"]), Some(&Value::Null));
    }
}
