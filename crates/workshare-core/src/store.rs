//! Store - the replicated key/value mapping
//!
//! One `Store` lives on the hub (authoritative) and one in every worker (a
//! replica). The store itself is plain data: it does not know about
//! replication. Interception happens in the hub and replica wrappers that
//! own it.

use crate::key::Key;
use crate::value::{Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A mapping from [`Key`] to [`Value`]
///
/// Iteration follows insertion order, but equality does not: two stores are
/// equal when they hold the same entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: IndexMap<Key, Value>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under a key
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        self.entries.get(&key.into())
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, returning its value
    ///
    /// Removing a missing key is a no-op.
    pub fn remove(&mut self, key: impl Into<Key>) -> Option<Value> {
        self.entries.shift_remove(&key.into())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    /// Convert into a map value (keys rendered as strings)
    ///
    /// Handy for shipping a whole store as an application message.
    pub fn to_value(&self) -> Value {
        let map: ValueMap = self
            .entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::Map(map)
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Store {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut store = Store::new();
        assert!(store.is_empty());

        assert_eq!(store.insert("value", 4), None);
        assert_eq!(store.get("value"), Some(&Value::Int(4)));
        assert_eq!(store.insert("value", "England"), Some(Value::Int(4)));

        assert_eq!(store.remove("value"), Some(Value::from("England")));
        assert_eq!(store.remove("value"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_integer_and_string_keys_alias() {
        let mut store = Store::new();
        store.insert(1, "one");
        assert_eq!(store.get("1"), Some(&Value::from("one")));
        assert!(store.contains_key(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: Store = [("x", 1), ("y", 2)].into_iter().collect();
        let b: Store = [("y", 2), ("x", 1)].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_json_round_trip_keeps_integer_keys() {
        let store: Store = [(Key::from(7), Value::from("seven")), (Key::from("k"), Value::Null)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"7":"seven","k":null}"#);

        let back: Store = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
        assert!(back.keys().any(|k| *k == Key::Int(7)));
    }

    #[test]
    fn test_to_value() {
        let store: Store = [("a", 1)].into_iter().collect();
        let value = store.to_value();
        assert_eq!(value.as_map().and_then(|m| m.get("a")), Some(&Value::Int(1)));
    }
}
