//! Snapshot - the serialized store handed to a worker at spawn time
//!
//! A worker sees the store exactly once as a snapshot, taken at the moment it
//! is hired. Everything after that reaches it as messages; there are no
//! retroactive snapshots.
//!
//! # Known Limitation
//!
//! Values with no JSON form (NaN, ±infinity) are written as `null`. The spawn
//! goes ahead and the worker starts with `Value::Null` in their place; the
//! hub keeps the original value until it is overwritten.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Immutable, serialized copy of a store plus the hire-time input payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Store contents as a JSON object
    store: String,
    /// Opaque payload forwarded to the worker
    input: Option<Value>,
}

impl Snapshot {
    /// Capture a snapshot of `store`
    ///
    /// Never fails: unrepresentable values become `null`.
    pub fn capture(store: &Store, input: Option<Value>) -> Self {
        let unrepresentable = store
            .iter()
            .filter(|(_, value)| !value.is_representable())
            .count();
        if unrepresentable > 0 {
            warn!(
                count = unrepresentable,
                "snapshot contains non-finite floats, they will arrive as null"
            );
        }

        let store = match serde_json::to_string(store) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize store, worker starts empty");
                "{}".to_string()
            }
        };

        let input = input.map(|value| {
            if value.is_representable() {
                value
            } else {
                warn!("hire input contains non-finite floats, it will arrive as null");
                reencode(&value)
            }
        });

        Self { store, input }
    }

    /// Rebuild the store this snapshot was taken from
    pub fn restore(&self) -> Result<Store> {
        serde_json::from_str(&self.store).map_err(|e| Error::Snapshot(e.to_string()))
    }

    /// The hire-time input payload
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    /// The serialized store
    pub fn as_str(&self) -> &str {
        &self.store
    }
}

/// Push a value through JSON so it matches what a receiver would see
fn reencode(value: &Value) -> Value {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_restore() {
        let store: Store = [("value", Value::Int(4)), ("name", Value::from("hub"))]
            .into_iter()
            .collect();
        let snapshot = Snapshot::capture(&store, Some("Hello".into()));

        assert_eq!(snapshot.restore().unwrap(), store);
        assert_eq!(snapshot.input(), Some(&Value::from("Hello")));
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut store: Store = [("value", 4)].into_iter().collect();
        let snapshot = Snapshot::capture(&store, None);

        store.insert("value", 5);
        assert_eq!(snapshot.restore().unwrap().get("value"), Some(&Value::Int(4)));
        assert_eq!(snapshot.input(), None);
    }

    #[test]
    fn test_non_finite_floats_become_null() {
        let store: Store = [
            ("bad", Value::Float(f64::NAN)),
            ("nested", Value::from(vec![Value::Float(f64::INFINITY), Value::Int(1)])),
        ]
        .into_iter()
        .collect();
        let snapshot = Snapshot::capture(&store, Some(Value::Float(f64::NEG_INFINITY)));

        let restored = snapshot.restore().unwrap();
        assert_eq!(restored.get("bad"), Some(&Value::Null));
        assert_eq!(
            restored.get("nested"),
            Some(&Value::from(vec![Value::Null, Value::Int(1)]))
        );
        assert_eq!(snapshot.input(), Some(&Value::Null));
    }

    #[test]
    fn test_empty_store() {
        let snapshot = Snapshot::capture(&Store::new(), None);
        assert_eq!(snapshot.as_str(), "{}");
        assert!(snapshot.restore().unwrap().is_empty());
    }
}
