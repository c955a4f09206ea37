//! Dynamic value type stored in object stores.

use serde::{Deserialize, Serialize};

/// A handle to a large binary object held outside the record payload.
///
/// Blob handles travel with the serialized value but the blob bytes
/// themselves are managed by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle(pub u64);

impl BlobHandle {
    /// Creates a new blob handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// A dynamic value as handed to the store by the host environment.
///
/// This is the record payload domain: anything structured out of the
/// variants below can be stored. `Blob` carries a reference to externally
/// managed binary data; `External` is an opaque host-object handle that can
/// never be cloned into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// A timestamp, in milliseconds since the epoch.
    Date(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of string keys to values.
    Map(Vec<(String, Value)>),
    /// Reference to an externally managed blob.
    Blob(BlobHandle),
    /// An opaque host-object handle. Not cloneable.
    External(u64),
}

impl Value {
    /// Looks up an entry in a map value.
    ///
    /// Returns `None` for non-map values and missing entries.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Looks up an entry in a map value mutably.
    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter_mut()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Sets an entry in a map value, replacing any existing entry.
    ///
    /// Does nothing for non-map values.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Value::Map(pairs) = self {
            if let Some(entry) = pairs.iter_mut().find(|(k, _)| k == name) {
                entry.1 = value;
            } else {
                pairs.push((name.to_string(), value));
            }
        }
    }

    /// Returns true if this value is a map.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true if any value in this graph references a blob.
    #[must_use]
    pub fn references_blobs(&self) -> bool {
        match self {
            Value::Blob(_) => true,
            Value::Array(items) => items.iter().any(Value::references_blobs),
            Value::Map(pairs) => pairs.iter().any(|(_, v)| v.references_blobs()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, age: f64) -> Value {
        Value::Map(vec![
            ("name".to_string(), Value::Text(name.to_string())),
            ("age".to_string(), Value::Number(age)),
        ])
    }

    #[test]
    fn get_finds_map_entry() {
        let value = user("Ada", 36.0);
        assert_eq!(value.get("name"), Some(&Value::Text("Ada".to_string())));
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn get_on_non_map_is_none() {
        assert_eq!(Value::Number(1.0).get("anything"), None);
    }

    #[test]
    fn set_replaces_existing_entry() {
        let mut value = user("Ada", 36.0);
        value.set("age", Value::Number(37.0));
        assert_eq!(value.get("age"), Some(&Value::Number(37.0)));
    }

    #[test]
    fn set_appends_new_entry() {
        let mut value = user("Ada", 36.0);
        value.set("email", Value::Text("ada@example.com".to_string()));
        assert!(value.get("email").is_some());
    }

    #[test]
    fn blob_references_are_found_in_nested_values() {
        let value = Value::Map(vec![(
            "attachments".to_string(),
            Value::Array(vec![Value::Blob(BlobHandle::new(7))]),
        )]);
        assert!(value.references_blobs());
        assert!(!user("Ada", 36.0).references_blobs());
    }
}
