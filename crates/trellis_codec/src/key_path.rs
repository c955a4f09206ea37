//! Key paths: extracting and injecting in-line keys.

use crate::key::Key;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A path expression used to locate the key inside a stored value.
///
/// A single path is a dotted sequence of identifier components; the empty
/// path designates the value itself. An array path yields an array key
/// built from each member path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPath {
    /// One path expression.
    Single(String),
    /// A sequence of path expressions producing an array key.
    Array(Vec<String>),
}

impl KeyPath {
    /// Returns true if this key path is syntactically well formed.
    ///
    /// Array paths must be non-empty and each member must itself be a
    /// non-empty well-formed path.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            KeyPath::Single(path) => path.is_empty() || is_valid_path(path),
            KeyPath::Array(paths) => {
                !paths.is_empty() && paths.iter().all(|p| is_valid_path(p))
            }
        }
    }

    /// Evaluates this key path against a value.
    ///
    /// Returns `None` when the path does not yield anything. A yielded key
    /// may still be invalid; the caller decides how to surface that.
    #[must_use]
    pub fn extract(&self, value: &Value) -> Option<Key> {
        match self {
            KeyPath::Single(path) => extract_single(path, value).map(|v| Key::from_value(v)),
            KeyPath::Array(paths) => {
                let mut keys = Vec::with_capacity(paths.len());
                for path in paths {
                    keys.push(Key::from_value(extract_single(path, value)?));
                }
                Some(Key::Array(keys))
            }
        }
    }

    /// Returns true if a generated key could be injected at this path.
    ///
    /// Injection requires a single non-empty path whose existing prefix
    /// components all resolve to maps; missing trailing components would be
    /// created on injection.
    #[must_use]
    pub fn can_inject(&self, value: &Value) -> bool {
        let KeyPath::Single(path) = self else {
            return false;
        };
        if path.is_empty() || !value.is_map() {
            return false;
        }

        // Every prefix component that already exists must be a map; the
        // final slot itself may hold anything since injection overwrites it.
        let components: Vec<&str> = path.split('.').collect();
        let mut current = value;
        for component in &components[..components.len() - 1] {
            match current.get(component) {
                Some(next) if next.is_map() => current = next,
                Some(_) => return false,
                None => return true,
            }
        }
        true
    }

    /// Injects a key at this path, creating intermediate maps as needed.
    ///
    /// Returns false (leaving the value untouched at the failing depth)
    /// when injection is not possible; callers are expected to have checked
    /// `can_inject` first.
    pub fn inject(&self, value: &mut Value, key: &Key) -> bool {
        let KeyPath::Single(path) = self else {
            return false;
        };
        if path.is_empty() || !value.is_map() {
            return false;
        }

        let components: Vec<&str> = path.split('.').collect();
        let mut current = value;
        for component in &components[..components.len() - 1] {
            if current.get(component).is_none() {
                current.set(component, Value::Map(Vec::new()));
            }
            match current.get_mut(component) {
                Some(next) if next.is_map() => current = next,
                _ => return false,
            }
        }

        let last = components[components.len() - 1];
        current.set(last, key.to_value());
        true
    }
}

/// Checks one dotted path: every component must be a non-empty identifier.
fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_valid_component)
}

fn is_valid_component(component: &str) -> bool {
    let mut chars = component.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Walks a single dotted path through nested maps.
fn extract_single<'a>(path: &str, value: &'a Value) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for component in path.split('.') {
        current = current.get(component)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        Value::Map(vec![
            ("id".to_string(), Value::Number(7.0)),
            (
                "meta".to_string(),
                Value::Map(vec![("tag".to_string(), Value::Text("a".to_string()))]),
            ),
        ])
    }

    #[test]
    fn single_path_extracts_nested_key() {
        let path = KeyPath::Single("meta.tag".to_string());
        assert_eq!(path.extract(&record()), Some(Key::String("a".to_string())));
    }

    #[test]
    fn empty_path_extracts_the_value_itself() {
        let path = KeyPath::Single(String::new());
        assert_eq!(
            path.extract(&Value::Number(3.0)),
            Some(Key::Number(3.0))
        );
    }

    #[test]
    fn missing_component_yields_nothing() {
        let path = KeyPath::Single("missing".to_string());
        assert_eq!(path.extract(&record()), None);
    }

    #[test]
    fn extraction_can_yield_an_invalid_key() {
        let path = KeyPath::Single("meta".to_string());
        let key = path.extract(&record()).unwrap();
        assert!(!key.is_valid());
    }

    #[test]
    fn array_path_builds_array_key() {
        let path = KeyPath::Array(vec!["id".to_string(), "meta.tag".to_string()]);
        assert_eq!(
            path.extract(&record()),
            Some(Key::Array(vec![
                Key::Number(7.0),
                Key::String("a".to_string())
            ]))
        );
    }

    #[test]
    fn array_path_with_missing_member_yields_nothing() {
        let path = KeyPath::Array(vec!["id".to_string(), "gone".to_string()]);
        assert_eq!(path.extract(&record()), None);
    }

    #[test]
    fn path_syntax_validation() {
        assert!(KeyPath::Single("a.b.c".to_string()).is_valid());
        assert!(KeyPath::Single(String::new()).is_valid());
        assert!(KeyPath::Single("$id".to_string()).is_valid());
        assert!(!KeyPath::Single("a..b".to_string()).is_valid());
        assert!(!KeyPath::Single("1a".to_string()).is_valid());
        assert!(!KeyPath::Single(".a".to_string()).is_valid());
        assert!(!KeyPath::Array(vec![]).is_valid());
        assert!(!KeyPath::Array(vec![String::new()]).is_valid());
    }

    #[test]
    fn inject_creates_missing_slot() {
        let path = KeyPath::Single("id".to_string());
        let mut value = Value::Map(vec![]);
        assert!(path.can_inject(&value));
        assert!(path.inject(&mut value, &Key::Number(1.0)));
        assert_eq!(value.get("id"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn inject_creates_intermediate_maps() {
        let path = KeyPath::Single("meta.id".to_string());
        let mut value = Value::Map(vec![]);
        assert!(path.can_inject(&value));
        assert!(path.inject(&mut value, &Key::Number(2.0)));
        assert_eq!(
            value.get("meta").and_then(|m| m.get("id")),
            Some(&Value::Number(2.0))
        );
    }

    #[test]
    fn cannot_inject_into_non_map() {
        let path = KeyPath::Single("id".to_string());
        assert!(!path.can_inject(&Value::Number(1.0)));
    }

    #[test]
    fn cannot_inject_through_non_map_component() {
        let path = KeyPath::Single("id.inner".to_string());
        let value = Value::Map(vec![("id".to_string(), Value::Number(1.0))]);
        assert!(!path.can_inject(&value));
        let mut value = value;
        assert!(!path.inject(&mut value, &Key::Number(2.0)));
    }

    #[test]
    fn cannot_inject_via_array_path() {
        let path = KeyPath::Array(vec!["a".to_string()]);
        assert!(!path.can_inject(&Value::Map(vec![])));
    }
}
