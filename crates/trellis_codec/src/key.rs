//! Record keys and their total ordering.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A record key.
///
/// Keys are drawn from a restricted type domain and are totally ordered
/// with type-class precedence: numbers sort before dates, dates before
/// strings, strings before binary, binary before arrays. Arrays compare
/// element by element, then by length.
///
/// `Invalid` is an explicit variant rather than an error so that key
/// conversion never fails: value shapes outside the key domain convert to
/// an invalid key, and every operation entry point rejects invalid keys
/// before they participate in any comparison. For container use, `Invalid`
/// sorts below every valid key, keeping the ordering total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Key {
    /// A value that is not a key.
    Invalid,
    /// Numeric key.
    Number(f64),
    /// Date key, in milliseconds since the epoch.
    Date(f64),
    /// String key, compared by code point.
    String(String),
    /// Binary key, compared bytewise.
    Binary(Vec<u8>),
    /// Array key, compared recursively.
    Array(Vec<Key>),
}

impl Key {
    /// Converts a dynamic value to a key.
    ///
    /// This never fails: value shapes outside the key domain (including
    /// array elements outside it) yield `Key::Invalid` or an array
    /// containing it, which `is_valid` reports as invalid.
    #[must_use]
    pub fn from_value(value: &Value) -> Key {
        match value {
            Value::Number(n) => Key::Number(*n),
            Value::Date(d) => Key::Date(*d),
            Value::Text(s) => Key::String(s.clone()),
            Value::Bytes(b) => Key::Binary(b.clone()),
            Value::Array(items) => Key::Array(items.iter().map(Key::from_value).collect()),
            _ => Key::Invalid,
        }
    }

    /// Converts this key back to a dynamic value.
    ///
    /// Used when a generated key is injected into a stored value. Invalid
    /// keys convert to `Value::Null`; callers validate before converting.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Key::Invalid => Value::Null,
            Key::Number(n) => Value::Number(*n),
            Key::Date(d) => Value::Date(*d),
            Key::String(s) => Value::Text(s.clone()),
            Key::Binary(b) => Value::Bytes(b.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_value).collect()),
        }
    }

    /// Returns true if this key may participate in store operations.
    ///
    /// NaN numbers and dates are invalid; an array is valid only if every
    /// element is.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Key::Invalid => false,
            Key::Number(n) | Key::Date(n) => !n.is_nan(),
            Key::String(_) | Key::Binary(_) => true,
            Key::Array(items) => items.iter().all(Key::is_valid),
        }
    }

    /// Rank used for type-class precedence in the total ordering.
    fn type_rank(&self) -> u8 {
        match self {
            Key::Invalid => 0,
            Key::Number(_) => 1,
            Key::Date(_) => 2,
            Key::String(_) => 3,
            Key::Binary(_) => 4,
            Key::Array(_) => 5,
        }
    }

    /// Compares two keys.
    ///
    /// The ordering is total over valid keys: type-class precedence first,
    /// then value comparison within a class. NaN payloads never reach this
    /// comparison because invalid keys are rejected at entry points; if one
    /// slips through in a container it sorts low deterministically.
    #[must_use]
    pub fn compare(&self, other: &Key) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Key::Invalid, Key::Invalid) => Ordering::Equal,
            (Key::Number(a), Key::Number(b)) | (Key::Date(a), Key::Date(b)) => {
                if a == b {
                    Ordering::Equal
                } else if a > b {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => unreachable!("type ranks matched but variants differ"),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}
