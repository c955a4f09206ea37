//! Key ranges over the record key ordering.

use crate::error::{ClientError, ClientResult};
use std::ops::Bound;
use trellis_codec::Key;

/// An immutable interval over the key ordering.
///
/// Ranges are validated at construction: invalid keys, inverted bounds,
/// and degenerate (empty) ranges are rejected with a data error, so a
/// constructed range is always usable. Missing bounds leave the range
/// unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    /// Creates a range containing exactly one key.
    ///
    /// # Errors
    ///
    /// Fails with a data error if the key is invalid.
    pub fn only(key: Key) -> ClientResult<KeyRange> {
        if !key.is_valid() {
            return Err(ClientError::data("the parameter is not a valid key"));
        }
        Ok(KeyRange {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        })
    }

    /// Creates a range bounded below, unbounded above.
    ///
    /// # Errors
    ///
    /// Fails with a data error if the key is invalid.
    pub fn lower_bound(key: Key, open: bool) -> ClientResult<KeyRange> {
        if !key.is_valid() {
            return Err(ClientError::data("the lower key is not a valid key"));
        }
        Ok(KeyRange {
            lower: Some(key),
            upper: None,
            lower_open: open,
            upper_open: false,
        })
    }

    /// Creates a range bounded above, unbounded below.
    ///
    /// # Errors
    ///
    /// Fails with a data error if the key is invalid.
    pub fn upper_bound(key: Key, open: bool) -> ClientResult<KeyRange> {
        if !key.is_valid() {
            return Err(ClientError::data("the upper key is not a valid key"));
        }
        Ok(KeyRange {
            lower: None,
            upper: Some(key),
            lower_open: false,
            upper_open: open,
        })
    }

    /// Creates a range bounded on both sides.
    ///
    /// # Errors
    ///
    /// Fails with a data error if either key is invalid, if the upper key
    /// is less than the lower key, or if the keys are equal while either
    /// end is open (an empty range).
    pub fn bound(lower: Key, upper: Key, lower_open: bool, upper_open: bool) -> ClientResult<KeyRange> {
        if !lower.is_valid() || !upper.is_valid() {
            return Err(ClientError::data("the parameter is not a valid key"));
        }
        if upper < lower {
            return Err(ClientError::data(
                "the lower key is greater than the upper key",
            ));
        }
        if lower == upper && (lower_open || upper_open) {
            return Err(ClientError::data(
                "the range is empty: equal keys with an open bound",
            ));
        }
        Ok(KeyRange {
            lower: Some(lower),
            upper: Some(upper),
            lower_open,
            upper_open,
        })
    }

    /// The unbounded range covering all keys.
    #[must_use]
    pub fn all() -> KeyRange {
        KeyRange {
            lower: None,
            upper: None,
            lower_open: false,
            upper_open: false,
        }
    }

    /// Returns the lower bound, if any.
    #[must_use]
    pub fn lower(&self) -> Option<&Key> {
        self.lower.as_ref()
    }

    /// Returns the upper bound, if any.
    #[must_use]
    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    /// Returns true if the lower bound is exclusive.
    #[must_use]
    pub fn lower_open(&self) -> bool {
        self.lower_open
    }

    /// Returns true if the upper bound is exclusive.
    #[must_use]
    pub fn upper_open(&self) -> bool {
        self.upper_open
    }

    /// Returns true if this range designates exactly one key.
    #[must_use]
    pub fn is_only_key(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => {
                !self.lower_open && !self.upper_open && lower == upper
            }
            _ => false,
        }
    }

    /// Returns true if the key falls inside this range.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            if key < lower || (self.lower_open && key == lower) {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if key > upper || (self.upper_open && key == upper) {
                return false;
            }
        }
        true
    }

    /// Converts this range into bounds usable with ordered containers.
    #[must_use]
    pub fn bounds(&self) -> (Bound<Key>, Bound<Key>) {
        let lower = match (&self.lower, self.lower_open) {
            (None, _) => Bound::Unbounded,
            (Some(key), true) => Bound::Excluded(key.clone()),
            (Some(key), false) => Bound::Included(key.clone()),
        };
        let upper = match (&self.upper, self.upper_open) {
            (None, _) => Bound::Unbounded,
            (Some(key), true) => Bound::Excluded(key.clone()),
            (Some(key), false) => Bound::Included(key.clone()),
        };
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Key {
        Key::Number(n)
    }

    #[test]
    fn only_is_a_closed_single_key_range() {
        let range = KeyRange::only(num(5.0)).unwrap();
        assert!(range.is_only_key());
        assert!(range.contains(&num(5.0)));
        assert!(!range.contains(&num(5.1)));
    }

    #[test]
    fn only_rejects_invalid_keys() {
        assert!(KeyRange::only(Key::Invalid).is_err());
        assert!(KeyRange::only(num(f64::NAN)).is_err());
    }

    #[test]
    fn bound_rejects_inverted_ranges() {
        for (lo, uo) in [(false, false), (true, false), (false, true), (true, true)] {
            let result = KeyRange::bound(num(10.0), num(1.0), lo, uo);
            assert!(matches!(result, Err(ClientError::Data { .. })));
        }
    }

    #[test]
    fn bound_rejects_empty_equal_key_ranges() {
        assert!(KeyRange::bound(num(3.0), num(3.0), true, false).is_err());
        assert!(KeyRange::bound(num(3.0), num(3.0), false, true).is_err());
        assert!(KeyRange::bound(num(3.0), num(3.0), true, true).is_err());

        let closed = KeyRange::bound(num(3.0), num(3.0), false, false).unwrap();
        assert!(closed.is_only_key());
    }

    #[test]
    fn bound_rejects_invalid_keys() {
        assert!(KeyRange::bound(Key::Invalid, num(1.0), false, false).is_err());
        assert!(KeyRange::bound(num(1.0), Key::Invalid, false, false).is_err());
    }

    #[test]
    fn open_bounds_exclude_their_endpoints() {
        let range = KeyRange::bound(num(1.0), num(5.0), true, true).unwrap();
        assert!(!range.contains(&num(1.0)));
        assert!(range.contains(&num(2.0)));
        assert!(!range.contains(&num(5.0)));
    }

    #[test]
    fn half_bounded_ranges() {
        let lower = KeyRange::lower_bound(num(10.0), false).unwrap();
        assert!(lower.contains(&num(10.0)));
        assert!(lower.contains(&num(1e9)));
        assert!(!lower.contains(&num(9.9)));
        assert!(!lower.is_only_key());

        let upper = KeyRange::upper_bound(num(10.0), true).unwrap();
        assert!(upper.contains(&num(-1e9)));
        assert!(!upper.contains(&num(10.0)));
    }

    #[test]
    fn all_contains_every_key_type() {
        let range = KeyRange::all();
        assert!(range.contains(&num(0.0)));
        assert!(range.contains(&Key::String("z".into())));
        assert!(range.contains(&Key::Array(vec![])));
        assert!(!range.is_only_key());
    }

    #[test]
    fn bounds_reflect_openness() {
        let range = KeyRange::bound(num(1.0), num(2.0), true, false).unwrap();
        let (lower, upper) = range.bounds();
        assert_eq!(lower, Bound::Excluded(num(1.0)));
        assert_eq!(upper, Bound::Included(num(2.0)));
    }
}
