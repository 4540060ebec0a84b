//! Insertion-ordered key-value storage.
//!
//! This module provides [`IndexedSequence`], the materialized form of every
//! chain: an ordered collection of `(Key, Value)` pairs with unique keys.
//!
//! # Overwrite Semantics
//!
//! Inserting an existing key replaces the value *in place*: the entry keeps
//! the position of its first occurrence and the last write wins. Collecting
//! an iterator of pairs follows the same rule, which is what governs
//! `flip`, `merge` and `flat_map` results.
//!
//! ```rust
//! use chainars::{IndexedSequence, Key, Value};
//!
//! let sequence: IndexedSequence = [
//!     (Key::from("a"), Value::from(1)),
//!     (Key::from("b"), Value::from(2)),
//!     (Key::from("a"), Value::from(3)),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert_eq!(sequence.len(), 2);
//! assert_eq!(sequence.get(&Key::from("a")), Some(&Value::from(3)));
//! assert_eq!(sequence.keys().next(), Some(&Key::from("a")));
//! ```

use std::fmt;
use std::iter::FromIterator;

use crate::FastHashMap;
use crate::error::ChainError;
use crate::value::{Key, Value};

/// An ordered collection of `(Key, Value)` pairs with unique keys.
///
/// # Time Complexity
///
/// | Operation       | Complexity |
/// |-----------------|------------|
/// | `get`           | O(1)       |
/// | `insert`        | O(1)       |
/// | `push`          | O(1)       |
/// | `remove`        | O(n)       |
/// | `position_of`   | O(n)       |
/// | `iter`          | O(n)       |
#[derive(Clone, Default)]
pub struct IndexedSequence {
    entries: Vec<(Key, Value)>,
    positions: FastHashMap<Key, usize>,
    /// Highest integer key ever inserted, drives `push`.
    max_int_key: Option<i64>,
}

impl IndexedSequence {
    /// Creates an empty sequence.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sequence with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut positions = FastHashMap::default();
        positions.reserve(capacity);
        Self {
            entries: Vec::with_capacity(capacity),
            positions,
            max_int_key: None,
        }
    }

    /// Creates a sequence from values, keyed `0..n`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::{IndexedSequence, Key, Value};
    ///
    /// let sequence = IndexedSequence::from_values([Value::from("x"), Value::from("y")]);
    /// assert_eq!(sequence.get(&Key::from(1)), Some(&Value::from("y")));
    /// ```
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let values = values.into_iter();
        let mut sequence = Self::with_capacity(values.size_hint().0);
        for (index, value) in (0_i64..).zip(values) {
            sequence.insert(Key::Int(index), value);
        }
        sequence
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the sequence has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.positions
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.positions.contains_key(key)
    }

    /// Inserts `value` under `key`.
    ///
    /// An existing entry is updated in place and its previous value
    /// returned; otherwise the entry is appended at the end.
    pub fn insert(&mut self, key: Key, value: Value) -> Option<Value> {
        if let Some(&position) = self.positions.get(&key) {
            return Some(std::mem::replace(&mut self.entries[position].1, value));
        }
        if let Key::Int(index) = key {
            self.max_int_key = Some(self.max_int_key.map_or(index, |max| max.max(index)));
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Appends `value` under the next free integer key and returns that key.
    ///
    /// The next free key is one past the highest integer key, or `0` when
    /// the sequence has no integer keys.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] when the highest integer key
    /// is already `i64::MAX`.
    pub fn push(&mut self, value: Value) -> Result<Key, ChainError> {
        let key = self.next_int_key().map(Key::Int).ok_or_else(next_key_occupied)?;
        self.insert(key.clone(), value);
        Ok(key)
    }

    /// Returns the key `push` would use, or `None` once the integer keys
    /// are exhausted.
    pub fn next_int_key(&self) -> Option<i64> {
        self.max_int_key.map_or(Some(0), |max| max.checked_add(1))
    }

    /// Removes the entry stored under `key`.
    ///
    /// The remaining entries keep their keys and relative order.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        let position = self.positions.remove(key)?;
        let (_, value) = self.entries.remove(position);
        for (shifted, (entry_key, _)) in self.entries.iter().enumerate().skip(position) {
            self.positions.insert(entry_key.clone(), shifted);
        }
        self.max_int_key = self.entries.iter().filter_map(|(key, _)| key.as_int()).max();
        Some(value)
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Key, &Value)> + ExactSizeIterator {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &Key> + ExactSizeIterator {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Iterates over values in insertion order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &Value> + ExactSizeIterator {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Returns the key of the first value strictly equal to `value`.
    pub fn position_of(&self, value: &Value) -> Option<&Key> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == value)
            .map(|(key, _)| key)
    }

    /// Returns `true` if some value is strictly equal to `value`.
    pub fn contains_value(&self, value: &Value) -> bool {
        self.position_of(value).is_some()
    }

    /// Returns `true` when the keys are exactly `0..n` in order.
    pub fn is_list(&self) -> bool {
        self.entries
            .iter()
            .zip(0_i64..)
            .all(|((key, _), expected)| key.as_int() == Some(expected))
    }

    /// Consumes the sequence and returns its values in order.
    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

pub(crate) fn next_key_occupied() -> ChainError {
    ChainError::InvalidArgument(
        "Cannot add element to the array as the next element is already occupied".to_string(),
    )
}

impl FromIterator<(Key, Value)> for IndexedSequence {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iterable: I) -> Self {
        let iterator = iterable.into_iter();
        let mut sequence = Self::with_capacity(iterator.size_hint().0);
        for (key, value) in iterator {
            sequence.insert(key, value);
        }
        sequence
    }
}

impl Extend<(Key, Value)> for IndexedSequence {
    fn extend<I: IntoIterator<Item = (Key, Value)>>(&mut self, iterable: I) {
        for (key, value) in iterable {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for IndexedSequence {
    type Item = (Key, Value);
    type IntoIter = std::vec::IntoIter<(Key, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl PartialEq for IndexedSequence {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for IndexedSequence {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for IndexedSequence {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("[")?;
        for (position, (key, value)) in self.entries.iter().enumerate() {
            if position > 0 {
                formatter.write_str(", ")?;
            }
            write!(formatter, "{key} => {value}")?;
        }
        formatter.write_str("]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for IndexedSequence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{SerializeMap, SerializeSeq};
        if self.is_list() {
            let mut sequence = serializer.serialize_seq(Some(self.len()))?;
            for value in self.values() {
                sequence.serialize_element(value)?;
            }
            sequence.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }
}

#[cfg(feature = "serde")]
impl IndexedSequence {
    pub(crate) fn deserialize_seq<'de, A>(mut access: A) -> Result<Self, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let capacity = access.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        let mut sequence = Self::with_capacity(capacity);
        let mut index = 0_i64;
        while let Some(value) = access.next_element::<Value>()? {
            sequence.insert(Key::Int(index), value);
            index += 1;
        }
        Ok(sequence)
    }

    pub(crate) fn deserialize_map<'de, A>(mut access: A) -> Result<Self, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut sequence = Self::new();
        while let Some((key, value)) = access.next_entry::<Key, Value>()? {
            sequence.insert(key, value);
        }
        Ok(sequence)
    }
}

#[cfg(feature = "serde")]
struct IndexedSequenceVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for IndexedSequenceVisitor {
    type Value = IndexedSequence;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence or a map")
    }

    fn visit_seq<A>(self, access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        IndexedSequence::deserialize_seq(access)
    }

    fn visit_map<A>(self, access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        IndexedSequence::deserialize_map(access)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for IndexedSequence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(IndexedSequenceVisitor)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn keys_of(sequence: &IndexedSequence) -> Vec<Key> {
        sequence.keys().cloned().collect()
    }

    #[rstest]
    fn test_from_values_numbers_keys_from_zero() {
        let sequence = IndexedSequence::from_values([Value::from(4), Value::from(5)]);
        assert_eq!(keys_of(&sequence), vec![Key::from(0), Key::from(1)]);
        assert!(sequence.is_list());
    }

    #[rstest]
    fn test_insert_existing_key_keeps_position() {
        let mut sequence = IndexedSequence::new();
        sequence.insert(Key::from("a"), Value::from(1));
        sequence.insert(Key::from("b"), Value::from(2));
        let previous = sequence.insert(Key::from("a"), Value::from(3));

        assert_eq!(previous, Some(Value::from(1)));
        assert_eq!(keys_of(&sequence), vec![Key::from("a"), Key::from("b")]);
        assert_eq!(sequence.get(&Key::from("a")), Some(&Value::from(3)));
    }

    #[rstest]
    fn test_push_uses_highest_integer_key() {
        let mut sequence = IndexedSequence::new();
        sequence.insert(Key::from(7), Value::from("x"));
        sequence.insert(Key::from("name"), Value::from("y"));
        sequence.insert(Key::from(3), Value::from("z"));

        assert_eq!(sequence.push(Value::from("w")), Ok(Key::from(8)));
    }

    #[rstest]
    fn test_push_on_empty_starts_at_zero() {
        let mut sequence = IndexedSequence::new();
        assert_eq!(sequence.push(Value::from(1)), Ok(Key::from(0)));
        assert_eq!(sequence.push(Value::from(2)), Ok(Key::from(1)));
    }

    #[rstest]
    fn test_push_after_max_key_fails_without_overwriting() {
        let mut sequence = IndexedSequence::new();
        sequence.insert(Key::from(i64::MAX), Value::from("existing"));

        assert!(matches!(
            sequence.push(Value::from("new")),
            Err(ChainError::InvalidArgument(message)) if message.contains("already occupied")
        ));
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence.get(&Key::from(i64::MAX)), Some(&Value::from("existing")));
    }

    #[rstest]
    fn test_remove_does_not_renumber() {
        let mut sequence =
            IndexedSequence::from_values([Value::from("a"), Value::from("b"), Value::from("c")]);
        assert_eq!(sequence.remove(&Key::from(1)), Some(Value::from("b")));

        assert_eq!(keys_of(&sequence), vec![Key::from(0), Key::from(2)]);
        assert_eq!(sequence.get(&Key::from(2)), Some(&Value::from("c")));
        assert!(!sequence.is_list());
    }

    #[rstest]
    fn test_remove_missing_key() {
        let mut sequence = IndexedSequence::from_values([Value::from(1)]);
        assert_eq!(sequence.remove(&Key::from("missing")), None);
        assert_eq!(sequence.len(), 1);
    }

    #[rstest]
    fn test_position_of_uses_strict_equality() {
        let sequence = IndexedSequence::from_values([Value::from(0), Value::from(6)]);
        assert_eq!(sequence.position_of(&Value::from(6)), Some(&Key::from(1)));
        assert_eq!(sequence.position_of(&Value::from("6")), None);
    }

    #[rstest]
    fn test_display() {
        let mut sequence = IndexedSequence::from_values([Value::from(1)]);
        sequence.insert(Key::from("k"), Value::from("v"));
        assert_eq!(sequence.to_string(), "[0 => 1, k => v]");
    }
}
