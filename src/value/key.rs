//! Keys of an indexed sequence.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::{Value, compare_floats, compare_int_with_float};
use crate::error::ChainError;

/// A key of an [`IndexedSequence`](crate::sequence::IndexedSequence).
///
/// Keys are either integers or strings. Numeric strings are *not* folded
/// into integer keys: `Key::Str("5")` and `Key::Int(5)` are distinct.
///
/// # Examples
///
/// ```rust
/// use chainars::Key;
///
/// let index = Key::from(3);
/// let name = Key::from("name");
///
/// assert_eq!(index.as_int(), Some(3));
/// assert_eq!(name.as_str(), Some("name"));
/// assert_ne!(Key::from(5), Key::from("5"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// An integer key.
    Int(i64),
    /// A string key.
    Str(Rc<str>),
}

impl Key {
    /// Returns the integer payload, if this is an integer key.
    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(index) => Some(*index),
            Self::Str(_) => None,
        }
    }

    /// Returns the string payload, if this is a string key.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(name) => Some(name),
        }
    }

    /// Returns `true` for integer keys.
    #[inline]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Converts a value into a key.
    ///
    /// Integers and strings map directly, booleans become `0`/`1` and
    /// floats are truncated toward zero. `Null` and compound values cannot
    /// be keys.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] for `Null`, arrays and objects.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::{Key, Value};
    ///
    /// assert_eq!(Key::try_from_value(&Value::from(true)).unwrap(), Key::Int(1));
    /// assert_eq!(Key::try_from_value(&Value::from(2.9)).unwrap(), Key::Int(2));
    /// assert!(Key::try_from_value(&Value::Null).is_err());
    /// ```
    pub fn try_from_value(value: &Value) -> Result<Self, ChainError> {
        match value {
            Value::Int(integer) => Ok(Self::Int(*integer)),
            Value::Str(text) => Ok(Self::Str(Rc::clone(text))),
            Value::Bool(flag) => Ok(Self::Int(i64::from(*flag))),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(float) if float.is_finite() => Ok(Self::Int(float.trunc() as i64)),
            other => Err(ChainError::InvalidArgument(format!(
                "Illegal offset type: {} cannot be used as a key",
                other.type_name()
            ))),
        }
    }

    /// Compares two keys in natural key order.
    ///
    /// Integer keys and numeric strings form one numeric range ordered by
    /// value, and sort before every non-numeric string. Equal numbers put
    /// the integer key first, then compare the strings' text. Non-numeric
    /// strings compare lexicographically.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::Key;
    /// use std::cmp::Ordering;
    ///
    /// assert_eq!(Key::from(10).natural_cmp(&Key::from("9")), Ordering::Greater);
    /// assert_eq!(Key::from(10).natural_cmp(&Key::from("10a")), Ordering::Less);
    /// assert_eq!(Key::from("9").natural_cmp(&Key::from("10a")), Ordering::Less);
    /// ```
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self.sort_class(), other.sort_class()) {
            (SortClass::Numeric(left), SortClass::Numeric(right)) => left
                .compare(right)
                .then_with(|| self.is_int().cmp(&other.is_int()).reverse())
                .then_with(|| self.as_str().cmp(&other.as_str())),
            (SortClass::Numeric(_), SortClass::Text(_)) => Ordering::Less,
            (SortClass::Text(_), SortClass::Numeric(_)) => Ordering::Greater,
            (SortClass::Text(left), SortClass::Text(right)) => left.cmp(right),
        }
    }

    fn sort_class(&self) -> SortClass<'_> {
        match self {
            Self::Int(index) => SortClass::Numeric(Numeric::Int(*index)),
            Self::Str(name) => {
                let trimmed = name.trim();
                if let Ok(index) = trimmed.parse::<i64>() {
                    SortClass::Numeric(Numeric::Int(index))
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(float) if float.is_finite() => SortClass::Numeric(Numeric::Float(float)),
                        _ => SortClass::Text(name),
                    }
                }
            }
        }
    }
}

enum SortClass<'a> {
    Numeric(Numeric),
    Text(&'a str),
}

#[derive(Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn compare(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => left.cmp(&right),
            (Self::Int(left), Self::Float(right)) => compare_int_with_float(left, right),
            (Self::Float(left), Self::Int(right)) => compare_int_with_float(right, left).reverse(),
            (Self::Float(left), Self::Float(right)) => compare_floats(left, right),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(index) => write!(formatter, "{index}"),
            Self::Str(name) => write!(formatter, "{name}"),
        }
    }
}

impl From<i64> for Key {
    fn from(index: i64) -> Self {
        Self::Int(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        Self::Int(i64::from(index))
    }
}

impl From<u32> for Key {
    fn from(index: u32) -> Self {
        Self::Int(i64::from(index))
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Str(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Str(Rc::from(name))
    }
}

impl From<Rc<str>> for Key {
    fn from(name: Rc<str>) -> Self {
        Self::Str(name)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(index) => Self::Int(index),
            Key::Str(name) => Self::Str(name),
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Int(index) => serializer.serialize_i64(*index),
            Self::Str(name) => serializer.serialize_str(name),
        }
    }
}

#[cfg(feature = "serde")]
struct KeyVisitor;

#[cfg(feature = "serde")]
impl serde::de::Visitor<'_> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer or a string")
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Key, E> {
        Ok(Key::Int(value))
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Key, E> {
        i64::try_from(value)
            .map(Key::Int)
            .map_err(|_| E::custom("integer key out of range"))
    }

    /// Object keys always arrive as strings; canonical decimal integers
    /// are read back as integer keys.
    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Key, E> {
        match value.parse::<i64>() {
            Ok(index) if index.to_string() == value => Ok(Key::Int(index)),
            _ => Ok(Key::from(value)),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(KeyVisitor)
    }
}
