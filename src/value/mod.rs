//! Dynamic values carried by indexed sequences.
//!
//! This module provides:
//!
//! - [`Key`]: an integer or string key
//! - [`Value`]: a dynamically typed element (scalar, array or object)
//! - [`Record`]: a named bag of properties addressed by dotted paths
//!
//! # Equality
//!
//! Values use *strict* equality. Scalars are equal when they have the same
//! type and the same payload, so `Value::Int(1) != Value::Float(1.0)`.
//! Arrays and objects are equal only when they are the same allocation:
//! two separately built arrays with identical contents are different values.
//!
//! ```rust
//! use chainars::Value;
//!
//! let shared = Value::array([1, 2, 3]);
//! assert_eq!(shared, shared.clone());
//! assert_ne!(Value::array([1, 2, 3]), Value::array([1, 2, 3]));
//! assert_ne!(Value::from(1), Value::from(1.0));
//! ```
//!
//! # Truthiness
//!
//! `Null`, `false`, `0`, `0.0`, `""` and the empty array are falsy; every
//! other value, including every object and the string `"0"`, is truthy.

mod identity;
mod key;
mod record;

pub(crate) use identity::IdentityKey;
pub use key::Key;
pub use record::Record;

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::sequence::IndexedSequence;

/// A dynamically typed element of an indexed sequence.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// An immutable string.
    Str(Rc<str>),
    /// A nested indexed sequence, compared by identity.
    Array(Rc<IndexedSequence>),
    /// A record with named properties, compared by identity.
    Object(Rc<Record>),
}

impl Value {
    /// Builds an array value from a list of values keyed `0..n`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::Value;
    ///
    /// let array = Value::array(["a", "b"]);
    /// assert_eq!(array.as_array().map(|items| items.len()), Some(2));
    /// ```
    pub fn array<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::Array(Rc::new(IndexedSequence::from_values(
            values.into_iter().map(Into::into),
        )))
    }

    /// Wraps a record into an object value.
    pub fn object(record: Record) -> Self {
        Self::Object(Rc::new(record))
    }

    /// Returns a short, human readable name of the value's type.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns `true` for booleans, integers, floats and strings.
    #[inline]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_)
        )
    }

    /// Returns `true` for arrays and objects.
    #[inline]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// Returns `true` for `Null`.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Evaluates the value in a boolean context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::Value;
    ///
    /// assert!(!Value::from("").is_truthy());
    /// assert!(!Value::from(0).is_truthy());
    /// assert!(Value::from("0").is_truthy());
    /// assert!(!Value::array(Vec::<Value>::new()).is_truthy());
    /// assert!(Value::from("0.0").is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(flag) => *flag,
            Self::Int(integer) => *integer != 0,
            Self::Float(float) => *float != 0.0,
            Self::Str(text) => !text.is_empty(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// Returns the integer payload, if any.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(integer) => Some(*integer),
            _ => None,
        }
    }

    /// Returns the float payload, if any.
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(float) => Some(*float),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the nested sequence, if this is an array.
    pub fn as_array(&self) -> Option<&IndexedSequence> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the record, if this is an object.
    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Self::Object(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the hashable surrogate of strict equality.
    ///
    /// `None` for `NaN`, which is never equal to anything.
    pub(crate) fn identity_key(&self) -> Option<IdentityKey> {
        IdentityKey::of(self)
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Str(_) => 3,
            Self::Array(_) => 4,
            Self::Object(_) => 5,
        }
    }

    /// Compares two values in natural order.
    ///
    /// Numbers compare numerically regardless of integer/float
    /// representation, strings lexicographically and booleans with
    /// `false < true`. Values of different categories are ordered
    /// `null < bool < number < string < array < object`. Arrays compare by
    /// length, then element by element; objects by allocation.
    ///
    /// Integers and floats compare exactly, without rounding through `f64`.
    /// `-0.0` equals `0.0` and `NaN` sorts above every other number.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::Value;
    /// use std::cmp::Ordering;
    ///
    /// assert_eq!(Value::from(2).natural_cmp(&Value::from(10)), Ordering::Less);
    /// assert_eq!(Value::from("aa").natural_cmp(&Value::from("b")), Ordering::Less);
    /// assert_eq!(Value::from(1).natural_cmp(&Value::from(1.0)), Ordering::Equal);
    /// ```
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Int(left), Self::Int(right)) => left.cmp(right),
            (Self::Int(left), Self::Float(right)) => compare_int_with_float(*left, *right),
            (Self::Float(left), Self::Int(right)) => compare_int_with_float(*right, *left).reverse(),
            (Self::Float(left), Self::Float(right)) => compare_floats(*left, *right),
            (Self::Str(left), Self::Str(right)) => left.cmp(right),
            (Self::Array(left), Self::Array(right)) => left.len().cmp(&right.len()).then_with(|| {
                left.values()
                    .zip(right.values())
                    .map(|(left, right)| left.natural_cmp(right))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
            (Self::Object(left), Self::Object(right)) => {
                Rc::as_ptr(left).addr().cmp(&Rc::as_ptr(right).addr())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Orders two floats, with `-0.0 == 0.0` and `NaN` above everything else.
pub(crate) fn compare_floats(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

/// Orders an integer against a float exactly.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn compare_int_with_float(integer: i64, float: f64) -> Ordering {
    // 2^63, the first float above every i64.
    const UPPER: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() || float >= UPPER {
        return Ordering::Less;
    }
    if float < -UPPER {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    integer.cmp(&(whole as i64)).then_with(|| {
        if float > whole {
            Ordering::Less
        } else if float < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Str(left), Self::Str(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => Rc::ptr_eq(left, right),
            (Self::Object(left), Self::Object(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Int(integer) => write!(formatter, "{integer}"),
            Self::Float(float) => write!(formatter, "{float}"),
            Self::Str(text) => formatter.write_str(text),
            Self::Array(items) => write!(formatter, "{items}"),
            Self::Object(record) => write!(formatter, "{}{{..}}", record.class()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(integer: i64) -> Self {
        Self::Int(integer)
    }
}

impl From<i32> for Value {
    fn from(integer: i32) -> Self {
        Self::Int(i64::from(integer))
    }
}

impl From<u32> for Value {
    fn from(integer: u32) -> Self {
        Self::Int(i64::from(integer))
    }
}

impl From<f64> for Value {
    fn from(float: f64) -> Self {
        Self::Float(float)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Str(Rc::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Str(Rc::from(text))
    }
}

impl From<Rc<str>> for Value {
    fn from(text: Rc<str>) -> Self {
        Self::Str(text)
    }
}

impl From<IndexedSequence> for Value {
    fn from(items: IndexedSequence) -> Self {
        Self::Array(Rc::new(items))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::object(record)
    }
}

impl From<Vec<Self>> for Value {
    fn from(values: Vec<Self>) -> Self {
        Self::array(values)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Self::Null, Into::into)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Int(integer) => serializer.serialize_i64(*integer),
            Self::Float(float) => serializer.serialize_f64(*float),
            Self::Str(text) => serializer.serialize_str(text),
            Self::Array(items) => serde::Serialize::serialize(&**items, serializer),
            Self::Object(record) => serde::Serialize::serialize(record.properties(), serializer),
        }
    }
}

#[cfg(feature = "serde")]
struct ValueVisitor;

#[cfg(feature = "serde")]
impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON-like value")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: serde::de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::Int(value))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Value, E> {
        Ok(i64::try_from(value).map_or(Value::Float(value as f64), Value::Int))
    }

    fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<Value, E> {
        Ok(Value::Float(value))
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_seq<A>(self, sequence: A) -> Result<Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        IndexedSequence::deserialize_seq(sequence).map(Value::from)
    }

    fn visit_map<A>(self, map: A) -> Result<Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        IndexedSequence::deserialize_map(map).map(Value::from)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Null, false)]
    #[case(Value::from(false), false)]
    #[case(Value::from(0), false)]
    #[case(Value::from(0.0), false)]
    #[case(Value::from(""), false)]
    #[case(Value::array(Vec::<Value>::new()), false)]
    #[case(Value::from(true), true)]
    #[case(Value::from(-1), true)]
    #[case(Value::from("a"), true)]
    #[case(Value::from("0"), true)]
    #[case(Value::array([0]), true)]
    #[case(Value::object(Record::new("Empty")), true)]
    fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.is_truthy(), expected);
    }

    #[rstest]
    fn test_strict_equality_between_types() {
        assert_ne!(Value::from(3), Value::from("3"));
        assert_ne!(Value::from(1), Value::from(true));
        assert_ne!(Value::Null, Value::from(false));
        assert_eq!(Value::from("abc"), Value::from(String::from("abc")));
    }

    #[rstest]
    fn test_compound_equality_is_identity() {
        let first = Value::object(Record::new("Point").with("x", 1));
        let second = Value::object(Record::new("Point").with("x", 1));

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
    }

    #[rstest]
    fn test_nan_is_never_equal() {
        let nan = Value::from(f64::NAN);
        assert_ne!(nan, nan.clone());
    }

    #[rstest]
    fn test_natural_cmp_across_categories() {
        let mut values = vec![
            Value::from("b"),
            Value::from(2),
            Value::Null,
            Value::from(true),
            Value::from(1.5),
        ];
        values.sort_by(Value::natural_cmp);

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::from(true),
                Value::from(1.5),
                Value::from(2),
                Value::from("b"),
            ]
        );
    }

    #[rstest]
    fn test_scalar_and_compound_classification() {
        assert!(Value::from(1).is_scalar());
        assert!(Value::from("x").is_scalar());
        assert!(!Value::Null.is_scalar());
        assert!(!Value::Null.is_compound());
        assert!(Value::array([1]).is_compound());
        assert!(Value::object(Record::new("X")).is_compound());
    }

    #[rstest]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(4)), Value::Int(4));
    }
}
