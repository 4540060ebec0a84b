use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::{Record, Value};
use crate::sequence::IndexedSequence;

/// Hashable surrogate of strict value equality.
///
/// Two values are strictly equal exactly when their identity keys are equal.
/// Compound values hash and compare by allocation; the key keeps the
/// allocation alive so an address can never be reused while it is held.
#[derive(Debug, Clone)]
pub(crate) enum IdentityKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Array(Rc<IndexedSequence>),
    Object(Rc<Record>),
}

impl IdentityKey {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Int(integer) => Self::Int(*integer),
            Value::Float(float) if float.is_nan() => return None,
            // -0.0 and 0.0 are equal
            Value::Float(float) => Self::Float((*float + 0.0).to_bits()),
            Value::Str(text) => Self::Str(Rc::clone(text)),
            Value::Array(items) => Self::Array(Rc::clone(items)),
            Value::Object(record) => Self::Object(Rc::clone(record)),
        })
    }
}

impl PartialEq for IdentityKey {
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

impl Eq for IdentityKey {}

impl Hash for IdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(flag) => flag.hash(state),
            Self::Int(integer) => integer.hash(state),
            Self::Float(bits) => bits.hash(state),
            Self::Str(text) => text.hash(state),
            Self::Array(items) => Rc::as_ptr(items).addr().hash(state),
            Self::Object(record) => Rc::as_ptr(record).addr().hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_identity_matches_strict_equality() {
        let array = Value::array([1, 2]);
        assert_eq!(IdentityKey::of(&array), IdentityKey::of(&array.clone()));
        assert_ne!(
            IdentityKey::of(&array),
            IdentityKey::of(&Value::array([1, 2]))
        );
        assert_ne!(
            IdentityKey::of(&Value::from(1)),
            IdentityKey::of(&Value::from(1.0))
        );
    }

    #[rstest]
    fn test_signed_zero_is_one_identity() {
        assert_eq!(
            IdentityKey::of(&Value::from(-0.0)),
            IdentityKey::of(&Value::from(0.0))
        );
    }

    #[rstest]
    fn test_nan_has_no_identity() {
        assert_eq!(IdentityKey::of(&Value::from(f64::NAN)), None);
    }
}
