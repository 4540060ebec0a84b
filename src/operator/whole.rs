//! Whole-sequence transforms.
//!
//! These consume a fully materialized [`IndexedSequence`] and produce a new
//! one. They are wrapped into operators by the constructors in the parent
//! module.

use std::cmp::Ordering;
use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};

use super::Direction;
use super::element::identity_set;
use crate::access::{PropertyAccessor, PropertyPath};
use crate::error::ChainError;
use crate::sequence::{IndexedSequence, next_key_occupied};
use crate::value::{Key, Value};

pub(crate) type ValueComparator = Rc<dyn Fn(&Value, &Value) -> Ordering>;
pub(crate) type KeyComparator = Rc<dyn Fn(&Key, &Key) -> Ordering>;

/// Concatenates `left` and `right`.
///
/// Integer keys are renumbered across the whole result; a string key
/// overwrites an earlier entry with the same key in place.
pub(crate) fn merge(
    left: IndexedSequence,
    right: &IndexedSequence,
) -> Result<IndexedSequence, ChainError> {
    let mut merged = IndexedSequence::with_capacity(left.len() + right.len());
    let right_entries = right.iter().map(|(key, value)| (key.clone(), value.clone()));
    for (key, value) in left.into_iter().chain(right_entries) {
        if key.is_int() {
            merged.push(value)?;
        } else {
            merged.insert(key, value);
        }
    }
    Ok(merged)
}

pub(crate) fn append(
    mut sequence: IndexedSequence,
    value: Value,
) -> Result<IndexedSequence, ChainError> {
    sequence.push(value)?;
    Ok(sequence)
}

pub(crate) fn prepend(
    sequence: IndexedSequence,
    value: Value,
) -> Result<IndexedSequence, ChainError> {
    let mut prepended = IndexedSequence::with_capacity(sequence.len() + 1);
    prepended.insert(Key::Int(0), value);
    for (key, value) in sequence {
        let shifted = match key {
            Key::Int(index) => Key::Int(index.checked_add(1).ok_or_else(next_key_occupied)?),
            named @ Key::Str(_) => named,
        };
        prepended.insert(shifted, value);
    }
    Ok(prepended)
}

pub(crate) fn sort_values(
    sequence: IndexedSequence,
    comparator: Option<&ValueComparator>,
    direction: Direction,
) -> IndexedSequence {
    let mut entries: Vec<(Key, Value)> = sequence.into_iter().collect();
    match comparator {
        Some(comparator) => entries.sort_by(|(_, left), (_, right)| comparator(left, right)),
        None => entries.sort_by(|(_, left), (_, right)| direction.orient(left.natural_cmp(right))),
    }
    entries.into_iter().collect()
}

pub(crate) fn sort_keys(
    sequence: IndexedSequence,
    comparator: Option<&KeyComparator>,
    direction: Direction,
) -> IndexedSequence {
    let mut entries: Vec<(Key, Value)> = sequence.into_iter().collect();
    match comparator {
        Some(comparator) => entries.sort_by(|(left, _), (right, _)| comparator(left, right)),
        None => entries.sort_by(|(left, _), (right, _)| direction.orient(left.natural_cmp(right))),
    }
    entries.into_iter().collect()
}

pub(crate) fn sort_by_property(
    sequence: IndexedSequence,
    path: &PropertyPath,
    direction: Direction,
    accessor: &dyn PropertyAccessor,
) -> Result<IndexedSequence, ChainError> {
    let mut entries = sequence
        .into_iter()
        .map(|(key, value)| -> Result<_, ChainError> {
            let resolved = accessor.resolve(&value, path)?;
            Ok((resolved, key, value))
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|(left, _, _), (right, _, _)| direction.orient(left.natural_cmp(right)));
    Ok(entries
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .collect())
}

pub(crate) fn reverse(sequence: IndexedSequence, preserve_keys: bool) -> IndexedSequence {
    let reversed = sequence.into_iter().rev();
    if preserve_keys {
        reversed.collect()
    } else {
        IndexedSequence::from_values(reversed.map(|(_, value)| value))
    }
}

/// Keeps the entries of `sequence` whose value is not strictly equal to
/// any value of `others`.
pub(crate) fn diff(
    sequence: IndexedSequence,
    others: &IndexedSequence,
) -> Result<IndexedSequence, ChainError> {
    let (compound, plain): (Vec<&Value>, Vec<&Value>) = sequence
        .values()
        .chain(others.values())
        .partition(|value| value.is_compound());
    if !compound.is_empty() && !plain.is_empty() {
        return Err(ChainError::InvalidArgument(
            "Could not compare object with scalar".to_owned(),
        ));
    }

    let excluded = identity_set(others.values());
    Ok(sequence
        .into_iter()
        .filter(|(_, value)| {
            value
                .identity_key()
                .is_none_or(|identity| !excluded.contains(&identity))
        })
        .collect())
}

pub(crate) fn mix(sequence: IndexedSequence, seed: Option<u64>) -> IndexedSequence {
    let mut values = sequence.into_values();
    match seed {
        Some(seed) => values.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => values.shuffle(&mut rand::rng()),
    }
    IndexedSequence::from_values(values)
}

pub(crate) fn set_value(mut sequence: IndexedSequence, key: Key, value: Value) -> IndexedSequence {
    sequence.insert(key, value);
    sequence
}

pub(crate) fn remove(mut sequence: IndexedSequence, key: &Key) -> IndexedSequence {
    sequence.remove(key);
    sequence
}

/// Counts occurrences of each distinct scalar, in first-seen order.
pub(crate) fn frequency_analysis(sequence: &IndexedSequence) -> Result<IndexedSequence, ChainError> {
    let mut histogram = IndexedSequence::new();
    for (key, value) in sequence.iter() {
        if !value.is_scalar() {
            return Err(ChainError::InvalidArgument(format!(
                "Frequency analysis can only count strings and numbers, got {} at key {key}",
                value.type_name()
            )));
        }
        let bucket = Key::try_from_value(value)?;
        let count = histogram.get(&bucket).and_then(Value::as_int).unwrap_or(0);
        histogram.insert(bucket, Value::Int(count + 1));
    }
    Ok(histogram)
}

pub(crate) fn intersect_keep_indexes(
    sequence: IndexedSequence,
    others: &IndexedSequence,
) -> IndexedSequence {
    let matching = identity_set(others.values());
    sequence
        .into_iter()
        .filter(|(_, value)| {
            value
                .identity_key()
                .is_some_and(|identity| matching.contains(&identity))
        })
        .collect()
}
