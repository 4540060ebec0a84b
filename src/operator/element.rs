//! Per-element strategies.
//!
//! Each strategy consumes one `(key, value)` pair and emits zero or more
//! pairs. Counters and caches are plain fields: an operator hands out a fresh
//! strategy for every lazy run, so state never leaks between runs.

use std::rc::Rc;

use smallvec::{SmallVec, smallvec};

use crate::FastHashSet;
use crate::error::ChainError;
use crate::value::{IdentityKey, Key, Value};

/// Pairs emitted for one input pair.
pub type Emission = SmallVec<[(Key, Value); 1]>;

/// A stateful per-element transform.
pub trait ElementStep {
    /// Transforms one input pair.
    ///
    /// # Errors
    ///
    /// Returns an error when the pair cannot be transformed; the current
    /// materialization is aborted.
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError>;

    /// Returns `true` once no further input can produce output.
    ///
    /// The stage stops pulling its upstream from then on.
    fn is_finished(&self) -> bool {
        false
    }
}

pub(crate) type Mapper = Rc<dyn Fn(Value) -> Value>;
pub(crate) type Predicate = Rc<dyn Fn(&Value) -> bool>;
pub(crate) type Visitor = Rc<dyn Fn(&Value, &Key)>;
pub(crate) type Expander = Rc<dyn Fn(Value, &Key) -> Value>;

/// Monotonic output counter used for re-indexing.
#[derive(Debug, Default)]
struct Counter(i64);

impl Counter {
    fn next_key(&mut self) -> Key {
        let key = Key::Int(self.0);
        self.0 += 1;
        key
    }

    fn key_for(&mut self, original: Key, preserve_keys: bool) -> Key {
        if preserve_keys {
            original
        } else {
            self.next_key()
        }
    }
}

pub(crate) struct MapStep {
    pub(crate) mapper: Mapper,
}

impl ElementStep for MapStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        Ok(smallvec![(key, (self.mapper)(value))])
    }
}

pub(crate) struct FilterStep {
    predicate: Option<Predicate>,
    preserve_keys: bool,
    counter: Counter,
}

impl FilterStep {
    pub(crate) fn new(predicate: Option<Predicate>, preserve_keys: bool) -> Self {
        Self {
            predicate,
            preserve_keys,
            counter: Counter::default(),
        }
    }
}

impl ElementStep for FilterStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        let keep = self
            .predicate
            .as_ref()
            .map_or_else(|| value.is_truthy(), |predicate| predicate(&value));
        if !keep {
            return Ok(Emission::new());
        }
        Ok(smallvec![(self.counter.key_for(key, self.preserve_keys), value)])
    }
}

pub(crate) struct ForEachStep {
    pub(crate) visitor: Visitor,
}

impl ElementStep for ForEachStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        (self.visitor)(&value, &key);
        Ok(smallvec![(key, value)])
    }
}

pub(crate) struct FlipStep;

impl ElementStep for FlipStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        let flipped = Key::try_from_value(&value)?;
        Ok(smallvec![(flipped, Value::from(key))])
    }
}

#[derive(Default)]
pub(crate) struct KeysStep {
    counter: Counter,
}

impl ElementStep for KeysStep {
    fn step(&mut self, key: Key, _value: Value) -> Result<Emission, ChainError> {
        Ok(smallvec![(self.counter.next_key(), Value::from(key))])
    }
}

#[derive(Default)]
pub(crate) struct ValuesStep {
    counter: Counter,
}

impl ElementStep for ValuesStep {
    fn step(&mut self, _key: Key, value: Value) -> Result<Emission, ChainError> {
        Ok(smallvec![(self.counter.next_key(), value)])
    }
}

pub(crate) struct UniqueStep {
    preserve_keys: bool,
    counter: Counter,
    seen: FastHashSet<IdentityKey>,
}

impl UniqueStep {
    pub(crate) fn new(preserve_keys: bool) -> Self {
        Self {
            preserve_keys,
            counter: Counter::default(),
            seen: FastHashSet::default(),
        }
    }
}

impl ElementStep for UniqueStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        // NaN has no identity and is never a duplicate
        let first_occurrence = value
            .identity_key()
            .is_none_or(|identity| self.seen.insert(identity));
        if !first_occurrence {
            return Ok(Emission::new());
        }
        Ok(smallvec![(self.counter.key_for(key, self.preserve_keys), value)])
    }
}

pub(crate) struct SliceStep {
    start: usize,
    stop: usize,
    step: usize,
    preserve_keys: bool,
    position: usize,
    counter: Counter,
}

impl SliceStep {
    pub(crate) fn new(start: usize, stop: usize, step: usize, preserve_keys: bool) -> Self {
        Self {
            start,
            stop,
            step,
            preserve_keys,
            position: 0,
            counter: Counter::default(),
        }
    }
}

impl ElementStep for SliceStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        let position = self.position;
        self.position += 1;
        let selected = position >= self.start
            && position < self.stop
            && (position - self.start) % self.step == 0;
        if !selected {
            return Ok(Emission::new());
        }
        Ok(smallvec![(self.counter.key_for(key, self.preserve_keys), value)])
    }

    fn is_finished(&self) -> bool {
        self.position >= self.stop
    }
}

pub(crate) struct IntersectStep {
    others: Rc<FastHashSet<IdentityKey>>,
    preserve_keys: bool,
    counter: Counter,
}

impl IntersectStep {
    pub(crate) fn new(others: Rc<FastHashSet<IdentityKey>>, preserve_keys: bool) -> Self {
        Self {
            others,
            preserve_keys,
            counter: Counter::default(),
        }
    }
}

impl ElementStep for IntersectStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        let matches = value
            .identity_key()
            .is_some_and(|identity| self.others.contains(&identity));
        if !matches {
            return Ok(Emission::new());
        }
        Ok(smallvec![(self.counter.key_for(key, self.preserve_keys), value)])
    }
}

pub(crate) struct FlatMapStep {
    expander: Expander,
    counter: Counter,
}

impl FlatMapStep {
    pub(crate) fn new(expander: Expander) -> Self {
        Self {
            expander,
            counter: Counter::default(),
        }
    }
}

impl ElementStep for FlatMapStep {
    fn step(&mut self, key: Key, value: Value) -> Result<Emission, ChainError> {
        match (self.expander)(value, &key) {
            Value::Array(items) => Ok(items
                .values()
                .map(|item| (self.counter.next_key(), item.clone()))
                .collect()),
            other => Err(ChainError::Type(format!(
                "Passed to flat_map() callback function must return iterable data, got {} for key {key}",
                other.type_name()
            ))),
        }
    }
}

/// Builds the identity set of `values`, used by intersection and difference.
pub(crate) fn identity_set<'a>(values: impl Iterator<Item = &'a Value>) -> FastHashSet<IdentityKey> {
    values.filter_map(Value::identity_key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(step: &mut dyn ElementStep, values: &[Value]) -> Vec<(Key, Value)> {
        values
            .iter()
            .zip(0_i64..)
            .flat_map(|(value, index)| step.step(Key::Int(index), value.clone()).unwrap())
            .collect()
    }

    #[rstest]
    fn test_filter_counter_only_advances_on_kept_items() {
        let mut step = FilterStep::new(None, false);
        let emitted = run(
            &mut step,
            &[Value::from(0), Value::from("a"), Value::from(""), Value::from(2)],
        );
        assert_eq!(
            emitted,
            vec![(Key::from(0), Value::from("a")), (Key::from(1), Value::from(2))]
        );
    }

    #[rstest]
    fn test_slice_position_is_independent_of_keys() {
        let mut step = SliceStep::new(1, 4, 2, true);
        let emitted: Vec<Key> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|name| step.step(Key::from(*name), Value::from(*name)).unwrap())
            .flat_map(|emission| emission.into_iter().map(|(key, _)| key))
            .collect();
        assert_eq!(emitted, vec![Key::from("b"), Key::from("d")]);
    }

    #[rstest]
    fn test_unique_keeps_every_nan() {
        let mut step = UniqueStep::new(false);
        let emitted = run(
            &mut step,
            &[Value::from(f64::NAN), Value::from(f64::NAN), Value::from(1.0), Value::from(1.0)],
        );
        assert_eq!(emitted.len(), 3);
    }

    #[rstest]
    fn test_flat_map_rejects_non_iterable() {
        let mut step = FlatMapStep::new(Rc::new(|value: Value, _: &Key| value));
        let error = step.step(Key::from(0), Value::from(5)).unwrap_err();
        assert!(matches!(error, ChainError::Type(message) if message.contains("must return iterable data")));
    }

    #[rstest]
    fn test_flip_rejects_compound_values() {
        let error = FlipStep.step(Key::from(0), Value::array([1])).unwrap_err();
        assert!(matches!(error, ChainError::InvalidArgument(_)));
    }
}
