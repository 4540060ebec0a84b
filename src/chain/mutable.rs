//! The self-mutating chain.

use std::cmp::Ordering;
use std::mem;

use super::{IntoSequence, sequence_from_arguments, sequence_from_value};
use crate::access::{PropertyAccessor, PropertyPath};
use crate::error::ChainError;
use crate::memo::{MemoizingSequence, SequenceCursor, Source};
use crate::operator::{Direction, Operator};
use crate::pipeline::Evaluator;
use crate::sequence::IndexedSequence;
use crate::value::{Key, Value};

#[derive(Debug, Clone, Default)]
enum Pipeline {
    /// Nothing queued, the chain reads its base.
    #[default]
    Fresh,
    /// Operators waiting for the next drain.
    Pending(Vec<Operator>),
}

/// A chain that queues operators on itself.
///
/// Every operator call returns the same `&mut Self`. Any terminal call
/// (`to_array`, `iter`, `size`, ...) drains the queue: the queued operators
/// are composed onto the base, the chain resets to its base, and only then
/// is the composed pipeline evaluated. A failing evaluation therefore still
/// leaves a fresh chain behind.
///
/// # Examples
///
/// ```rust
/// use chainars::{MutableChain, Value, values};
///
/// let mut chain = MutableChain::of(values![1, 2, 3]).unwrap();
/// chain.map(|value| Value::from(value.as_int().unwrap_or(0) + 1)).reverse(false);
/// assert!(!chain.is_fresh());
///
/// let result = chain.to_array().unwrap();
/// assert_eq!(result.values().cloned().collect::<Vec<_>>(), values![4, 3, 2]);
/// assert!(chain.is_fresh());
/// ```
#[derive(Debug, Clone)]
pub struct MutableChain {
    base: MemoizingSequence,
    pipeline: Pipeline,
}

impl MutableChain {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a chain over `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Initialization`] if a deferred source fails.
    pub fn of(source: impl Into<Source>) -> Result<Self, ChainError> {
        MemoizingSequence::new(source).map(Self::from_base)
    }

    /// Creates a chain over an already memoized sequence.
    pub fn from_base(base: MemoizingSequence) -> Self {
        Self {
            base,
            pipeline: Pipeline::Fresh,
        }
    }

    /// Creates a chain over a materialized sequence.
    pub fn from_sequence(sequence: IndexedSequence) -> Self {
        Self::from_base(MemoizingSequence::from_sequence(sequence))
    }

    /// Creates a chain over `values`, keyed `0..n`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::from_sequence(IndexedSequence::from_values(
            values.into_iter().map(Into::into),
        ))
    }

    /// Creates an empty chain.
    pub fn empty() -> Self {
        Self::from_base(MemoizingSequence::empty())
    }

    /// Creates a chain from a dynamic value.
    ///
    /// An array contributes its entries and `Null` gives an empty chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Construction`] for any other value.
    pub fn try_from_value(value: Value) -> Result<Self, ChainError> {
        sequence_from_value(value).map(Self::from_sequence)
    }

    /// Creates a chain from an argument list.
    ///
    /// No arguments give an empty chain and a single array argument
    /// contributes its entries; otherwise the arguments are the elements.
    pub fn values_of(values: Vec<Value>) -> Self {
        Self::from_sequence(sequence_from_arguments(values))
    }

    // =========================================================================
    // Pipeline state
    // =========================================================================

    /// Returns `true` when no operator is queued.
    pub const fn is_fresh(&self) -> bool {
        matches!(self.pipeline, Pipeline::Fresh)
    }

    /// Returns the queued operators, oldest first.
    pub fn pending_operators(&self) -> &[Operator] {
        match &self.pipeline {
            Pipeline::Fresh => &[],
            Pipeline::Pending(operators) => operators,
        }
    }

    /// Queues `operator`.
    pub fn apply(&mut self, operator: Operator) -> &mut Self {
        tracing::debug!(operator = %operator.kind(), "queueing operator");
        match &mut self.pipeline {
            Pipeline::Fresh => self.pipeline = Pipeline::Pending(vec![operator]),
            Pipeline::Pending(operators) => operators.push(operator),
        }
        self
    }

    /// Composes the queued operators and resets the chain to its base.
    fn drain(&mut self) -> MemoizingSequence {
        match mem::take(&mut self.pipeline) {
            Pipeline::Fresh => self.base.clone(),
            Pipeline::Pending(operators) => {
                tracing::debug!(operators = operators.len(), "draining pending pipeline");
                Evaluator::compose_all(&self.base, &operators)
            }
        }
    }

    // =========================================================================
    // Per-element operators
    // =========================================================================

    /// Replaces every value with `mapper(value)`. Keys are kept.
    pub fn map<F>(&mut self, mapper: F) -> &mut Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.apply(Operator::map(mapper))
    }

    /// Keeps the elements `predicate` accepts, re-indexed.
    pub fn filter<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.apply(Operator::filter(predicate, false))
    }

    /// Keeps the elements `predicate` accepts.
    pub fn filter_with<F>(&mut self, predicate: F, preserve_keys: bool) -> &mut Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.apply(Operator::filter(predicate, preserve_keys))
    }

    /// Keeps the truthy elements.
    pub fn filter_values(&mut self, preserve_keys: bool) -> &mut Self {
        self.apply(Operator::filter_truthy(preserve_keys))
    }

    /// Calls `visitor(value, key)` once per element per materialization.
    pub fn for_each<F>(&mut self, visitor: F) -> &mut Self
    where
        F: Fn(&Value, &Key) + 'static,
    {
        self.apply(Operator::for_each(visitor))
    }

    /// Swaps keys and values. Later duplicates win.
    pub fn flip(&mut self) -> &mut Self {
        self.apply(Operator::flip())
    }

    /// Replaces the elements with their keys.
    pub fn keys(&mut self) -> &mut Self {
        self.apply(Operator::keys())
    }

    /// Re-indexes the values `0..n`.
    pub fn values(&mut self) -> &mut Self {
        self.apply(Operator::values())
    }

    /// Drops values strictly equal to an earlier value.
    pub fn unique(&mut self, preserve_keys: bool) -> &mut Self {
        self.apply(Operator::unique(preserve_keys))
    }

    /// Keeps every `step`-th position in `start..stop`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] when `step` is zero.
    pub fn slice(
        &mut self,
        start: usize,
        stop: Option<usize>,
        step: usize,
        preserve_keys: bool,
    ) -> Result<&mut Self, ChainError> {
        let operator = Operator::slice(start, stop, step, preserve_keys)?;
        Ok(self.apply(operator))
    }

    /// Keeps the values strictly equal to a value of `others`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn intersect(
        &mut self,
        others: impl IntoSequence,
        preserve_keys: bool,
    ) -> Result<&mut Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::intersect(&others, preserve_keys)))
    }

    /// Keeps the values strictly equal to a value of `others`, under their
    /// original keys.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn intersect_keep_indexes(
        &mut self,
        others: impl IntoSequence,
    ) -> Result<&mut Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::intersect_keep_indexes(others)))
    }

    /// Replaces each element with the entries of the array `expander`
    /// returns, re-indexed.
    pub fn flat_map<F>(&mut self, expander: F) -> &mut Self
    where
        F: Fn(Value, &Key) -> Value + 'static,
    {
        self.apply(Operator::flat_map(expander))
    }

    // =========================================================================
    // Whole-sequence operators
    // =========================================================================

    /// Appends `others`, renumbering integer keys.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn merge(&mut self, others: impl IntoSequence) -> Result<&mut Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::merge(others)))
    }

    /// Adds `value` under the next integer key.
    pub fn append(&mut self, value: impl Into<Value>) -> &mut Self {
        self.apply(Operator::append(value.into()))
    }

    /// Adds `value` in front under key `0`.
    pub fn prepend(&mut self, value: impl Into<Value>) -> &mut Self {
        self.apply(Operator::prepend(value.into()))
    }

    /// Sorts by natural value order. Keys travel with their values.
    pub fn sort_values(&mut self, direction: Direction) -> &mut Self {
        self.apply(Operator::sort_values(direction))
    }

    /// Sorts values with `comparator`.
    pub fn sort_values_by<F>(&mut self, comparator: F) -> &mut Self
    where
        F: Fn(&Value, &Value) -> Ordering + 'static,
    {
        self.apply(Operator::sort_values_by(comparator))
    }

    /// Sorts by natural key order.
    pub fn sort_keys(&mut self, direction: Direction) -> &mut Self {
        self.apply(Operator::sort_keys(direction))
    }

    /// Sorts keys with `comparator`.
    pub fn sort_keys_by<F>(&mut self, comparator: F) -> &mut Self
    where
        F: Fn(&Key, &Key) -> Ordering + 'static,
    {
        self.apply(Operator::sort_keys_by(comparator))
    }

    /// Sorts by the value found at `path` inside each element.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] for a malformed path.
    /// Elements the path cannot be resolved on fail the materialization.
    pub fn sort_by_property(
        &mut self,
        path: &str,
        direction: Direction,
    ) -> Result<&mut Self, ChainError> {
        let path = PropertyPath::parse(path)?;
        Ok(self.apply(Operator::sort_by_property(path, direction)))
    }

    /// Like [`MutableChain::sort_by_property`], resolving with `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] for a malformed path.
    pub fn sort_by_property_with<A>(
        &mut self,
        path: &str,
        direction: Direction,
        accessor: A,
    ) -> Result<&mut Self, ChainError>
    where
        A: PropertyAccessor + 'static,
    {
        let path = PropertyPath::parse(path)?;
        Ok(self.apply(Operator::sort_by_property_with(path, direction, accessor)))
    }

    /// Reverses the order.
    pub fn reverse(&mut self, preserve_keys: bool) -> &mut Self {
        self.apply(Operator::reverse(preserve_keys))
    }

    /// Drops the values strictly equal to a value of `others`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn diff(&mut self, others: impl IntoSequence) -> Result<&mut Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::diff(others)))
    }

    /// Shuffles the values.
    pub fn mix(&mut self) -> &mut Self {
        self.apply(Operator::mix())
    }

    /// Shuffles the values reproducibly.
    pub fn mix_seeded(&mut self, seed: u64) -> &mut Self {
        self.apply(Operator::mix_seeded(seed))
    }

    /// Writes `value` under `key`.
    pub fn set_value(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> &mut Self {
        self.apply(Operator::set_value(key.into(), value.into()))
    }

    /// Deletes `key`.
    pub fn remove(&mut self, key: impl Into<Key>) -> &mut Self {
        self.apply(Operator::remove(key.into()))
    }

    /// Replaces the elements with a count of each distinct value.
    pub fn frequency_analysis(&mut self) -> &mut Self {
        self.apply(Operator::frequency_analysis())
    }

    /// Materializes into a new, independent chain.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn to_chain(&mut self) -> Result<Self, ChainError> {
        self.to_array().map(Self::from_sequence)
    }

    // =========================================================================
    // Terminal operations
    // =========================================================================

    /// Drains the pipeline into a cursor.
    pub fn iter(&mut self) -> SequenceCursor {
        self.drain().iter()
    }

    /// Drains the pipeline into a materialized sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn to_array(&mut self) -> Result<IndexedSequence, ChainError> {
        Evaluator::materialize(&self.drain())
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn size(&mut self) -> Result<usize, ChainError> {
        self.to_array().map(|sequence| sequence.len())
    }

    /// Returns `true` when there are no entries.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn is_empty(&mut self) -> Result<bool, ChainError> {
        self.to_array().map(|sequence| sequence.is_empty())
    }

    /// Returns `true` when `key` is present.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn has_key(&mut self, key: impl Into<Key>) -> Result<bool, ChainError> {
        let key = key.into();
        self.to_array().map(|sequence| sequence.contains_key(&key))
    }

    /// Returns `true` when a value strictly equals `value`.
    ///
    /// Stops pulling at the first match.
    ///
    /// # Errors
    ///
    /// Returns the first error raised before a match is found.
    pub fn has_value(&mut self, value: &Value) -> Result<bool, ChainError> {
        for pair in self.iter() {
            if pair?.1 == *value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn get_value(&mut self, key: impl Into<Key>) -> Result<Option<Value>, ChainError> {
        let key = key.into();
        self.to_array().map(|sequence| sequence.get(&key).cloned())
    }

    /// Returns the key of the first value strictly equal to `value`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn search(&mut self, value: &Value) -> Result<Option<Key>, ChainError> {
        self.to_array()
            .map(|sequence| sequence.position_of(value).cloned())
    }

    /// Folds the values with `reducer`, starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn reduce<F>(&mut self, reducer: F, initial: impl Into<Value>) -> Result<Value, ChainError>
    where
        F: FnMut(Value, Value) -> Value,
    {
        let sequence = self.to_array()?;
        Ok(sequence.into_values().into_iter().fold(initial.into(), reducer))
    }
}

// =============================================================================
// serde Support
// =============================================================================

/// Serializes the output of the queued pipeline.
///
/// Serializing takes `&self`, so the queue is evaluated but left in place.
#[cfg(feature = "serde")]
impl serde::Serialize for MutableChain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let sequence = Evaluator::evaluate(&self.base, self.pending_operators())
            .map_err(serde::ser::Error::custom)?;
        serde::Serialize::serialize(&sequence, serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;
    use rstest::rstest;

    #[rstest]
    fn test_operator_calls_return_the_same_chain() {
        let mut chain = MutableChain::from_values([1, 2, 3]);
        let address = std::ptr::from_ref(&chain);

        let returned = chain.map(|value| value).flip();

        assert!(std::ptr::eq(std::ptr::from_ref(returned), address));
    }

    #[rstest]
    fn test_operators_queue_until_drained() {
        let mut chain = MutableChain::from_values([1, 2, 3]);
        chain.reverse(false).values();

        assert_eq!(chain.pending_operators().len(), 2);

        let _ = chain.to_array().unwrap();
        assert!(chain.is_fresh());
        assert!(chain.pending_operators().is_empty());
    }

    #[rstest]
    fn test_drain_resets_even_when_evaluation_fails() {
        let mut chain = MutableChain::from_values([Value::array([1])]);
        chain.flip();

        assert!(chain.to_array().is_err());
        assert!(chain.is_fresh());
        assert_eq!(chain.size().unwrap(), 1);
    }

    #[rstest]
    fn test_fresh_drain_returns_base() {
        let mut chain = MutableChain::from_values(["a", "b"]);
        assert_eq!(chain.to_array().unwrap().len(), 2);
        assert_eq!(chain.to_array().unwrap().len(), 2);
    }

    #[rstest]
    fn test_reduce_sums_values() {
        let mut chain = MutableChain::values_of(values![1, 2, 3, 4]);
        let total = chain
            .reduce(
                |carry, item| Value::from(carry.as_int().unwrap_or(0) + item.as_int().unwrap_or(0)),
                0,
            )
            .unwrap();
        assert_eq!(total, Value::from(10));
    }

    #[rstest]
    fn test_try_from_value_rejects_scalars() {
        assert!(matches!(
            MutableChain::try_from_value(Value::from(true)),
            Err(ChainError::Construction(_))
        ));
        assert!(MutableChain::try_from_value(Value::Null).is_ok());
    }
}
