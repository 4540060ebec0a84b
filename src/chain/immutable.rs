//! The copy-on-write chain.

use std::cmp::Ordering;

use super::{IntoSequence, sequence_from_arguments, sequence_from_value};
use crate::access::{PropertyAccessor, PropertyPath};
use crate::error::ChainError;
use crate::memo::{MemoizingSequence, SequenceCursor, Source};
use crate::operator::{Direction, Operator};
use crate::pipeline::Evaluator;
use crate::sequence::IndexedSequence;
use crate::value::{Key, Value};

/// A chain whose operations return new chains.
///
/// Each call composes one operator onto the current tip and returns a chain
/// over the new node; `self` is left untouched. Because every node memoizes
/// its output, materializing a chain twice yields the same result and runs
/// `for_each` callbacks only once.
///
/// Cloning shares the tip.
///
/// # Examples
///
/// ```rust
/// use chainars::{ImmutableChain, Value, values};
///
/// let base = ImmutableChain::of(values![1, 2, 3]).unwrap();
/// let appended = base.append(4);
///
/// assert_eq!(base.size().unwrap(), 3);
/// assert_eq!(appended.size().unwrap(), 4);
/// assert_eq!(appended.to_array().unwrap(), appended.to_array().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ImmutableChain {
    sequence: MemoizingSequence,
}

impl ImmutableChain {
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
    pub const fn from_base(sequence: MemoizingSequence) -> Self {
        Self { sequence }
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
    /// # Errors
    ///
    /// Returns [`ChainError::Construction`] unless `value` is an array or
    /// `Null`.
    pub fn try_from_value(value: Value) -> Result<Self, ChainError> {
        sequence_from_value(value).map(Self::from_sequence)
    }

    /// Creates a chain from an argument list.
    pub fn values_of(values: Vec<Value>) -> Self {
        Self::from_sequence(sequence_from_arguments(values))
    }

    /// Returns the memoized tip.
    pub const fn sequence(&self) -> &MemoizingSequence {
        &self.sequence
    }

    /// Returns a chain with `operator` composed onto this one.
    #[must_use]
    pub fn apply(&self, operator: Operator) -> Self {
        Self::from_base(Evaluator::compose(&self.sequence, &operator))
    }

    // =========================================================================
    // Per-element operators
    // =========================================================================

    /// Replaces every value with `mapper(value)`. Keys are kept.
    #[must_use]
    pub fn map<F>(&self, mapper: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.apply(Operator::map(mapper))
    }

    /// Keeps the elements `predicate` accepts, re-indexed.
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.apply(Operator::filter(predicate, false))
    }

    /// Keeps the elements `predicate` accepts.
    #[must_use]
    pub fn filter_with<F>(&self, predicate: F, preserve_keys: bool) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.apply(Operator::filter(predicate, preserve_keys))
    }

    /// Keeps the truthy elements.
    #[must_use]
    pub fn filter_values(&self, preserve_keys: bool) -> Self {
        self.apply(Operator::filter_truthy(preserve_keys))
    }

    /// Calls `visitor(value, key)` for each element the first time this
    /// node is materialized.
    #[must_use]
    pub fn for_each<F>(&self, visitor: F) -> Self
    where
        F: Fn(&Value, &Key) + 'static,
    {
        self.apply(Operator::for_each(visitor))
    }

    /// Swaps keys and values. Later duplicates win.
    #[must_use]
    pub fn flip(&self) -> Self {
        self.apply(Operator::flip())
    }

    /// Replaces the elements with their keys.
    #[must_use]
    pub fn keys(&self) -> Self {
        self.apply(Operator::keys())
    }

    /// Re-indexes the values `0..n`.
    #[must_use]
    pub fn values(&self) -> Self {
        self.apply(Operator::values())
    }

    /// Drops values strictly equal to an earlier value.
    #[must_use]
    pub fn unique(&self, preserve_keys: bool) -> Self {
        self.apply(Operator::unique(preserve_keys))
    }

    /// Keeps every `step`-th position in `start..stop`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] when `step` is zero.
    pub fn slice(
        &self,
        start: usize,
        stop: Option<usize>,
        step: usize,
        preserve_keys: bool,
    ) -> Result<Self, ChainError> {
        Operator::slice(start, stop, step, preserve_keys).map(|operator| self.apply(operator))
    }

    /// Keeps the values strictly equal to a value of `others`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn intersect(
        &self,
        others: impl IntoSequence,
        preserve_keys: bool,
    ) -> Result<Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::intersect(&others, preserve_keys)))
    }

    /// Like [`ImmutableChain::intersect`], keeping the original keys.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn intersect_keep_indexes(&self, others: impl IntoSequence) -> Result<Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::intersect_keep_indexes(others)))
    }

    /// Replaces each element with the entries of the array `expander` returns.
    #[must_use]
    pub fn flat_map<F>(&self, expander: F) -> Self
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
    pub fn merge(&self, others: impl IntoSequence) -> Result<Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::merge(others)))
    }

    /// Adds `value` under the next integer key.
    #[must_use]
    pub fn append(&self, value: impl Into<Value>) -> Self {
        self.apply(Operator::append(value.into()))
    }

    /// Adds `value` in front under key `0`.
    #[must_use]
    pub fn prepend(&self, value: impl Into<Value>) -> Self {
        self.apply(Operator::prepend(value.into()))
    }

    /// Sorts by natural value order.
    #[must_use]
    pub fn sort_values(&self, direction: Direction) -> Self {
        self.apply(Operator::sort_values(direction))
    }

    /// Sorts values with `comparator`.
    #[must_use]
    pub fn sort_values_by<F>(&self, comparator: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + 'static,
    {
        self.apply(Operator::sort_values_by(comparator))
    }

    /// Sorts by natural key order.
    #[must_use]
    pub fn sort_keys(&self, direction: Direction) -> Self {
        self.apply(Operator::sort_keys(direction))
    }

    /// Sorts keys with `comparator`.
    #[must_use]
    pub fn sort_keys_by<F>(&self, comparator: F) -> Self
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
    pub fn sort_by_property(&self, path: &str, direction: Direction) -> Result<Self, ChainError> {
        let path = PropertyPath::parse(path)?;
        Ok(self.apply(Operator::sort_by_property(path, direction)))
    }

    /// Like [`ImmutableChain::sort_by_property`], resolving with `accessor`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] for a malformed path.
    pub fn sort_by_property_with<A>(
        &self,
        path: &str,
        direction: Direction,
        accessor: A,
    ) -> Result<Self, ChainError>
    where
        A: PropertyAccessor + 'static,
    {
        let path = PropertyPath::parse(path)?;
        Ok(self.apply(Operator::sort_by_property_with(path, direction, accessor)))
    }

    /// Reverses the order.
    #[must_use]
    pub fn reverse(&self, preserve_keys: bool) -> Self {
        self.apply(Operator::reverse(preserve_keys))
    }

    /// Drops the values strictly equal to a value of `others`.
    ///
    /// # Errors
    ///
    /// Returns any error raised while materializing `others`.
    pub fn diff(&self, others: impl IntoSequence) -> Result<Self, ChainError> {
        let others = others.into_sequence()?;
        Ok(self.apply(Operator::diff(others)))
    }

    /// Shuffles once; the shuffled order is memoized with the node.
    #[must_use]
    pub fn mix(&self) -> Self {
        self.apply(Operator::mix())
    }

    /// Shuffles the values reproducibly.
    #[must_use]
    pub fn mix_seeded(&self, seed: u64) -> Self {
        self.apply(Operator::mix_seeded(seed))
    }

    /// Writes `value` under `key`.
    #[must_use]
    pub fn set_value(&self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.apply(Operator::set_value(key.into(), value.into()))
    }

    /// Deletes `key`.
    #[must_use]
    pub fn remove(&self, key: impl Into<Key>) -> Self {
        self.apply(Operator::remove(key.into()))
    }

    /// Replaces the elements with a count of each distinct value.
    #[must_use]
    pub fn frequency_analysis(&self) -> Self {
        self.apply(Operator::frequency_analysis())
    }

    /// Materializes into a chain over a plain sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn to_chain(&self) -> Result<Self, ChainError> {
        self.to_array().map(Self::from_sequence)
    }

    // =========================================================================
    // Terminal operations
    // =========================================================================

    /// Returns a lazy cursor over the tip.
    pub fn iter(&self) -> SequenceCursor {
        self.sequence.iter()
    }

    /// Materializes the tip.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn to_array(&self) -> Result<IndexedSequence, ChainError> {
        Evaluator::materialize(&self.sequence)
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn size(&self) -> Result<usize, ChainError> {
        self.to_array().map(|sequence| sequence.len())
    }

    /// Returns `true` when there are no entries.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn is_empty(&self) -> Result<bool, ChainError> {
        self.to_array().map(|sequence| sequence.is_empty())
    }

    /// Returns `true` when `key` is present.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn has_key(&self, key: impl Into<Key>) -> Result<bool, ChainError> {
        let key = key.into();
        self.to_array().map(|sequence| sequence.contains_key(&key))
    }

    /// Stops pulling at the first value strictly equal to `value`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised before a match is found.
    pub fn has_value(&self, value: &Value) -> Result<bool, ChainError> {
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
    pub fn get_value(&self, key: impl Into<Key>) -> Result<Option<Value>, ChainError> {
        let key = key.into();
        self.to_array().map(|sequence| sequence.get(&key).cloned())
    }

    /// Returns the key of the first value strictly equal to `value`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn search(&self, value: &Value) -> Result<Option<Key>, ChainError> {
        self.to_array()
            .map(|sequence| sequence.position_of(value).cloned())
    }

    /// Folds the values with `reducer`, starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    pub fn reduce<F>(&self, reducer: F, initial: impl Into<Value>) -> Result<Value, ChainError>
    where
        F: FnMut(Value, Value) -> Value,
    {
        let sequence = self.to_array()?;
        Ok(sequence.into_values().into_iter().fold(initial.into(), reducer))
    }
}

impl<'a> IntoIterator for &'a ImmutableChain {
    type Item = crate::memo::PairResult;
    type IntoIter = SequenceCursor;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for ImmutableChain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let sequence = self.to_array().map_err(serde::ser::Error::custom)?;
        serde::Serialize::serialize(&sequence, serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;

    #[rstest]
    fn test_operations_leave_the_original_untouched() {
        let base = ImmutableChain::from_values([3, 1, 2]);
        let before = base.to_array().unwrap();

        let sorted = base.sort_values(Direction::Ascending);

        assert!(!sorted.sequence().ptr_eq(base.sequence()));
        assert_eq!(base.to_array().unwrap(), before);
    }

    #[rstest]
    fn test_for_each_runs_once_per_node() {
        let visits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&visits);
        let chain = ImmutableChain::from_values([1, 2, 3])
            .for_each(move |_, _| counter.set(counter.get() + 1));

        let _ = chain.to_array().unwrap();
        let _ = chain.to_array().unwrap();

        assert_eq!(visits.get(), 3);
    }

    #[rstest]
    fn test_chain_over_chain_shares_the_tip() {
        let first = ImmutableChain::from_values([1, 2]).append(3);
        let second = ImmutableChain::of(&first).unwrap().append(4);

        assert_eq!(second.size().unwrap(), 4);
        assert!(first.sequence().is_exhausted());
    }

    #[rstest]
    fn test_mix_is_memoized_per_node() {
        let mixed = ImmutableChain::from_values(0..50).mix();
        assert_eq!(mixed.to_array().unwrap(), mixed.to_array().unwrap());
    }
}
