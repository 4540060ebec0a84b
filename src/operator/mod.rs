//! Operators: the unit of a chain pipeline.
//!
//! An [`Operator`] is an immutable value describing one transformation. Its
//! body is either
//!
//! - **per-element**: a factory that hands out a fresh [`ElementStep`] for
//!   every lazy run, consuming one pair at a time, or
//! - **whole-sequence**: a transform over the fully materialized input.
//!
//! Static arguments (slice step, sort direction, property path syntax) are
//! validated when the operator is built; data-dependent failures surface
//! when it is applied.
//!
//! # Examples
//!
//! ```rust
//! use chainars::{IndexedSequence, Operator, OperatorKind, Value};
//!
//! let double = Operator::map(|value| Value::from(value.as_int().unwrap_or(0) * 2));
//! assert_eq!(double.kind(), OperatorKind::Map);
//! assert!(double.is_per_element());
//!
//! let input = IndexedSequence::from_values([Value::from(1), Value::from(2)]);
//! let output = double.apply_to(input).unwrap();
//! assert_eq!(output.values().cloned().collect::<Vec<_>>(), vec![Value::from(2), Value::from(4)]);
//! ```

mod direction;
mod element;
mod whole;

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

pub use direction::Direction;
pub use element::{ElementStep, Emission};

use element::{
    FilterStep, FlatMapStep, FlipStep, ForEachStep, IntersectStep, KeysStep, MapStep, SliceStep,
    UniqueStep, ValuesStep, identity_set,
};

use crate::access::{PathAccessor, PropertyAccessor, PropertyPath};
use crate::error::ChainError;
use crate::sequence::IndexedSequence;
use crate::value::{Key, Value};

// =============================================================================
// OperatorKind and Attributes
// =============================================================================

/// The transformation an [`Operator`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// Per-element value transform.
    Map,
    /// Per-element predicate filter.
    Filter,
    /// Per-element side effect.
    ForEach,
    /// Swaps keys and values.
    Flip,
    /// Emits the keys as values.
    Keys,
    /// Emits the values re-indexed.
    Values,
    /// Drops repeated values.
    Unique,
    /// Keeps a positional range.
    Slice,
    /// Keeps values present in another sequence.
    Intersect,
    /// Expands each element into several.
    FlatMap,
    /// Concatenates another sequence.
    Merge,
    /// Adds a value at the end.
    Append,
    /// Adds a value at the front.
    Prepend,
    /// Orders by value.
    SortValues,
    /// Orders by key.
    SortKeys,
    /// Orders by a nested property.
    SortByProperty,
    /// Reverses the order.
    Reverse,
    /// Drops values present in another sequence.
    Diff,
    /// Shuffles the values.
    Mix,
    /// Writes one key.
    SetValue,
    /// Deletes one key.
    Remove,
    /// Counts distinct values.
    FrequencyAnalysis,
    /// Keeps values present in another sequence under their original keys.
    IntersectKeepIndexes,
}

impl OperatorKind {
    /// Returns the operation name as used by the chain methods.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Filter => "filter",
            Self::ForEach => "for_each",
            Self::Flip => "flip",
            Self::Keys => "keys",
            Self::Values => "values",
            Self::Unique => "unique",
            Self::Slice => "slice",
            Self::Intersect => "intersect",
            Self::FlatMap => "flat_map",
            Self::Merge => "merge",
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::SortValues => "sort_values",
            Self::SortKeys => "sort_keys",
            Self::SortByProperty => "sort_by_property",
            Self::Reverse => "reverse",
            Self::Diff => "diff",
            Self::Mix => "mix",
            Self::SetValue => "set_value",
            Self::Remove => "remove",
            Self::FrequencyAnalysis => "frequency_analysis",
            Self::IntersectKeepIndexes => "intersect_keep_indexes",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Literal arguments an operator was built with.
///
/// Callables are not part of the attributes; they live in the operator body.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    /// Sort direction.
    pub direction: Option<Direction>,
    /// First selected position of a slice.
    pub start: Option<usize>,
    /// Exclusive end position of a slice, `None` when unbounded.
    pub stop: Option<usize>,
    /// Distance between selected positions of a slice.
    pub step: Option<usize>,
    /// Whether original keys are kept instead of re-indexing.
    pub preserve_keys: bool,
    /// Literal value for `append`, `prepend` and `set_value`.
    pub value: Option<Value>,
    /// Literal key for `set_value` and `remove`.
    pub key: Option<Key>,
    /// Property path for `sort_by_property`.
    pub path: Option<PropertyPath>,
    /// Shuffle seed for `mix`.
    pub seed: Option<u64>,
}

// =============================================================================
// Operator
// =============================================================================

/// Produces a fresh per-element strategy.
pub type StepFactory = Rc<dyn Fn() -> Box<dyn ElementStep>>;

/// Transforms a materialized sequence.
pub type SequenceTransform = Rc<dyn Fn(IndexedSequence) -> Result<IndexedSequence, ChainError>>;

/// The executable part of an [`Operator`].
#[derive(Clone)]
pub enum Body {
    /// Consumes one pair at a time.
    PerElement(StepFactory),
    /// Consumes the whole input.
    WholeSequence(SequenceTransform),
}

/// One immutable step of a chain pipeline.
///
/// Cloning is cheap: bodies and captured operands are reference counted.
#[derive(Clone)]
pub struct Operator {
    kind: OperatorKind,
    attributes: Attributes,
    body: Body,
}

impl Operator {
    fn per_element<F>(kind: OperatorKind, attributes: Attributes, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ElementStep> + 'static,
    {
        Self {
            kind,
            attributes,
            body: Body::PerElement(Rc::new(factory)),
        }
    }

    fn whole_sequence<F>(kind: OperatorKind, attributes: Attributes, transform: F) -> Self
    where
        F: Fn(IndexedSequence) -> Result<IndexedSequence, ChainError> + 'static,
    {
        Self {
            kind,
            attributes,
            body: Body::WholeSequence(Rc::new(transform)),
        }
    }

    /// Returns what this operator does.
    pub const fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// Returns the literal arguments this operator was built with.
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the executable body.
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns `true` when the operator consumes one pair at a time.
    pub const fn is_per_element(&self) -> bool {
        matches!(self.body, Body::PerElement(_))
    }

    /// Applies this operator eagerly to a materialized sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the operator body.
    pub fn apply_to(&self, sequence: IndexedSequence) -> Result<IndexedSequence, ChainError> {
        match &self.body {
            Body::PerElement(factory) => {
                let mut step = factory();
                let mut output = IndexedSequence::with_capacity(sequence.len());
                for (key, value) in sequence {
                    if step.is_finished() {
                        break;
                    }
                    output.extend(step.step(key, value)?);
                }
                Ok(output)
            }
            Body::WholeSequence(transform) => transform(sequence),
        }
    }

    // =========================================================================
    // Per-element operators
    // =========================================================================

    /// `(k, v) -> (k, mapper(v))`.
    pub fn map<F>(mapper: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        let mapper: element::Mapper = Rc::new(mapper);
        Self::per_element(OperatorKind::Map, Attributes::default(), move || {
            Box::new(MapStep {
                mapper: Rc::clone(&mapper),
            })
        })
    }

    /// Keeps the elements `predicate` accepts.
    pub fn filter<F>(predicate: F, preserve_keys: bool) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        let predicate: element::Predicate = Rc::new(predicate);
        Self::build_filter(Some(predicate), preserve_keys)
    }

    /// Keeps the truthy elements.
    pub fn filter_truthy(preserve_keys: bool) -> Self {
        Self::build_filter(None, preserve_keys)
    }

    fn build_filter(predicate: Option<element::Predicate>, preserve_keys: bool) -> Self {
        let attributes = Attributes {
            preserve_keys,
            ..Attributes::default()
        };
        Self::per_element(OperatorKind::Filter, attributes, move || {
            Box::new(FilterStep::new(predicate.clone(), preserve_keys))
        })
    }

    /// Calls `visitor(value, key)` for every element and passes it through.
    pub fn for_each<F>(visitor: F) -> Self
    where
        F: Fn(&Value, &Key) + 'static,
    {
        let visitor: element::Visitor = Rc::new(visitor);
        Self::per_element(OperatorKind::ForEach, Attributes::default(), move || {
            Box::new(ForEachStep {
                visitor: Rc::clone(&visitor),
            })
        })
    }

    /// `(k, v) -> (v, k)`.
    pub fn flip() -> Self {
        Self::per_element(OperatorKind::Flip, Attributes::default(), || Box::new(FlipStep))
    }

    /// Emits the keys as values, re-indexed.
    pub fn keys() -> Self {
        Self::per_element(OperatorKind::Keys, Attributes::default(), || {
            Box::new(KeysStep::default())
        })
    }

    /// Emits the values, re-indexed.
    pub fn values() -> Self {
        Self::per_element(OperatorKind::Values, Attributes::default(), || {
            Box::new(ValuesStep::default())
        })
    }

    /// Keeps the first occurrence of each strictly distinct value.
    pub fn unique(preserve_keys: bool) -> Self {
        let attributes = Attributes {
            preserve_keys,
            ..Attributes::default()
        };
        Self::per_element(OperatorKind::Unique, attributes, move || {
            Box::new(UniqueStep::new(preserve_keys))
        })
    }

    /// Keeps every `step`-th position in `start..stop`.
    ///
    /// Positions count elements, not keys. `stop: None` runs to the end.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] when `step` is zero.
    pub fn slice(
        start: usize,
        stop: Option<usize>,
        step: usize,
        preserve_keys: bool,
    ) -> Result<Self, ChainError> {
        if step == 0 {
            return Err(ChainError::InvalidArgument(
                "Slice step must be greater than zero".to_owned(),
            ));
        }
        let attributes = Attributes {
            start: Some(start),
            stop,
            step: Some(step),
            preserve_keys,
            ..Attributes::default()
        };
        let end = stop.unwrap_or(usize::MAX);
        Ok(Self::per_element(OperatorKind::Slice, attributes, move || {
            Box::new(SliceStep::new(start, end, step, preserve_keys))
        }))
    }

    /// Keeps the elements whose value strictly equals a value of `others`.
    pub fn intersect(others: &IndexedSequence, preserve_keys: bool) -> Self {
        let matching = Rc::new(identity_set(others.values()));
        let attributes = Attributes {
            preserve_keys,
            ..Attributes::default()
        };
        Self::per_element(OperatorKind::Intersect, attributes, move || {
            Box::new(IntersectStep::new(Rc::clone(&matching), preserve_keys))
        })
    }

    /// Replaces each element by the entries of the array `expander` returns.
    ///
    /// A non-array result fails the run with [`ChainError::Type`].
    pub fn flat_map<F>(expander: F) -> Self
    where
        F: Fn(Value, &Key) -> Value + 'static,
    {
        let expander: element::Expander = Rc::new(expander);
        Self::per_element(OperatorKind::FlatMap, Attributes::default(), move || {
            Box::new(FlatMapStep::new(Rc::clone(&expander)))
        })
    }

    // =========================================================================
    // Whole-sequence operators
    // =========================================================================

    /// Concatenates `others`, renumbering integer keys.
    pub fn merge(others: IndexedSequence) -> Self {
        let others = Rc::new(others);
        Self::whole_sequence(OperatorKind::Merge, Attributes::default(), move |sequence| {
            whole::merge(sequence, &others)
        })
    }

    /// Adds `value` under the next integer key.
    pub fn append(value: Value) -> Self {
        let attributes = Attributes {
            value: Some(value.clone()),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::Append, attributes, move |sequence| {
            whole::append(sequence, value.clone())
        })
    }

    /// Adds `value` under key `0`, shifting integer keys up by one.
    ///
    /// An existing key `-1` shifts onto `0` and overwrites the new value.
    /// An existing key `i64::MAX` cannot shift and fails the evaluation
    /// with [`ChainError::InvalidArgument`].
    pub fn prepend(value: Value) -> Self {
        let attributes = Attributes {
            value: Some(value.clone()),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::Prepend, attributes, move |sequence| {
            whole::prepend(sequence, value.clone())
        })
    }

    /// Stable sort by natural value order.
    pub fn sort_values(direction: Direction) -> Self {
        let attributes = Attributes {
            direction: Some(direction),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::SortValues, attributes, move |sequence| {
            Ok(whole::sort_values(sequence, None, direction))
        })
    }

    /// Stable sort by `comparator` over values.
    pub fn sort_values_by<F>(comparator: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + 'static,
    {
        let comparator: whole::ValueComparator = Rc::new(comparator);
        Self::whole_sequence(OperatorKind::SortValues, Attributes::default(), move |sequence| {
            Ok(whole::sort_values(sequence, Some(&comparator), Direction::Ascending))
        })
    }

    /// Stable sort by natural key order.
    pub fn sort_keys(direction: Direction) -> Self {
        let attributes = Attributes {
            direction: Some(direction),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::SortKeys, attributes, move |sequence| {
            Ok(whole::sort_keys(sequence, None, direction))
        })
    }

    /// Stable sort by `comparator` over keys.
    pub fn sort_keys_by<F>(comparator: F) -> Self
    where
        F: Fn(&Key, &Key) -> Ordering + 'static,
    {
        let comparator: whole::KeyComparator = Rc::new(comparator);
        Self::whole_sequence(OperatorKind::SortKeys, Attributes::default(), move |sequence| {
            Ok(whole::sort_keys(sequence, Some(&comparator), Direction::Ascending))
        })
    }

    /// Stable sort by the value found at `path`, read with [`PathAccessor`].
    pub fn sort_by_property(path: PropertyPath, direction: Direction) -> Self {
        Self::sort_by_property_with(path, direction, PathAccessor)
    }

    /// Stable sort by the value found at `path`, read with `accessor`.
    ///
    /// Resolution failures surface as [`ChainError::InvalidArgument`] when
    /// the operator is applied.
    pub fn sort_by_property_with<A>(path: PropertyPath, direction: Direction, accessor: A) -> Self
    where
        A: PropertyAccessor + 'static,
    {
        let attributes = Attributes {
            direction: Some(direction),
            path: Some(path.clone()),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::SortByProperty, attributes, move |sequence| {
            whole::sort_by_property(sequence, &path, direction, &accessor)
        })
    }

    /// Reverses the order.
    pub fn reverse(preserve_keys: bool) -> Self {
        let attributes = Attributes {
            preserve_keys,
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::Reverse, attributes, move |sequence| {
            Ok(whole::reverse(sequence, preserve_keys))
        })
    }

    /// Drops the elements whose value strictly equals a value of `others`.
    pub fn diff(others: IndexedSequence) -> Self {
        let others = Rc::new(others);
        Self::whole_sequence(OperatorKind::Diff, Attributes::default(), move |sequence| {
            whole::diff(sequence, &others)
        })
    }

    /// Shuffles the values and re-indexes them.
    pub fn mix() -> Self {
        Self::whole_sequence(OperatorKind::Mix, Attributes::default(), |sequence| {
            Ok(whole::mix(sequence, None))
        })
    }

    /// Shuffles the values reproducibly.
    pub fn mix_seeded(seed: u64) -> Self {
        let attributes = Attributes {
            seed: Some(seed),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::Mix, attributes, move |sequence| {
            Ok(whole::mix(sequence, Some(seed)))
        })
    }

    /// Writes `value` under `key`, in place or at the end.
    pub fn set_value(key: Key, value: Value) -> Self {
        let attributes = Attributes {
            key: Some(key.clone()),
            value: Some(value.clone()),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::SetValue, attributes, move |sequence| {
            Ok(whole::set_value(sequence, key.clone(), value.clone()))
        })
    }

    /// Deletes `key`.
    pub fn remove(key: Key) -> Self {
        let attributes = Attributes {
            key: Some(key.clone()),
            ..Attributes::default()
        };
        Self::whole_sequence(OperatorKind::Remove, attributes, move |sequence| {
            Ok(whole::remove(sequence, &key))
        })
    }

    /// Counts each distinct scalar value.
    pub fn frequency_analysis() -> Self {
        Self::whole_sequence(
            OperatorKind::FrequencyAnalysis,
            Attributes::default(),
            |sequence| whole::frequency_analysis(&sequence),
        )
    }

    /// Keeps the elements whose value strictly equals a value of `others`,
    /// under their original keys.
    pub fn intersect_keep_indexes(others: IndexedSequence) -> Self {
        let others = Rc::new(others);
        Self::whole_sequence(
            OperatorKind::IntersectKeepIndexes,
            Attributes {
                preserve_keys: true,
                ..Attributes::default()
            },
            move |sequence| Ok(whole::intersect_keep_indexes(sequence, &others)),
        )
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Operator")
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .field("per_element", &self.is_per_element())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    fn int_values(sequence: &IndexedSequence) -> Vec<i64> {
        sequence.values().filter_map(Value::as_int).collect()
    }

    #[rstest]
    fn test_slice_rejects_zero_step() {
        assert!(matches!(
            Operator::slice(0, None, 0, false),
            Err(ChainError::InvalidArgument(_))
        ));
    }

    #[rstest]
    fn test_slice_over_range() {
        let input = IndexedSequence::from_values((0..=100).map(Value::from));
        let sliced = Operator::slice(2, Some(5), 2, false)
            .unwrap()
            .apply_to(input)
            .unwrap();
        assert_eq!(int_values(&sliced), vec![2, 4]);
    }

    #[rstest]
    fn test_each_application_gets_a_fresh_step() {
        let unique = Operator::unique(false);
        let input = IndexedSequence::from_values([1, 1, 2].map(Value::from));

        let first = unique.apply_to(input.clone()).unwrap();
        let second = unique.apply_to(input).unwrap();

        assert_eq!(first, second);
        assert_eq!(int_values(&second), vec![1, 2]);
    }

    #[rstest]
    fn test_for_each_visits_every_element_once() {
        let visits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&visits);
        let operator = Operator::for_each(move |_, _| counter.set(counter.get() + 1));

        operator
            .apply_to(IndexedSequence::from_values([1, 2, 3].map(Value::from)))
            .unwrap();

        assert_eq!(visits.get(), 3);
    }

    #[rstest]
    fn test_attributes_record_literals() {
        let operator = Operator::set_value(Key::from("a"), Value::from(1));
        assert_eq!(operator.kind(), OperatorKind::SetValue);
        assert_eq!(operator.attributes().key, Some(Key::from("a")));
        assert!(!operator.is_per_element());
    }

    #[rstest]
    fn test_sort_by_property_reports_path_lazily() {
        let path = PropertyPath::parse("[missing]").unwrap();
        let operator = Operator::sort_by_property(path, Direction::Ascending);
        let input = IndexedSequence::from_values([Value::array([1])]);

        let error = operator.apply_to(input).unwrap_err();

        assert!(matches!(error, ChainError::InvalidArgument(message) if message.contains("[missing]")));
    }

    #[rstest]
    #[case(OperatorKind::FlatMap, "flat_map")]
    #[case(OperatorKind::IntersectKeepIndexes, "intersect_keep_indexes")]
    fn test_kind_display(#[case] kind: OperatorKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }
}
