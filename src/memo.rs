//! Memoizing lazy sequences.
//!
//! This module provides [`MemoizingSequence`], a wrapper around a one-shot
//! source of `(Key, Value)` pairs that can be traversed any number of times
//! by any number of independent cursors. Each item is pulled from the source
//! at most once and cached; later traversals replay the cache and only pull
//! what no cursor has reached yet.
//!
//! # Examples
//!
//! ```rust
//! use chainars::{Key, MemoizingSequence, Source, Value};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let pulls = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&pulls);
//! let source = Source::from_pairs((0..10).map(move |index| {
//!     counter.set(counter.get() + 1);
//!     (Key::from(index), Value::from(index))
//! }));
//! let sequence = MemoizingSequence::new(source).unwrap();
//!
//! // Stop after the first item
//! assert_eq!(sequence.iter().take(1).count(), 1);
//! assert_eq!(pulls.get(), 1);
//!
//! // A full traversal only pulls the remaining nine
//! assert_eq!(sequence.iter().count(), 10);
//! assert_eq!(sequence.iter().count(), 10);
//! assert_eq!(pulls.get(), 10);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ChainError;
use crate::sequence::IndexedSequence;
use crate::value::{Key, Value};

/// One item produced by a source or a cursor.
pub type PairResult = Result<(Key, Value), ChainError>;

/// A boxed one-shot iterator of fallible pairs.
pub type PairIterator = Box<dyn Iterator<Item = PairResult>>;

/// A factory that produces a pair iterator when a sequence is created.
pub type DeferredSource = Box<dyn FnOnce() -> Result<PairIterator, Box<dyn std::error::Error>>>;

// =============================================================================
// Source
// =============================================================================

/// The origin of a [`MemoizingSequence`].
pub enum Source {
    /// An already materialized sequence.
    Sequence(IndexedSequence),
    /// A one-shot iterator of pairs.
    Iterator(PairIterator),
    /// An object that produces an iterator on request, which may fail.
    Deferred(DeferredSource),
}

impl Source {
    /// Creates a source from an infallible iterator of pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Key, Value)>,
        I::IntoIter: 'static,
    {
        Self::Iterator(Box::new(pairs.into_iter().map(Ok)))
    }

    /// Creates a source from a fallible iterator of pairs.
    ///
    /// Errors are converted with [`ChainError::source`] and surface to the
    /// cursor that pulls the failing item.
    pub fn try_from_pairs<I, E>(pairs: I) -> Self
    where
        I: IntoIterator<Item = Result<(Key, Value), E>>,
        I::IntoIter: 'static,
        E: fmt::Display,
    {
        Self::Iterator(Box::new(
            pairs.into_iter().map(|pair| pair.map_err(ChainError::source)),
        ))
    }

    /// Creates a source from a lazy iterator of values, keyed `0..n`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
        I::IntoIter: 'static,
    {
        Self::Iterator(Box::new(
            (0_i64..)
                .zip(values)
                .map(|(index, value)| Ok((Key::Int(index), value.into()))),
        ))
    }

    /// Creates a source that asks `factory` for its iterator.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<PairIterator, Box<dyn std::error::Error>> + 'static,
    {
        Self::Deferred(Box::new(factory))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(sequence) => formatter.debug_tuple("Sequence").field(sequence).finish(),
            Self::Iterator(_) => formatter.write_str("Iterator(..)"),
            Self::Deferred(_) => formatter.write_str("Deferred(..)"),
        }
    }
}

impl From<IndexedSequence> for Source {
    fn from(sequence: IndexedSequence) -> Self {
        Self::Sequence(sequence)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Source {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(IndexedSequence::from_values(
            values.into_iter().map(Into::into),
        ))
    }
}

impl From<PairIterator> for Source {
    fn from(iterator: PairIterator) -> Self {
        Self::Iterator(iterator)
    }
}

// =============================================================================
// MemoizingSequence
// =============================================================================

struct Node {
    cache: RefCell<Vec<(Key, Value)>>,
    /// `None` once the source is exhausted.
    source: RefCell<Option<PairIterator>>,
}

/// A lazily pulled, cached, multi-cursor sequence of pairs.
///
/// Cloning a `MemoizingSequence` is cheap and shares the cache and the
/// source: both handles observe the same items.
///
/// # Invariants
///
/// - The source is advanced at most once per item.
/// - The cache only grows, in the order items were produced.
/// - A failed pull caches nothing.
#[derive(Clone)]
pub struct MemoizingSequence {
    node: Rc<Node>,
}

static_assertions::assert_not_impl_any!(MemoizingSequence: Send, Sync);

impl MemoizingSequence {
    /// Wraps `source` into a memoizing sequence.
    ///
    /// A [`Source::Deferred`] factory is invoked immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Initialization`] if a deferred source fails to
    /// produce its iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::{ChainError, MemoizingSequence, Source};
    ///
    /// let failing = Source::deferred(|| Err("no iterator".into()));
    /// assert!(matches!(
    ///     MemoizingSequence::new(failing),
    ///     Err(ChainError::Initialization(_))
    /// ));
    /// ```
    pub fn new(source: impl Into<Source>) -> Result<Self, ChainError> {
        match source.into() {
            Source::Sequence(sequence) => Ok(Self::from_sequence(sequence)),
            Source::Iterator(iterator) => Ok(Self::from_iterator(iterator)),
            Source::Deferred(factory) => factory().map(Self::from_iterator).map_err(|error| {
                ChainError::Initialization(format!(
                    "deferred source failed to produce an iterator: {error}"
                ))
            }),
        }
    }

    /// Creates an already exhausted sequence holding `sequence`.
    pub fn from_sequence(sequence: IndexedSequence) -> Self {
        Self {
            node: Rc::new(Node {
                cache: RefCell::new(sequence.into_iter().collect()),
                source: RefCell::new(None),
            }),
        }
    }

    /// Creates a sequence that pulls from `iterator` on demand.
    pub fn from_iterator(iterator: PairIterator) -> Self {
        Self {
            node: Rc::new(Node {
                cache: RefCell::new(Vec::new()),
                source: RefCell::new(Some(iterator)),
            }),
        }
    }

    /// Creates an empty sequence.
    pub fn empty() -> Self {
        Self::from_sequence(IndexedSequence::new())
    }

    /// Returns a new cursor positioned before the first item.
    pub fn iter(&self) -> SequenceCursor {
        SequenceCursor {
            node: Rc::clone(&self.node),
            position: 0,
        }
    }

    /// Returns how many items have been pulled and cached so far.
    pub fn cached_len(&self) -> usize {
        self.node.cache.borrow().len()
    }

    /// Returns `true` once the source has reported its end.
    ///
    /// While a pull is in progress the sequence is reported as not
    /// exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.node
            .source
            .try_borrow()
            .is_ok_and(|source| source.is_none())
    }

    /// Returns `true` when both handles share the same cache.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl Node {
    fn cached(&self, position: usize) -> Option<(Key, Value)> {
        self.cache.borrow().get(position).cloned()
    }

    fn pull(&self) -> Option<PairResult> {
        let Ok(mut slot) = self.source.try_borrow_mut() else {
            return Some(Err(ChainError::ReentrantPull));
        };
        let source = slot.as_mut()?;
        match source.next() {
            None => {
                *slot = None;
                tracing::trace!(cached = self.cache.borrow().len(), "source exhausted");
                None
            }
            Some(Ok(pair)) => {
                let mut cache = self.cache.borrow_mut();
                cache.push(pair.clone());
                tracing::trace!(cached = cache.len(), key = %pair.0, "pulled item from source");
                Some(Ok(pair))
            }
            Some(Err(error)) => {
                tracing::debug!(%error, "source failed while producing an item");
                Some(Err(error))
            }
        }
    }
}

impl fmt::Debug for MemoizingSequence {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MemoizingSequence")
            .field("cached", &self.cached_len())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

impl<'a> IntoIterator for &'a MemoizingSequence {
    type Item = PairResult;
    type IntoIter = SequenceCursor;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// SequenceCursor
// =============================================================================

/// An independent position within a [`MemoizingSequence`].
///
/// A cursor first replays cached items, then pulls new items from the
/// source, caching them for every other cursor. A cursor that hits an error
/// does not advance, so the next call retries the same position.
pub struct SequenceCursor {
    node: Rc<Node>,
    position: usize,
}

impl SequenceCursor {
    /// Returns the number of items this cursor has yielded.
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for SequenceCursor {
    type Item = PairResult;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pair) = self.node.cached(self.position) {
            self.position += 1;
            return Some(Ok(pair));
        }
        let pulled = self.node.pull()?;
        if pulled.is_ok() {
            self.position += 1;
        }
        Some(pulled)
    }
}

impl fmt::Debug for SequenceCursor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SequenceCursor")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    fn counted_source(length: i64, pulls: &Rc<Cell<usize>>) -> Source {
        let counter = Rc::clone(pulls);
        Source::from_pairs((0..length).map(move |index| {
            counter.set(counter.get() + 1);
            (Key::from(index), Value::from(index))
        }))
    }

    fn collect_values(cursor: impl Iterator<Item = PairResult>) -> Vec<i64> {
        cursor
            .map(|pair| pair.unwrap().1.as_int().unwrap())
            .collect()
    }

    #[rstest]
    fn test_partial_then_full_traversals_pull_once() {
        let pulls = Rc::new(Cell::new(0));
        let sequence = MemoizingSequence::new(counted_source(10, &pulls)).unwrap();

        assert_eq!(collect_values(sequence.iter().take(1)), vec![0]);
        assert_eq!(collect_values(sequence.iter().take(5)), vec![0, 1, 2, 3, 4]);
        assert_eq!(collect_values(sequence.iter()), (0..10).collect::<Vec<_>>());
        assert_eq!(collect_values(sequence.iter().take(20)), (0..10).collect::<Vec<_>>());
        assert_eq!(pulls.get(), 10);
        assert!(sequence.is_exhausted());
    }

    #[rstest]
    fn test_interleaved_cursors_share_cache() {
        let pulls = Rc::new(Cell::new(0));
        let sequence = MemoizingSequence::new(counted_source(3, &pulls)).unwrap();
        let mut first = sequence.iter();
        let mut second = sequence.iter();

        assert_eq!(first.next().unwrap().unwrap().1, Value::from(0));
        assert_eq!(first.next().unwrap().unwrap().1, Value::from(1));
        assert_eq!(second.next().unwrap().unwrap().1, Value::from(0));
        assert_eq!(pulls.get(), 2);

        assert_eq!(second.next().unwrap().unwrap().1, Value::from(1));
        assert_eq!(second.next().unwrap().unwrap().1, Value::from(2));
        assert_eq!(first.next().unwrap().unwrap().1, Value::from(2));
        assert!(first.next().is_none());
        assert_eq!(pulls.get(), 3);
    }

    #[rstest]
    fn test_sequence_source_is_cached_up_front() {
        let sequence = MemoizingSequence::new(vec![1, 2, 3]).unwrap();
        assert_eq!(sequence.cached_len(), 3);
        assert!(sequence.is_exhausted());
        assert_eq!(collect_values(sequence.iter()), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_deferred_source_is_opened_immediately() {
        let opened = Rc::new(Cell::new(false));
        let flag = Rc::clone(&opened);
        let sequence = MemoizingSequence::new(Source::deferred(move || {
            flag.set(true);
            Ok(Box::new(std::iter::once(Ok((Key::from(0), Value::from("x"))))) as PairIterator)
        }))
        .unwrap();

        assert!(opened.get());
        assert_eq!(sequence.iter().count(), 1);
    }

    #[rstest]
    fn test_failing_deferred_source_reports_initialization_error() {
        let result = MemoizingSequence::new(Source::deferred(|| Err("test exception".into())));
        assert_eq!(
            result.unwrap_err(),
            ChainError::Initialization(
                "deferred source failed to produce an iterator: test exception".to_string()
            )
        );
    }

    #[rstest]
    fn test_source_error_keeps_cache_valid() {
        let items: Vec<Result<(Key, Value), String>> = vec![
            Ok((Key::from(0), Value::from("a"))),
            Ok((Key::from(1), Value::from("b"))),
            Err("broken item".to_string()),
            Ok((Key::from(3), Value::from("d"))),
        ];
        let sequence = MemoizingSequence::new(Source::try_from_pairs(items)).unwrap();

        let collected: Result<Vec<_>, _> = sequence.iter().collect();
        assert_eq!(collected.unwrap_err(), ChainError::Source("broken item".to_string()));
        assert_eq!(sequence.cached_len(), 2);

        // The next pull continues with whatever the source yields next
        let replayed: Vec<_> = sequence.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[2], (Key::from(3), Value::from("d")));
    }

    #[rstest]
    fn test_clones_share_state() {
        let pulls = Rc::new(Cell::new(0));
        let sequence = MemoizingSequence::new(counted_source(4, &pulls)).unwrap();
        let clone = sequence.clone();

        assert_eq!(sequence.iter().count(), 4);
        assert_eq!(clone.cached_len(), 4);
        assert!(clone.ptr_eq(&sequence));
        assert_eq!(pulls.get(), 4);
    }

    #[rstest]
    fn test_from_values_source_is_lazy() {
        let pulls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulls);
        let sequence = MemoizingSequence::new(Source::from_values((10..20).map(move |value| {
            counter.set(counter.get() + 1);
            value
        })))
        .unwrap();

        let first = sequence.iter().next().unwrap().unwrap();
        assert_eq!(first, (Key::from(0), Value::from(10)));
        assert_eq!(pulls.get(), 1);
    }
}
