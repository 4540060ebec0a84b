//! Chainable sequence pipelines.
//!
//! Two execution strategies share one operator set:
//!
//! - [`MutableChain`] queues operators against a persistent base and
//!   returns `&mut Self` from every call. Materializing drains the queue
//!   and resets the chain to its base, so it can be reused.
//! - [`ImmutableChain`] composes every operator immediately into a new lazy
//!   node and returns a new chain. The original is never modified.
//!
//! # Examples
//!
//! ```rust
//! use chainars::{Value, chain, values};
//!
//! let mut mutable = chain::of(values![1, 2, 3, 4]).unwrap();
//! let evens = mutable
//!     .filter(|value| value.as_int().is_some_and(|number| number % 2 == 0))
//!     .to_array()
//!     .unwrap();
//! assert_eq!(evens.len(), 2);
//! // The pipeline was reset to the base contents
//! assert_eq!(mutable.size().unwrap(), 4);
//!
//! let base = chain::immutable(values![3, 1, 2]).unwrap();
//! let sorted = base.sort_values(Default::default());
//! assert_eq!(sorted.to_array().unwrap().values().next(), Some(&Value::from(1)));
//! assert_eq!(base.to_array().unwrap().values().next(), Some(&Value::from(3)));
//! ```

mod immutable;
mod mutable;

pub use immutable::ImmutableChain;
pub use mutable::MutableChain;

use crate::error::ChainError;
use crate::memo::{MemoizingSequence, Source};
use crate::pipeline::Evaluator;
use crate::sequence::IndexedSequence;
use crate::value::Value;

/// Creates a [`MutableChain`] over `source`.
///
/// # Errors
///
/// Returns [`ChainError::Initialization`] if a deferred source fails.
pub fn of(source: impl Into<Source>) -> Result<MutableChain, ChainError> {
    MutableChain::of(source)
}

/// Creates an [`ImmutableChain`] over `source`.
///
/// # Errors
///
/// Returns [`ChainError::Initialization`] if a deferred source fails.
pub fn immutable(source: impl Into<Source>) -> Result<ImmutableChain, ChainError> {
    ImmutableChain::of(source)
}

/// Operands accepted by `merge`, `intersect`, `intersect_keep_indexes` and
/// `diff`.
///
/// Converting may materialize a chain, which can fail.
pub trait IntoSequence {
    /// Materializes the operand.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while materializing.
    fn into_sequence(self) -> Result<IndexedSequence, ChainError>;
}

impl IntoSequence for IndexedSequence {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        Ok(self)
    }
}

impl<T: Into<Value>> IntoSequence for Vec<T> {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        Ok(IndexedSequence::from_values(self.into_iter().map(Into::into)))
    }
}

/// An array contributes its entries, any other value is a single element.
impl IntoSequence for Value {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        match self {
            Self::Array(items) => Ok(IndexedSequence::clone(&items)),
            other => Ok(IndexedSequence::from_values([other])),
        }
    }
}

impl IntoSequence for &MemoizingSequence {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        Evaluator::materialize(self)
    }
}

impl IntoSequence for &ImmutableChain {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        self.to_array()
    }
}

impl IntoSequence for ImmutableChain {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        self.to_array()
    }
}

impl IntoSequence for &mut MutableChain {
    fn into_sequence(self) -> Result<IndexedSequence, ChainError> {
        self.to_array()
    }
}

impl IntoSequence for MutableChain {
    fn into_sequence(mut self) -> Result<IndexedSequence, ChainError> {
        self.to_array()
    }
}

/// An immutable chain is read lazily through a cursor of its tip.
impl From<&ImmutableChain> for Source {
    fn from(chain: &ImmutableChain) -> Self {
        Self::Iterator(Box::new(chain.iter()))
    }
}

impl From<ImmutableChain> for Source {
    fn from(chain: ImmutableChain) -> Self {
        Self::from(&chain)
    }
}

/// A mutable chain is drained; its pipeline resets.
impl From<&mut MutableChain> for Source {
    fn from(chain: &mut MutableChain) -> Self {
        Self::Iterator(Box::new(chain.iter()))
    }
}

/// Builds the base sequence for the dynamic constructors.
fn sequence_from_value(value: Value) -> Result<IndexedSequence, ChainError> {
    match value {
        Value::Array(items) => Ok(IndexedSequence::clone(&items)),
        Value::Null => Ok(IndexedSequence::new()),
        other => Err(ChainError::Construction(format!(
            "a chain can only be built from an array, an iterator or another chain, got {}",
            other.type_name()
        ))),
    }
}

/// Builds the base sequence for the variadic constructors.
///
/// A single array argument contributes its entries, anything else is a list.
fn sequence_from_arguments(values: Vec<Value>) -> IndexedSequence {
    if let [Value::Array(items)] = values.as_slice() {
        return IndexedSequence::clone(items);
    }
    IndexedSequence::from_values(values)
}
