//! # chainars
//!
//! Lazy, chainable transformations over ordered key-value sequences.
//!
//! ## Overview
//!
//! A chain wraps an ordered collection of `(Key, Value)` pairs and lets you
//! compose a pipeline of operations that only runs when the result is
//! materialized:
//!
//! - **Sequences**: [`IndexedSequence`], an insertion-ordered map with
//!   last-write-wins keys, and the dynamic [`Value`] it stores
//! - **Memoization**: [`MemoizingSequence`] pulls each item from its source
//!   at most once and replays it for every later cursor
//! - **Operators**: per-element (`map`, `filter`, `slice`, ...) and
//!   whole-sequence (`sort_values`, `merge`, `reverse`, ...) [`Operator`]s
//! - **Chains**: [`MutableChain`] queues operators on itself,
//!   [`ImmutableChain`] returns a new chain from every call
//! - **Property access**: [`PropertyPath`] and [`PropertyAccessor`] for
//!   `sort_by_property`
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for values and sequences,
//!   `Serialize` for immutable chains
//! - `fxhash`: use `rustc-hash` for the internal key and identity indexes
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use chainars::prelude::*;
//!
//! let result = chain::of(values![1, 1, 3, 2, 3])
//!     .unwrap()
//!     .unique(false)
//!     .sort_values(Direction::Descending)
//!     .values()
//!     .to_array()
//!     .unwrap();
//!
//! assert_eq!(result.into_values(), values![3, 2, 1]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types, traits and macros.
///
/// # Usage
///
/// ```rust
/// use chainars::prelude::*;
/// ```
pub mod prelude {
    pub use crate::access::{PathAccessor, PropertyAccessor, PropertyPath};
    pub use crate::chain::{self, ImmutableChain, IntoSequence, MutableChain};
    pub use crate::error::ChainError;
    pub use crate::memo::{MemoizingSequence, Source};
    pub use crate::operator::{Direction, Operator, OperatorKind};
    pub use crate::pipeline::Evaluator;
    pub use crate::sequence::IndexedSequence;
    pub use crate::value::{Key, Record, Value};
    pub use crate::{sequence, values};
}

mod macros;

pub mod access;
pub mod chain;
pub mod error;
pub mod memo;
pub mod operator;
pub mod pipeline;
pub mod sequence;
pub mod value;

pub use access::{AccessError, PathAccessor, PropertyAccessor, PropertyPath};
pub use chain::{ImmutableChain, IntoSequence, MutableChain, immutable, of};
pub use error::ChainError;
pub use memo::{MemoizingSequence, PairIterator, PairResult, SequenceCursor, Source};
pub use operator::{Direction, Operator, OperatorKind};
pub use pipeline::Evaluator;
pub use sequence::IndexedSequence;
pub use value::{Key, Record, Value};

/// Hash map used for internal indexes.
#[cfg(feature = "fxhash")]
pub(crate) type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
/// Hash map used for internal indexes.
#[cfg(not(feature = "fxhash"))]
pub(crate) type FastHashMap<K, V> = std::collections::HashMap<K, V>;

/// Hash set used for internal indexes.
#[cfg(feature = "fxhash")]
pub(crate) type FastHashSet<T> = rustc_hash::FxHashSet<T>;
/// Hash set used for internal indexes.
#[cfg(not(feature = "fxhash"))]
pub(crate) type FastHashSet<T> = std::collections::HashSet<T>;
