//! Error types for chain construction and evaluation.
//!
//! Every fallible operation in this crate returns [`ChainError`]. Static
//! arguments (a sort direction code, a slice step, a property path) are
//! checked when the operator is built; data-dependent conditions are checked
//! lazily, while the pipeline is being materialized.

use thiserror::Error;

/// Errors raised while building or evaluating a chain.
///
/// # Examples
///
/// ```rust
/// use chainars::ChainError;
///
/// let error = ChainError::InvalidArgument("Invalid sort direction: 10".to_string());
/// assert_eq!(error.to_string(), "invalid argument: Invalid sort direction: 10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The argument handed to a chain constructor is not a sequence,
    /// an iterable or a chain.
    #[error("invalid constructor argument: {0}")]
    Construction(String),

    /// A memoizing sequence could not obtain an iterator from its source.
    #[error("failed to initialize sequence: {0}")]
    Initialization(String),

    /// An operator received an argument it cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A callback returned a value of the wrong shape.
    #[error("type error: {0}")]
    Type(String),

    /// A caller-supplied source failed while producing an item.
    #[error("source error: {0}")]
    Source(String),

    /// A memoized node was asked for its next item while it was already
    /// pulling one from its source.
    #[error("sequence is already being pulled from its source")]
    ReentrantPull,
}

impl ChainError {
    /// Creates a [`ChainError::Source`] from any displayable error.
    ///
    /// Convenient inside `map_err` when adapting a fallible iterator into a
    /// [`Source`](crate::memo::Source).
    pub fn source(error: impl std::fmt::Display) -> Self {
        Self::Source(error.to_string())
    }
}
