//! Lazy composition of operators over memoizing sequences.
//!
//! [`Evaluator::compose`] never evaluates anything: it wraps a stage
//! iterator reading from a fresh cursor of the input into a new
//! [`MemoizingSequence`]. Work happens only when that node is pulled.
//!
//! - A per-element stage pulls one upstream pair at a time and buffers the
//!   pairs its step emits. It stops pulling once the step is finished.
//! - A whole-sequence stage drains its upstream on the first pull, applies
//!   the transform once, then yields the result.
//!
//! A stage that failed keeps returning the same error. Retrying a failed
//! node therefore reports the failure again instead of silently resuming
//! past the item that caused it.
//!
//! # Examples
//!
//! ```rust
//! use chainars::{Evaluator, MemoizingSequence, Operator, Value};
//!
//! let base = MemoizingSequence::new(vec![3, 1, 2]).unwrap();
//! let pipeline = [
//!     Operator::map(|value| Value::from(value.as_int().unwrap_or(0) * 10)),
//!     Operator::sort_values(Default::default()),
//! ];
//!
//! let tip = Evaluator::compose_all(&base, &pipeline);
//! assert_eq!(tip.cached_len(), 0);
//!
//! let result = Evaluator::materialize(&tip).unwrap();
//! let values: Vec<i64> = result.values().filter_map(Value::as_int).collect();
//! assert_eq!(values, vec![10, 20, 30]);
//! ```

use smallvec::IntoIter as EmissionIter;

use crate::error::ChainError;
use crate::memo::{MemoizingSequence, PairResult, SequenceCursor};
use crate::operator::{Body, ElementStep, Emission, Operator, SequenceTransform};
use crate::sequence::IndexedSequence;
use crate::value::{Key, Value};

/// Threads memoizing sequences through operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Returns a new node that applies `operator` to `input` on demand.
    pub fn compose(input: &MemoizingSequence, operator: &Operator) -> MemoizingSequence {
        tracing::debug!(operator = %operator.kind(), "composing operator");
        let upstream = input.iter();
        match operator.body() {
            Body::PerElement(factory) => MemoizingSequence::from_iterator(Box::new(ElementStage {
                upstream,
                step: factory(),
                pending: Emission::new().into_iter(),
                failure: None,
            })),
            Body::WholeSequence(transform) => {
                MemoizingSequence::from_iterator(Box::new(WholeSequenceStage {
                    upstream: Some(upstream),
                    transform: transform.clone(),
                    output: None,
                    failure: None,
                }))
            }
        }
    }

    /// Folds [`Evaluator::compose`] over `operators` in order.
    pub fn compose_all<'a, I>(base: &MemoizingSequence, operators: I) -> MemoizingSequence
    where
        I: IntoIterator<Item = &'a Operator>,
    {
        operators
            .into_iter()
            .fold(base.clone(), |tip, operator| Self::compose(&tip, operator))
    }

    /// Pulls every pair of `sequence` into an [`IndexedSequence`].
    ///
    /// Duplicate keys collapse, last write wins.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while pulling.
    pub fn materialize(sequence: &MemoizingSequence) -> Result<IndexedSequence, ChainError> {
        sequence.iter().collect()
    }

    /// Composes `operators` onto `base` and materializes the result.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while pulling.
    pub fn evaluate(
        base: &MemoizingSequence,
        operators: &[Operator],
    ) -> Result<IndexedSequence, ChainError> {
        Self::materialize(&Self::compose_all(base, operators))
    }
}

// =============================================================================
// Stages
// =============================================================================

struct ElementStage {
    upstream: SequenceCursor,
    step: Box<dyn ElementStep>,
    pending: EmissionIter<[(Key, Value); 1]>,
    failure: Option<ChainError>,
}

impl Iterator for ElementStage {
    type Item = PairResult;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = &self.failure {
            return Some(Err(error.clone()));
        }
        loop {
            if let Some(pair) = self.pending.next() {
                return Some(Ok(pair));
            }
            if self.step.is_finished() {
                return None;
            }
            let outcome = match self.upstream.next()? {
                Ok((key, value)) => self.step.step(key, value),
                Err(error) => Err(error),
            };
            match outcome {
                Ok(emission) => self.pending = emission.into_iter(),
                Err(error) => {
                    self.failure = Some(error.clone());
                    return Some(Err(error));
                }
            }
        }
    }
}

struct WholeSequenceStage {
    upstream: Option<SequenceCursor>,
    transform: SequenceTransform,
    output: Option<std::vec::IntoIter<(Key, Value)>>,
    failure: Option<ChainError>,
}

impl WholeSequenceStage {
    fn run(&mut self) -> Result<(), ChainError> {
        let Some(upstream) = self.upstream.take() else {
            return Ok(());
        };
        let input: IndexedSequence = upstream.collect::<Result<_, _>>()?;
        tracing::trace!(len = input.len(), "applying whole-sequence transform");
        let output = (self.transform)(input)?;
        self.output = Some(output.into_iter());
        Ok(())
    }
}

impl Iterator for WholeSequenceStage {
    type Item = PairResult;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = &self.failure {
            return Some(Err(error.clone()));
        }
        if let Err(error) = self.run() {
            self.failure = Some(error.clone());
            return Some(Err(error));
        }
        self.output.as_mut()?.next().map(Ok)
    }
}
