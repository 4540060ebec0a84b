//! Property-based tests for chain laws.
//!
//! This module verifies that chains satisfy:
//!
//! - **Idempotence**: materializing a node twice gives the same result
//! - **Involution**: reverse and flip undo themselves
//! - **Agreement**: mutable and immutable chains compute the same result
//! - **Bounds**: slice and unique never invent elements
//! - **Ordering**: sorting over mixed keys and numbers yields an ordered result
//! - **Memoization**: a source is pulled at most once per item

use chainars::{Direction, ImmutableChain, IndexedSequence, Key, MemoizingSequence, MutableChain, Source, Value};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

fn ints(sequence: &IndexedSequence) -> Vec<i64> {
    sequence.values().filter_map(Value::as_int).collect()
}

// =============================================================================
// Idempotence Law
// =============================================================================

proptest! {
    /// Idempotence: a node gives the same output every time it is materialized
    #[test]
    fn prop_materialize_idempotence(values in prop::collection::vec(-50_i64..50, 0..40)) {
        let chain = ImmutableChain::from_values(values)
            .unique(false)
            .sort_values(Direction::Descending)
            .mix_seeded(3);

        let first = chain.to_array().unwrap();
        let second = chain.to_array().unwrap();

        prop_assert_eq!(first, second);
    }
}

proptest! {
    /// Idempotence: a mutable chain drained twice with the same pipeline
    /// gives the same output
    #[test]
    fn prop_mutable_drain_idempotence(values in prop::collection::vec(any::<i64>(), 0..40)) {
        let mut chain = MutableChain::from_values(values);

        let first = chain.reverse(false).values().to_array().unwrap();
        let second = chain.reverse(false).values().to_array().unwrap();

        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// Involution Laws
// =============================================================================

proptest! {
    /// Involution: reverse(true) applied twice is the identity
    #[test]
    fn prop_reverse_preserving_keys_twice(values in prop::collection::vec(any::<i64>(), 0..40)) {
        let chain = ImmutableChain::from_values(values);

        let twice = chain.reverse(true).reverse(true).to_array().unwrap();

        prop_assert_eq!(twice, chain.to_array().unwrap());
    }
}

proptest! {
    /// Involution: reverse(false) applied twice is the identity on lists
    #[test]
    fn prop_reverse_renumbering_twice(values in prop::collection::vec(any::<i64>(), 0..40)) {
        let chain = ImmutableChain::from_values(values);

        let twice = chain.reverse(false).reverse(false).to_array().unwrap();

        prop_assert_eq!(twice, chain.to_array().unwrap());
    }
}

proptest! {
    /// Involution: flip applied twice is the identity when values are unique
    #[test]
    fn prop_flip_twice_with_unique_values(values in prop::collection::hash_set(any::<i64>(), 0..40)) {
        let chain = ImmutableChain::from_values(values);

        let twice = chain.flip().flip().to_array().unwrap();

        prop_assert_eq!(twice, chain.to_array().unwrap());
    }
}

// =============================================================================
// Agreement Law
// =============================================================================

proptest! {
    /// Agreement: both chain flavors compute the same pipeline
    #[test]
    fn prop_mutable_and_immutable_agree(
        values in prop::collection::vec(-20_i64..20, 0..40),
        threshold in -20_i64..20,
    ) {
        let keep = move |value: &Value| value.as_int().is_some_and(|number| number >= threshold);

        let immutable = ImmutableChain::from_values(values.clone())
            .filter(keep)
            .unique(true)
            .sort_values(Direction::Ascending)
            .append(100)
            .to_array()
            .unwrap();
        let mutable = MutableChain::from_values(values)
            .filter(keep)
            .unique(true)
            .sort_values(Direction::Ascending)
            .append(100)
            .to_array()
            .unwrap();

        prop_assert_eq!(immutable, mutable);
    }
}

// =============================================================================
// Bounds Laws
// =============================================================================

proptest! {
    /// Bounds: slice keeps exactly the positions in range
    #[test]
    fn prop_slice_bounds(
        values in prop::collection::vec(any::<i64>(), 0..60),
        start in 0_usize..70,
        length in 0_usize..70,
    ) {
        let chain = ImmutableChain::from_values(values.clone());

        let sliced = chain.slice(start, Some(start + length), 1, false).unwrap().to_array().unwrap();

        let expected: Vec<i64> = values.into_iter().skip(start).take(length).collect();
        prop_assert_eq!(ints(&sliced), expected);
        prop_assert!(sliced.is_list());
    }
}

proptest! {
    /// Bounds: unique keeps first occurrences in their original order
    #[test]
    fn prop_unique_keeps_first_occurrences(values in prop::collection::vec(-10_i64..10, 0..60)) {
        let chain = ImmutableChain::from_values(values.clone());

        let unique = chain.unique(false).to_array().unwrap();

        let mut seen = HashSet::new();
        let expected: Vec<i64> = values.into_iter().filter(|value| seen.insert(*value)).collect();
        prop_assert_eq!(ints(&unique), expected);
    }
}

proptest! {
    /// Bounds: sort_values keeps every element and orders the values
    #[test]
    fn prop_sort_values_is_a_permutation(values in prop::collection::vec(any::<i64>(), 0..60)) {
        let sorted = ImmutableChain::from_values(values.clone())
            .sort_values(Direction::Ascending)
            .to_array()
            .unwrap();

        let mut expected = values;
        expected.sort_unstable();
        prop_assert_eq!(ints(&sorted), expected);
    }
}

proptest! {
    /// Bounds: merging two lists gives a list holding both, in order
    #[test]
    fn prop_merge_lists(
        left in prop::collection::vec(any::<i64>(), 0..30),
        right in prop::collection::vec(any::<i64>(), 0..30),
    ) {
        let merged = ImmutableChain::from_values(left.clone())
            .merge(right.iter().copied().map(Value::from).collect::<Vec<_>>())
            .unwrap()
            .to_array()
            .unwrap();

        let expected: Vec<i64> = left.into_iter().chain(right).collect();
        prop_assert_eq!(ints(&merged), expected);
        prop_assert!(merged.is_list());
    }
}

// =============================================================================
// Ordering Laws
// =============================================================================

fn mixed_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        (-50_i64..50).prop_map(Key::from),
        (-50_i64..50).prop_map(|number| Key::from(number.to_string())),
        (-50_i64..50).prop_map(|number| Key::from(format!("{number}a"))),
        (-50_i64..50).prop_map(|number| Key::from(format!("{number}.5"))),
        "[a-z]{1,3}".prop_map(Key::from),
    ]
}

fn mixed_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        (-3_i64..3).prop_map(|offset| Value::from((1_i64 << 53) + offset)),
        (-3_i64..3).prop_map(|offset| Value::from(9_007_199_254_740_992.0 + offset as f64)),
    ]
}

proptest! {
    /// Ordering: sort_keys over int, numeric-string and text keys never
    /// fails and orders every neighbouring pair
    #[test]
    fn prop_sort_keys_over_mixed_keys(keys in prop::collection::vec(mixed_key(), 0..200)) {
        let sequence: IndexedSequence = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| (key, Value::from(index.to_string())))
            .collect();
        let length = sequence.len();

        let sorted = MutableChain::from_sequence(sequence)
            .sort_keys(Direction::Ascending)
            .to_array()
            .unwrap();

        prop_assert_eq!(sorted.len(), length);
        let keys: Vec<&Key> = sorted.keys().collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0].natural_cmp(pair[1]).is_le());
        }
    }
}

proptest! {
    /// Ordering: sort_values over large integers and floats orders every
    /// neighbouring pair
    #[test]
    fn prop_sort_values_over_mixed_numbers(values in prop::collection::vec(mixed_number(), 0..200)) {
        let sorted = ImmutableChain::from_values(values.clone())
            .sort_values(Direction::Ascending)
            .to_array()
            .unwrap();

        prop_assert_eq!(sorted.len(), values.len());
        let values: Vec<&Value> = sorted.values().collect();
        for pair in values.windows(2) {
            prop_assert!(pair[0].natural_cmp(pair[1]).is_le());
        }
    }
}

// =============================================================================
// Memoization Law
// =============================================================================

proptest! {
    /// Memoization: any series of prefix traversals pulls each item once
    #[test]
    fn prop_source_pulled_at_most_once(
        length in 0_i64..30,
        prefixes in prop::collection::vec(0_usize..40, 1..8),
    ) {
        let pulls = Rc::new(Cell::new(0_usize));
        let counter = Rc::clone(&pulls);
        let source = Source::from_pairs((0..length).map(move |index| {
            counter.set(counter.get() + 1);
            (Key::from(index), Value::from(index))
        }));
        let sequence = MemoizingSequence::new(source).unwrap();

        let mut furthest = 0;
        for prefix in prefixes {
            let taken = sequence.iter().take(prefix).count();
            furthest = furthest.max(taken);
        }

        prop_assert_eq!(pulls.get(), furthest);
        prop_assert_eq!(sequence.cached_len(), furthest);
    }
}
