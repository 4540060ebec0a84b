#![cfg(feature = "serde")]

//! Integration tests for serde support in chainars.
//!
//! Lists serialize as JSON arrays, any other sequence as a JSON object, and
//! an immutable chain serializes its materialized output.

use chainars::{ImmutableChain, IndexedSequence, Key, MutableChain, Record, Value, sequence, values};
use rstest::rstest;

// =============================================================================
// IndexedSequence
// =============================================================================

#[rstest]
fn test_list_serializes_as_array() {
    let list = IndexedSequence::from_values(values![1, 2]);

    assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2]");
}

#[rstest]
fn test_keyed_sequence_serializes_as_object() {
    let keyed = sequence! { "a" => 1, 5 => "x" };

    assert_eq!(serde_json::to_string(&keyed).unwrap(), r#"{"a":1,"5":"x"}"#);
}

#[rstest]
fn test_keyed_sequence_json_roundtrip() {
    let keyed = sequence! { "name" => "a", 3 => 1.5, "nested" => sequence! { 0 => true, 1 => Value::Null } };

    let json = serde_json::to_string(&keyed).unwrap();
    let restored: IndexedSequence = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, keyed);
    assert_eq!(restored.get(&Key::from(3)), Some(&Value::from(1.5)));
}

#[rstest]
fn test_array_json_becomes_list() {
    let restored: IndexedSequence = serde_json::from_str(r#"[1, "two", null]"#).unwrap();

    assert!(restored.is_list());
    assert_eq!(restored.into_values(), vec![Value::from(1), Value::from("two"), Value::Null]);
}

// =============================================================================
// Value
// =============================================================================

#[rstest]
#[case(Value::Null, "null")]
#[case(Value::from(true), "true")]
#[case(Value::from(-3), "-3")]
#[case(Value::from("text"), r#""text""#)]
#[case(Value::array([1, 2]), "[1,2]")]
fn test_value_serialization(#[case] value: Value, #[case] expected: &str) {
    assert_eq!(serde_json::to_string(&value).unwrap(), expected);
}

#[rstest]
fn test_record_serializes_its_properties() {
    let record = Value::object(Record::new("Person").with("name", "a").with("age", 1));

    assert_eq!(
        serde_json::to_string(&record).unwrap(),
        r#"{"name":"a","age":1}"#
    );
}

// =============================================================================
// ImmutableChain
// =============================================================================

#[rstest]
fn test_chain_serializes_its_output() {
    let chain = ImmutableChain::values_of(values![1, 2]);

    assert_eq!(serde_json::to_string(&chain).unwrap(), "[1,2]");
    assert_eq!(
        serde_json::to_string(&chain.reverse(true)).unwrap(),
        r#"{"1":2,"0":1}"#
    );
}

#[rstest]
fn test_failing_chain_reports_a_serialization_error() {
    let chain = ImmutableChain::values_of(vec![Value::array([1])]).flip();

    assert!(serde_json::to_string(&chain).is_err());
}

// =============================================================================
// MutableChain
// =============================================================================

#[rstest]
fn test_mutable_chain_serializes_its_output() {
    let chain = MutableChain::values_of(values![1, 2]);

    assert_eq!(serde_json::to_string(&chain).unwrap(), "[1,2]");
}

#[rstest]
fn test_mutable_chain_serializes_its_queued_pipeline() {
    let mut chain = MutableChain::values_of(values![1, 2]);
    chain.reverse(true);

    assert_eq!(serde_json::to_string(&chain).unwrap(), r#"{"1":2,"0":1}"#);
    assert_eq!(chain.pending_operators().len(), 1);
}

#[rstest]
fn test_failing_mutable_chain_reports_a_serialization_error() {
    let mut chain = MutableChain::values_of(vec![Value::array([1])]);
    chain.flip();

    assert!(serde_json::to_string(&chain).is_err());
}
