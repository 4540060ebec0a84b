//! Literal macros for values and sequences.

/// Builds a `Vec<Value>` from a list of convertible literals.
///
/// # Examples
///
/// ```rust
/// use chainars::{Value, values};
///
/// let list = values![1, "two", 3.0, true];
/// assert_eq!(list[1], Value::from("two"));
/// assert!(values![].is_empty());
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

/// Builds an [`IndexedSequence`](crate::IndexedSequence) from `key => value`
/// pairs.
///
/// Repeated keys follow the usual overwrite rule: the value is replaced at
/// the position of the first occurrence.
///
/// # Examples
///
/// ```rust
/// use chainars::{Key, Value, sequence};
///
/// let sequence = sequence! { 10 => "b", 23 => "a", "test" => "c" };
/// assert_eq!(sequence.len(), 3);
/// assert_eq!(sequence.get(&Key::from("test")), Some(&Value::from("c")));
/// ```
#[macro_export]
macro_rules! sequence {
    () => {
        $crate::IndexedSequence::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        <$crate::IndexedSequence as ::core::iter::FromIterator<($crate::Key, $crate::Value)>>::from_iter([
            $(($crate::Key::from($key), $crate::Value::from($value))),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::{Key, Value};
    use rstest::rstest;

    #[rstest]
    fn test_values_converts_each_literal() {
        assert_eq!(
            values![1, "a", false],
            vec![Value::from(1), Value::from("a"), Value::from(false)]
        );
    }

    #[rstest]
    fn test_sequence_keeps_first_position_of_repeated_key() {
        let sequence = sequence! { "a" => 1, "b" => 2, "a" => 3 };
        assert_eq!(
            sequence.keys().cloned().collect::<Vec<_>>(),
            vec![Key::from("a"), Key::from("b")]
        );
        assert_eq!(sequence.get(&Key::from("a")), Some(&Value::from(3)));
    }

    #[rstest]
    fn test_empty_sequence() {
        assert!(sequence! {}.is_empty());
    }
}
