use super::{Key, Value};
use crate::sequence::IndexedSequence;

/// An object value: a class name plus named properties.
///
/// Records are what dotted property paths (`address.street`) walk through,
/// while bracketed paths (`[address][street]`) walk arrays.
///
/// # Examples
///
/// ```rust
/// use chainars::{Record, Value};
///
/// let address = Record::new("Address").with("street", "aa").with("number", 11);
/// let person = Record::new("Person")
///     .with("name", "a")
///     .with("address", Value::object(address));
///
/// assert_eq!(person.class(), "Person");
/// assert_eq!(person.property("name"), Some(&Value::from("a")));
/// assert!(person.property("age").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    class: String,
    properties: IndexedSequence,
}

impl Record {
    /// Creates a record without properties.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: IndexedSequence::new(),
        }
    }

    /// Returns the record with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(Key::from(name), value.into());
        self
    }

    /// Returns the class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(&Key::from(name))
    }

    /// Returns all properties in declaration order.
    pub const fn properties(&self) -> &IndexedSequence {
        &self.properties
    }
}
