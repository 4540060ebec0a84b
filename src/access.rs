//! Property-path access into nested values.
//!
//! `sort_by_property` orders elements by a value found somewhere inside each
//! element. The location is written as a [`PropertyPath`]:
//!
//! - `name.street` walks object properties,
//! - `[address][street]` walks array entries,
//! - `address.home[number]` mixes both.
//!
//! Resolution goes through the [`PropertyAccessor`] trait so callers can plug
//! in their own lookup rules; [`PathAccessor`] is the default.
//!
//! # Examples
//!
//! ```rust
//! use chainars::{PathAccessor, PropertyAccessor, PropertyPath, Record, Value};
//!
//! let home = Value::array([11, 12]);
//! let person = Value::object(Record::new("Person").with("home", home));
//!
//! let path = PropertyPath::parse("home[0]").unwrap();
//! assert_eq!(PathAccessor.resolve(&person, &path), Ok(Value::from(11)));
//! ```

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

use crate::error::ChainError;
use crate::value::{Key, Value};

/// One step of a [`PropertyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A dotted object property, `name` in `person.name`.
    Property(Rc<str>),
    /// A bracketed array index, `name` in `[name]`.
    Index(Rc<str>),
}

impl Segment {
    /// Array key addressed by an index segment.
    ///
    /// Integer-looking indices address integer keys.
    fn key(index: &str) -> Key {
        index
            .parse::<i64>()
            .map_or_else(|_| Key::from(index), Key::Int)
    }
}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    source: Rc<str>,
    segments: Vec<Segment>,
}

impl PropertyPath {
    /// Parses a dotted and/or bracketed property path.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidArgument`] for an empty path, an empty
    /// or unclosed bracket, a stray `]`, or a dot that is not followed by a
    /// property name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chainars::PropertyPath;
    ///
    /// assert_eq!(PropertyPath::parse("address.home[number]").unwrap().len(), 3);
    /// assert!(PropertyPath::parse("address.").is_err());
    /// assert!(PropertyPath::parse("[address").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, ChainError> {
        let malformed = |reason: &str| {
            ChainError::InvalidArgument(format!("Malformed property path \"{source}\": {reason}"))
        };

        if source.is_empty() {
            return Err(malformed("path is empty"));
        }

        let mut segments = Vec::new();
        let mut rest = source;
        let mut after_dot = false;
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('[') {
                if after_dot {
                    return Err(malformed("a dot must be followed by a property name"));
                }
                let end = inner.find(']').ok_or_else(|| malformed("unclosed bracket"))?;
                let index = &inner[..end];
                if index.is_empty() || index.contains('[') {
                    return Err(malformed("brackets must hold a single index"));
                }
                segments.push(Segment::Index(Rc::from(index)));
                rest = &inner[end + 1..];
            } else if let Some(remaining) = rest.strip_prefix('.') {
                if segments.is_empty() || after_dot {
                    return Err(malformed("unexpected dot"));
                }
                after_dot = true;
                rest = remaining;
                continue;
            } else {
                if !segments.is_empty() && !after_dot {
                    return Err(malformed("a property name must follow a dot"));
                }
                let end = rest.find(['.', '[', ']']).unwrap_or(rest.len());
                if end == 0 {
                    return Err(malformed("unexpected ']'"));
                }
                segments.push(Segment::Property(Rc::from(&rest[..end])));
                rest = &rest[end..];
            }
            after_dot = false;
        }

        if after_dot {
            return Err(malformed("path ends with a dot"));
        }
        Ok(Self {
            source: Rc::from(source),
            segments,
        })
    }

    /// Returns the parsed segments in walking order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for PropertyPath {
    type Err = ChainError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.source)
    }
}

/// Failure to resolve a [`PropertyPath`] against a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// A dotted segment met a value without that property.
    #[error("Could not read property \"{property}\" of path \"{path}\"")]
    PropertyNotFound {
        /// The full path being resolved.
        path: String,
        /// The missing property.
        property: String,
    },
    /// A bracketed segment met a value without that index.
    #[error("Could not read index \"{index}\" of path \"{path}\"")]
    IndexNotFound {
        /// The full path being resolved.
        path: String,
        /// The missing index.
        index: String,
    },
}

impl From<AccessError> for ChainError {
    fn from(error: AccessError) -> Self {
        Self::InvalidArgument(error.to_string())
    }
}

/// Resolves property paths against values.
///
/// Implemented for every `Fn(&Value, &PropertyPath) -> Result<Value, AccessError>`,
/// so a closure can stand in for a full accessor.
pub trait PropertyAccessor {
    /// Returns the value found at `path` inside `value`.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessError`] naming the first segment that could not be
    /// read.
    fn resolve(&self, value: &Value, path: &PropertyPath) -> Result<Value, AccessError>;
}

impl<F> PropertyAccessor for F
where
    F: Fn(&Value, &PropertyPath) -> Result<Value, AccessError>,
{
    fn resolve(&self, value: &Value, path: &PropertyPath) -> Result<Value, AccessError> {
        self(value, path)
    }
}

/// The default accessor.
///
/// Dotted segments read [`Record`](crate::Record) properties, bracketed
/// segments read array entries. Reading a property of anything but an
/// object, or an index of anything but an array, is a resolution failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathAccessor;

impl PropertyAccessor for PathAccessor {
    fn resolve(&self, value: &Value, path: &PropertyPath) -> Result<Value, AccessError> {
        let mut current = value.clone();
        for segment in path.segments() {
            current = match segment {
                Segment::Property(name) => current
                    .as_object()
                    .and_then(|record| record.property(name))
                    .cloned()
                    .ok_or_else(|| AccessError::PropertyNotFound {
                        path: path.to_string(),
                        property: name.to_string(),
                    })?,
                Segment::Index(index) => current
                    .as_array()
                    .and_then(|items| items.get(&Segment::key(index)))
                    .cloned()
                    .ok_or_else(|| AccessError::IndexNotFound {
                        path: path.to_string(),
                        index: index.to_string(),
                    })?,
            };
        }
        Ok(current)
    }
}
