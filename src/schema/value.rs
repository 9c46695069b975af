//! Runtime value model for validation input and output.
//!
//! Input arrives as untyped key to value maps (form fields, stored
//! hashes); fields parse entries into the typed variants below.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::errors::FieldError;

/// Untyped input or validated output of one pass
pub type ValueMap = BTreeMap<String, Value>;

/// A single dynamically typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
    List(Vec<ListEntry>),
}

/// One slot of a delimited-list value.
///
/// A bad element never fails the whole field; it is kept in place as
/// an `Invalid` entry so callers can report it positionally.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    Value(Value),
    Invalid(FieldError),
}

/// Discriminant of [`Value`], used for type checks and error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Int,
    Bool,
    Time,
    List,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Str => "string",
            ValueKind::Int => "integer",
            ValueKind::Bool => "boolean",
            ValueKind::Time => "timestamp",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Time(_) => ValueKind::Time,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ListEntry]> {
        match self {
            Value::List(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values.into_iter().map(ListEntry::Value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Value::from("abc").kind(), ValueKind::Str);
        assert_eq!(Value::from(7i64).kind(), ValueKind::Int);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from(Utc::now()).kind(), ValueKind::Time);
    }

    #[test]
    fn test_accessors_reject_other_variants() {
        let v = Value::from("abc");
        assert_eq!(v.as_str(), Some("abc"));
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_bool(), None);
    }

    #[test]
    fn test_list_from_values_wraps_entries() {
        let v = Value::from(vec![Value::from("a"), Value::from("b")]);
        let entries = v.as_list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ListEntry::Value(Value::from("a")));
    }
}
