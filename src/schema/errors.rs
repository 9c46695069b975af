//! # Schema Errors
//!
//! Per-field validation errors and the aggregate error raised by
//! [`Schema::check`](crate::schema::Schema::check).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use super::value::ValueKind;

/// Result type for whole-input validation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for a single field pipeline
pub type FieldResult<T> = Result<T, FieldError>;

/// Error produced by one field's validation pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    // ==================
    // Presence
    // ==================
    /// Field is required but absent from the input
    #[error("value is required")]
    Missing,

    // ==================
    // Strings
    // ==================
    /// Value is not a string
    #[error("not a string")]
    NotAString,

    /// String or list shorter than the declared minimum
    #[error("too short, minimum length is {min}")]
    TooShort { min: usize },

    /// String or list longer than the declared maximum
    #[error("too long, maximum length is {max}")]
    TooLong { max: usize },

    /// String lacks the shape of an email address
    #[error("not an email address")]
    NotAnEmail,

    // ==================
    // Integers
    // ==================
    /// String input that does not parse as an integer
    #[error("malformed integer")]
    MalformedInteger,

    /// Value is neither an integer nor an integer string
    #[error("not an integer")]
    NotAnInteger,

    /// Integer below the declared minimum
    #[error("too small, minimum is {min}")]
    TooSmall { min: i64 },

    /// Integer above the declared maximum
    #[error("too big, maximum is {max}")]
    TooBig { max: i64 },

    // ==================
    // Other kinds
    // ==================
    /// Value cannot be read as a boolean
    #[error("cannot interpret as a boolean")]
    BadBoolean,

    /// String input that does not parse as an RFC3339 timestamp
    #[error("malformed RFC3339 timestamp")]
    BadDateFormat,

    /// Value is neither a string to split nor a list
    #[error("not a sequence")]
    NotASequence,

    /// Value has the wrong type for the field
    #[error("expected {expected}, got {actual}")]
    BadType { expected: ValueKind, actual: ValueKind },

    /// Rejected by a custom validator
    #[error("{0}")]
    Invalid(String),
}

/// Aggregate of every field failure from one validation pass.
///
/// `check` never applies an input partially: either the whole input set
/// validates, or this error carries the failure for each bad field.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    errors: BTreeMap<String, FieldError>,
}

impl SchemaError {
    /// Create from a field name to error mapping
    pub fn new(errors: BTreeMap<String, FieldError>) -> Self {
        Self { errors }
    }

    /// Create with a single failed field
    pub fn single(field: impl Into<String>, error: FieldError) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), error);
        Self { errors }
    }

    /// Returns the error for a field, if that field failed
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.errors.get(field)
    }

    /// Iterate over (field, error) pairs in field-name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(name, err)| (name.as_str(), err))
    }

    /// Number of failed fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field-name to message mapping for API responses
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .errors
            .iter()
            .map(|(name, err)| (name.clone(), serde_json::Value::String(err.to_string())))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} field(s):", self.errors.len())?;
        for (name, err) in &self.errors {
            write!(f, " {}: {};", name, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}
