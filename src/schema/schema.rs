//! Schema container and validation modes.
//!
//! A schema is an ordered collection of named fields. One schema value
//! serves three situations through its mode argument:
//!
//! - Standard: fresh input; defaults resolve, required is enforced
//! - Rigid: stored records; every field required, defaults ignored
//! - Flexible: partial updates; every field optional, defaults ignored

use std::collections::BTreeMap;

use super::errors::{FieldError, SchemaError, SchemaResult};
use super::fields::Field;
use super::value::{Value, ValueMap};

/// How absence and defaults are treated during one validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Standard,
    Rigid,
    Flexible,
}

/// Ordered collection of named fields defining a record shape
pub struct Schema {
    fields: Vec<(String, Field)>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field; declaration order is validation order
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate lazily, yielding one `(name, result)` entry per field
    /// that participates under the mode rules.
    ///
    /// Standard mode skips absent optional fields without defaults;
    /// flexible mode skips every absent field. Entries come out in
    /// declaration order.
    pub fn validate<'a>(
        &'a self,
        input: &'a ValueMap,
        mode: Mode,
    ) -> impl Iterator<Item = (&'a str, Result<Value, FieldError>)> + 'a {
        self.fields.iter().filter_map(move |(name, field)| {
            let supplied = input.get(name.as_str()).cloned();
            let outcome = match mode {
                Mode::Standard => {
                    if supplied.is_none() && !field.is_required() && !field.has_default() {
                        None
                    } else {
                        Some(field.apply(supplied))
                    }
                }
                Mode::Rigid => match supplied {
                    Some(value) => Some(field.apply(Some(value))),
                    None => Some(Err(FieldError::Missing)),
                },
                Mode::Flexible => supplied.map(|value| field.apply(Some(value))),
            };
            outcome.map(|result| (name.as_str(), result))
        })
    }

    /// All-or-nothing validation.
    ///
    /// # Errors
    ///
    /// Returns a single [`SchemaError`] aggregating the failure of
    /// every bad field; nothing is applied partially.
    pub fn check(&self, input: &ValueMap, mode: Mode) -> SchemaResult<ValueMap> {
        let mut output = ValueMap::new();
        let mut errors = BTreeMap::new();

        for (name, result) in self.validate(input, mode) {
            match result {
                Ok(value) => {
                    output.insert(name.to_string(), value);
                }
                Err(err) => {
                    errors.insert(name.to_string(), err);
                }
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(SchemaError::new(errors))
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
