//! Field kinds and their validation pipelines.
//!
//! Every field is the same ordered pipeline over an optional input:
//! default resolution, required check, parse, type check, validate.
//! The stock constructors below wire the stages for each kind; custom
//! parsers and validators compose on top.

use std::fmt;

use chrono::{DateTime, Utc};

use super::errors::{FieldError, FieldResult};
use super::value::{ListEntry, Value, ValueKind};

/// Pipeline stage: transforms or rejects a value
type Stage = Box<dyn Fn(Value) -> FieldResult<Value> + Send + Sync>;

/// Zero-argument default factory, evaluated fresh per validation call
type Factory = Box<dyn Fn() -> Value + Send + Sync>;

/// Default for an absent field
pub enum FieldDefault {
    Literal(Value),
    Factory(Factory),
}

impl FieldDefault {
    fn produce(&self) -> Value {
        match self {
            FieldDefault::Literal(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            FieldDefault::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Element stripping applied by delimited-list fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strip {
    None,
    Whitespace,
    /// Trim any of the given characters from both ends
    Matching(String),
}

/// Configuration for a delimited-list field
pub struct DelimitedList {
    delimiter: String,
    strip: Strip,
    omit_empty: bool,
    min: Option<usize>,
    max: Option<usize>,
    element: Option<Box<Field>>,
}

impl DelimitedList {
    pub fn new() -> Self {
        Self {
            delimiter: "|".to_string(),
            strip: Strip::Whitespace,
            omit_empty: false,
            min: None,
            max: None,
            element: None,
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn strip(mut self, strip: Strip) -> Self {
        self.strip = strip;
        self
    }

    /// Drop elements that are empty after stripping
    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    /// Bounds on the processed element count
    pub fn bounded(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Pipeline applied to each element; its required flag and default
    /// are not consulted
    pub fn each(mut self, element: Field) -> Self {
        self.element = Some(Box::new(element));
        self
    }

    fn clean(&self, value: Value) -> Value {
        match (&self.strip, value) {
            (Strip::None, value) => value,
            (Strip::Whitespace, Value::Str(s)) => Value::Str(s.trim().to_string()),
            (Strip::Matching(set), Value::Str(s)) => {
                Value::Str(s.trim_matches(|c| set.contains(c)).to_string())
            }
            (_, value) => value,
        }
    }

    fn is_omitted(&self, value: &Value) -> bool {
        self.omit_empty && value.as_str() == Some("")
    }

    fn process(&self, entries: Vec<ListEntry>) -> FieldResult<Value> {
        let mut out = Vec::with_capacity(entries.len());

        for entry in entries {
            let value = match entry {
                ListEntry::Value(value) => self.clean(value),
                invalid => {
                    out.push(invalid);
                    continue;
                }
            };

            if self.is_omitted(&value) {
                continue;
            }

            match &self.element {
                Some(field) => match field.apply(Some(value)) {
                    Ok(value) => out.push(ListEntry::Value(value)),
                    Err(err) => out.push(ListEntry::Invalid(err)),
                },
                None => out.push(ListEntry::Value(value)),
            }
        }

        if let Some(min) = self.min {
            if out.len() < min {
                return Err(FieldError::TooShort { min });
            }
        }
        if let Some(max) = self.max {
            if out.len() > max {
                return Err(FieldError::TooLong { max });
            }
        }

        Ok(Value::List(out))
    }

    fn into_stage(self) -> Stage {
        Box::new(move |value| {
            let entries = match value {
                Value::Str(s) => s
                    .split(self.delimiter.as_str())
                    .map(|part| ListEntry::Value(Value::from(part)))
                    .collect(),
                Value::List(entries) => entries,
                _ => return Err(FieldError::NotASequence),
            };
            self.process(entries)
        })
    }
}

impl Default for DelimitedList {
    fn default() -> Self {
        Self::new()
    }
}

/// One named slot of a schema.
///
/// Absence handling belongs to the schema mode; given a resolved value
/// the field runs parse, type check, and validate in that order.
pub struct Field {
    required: bool,
    default: Option<FieldDefault>,
    parser: Option<Stage>,
    expects: Option<ValueKind>,
    validator: Option<Stage>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("required", &self.required)
            .field("default", &self.default)
            .field("expects", &self.expects)
            .finish()
    }
}

impl Field {
    /// Bare required field with no stages
    pub fn new() -> Self {
        Self {
            required: true,
            default: None,
            parser: None,
            expects: None,
            validator: None,
        }
    }

    /// String field with the stock 1..=255 length bounds
    pub fn string() -> Self {
        Self::string_sized(1, 255)
    }

    /// String field with explicit length bounds
    pub fn string_sized(min: usize, max: usize) -> Self {
        Self::new().with_validator(move |value| check_string(value, min, max))
    }

    /// Integer field accepting native integers and integer strings
    pub fn integer() -> Self {
        Self::integer_bounded(None, None)
    }

    /// Integer field with optional bounds
    pub fn integer_bounded(min: Option<i64>, max: Option<i64>) -> Self {
        let mut field = Self::new().with_parser(parse_integer).expecting(ValueKind::Int);
        field = field.with_validator(move |value| {
            let n = match value.as_int() {
                Some(n) => n,
                None => return Err(FieldError::NotAnInteger),
            };
            if let Some(min) = min {
                if n < min {
                    return Err(FieldError::TooSmall { min });
                }
            }
            if let Some(max) = max {
                if n > max {
                    return Err(FieldError::TooBig { max });
                }
            }
            Ok(value)
        });
        field
    }

    /// Boolean field accepting native booleans, truthy integers, and a
    /// case-insensitive word vocabulary
    pub fn boolean() -> Self {
        Self::new().with_parser(parse_boolean).expecting(ValueKind::Bool)
    }

    /// Email field: string rules with a 320 cap, must contain an `@`
    pub fn email() -> Self {
        Self::new().with_validator(|value| {
            let value = check_string(value, 1, 320)?;
            match value.as_str() {
                Some(s) if s.contains('@') => Ok(value),
                _ => Err(FieldError::NotAnEmail),
            }
        })
    }

    /// Timestamp field: native timestamps pass, strings parse as RFC3339
    pub fn timestamp() -> Self {
        Self::new().with_parser(parse_timestamp).expecting(ValueKind::Time)
    }

    /// Delimited-list field
    pub fn delimited(config: DelimitedList) -> Self {
        Self::new()
            .with_parser_boxed(config.into_stage())
            .expecting(ValueKind::List)
    }

    /// Literal default; declaring a default makes the field optional
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Literal(value.into()));
        self.required = false;
        self
    }

    /// Factory default, evaluated per validation call; makes the field
    /// optional
    pub fn with_default_fn(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(FieldDefault::Factory(Box::new(factory)));
        self.required = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_parser(self, parser: impl Fn(Value) -> FieldResult<Value> + Send + Sync + 'static) -> Self {
        self.with_parser_boxed(Box::new(parser))
    }

    fn with_parser_boxed(mut self, parser: Stage) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn expecting(mut self, kind: ValueKind) -> Self {
        self.expects = Some(kind);
        self
    }

    /// Chain a validator after any built-in checks
    pub fn with_validator(mut self, validator: impl Fn(Value) -> FieldResult<Value> + Send + Sync + 'static) -> Self {
        self.validator = Some(match self.validator.take() {
            Some(existing) => Box::new(move |value| validator(existing(value)?)),
            None => Box::new(validator),
        });
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Evaluate the default, if one is declared
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::produce)
    }

    /// Run the pipeline over a resolved input.
    ///
    /// `None` resolves the default when one is declared and fails with
    /// [`FieldError::Missing`] otherwise; mode-level absence rules are
    /// the schema's business.
    pub fn apply(&self, value: Option<Value>) -> FieldResult<Value> {
        let value = match value {
            Some(value) => value,
            None => match &self.default {
                Some(default) => default.produce(),
                None => return Err(FieldError::Missing),
            },
        };

        let value = match &self.parser {
            Some(parse) => parse(value)?,
            None => value,
        };

        if let Some(expected) = self.expects {
            let actual = value.kind();
            if actual != expected {
                return Err(FieldError::BadType { expected, actual });
            }
        }

        match &self.validator {
            Some(validate) => validate(value),
            None => Ok(value),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}

fn check_string(value: Value, min: usize, max: usize) -> FieldResult<Value> {
    let len = match value.as_str() {
        Some(s) => s.chars().count(),
        None => return Err(FieldError::NotAString),
    };
    if len < min {
        return Err(FieldError::TooShort { min });
    }
    if len > max {
        return Err(FieldError::TooLong { max });
    }
    Ok(value)
}

fn parse_integer(value: Value) -> FieldResult<Value> {
    match value {
        Value::Int(_) => Ok(value),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| FieldError::MalformedInteger),
        _ => Err(FieldError::NotAnInteger),
    }
}

fn parse_boolean(value: Value) -> FieldResult<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Int(n) => Ok(Value::Bool(n != 0)),
        Value::Str(s) => match s.to_lowercase().as_str() {
            "y" | "yes" | "1" | "t" | "true" => Ok(Value::Bool(true)),
            "n" | "no" | "0" | "f" | "false" => Ok(Value::Bool(false)),
            _ => Err(FieldError::BadBoolean),
        },
        _ => Err(FieldError::BadBoolean),
    }
}

fn parse_timestamp(value: Value) -> FieldResult<Value> {
    match value {
        Value::Time(_) => Ok(value),
        Value::Str(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Value::Time(t.with_timezone(&Utc)))
            .map_err(|_| FieldError::BadDateFormat),
        other => Err(FieldError::BadType {
            expected: ValueKind::Time,
            actual: other.kind(),
        }),
    }
}
