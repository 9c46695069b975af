//! Validation schema engine.
//!
//! Fields are data-driven pipelines, schemas are ordered field
//! collections, and one schema serves three validation modes.
//!
//! # Design Principles
//!
//! - A field is the pipeline: default, required, parse, type, validate
//! - Defaults imply optional; factories re-evaluate per call
//! - `check` is all-or-nothing and aggregates every field failure
//! - Schemas are plain values, constructed where they are used

mod errors;
mod fields;
#[allow(clippy::module_inception)]
mod schema;
mod value;

pub use errors::{FieldError, FieldResult, SchemaError, SchemaResult};
pub use fields::{DelimitedList, Field, FieldDefault, Strip};
pub use schema::{Mode, Schema};
pub use value::{ListEntry, Value, ValueKind, ValueMap};
