//! Schema Invariant Tests
//!
//! End-to-end checks of the validation schema engine:
//! - Mode semantics (standard, rigid, flexible)
//! - Default resolution, factories re-evaluated per call
//! - Error aggregation across fields
//! - Boolean vocabulary and delimited-list element handling

use exifwash::schema::{
    DelimitedList, Field, FieldError, ListEntry, Mode, Schema, Strip, Value, ValueMap,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn profile_schema() -> Schema {
    Schema::new()
        .field("name", Field::string())
        .field("bio", Field::string().optional())
        .field("admin", Field::boolean().with_default(false))
        .field("visits", Field::integer().with_default(0i64))
}

fn input(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

// =============================================================================
// Standard Mode
// =============================================================================

/// Defaults fill absent fields; provided values pass through.
#[test]
fn test_standard_mode_resolves_defaults() {
    let schema = profile_schema();
    let output = schema
        .check(&input(&[("name", Value::from("carol"))]), Mode::Standard)
        .unwrap();

    assert_eq!(output.get("name"), Some(&Value::from("carol")));
    assert_eq!(output.get("admin"), Some(&Value::from(false)));
    assert_eq!(output.get("visits"), Some(&Value::from(0i64)));
    // optional, no default, absent: stays absent
    assert!(output.get("bio").is_none());
}

/// A missing required field fails; nothing else masks it.
#[test]
fn test_standard_mode_requires_defaultless_fields() {
    let schema = profile_schema();
    let err = schema.check(&ValueMap::new(), Mode::Standard).unwrap_err();

    assert_eq!(err.get("name"), Some(&FieldError::Missing));
    assert!(err.get("admin").is_none());
}

/// Default factories run once per validation call.
#[test]
fn test_default_factory_reevaluated_per_call() {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    let counter = Arc::new(AtomicI64::new(0));
    let schema = Schema::new().field("serial", {
        let counter = counter.clone();
        Field::integer()
            .with_default_fn(move || Value::from(counter.fetch_add(1, Ordering::SeqCst)))
    });

    let first = schema.check(&ValueMap::new(), Mode::Standard).unwrap();
    let second = schema.check(&ValueMap::new(), Mode::Standard).unwrap();

    assert_eq!(first.get("serial"), Some(&Value::from(0i64)));
    assert_eq!(second.get("serial"), Some(&Value::from(1i64)));
}

// =============================================================================
// Rigid and Flexible Modes
// =============================================================================

/// Rigid mode wants every field present, defaults notwithstanding.
#[test]
fn test_rigid_mode_ignores_defaults() {
    let schema = profile_schema();
    let full = input(&[
        ("name", Value::from("carol")),
        ("bio", Value::from("hi")),
        ("admin", Value::from(true)),
        ("visits", Value::from(7i64)),
    ]);
    assert!(schema.check(&full, Mode::Rigid).is_ok());

    let mut partial = full.clone();
    partial.remove("admin");
    let err = schema.check(&partial, Mode::Rigid).unwrap_err();
    assert_eq!(err.get("admin"), Some(&FieldError::Missing));
}

/// Flexible mode validates whatever subset shows up.
#[test]
fn test_flexible_mode_accepts_subsets() {
    let schema = profile_schema();
    let output = schema
        .check(&input(&[("visits", Value::from(3i64))]), Mode::Flexible)
        .unwrap();

    assert_eq!(output.len(), 1);
    assert_eq!(output.get("visits"), Some(&Value::from(3i64)));
}

/// Present-but-invalid fields still fail in flexible mode.
#[test]
fn test_flexible_mode_checks_present_values() {
    let schema = profile_schema();
    let err = schema
        .check(
            &input(&[("visits", Value::from("eleven"))]),
            Mode::Flexible,
        )
        .unwrap_err();

    assert!(err.get("visits").is_some());
}

// =============================================================================
// Error Aggregation
// =============================================================================

/// Every failing field is reported in one error.
#[test]
fn test_all_field_errors_aggregate() {
    let schema = profile_schema();
    let bad = input(&[
        ("admin", Value::from("perhaps")),
        ("visits", Value::from("many")),
    ]);
    let err = schema.check(&bad, Mode::Standard).unwrap_err();

    assert_eq!(err.len(), 3);
    assert_eq!(err.get("name"), Some(&FieldError::Missing));
    assert!(err.get("admin").is_some());
    assert!(err.get("visits").is_some());
}

// =============================================================================
// Boolean Vocabulary
// =============================================================================

/// The word vocabulary is case-insensitive.
#[test]
fn test_boolean_vocabulary() {
    let schema = Schema::new().field("flag", Field::boolean());

    for word in ["y", "YES", "1", "t", "True"] {
        let output = schema
            .check(&input(&[("flag", Value::from(word))]), Mode::Standard)
            .unwrap();
        assert_eq!(output.get("flag"), Some(&Value::from(true)), "{word}");
    }
    for word in ["n", "No", "0", "F", "false"] {
        let output = schema
            .check(&input(&[("flag", Value::from(word))]), Mode::Standard)
            .unwrap();
        assert_eq!(output.get("flag"), Some(&Value::from(false)), "{word}");
    }

    let err = schema
        .check(&input(&[("flag", Value::from("perhaps"))]), Mode::Standard)
        .unwrap_err();
    assert_eq!(err.get("flag"), Some(&FieldError::BadBoolean));
}

// =============================================================================
// Delimited Lists
// =============================================================================

/// Elements are stripped, empties dropped, and each survivor parsed.
#[test]
fn test_delimited_list_pipeline() {
    let config = DelimitedList::new()
        .delimiter(",")
        .strip(Strip::Whitespace)
        .omit_empty()
        .each(Field::integer());
    let schema = Schema::new().field("scores", Field::delimited(config));

    let output = schema
        .check(
            &input(&[("scores", Value::from(" 1 , 2 ,, 3 "))]),
            Mode::Standard,
        )
        .unwrap();

    let entries = match output.get("scores") {
        Some(Value::List(entries)) => entries,
        other => panic!("expected a list, got {other:?}"),
    };
    let expected = [1i64, 2, 3];
    assert_eq!(entries.len(), expected.len());
    for (entry, n) in entries.iter().zip(expected) {
        assert_eq!(entry, &ListEntry::Value(Value::from(n)));
    }
}

/// A bad element stays in place as an error entry; the field itself
/// still validates.
#[test]
fn test_delimited_list_keeps_bad_elements_positionally() {
    let config = DelimitedList::new().delimiter(",").each(Field::integer());
    let schema = Schema::new().field("scores", Field::delimited(config));

    let output = schema
        .check(&input(&[("scores", Value::from("1,oops,3"))]), Mode::Standard)
        .unwrap();

    let entries = match output.get("scores") {
        Some(Value::List(entries)) => entries,
        other => panic!("expected a list, got {other:?}"),
    };
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0], ListEntry::Value(Value::from(1i64)));
    assert!(matches!(entries[1], ListEntry::Invalid(_)));
    assert_eq!(entries[2], ListEntry::Value(Value::from(3i64)));
}
