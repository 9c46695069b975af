//! # Request Body Decoding
//!
//! Management endpoints take flat JSON objects whose fields flow into
//! the record schemas. Only scalars survive the trip; the schemas do
//! the real validation afterwards.

use crate::schema::{Value, ValueMap};

use super::errors::{ApiError, ApiResult};

/// Turn a JSON request body into schema input.
///
/// Strings, booleans, and integers map directly. Nulls are treated as
/// absent. Anything nested is refused before validation runs.
pub fn body_values(body: &serde_json::Value) -> ApiResult<ValueMap> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("expected a JSON object".to_string()))?;

    let mut values = ValueMap::new();
    for (name, value) in object {
        match value {
            serde_json::Value::String(s) => {
                values.insert(name.clone(), Value::from(s.as_str()));
            }
            serde_json::Value::Bool(b) => {
                values.insert(name.clone(), Value::from(*b));
            }
            serde_json::Value::Number(n) => {
                let n = n.as_i64().ok_or_else(|| {
                    ApiError::BadRequest(format!("field '{name}' is not an integer"))
                })?;
                values.insert(name.clone(), Value::from(n));
            }
            serde_json::Value::Null => {}
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "field '{name}' has an unsupported shape"
                )));
            }
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_map_to_values() {
        let body = serde_json::json!({
            "username": "carol",
            "admin": true,
            "expires": 1200,
        });
        let values = body_values(&body).unwrap();
        assert_eq!(values.get("username"), Some(&Value::from("carol")));
        assert_eq!(values.get("admin"), Some(&Value::from(true)));
        assert_eq!(values.get("expires"), Some(&Value::from(1200i64)));
    }

    #[test]
    fn test_null_fields_are_dropped() {
        let body = serde_json::json!({ "email": null });
        let values = body_values(&body).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_rejects_non_object_body() {
        assert!(body_values(&serde_json::json!("carol")).is_err());
        assert!(body_values(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_rejects_nested_values() {
        let body = serde_json::json!({ "profile": {"bio": "hi"} });
        assert!(body_values(&body).is_err());
    }

    #[test]
    fn test_rejects_fractional_numbers() {
        let body = serde_json::json!({ "expires": 3.5 });
        assert!(body_values(&body).is_err());
    }
}
