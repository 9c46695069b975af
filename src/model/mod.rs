//! Shared record machinery.
//!
//! Records track mutation through a previous-value ledger written by
//! their setters, and derive their storage key and secondary index
//! members through the helpers here so every manager uses the same
//! layout.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::schema::{FieldError, SchemaError, SchemaResult, Value, ValueMap};

/// Separator between the sort key and the storage key inside an index
/// member. Storage keys never contain it, so members parse from the
/// right unambiguously.
const MEMBER_SEPARATOR: &str = "::";

/// Storage key for a record: `"<kind>:<id>"`
pub fn storage_key(kind: &str, id: &str) -> String {
    format!("{}:{}", kind, id)
}

/// Composite member for an ordered secondary index
pub fn index_member(sort_key: &str, storage_key: &str) -> String {
    format!("{}{}{}", sort_key, MEMBER_SEPARATOR, storage_key)
}

/// Storage key half of a composite index member
pub fn member_storage_key(member: &str) -> Option<&str> {
    member
        .rsplit_once(MEMBER_SEPARATOR)
        .map(|(_, storage_key)| storage_key)
}

// Typed extraction from a validated output map. The schema guarantees
// presence and kind; a mismatch still surfaces as an error instead of
// a panic.

pub fn take_string(output: &mut ValueMap, field: &str) -> SchemaResult<String> {
    match output.remove(field) {
        Some(Value::Str(s)) => Ok(s),
        _ => Err(SchemaError::single(field, FieldError::Missing)),
    }
}

pub fn take_bool(output: &mut ValueMap, field: &str) -> SchemaResult<bool> {
    match output.remove(field) {
        Some(Value::Bool(b)) => Ok(b),
        _ => Err(SchemaError::single(field, FieldError::Missing)),
    }
}

pub fn take_int(output: &mut ValueMap, field: &str) -> SchemaResult<i64> {
    match output.remove(field) {
        Some(Value::Int(n)) => Ok(n),
        _ => Err(SchemaError::single(field, FieldError::Missing)),
    }
}

pub fn take_time(output: &mut ValueMap, field: &str) -> SchemaResult<DateTime<Utc>> {
    match output.remove(field) {
        Some(Value::Time(t)) => Ok(t),
        _ => Err(SchemaError::single(field, FieldError::Missing)),
    }
}

/// Previous-value ledger behind record setters.
///
/// The first write for a field wins: the ledger keeps the earliest
/// prior value of the mutation session, so reverting a field makes it
/// read as unchanged and index repair removes the member that is
/// actually stored. A successful save ends the session and clears it.
#[derive(Debug, Clone, Default)]
pub struct ChangeLedger {
    old: BTreeMap<&'static str, Value>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note the value a field held before its first mutation
    pub fn record(&mut self, field: &'static str, prior: Value) {
        self.old.entry(field).or_insert(prior);
    }

    /// Prior value of a field, if it was mutated this session
    pub fn old(&self, field: &str) -> Option<&Value> {
        self.old.get(field)
    }

    /// Ledger entries in field-name order
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.old.iter().map(|(name, prior)| (*name, prior))
    }

    pub fn is_empty(&self) -> bool {
        self.old.is_empty()
    }

    pub fn clear(&mut self) {
        self.old.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_wins() {
        let mut ledger = ChangeLedger::new();
        ledger.record("username", Value::from("alice"));
        ledger.record("username", Value::from("bob"));

        assert_eq!(ledger.old("username"), Some(&Value::from("alice")));
    }

    #[test]
    fn test_clear_ends_the_session() {
        let mut ledger = ChangeLedger::new();
        ledger.record("admin", Value::from(false));
        assert!(!ledger.is_empty());

        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.old("admin"), None);
    }

    #[test]
    fn test_storage_key_layout() {
        assert_eq!(storage_key("user", "abc123"), "user:abc123");
        assert_eq!(storage_key("act", "XyZ"), "act:XyZ");
    }

    #[test]
    fn test_take_helpers_extract_by_kind() {
        let mut output = ValueMap::new();
        output.insert("username".to_string(), Value::from("alice"));
        output.insert("admin".to_string(), Value::from(true));
        output.insert("expires".to_string(), Value::from(3600i64));

        assert_eq!(take_string(&mut output, "username").unwrap(), "alice");
        assert!(take_bool(&mut output, "admin").unwrap());
        assert_eq!(take_int(&mut output, "expires").unwrap(), 3600);

        // Absent or wrong-kind entries error instead of panicking
        assert!(take_string(&mut output, "username").is_err());
        assert!(take_time(&mut output, "joined").is_err());
    }

    #[test]
    fn test_member_parses_from_the_right() {
        let member = index_member("alice", "user:abc");
        assert_eq!(member, "alice::user:abc");
        assert_eq!(member_storage_key(&member), Some("user:abc"));

        // Sort keys may contain the separator; storage keys do not
        let odd = index_member("a::b", "user:abc");
        assert_eq!(member_storage_key(&odd), Some("user:abc"));

        assert_eq!(member_storage_key("plain"), None);
    }
}
