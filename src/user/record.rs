//! User record.
//!
//! Construction validates under the standard schema; decoding a stored
//! hash validates under the rigid schema and keeps the stored password
//! hash as-is. Setters feed the change ledger so a manager save can
//! repair exactly the index entries that moved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::ids::random_id;
use crate::model::{storage_key, take_bool, take_string, take_time, ChangeLedger};
use crate::schema::{Field, Mode, Schema, Value, ValueMap};

use super::crypto;
use super::errors::UserResult;

pub(super) const KIND: &str = "user";

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// A service account
#[derive(Debug, Clone)]
pub struct User {
    id: String,
    username: String,
    email: String,
    password: String,
    admin: bool,
    activated: bool,
    enabled: bool,
    joined: DateTime<Utc>,
    ledger: ChangeLedger,
}

impl User {
    /// The user schema; a fresh instance per call
    pub fn schema() -> Schema {
        Schema::new()
            .field("id", Field::string().with_default_fn(|| Value::from(random_id())))
            .field("username", Field::string())
            .field("email", Field::email())
            .field("password", Field::string())
            .field("admin", Field::boolean().with_default(false))
            .field("activated", Field::boolean().with_default(false))
            .field("enabled", Field::boolean().with_default(true))
            .field("joined", Field::timestamp().with_default_fn(|| Value::from(Utc::now())))
    }

    /// Validate fresh input and build the record; the password arrives
    /// as plaintext and is stored hashed.
    pub fn create(input: &ValueMap) -> UserResult<Self> {
        let mut output = Self::schema().check(input, Mode::Standard)?;
        let plaintext = take_string(&mut output, "password")?;

        Ok(Self {
            id: take_string(&mut output, "id")?,
            username: take_string(&mut output, "username")?,
            email: take_string(&mut output, "email")?,
            password: crypto::hash_password(&plaintext)?,
            admin: take_bool(&mut output, "admin")?,
            activated: take_bool(&mut output, "activated")?,
            enabled: take_bool(&mut output, "enabled")?,
            joined: take_time(&mut output, "joined")?,
            ledger: ChangeLedger::new(),
        })
    }

    /// Decode a stored hash. The password field holds the stored hash
    /// and is not re-hashed.
    pub fn from_hash(data: &HashMap<String, String>) -> UserResult<Self> {
        let input: ValueMap = data
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();
        let mut output = Self::schema().check(&input, Mode::Rigid)?;

        Ok(Self {
            id: take_string(&mut output, "id")?,
            username: take_string(&mut output, "username")?,
            email: take_string(&mut output, "email")?,
            password: take_string(&mut output, "password")?,
            admin: take_bool(&mut output, "admin")?,
            activated: take_bool(&mut output, "activated")?,
            enabled: take_bool(&mut output, "enabled")?,
            joined: take_time(&mut output, "joined")?,
            ledger: ChangeLedger::new(),
        })
    }

    /// Flat string representation for storage, re-validated under the
    /// rigid schema before it is returned.
    pub fn to_hash(&self) -> UserResult<HashMap<String, String>> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), self.id.clone());
        fields.insert("username".to_string(), self.username.clone());
        fields.insert("email".to_string(), self.email.clone());
        fields.insert("password".to_string(), self.password.clone());
        fields.insert("admin".to_string(), flag(self.admin).to_string());
        fields.insert("activated".to_string(), flag(self.activated).to_string());
        fields.insert("enabled".to_string(), flag(self.enabled).to_string());
        fields.insert("joined".to_string(), self.joined.to_rfc3339());

        let input: ValueMap = fields
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();
        Self::schema().check(&input, Mode::Rigid)?;

        Ok(fields)
    }

    /// API view; the password hash never leaves the record
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "admin": self.admin,
            "activated": self.activated,
            "enabled": self.enabled,
            "joined": self.joined.to_rfc3339(),
        })
    }

    pub fn key(&self) -> String {
        storage_key(KIND, &self.id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password
    }

    pub fn admin(&self) -> bool {
        self.admin
    }

    pub fn activated(&self) -> bool {
        self.activated
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn joined(&self) -> DateTime<Utc> {
        self.joined
    }

    pub fn set_username(&mut self, username: String) {
        self.ledger.record("username", Value::from(self.username.clone()));
        self.username = username;
    }

    pub fn set_email(&mut self, email: String) {
        self.ledger.record("email", Value::from(self.email.clone()));
        self.email = email;
    }

    /// Hash the plaintext and store the hash
    pub fn set_password(&mut self, plaintext: &str) -> UserResult<()> {
        let hash = crypto::hash_password(plaintext)?;
        self.ledger.record("password", Value::from(self.password.clone()));
        self.password = hash;
        Ok(())
    }

    pub fn set_admin(&mut self, admin: bool) {
        self.ledger.record("admin", Value::from(self.admin));
        self.admin = admin;
    }

    pub fn set_activated(&mut self, activated: bool) {
        self.ledger.record("activated", Value::from(self.activated));
        self.activated = activated;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.ledger.record("enabled", Value::from(self.enabled));
        self.enabled = enabled;
    }

    pub fn set_joined(&mut self, joined: DateTime<Utc>) {
        self.ledger.record("joined", Value::from(self.joined));
        self.joined = joined;
    }

    /// Apply a partial update after validating it under the flexible
    /// schema; nothing is applied when any field fails. The id is
    /// fixed at creation and ignored here.
    pub fn update(&mut self, changes: &ValueMap) -> UserResult<()> {
        let validated = Self::schema().check(changes, Mode::Flexible)?;

        for (name, value) in validated {
            match (name.as_str(), value) {
                ("username", Value::Str(s)) => self.set_username(s),
                ("email", Value::Str(s)) => self.set_email(s),
                ("password", Value::Str(s)) => self.set_password(&s)?,
                ("admin", Value::Bool(b)) => self.set_admin(b),
                ("activated", Value::Bool(b)) => self.set_activated(b),
                ("enabled", Value::Bool(b)) => self.set_enabled(b),
                ("joined", Value::Time(t)) => self.set_joined(t),
                _ => {}
            }
        }
        Ok(())
    }

    /// Fields whose current value differs from the session's earliest
    /// prior value, in name order
    pub fn changed(&self) -> Vec<&'static str> {
        self.ledger
            .entries()
            .filter(|(name, prior)| {
                self.current_value(name)
                    .map(|current| current != **prior)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name)
            .collect()
    }

    /// Prior value of a field mutated this session
    pub fn old(&self, field: &str) -> Option<&Value> {
        self.ledger.old(field)
    }

    pub(super) fn end_session(&mut self) {
        self.ledger.clear();
    }

    fn current_value(&self, field: &str) -> Option<Value> {
        match field {
            "username" => Some(Value::from(self.username.clone())),
            "email" => Some(Value::from(self.email.clone())),
            "password" => Some(Value::from(self.password.clone())),
            "admin" => Some(Value::from(self.admin)),
            "activated" => Some(Value::from(self.activated)),
            "enabled" => Some(Value::from(self.enabled)),
            "joined" => Some(Value::from(self.joined)),
            _ => None,
        }
    }

    /// Check a plaintext password against the stored hash.
    ///
    /// Disabled accounts never authenticate. Unactivated accounts
    /// authenticate only when the activation check is bypassed, which
    /// the activation flow needs.
    pub fn authenticate(&self, password: &str, bypass_activation: bool) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.activated && !bypass_activation {
            return false;
        }
        crypto::verify_password(password, &self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ValueMap {
        let mut input = ValueMap::new();
        input.insert("username".to_string(), Value::from("alice"));
        input.insert("email".to_string(), Value::from("alice@example.com"));
        input.insert("password".to_string(), Value::from("hunter2hunter2"));
        input
    }

    #[test]
    fn test_create_fills_defaults() {
        let before = Utc::now();
        let user = User::create(&sample_input()).unwrap();

        assert!(!user.id().is_empty());
        assert!(!user.admin());
        assert!(!user.activated());
        assert!(user.enabled());
        assert!(user.joined() >= before);
        assert_eq!(user.key(), format!("user:{}", user.id()));
        assert!(user.changed().is_empty());
    }

    #[test]
    fn test_create_hashes_the_password() {
        let user = User::create(&sample_input()).unwrap();
        assert_ne!(user.password_hash(), "hunter2hunter2");
        assert!(crypto::verify_password("hunter2hunter2", user.password_hash()));
    }

    #[test]
    fn test_create_aggregates_failures() {
        let mut input = ValueMap::new();
        input.insert("email".to_string(), Value::from("not-an-email"));

        let err = match User::create(&input) {
            Err(crate::user::UserError::Validation(err)) => err,
            other => panic!("expected validation error, got {:?}", other),
        };
        assert!(err.get("username").is_some());
        assert!(err.get("password").is_some());
        assert!(err.get("email").is_some());
    }

    #[test]
    fn test_changed_lists_net_modifications() {
        let mut user = User::create(&sample_input()).unwrap();

        let mut changes = ValueMap::new();
        changes.insert("admin".to_string(), Value::from(true));
        changes.insert("activated".to_string(), Value::from(true));
        changes.insert("username".to_string(), Value::from("alicia"));
        user.update(&changes).unwrap();

        assert_eq!(user.changed(), ["activated", "admin", "username"]);
        assert_eq!(user.old("username"), Some(&Value::from("alice")));
    }

    #[test]
    fn test_earliest_prior_wins_and_reverts_read_unchanged() {
        let mut user = User::create(&sample_input()).unwrap();

        user.set_username("bob".to_string());
        user.set_username("carol".to_string());
        assert_eq!(user.old("username"), Some(&Value::from("alice")));
        assert_eq!(user.changed(), ["username"]);

        user.set_username("alice".to_string());
        assert!(user.changed().is_empty());
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut user = User::create(&sample_input()).unwrap();

        let mut changes = ValueMap::new();
        changes.insert("email".to_string(), Value::from("broken"));
        changes.insert("admin".to_string(), Value::from(true));
        assert!(user.update(&changes).is_err());

        assert_eq!(user.email(), "alice@example.com");
        assert!(!user.admin());
        assert!(user.changed().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_fields_and_hash() {
        let user = User::create(&sample_input()).unwrap();
        let stored = user.to_hash().unwrap();
        let decoded = User::from_hash(&stored).unwrap();

        assert_eq!(decoded.id(), user.id());
        assert_eq!(decoded.username(), user.username());
        assert_eq!(decoded.email(), user.email());
        assert_eq!(decoded.password_hash(), user.password_hash());
        assert_eq!(decoded.admin(), user.admin());
        assert_eq!(decoded.activated(), user.activated());
        assert_eq!(decoded.enabled(), user.enabled());
        assert_eq!(decoded.joined(), user.joined());
    }

    #[test]
    fn test_from_hash_requires_every_field() {
        let user = User::create(&sample_input()).unwrap();
        let mut stored = user.to_hash().unwrap();
        stored.remove("enabled");

        assert!(User::from_hash(&stored).is_err());
    }

    #[test]
    fn test_authenticate_fails_closed() {
        let mut user = User::create(&sample_input()).unwrap();

        // Not yet activated
        assert!(!user.authenticate("hunter2hunter2", false));
        assert!(user.authenticate("hunter2hunter2", true));
        assert!(!user.authenticate("wrong", true));

        user.set_activated(true);
        assert!(user.authenticate("hunter2hunter2", false));

        user.set_enabled(false);
        assert!(!user.authenticate("hunter2hunter2", false));
        assert!(!user.authenticate("hunter2hunter2", true));
    }

    #[test]
    fn test_json_view_has_no_password() {
        let user = User::create(&sample_input()).unwrap();
        let json = user.to_json();
        assert_eq!(json["username"], "alice");
        assert!(json.get("password").is_none());
    }
}
