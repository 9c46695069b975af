//! Single-use code record.
//!
//! The same record backs plain codes and account activations; the
//! kind only decides the storage key prefix. The code string is the
//! record identity and doubles as the secret handed to the user.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::ids::random_id;
use crate::model::{storage_key, take_bool, take_int, take_string, take_time, ChangeLedger};
use crate::schema::{Field, Mode, Schema, Value, ValueMap};

use super::errors::CodeResult;

/// Default lifetime of a fresh code, in seconds
pub const DEFAULT_EXPIRY: i64 = 3600;

/// Which key prefix a code lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Code,
    Activation,
}

impl CodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Activation => "act",
        }
    }
}

/// A single-use code tied to one user
#[derive(Debug, Clone)]
pub struct Code {
    kind: CodeKind,
    user: String,
    code: String,
    used: bool,
    expires: i64,
    created: DateTime<Utc>,
    ledger: ChangeLedger,
}

impl Code {
    /// The code schema; a fresh instance per call
    pub fn schema() -> Schema {
        Schema::new()
            .field("user", Field::string())
            .field("code", Field::string().with_default_fn(|| Value::from(random_id())))
            .field("used", Field::boolean().with_default(false))
            .field("expires", Field::integer().with_default(DEFAULT_EXPIRY))
            .field("created", Field::timestamp().with_default_fn(|| Value::from(Utc::now())))
    }

    pub fn create(kind: CodeKind, input: &ValueMap) -> CodeResult<Self> {
        let mut output = Self::schema().check(input, Mode::Standard)?;
        Ok(Self {
            kind,
            user: take_string(&mut output, "user")?,
            code: take_string(&mut output, "code")?,
            used: take_bool(&mut output, "used")?,
            expires: take_int(&mut output, "expires")?,
            created: take_time(&mut output, "created")?,
            ledger: ChangeLedger::new(),
        })
    }

    pub fn from_hash(kind: CodeKind, data: &HashMap<String, String>) -> CodeResult<Self> {
        let input: ValueMap = data
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();
        let mut output = Self::schema().check(&input, Mode::Rigid)?;
        Ok(Self {
            kind,
            user: take_string(&mut output, "user")?,
            code: take_string(&mut output, "code")?,
            used: take_bool(&mut output, "used")?,
            expires: take_int(&mut output, "expires")?,
            created: take_time(&mut output, "created")?,
            ledger: ChangeLedger::new(),
        })
    }

    /// Flat string representation for storage, re-validated under the
    /// rigid schema before it is returned.
    pub fn to_hash(&self) -> CodeResult<HashMap<String, String>> {
        let mut fields = HashMap::new();
        fields.insert("user".to_string(), self.user.clone());
        fields.insert("code".to_string(), self.code.clone());
        fields.insert(
            "used".to_string(),
            if self.used { "1" } else { "0" }.to_string(),
        );
        fields.insert("expires".to_string(), self.expires.to_string());
        fields.insert("created".to_string(), self.created.to_rfc3339());

        let input: ValueMap = fields
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(value.clone())))
            .collect();
        Self::schema().check(&input, Mode::Rigid)?;

        Ok(fields)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "user": self.user,
            "code": self.code,
            "used": self.used,
            "expires": self.expires,
            "created": self.created.to_rfc3339(),
        })
    }

    pub fn key(&self) -> String {
        storage_key(self.kind.prefix(), &self.code)
    }

    pub fn kind(&self) -> CodeKind {
        self.kind
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn used(&self) -> bool {
        self.used
    }

    /// Lifetime in seconds granted at creation
    pub fn expires(&self) -> i64 {
        self.expires
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Moment the code stops being redeemable
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created + Duration::seconds(self.expires)
    }

    pub fn set_used(&mut self, used: bool) {
        self.ledger.record("used", Value::from(self.used));
        self.used = used;
    }

    pub fn old(&self, field: &str) -> Option<&Value> {
        self.ledger.old(field)
    }

    pub(super) fn end_session(&mut self) {
        self.ledger.clear();
    }
}
