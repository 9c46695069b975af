//! Single-use code persistence and redemption.
//!
//! Codes are written with a key TTL matching their `expires` field
//! and indexed by creation time, newest first. Redemption runs the
//! owner's credential check, flips the used flag, and applies any
//! post-use writes in the same batch.

use std::sync::Arc;

use crate::model::{index_member, member_storage_key, storage_key};
use crate::schema::ValueMap;
use crate::store::{IndexOrder, KvStore, WriteBatch};
use crate::user::{crypto, User, UserError, UserManager};

use super::errors::{CodeError, CodeResult};
use super::record::{Code, CodeKind};

/// Sorted index of created::key members, newest first
pub(crate) const BY_DATE_INDEX: &str = "index:codes:by-date";

/// What happens to a code once it is redeemed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep the flagged record until its TTL reaps it
    Retain,
    /// Drop the record and its index entry immediately
    Delete,
}

/// Extra writes folded into the redemption batch
pub type PostUseHook =
    Box<dyn Fn(&Code, &User, &mut WriteBatch) -> CodeResult<()> + Send + Sync>;

/// CRUD and redemption over stored codes
pub struct CodeManager<S: KvStore> {
    store: Arc<S>,
    users: Arc<UserManager<S>>,
    kind: CodeKind,
    index: &'static str,
    retention: Retention,
    allow_unactivated: bool,
    post_use: Option<PostUseHook>,
}

impl<S: KvStore> CodeManager<S> {
    pub fn new(store: Arc<S>, users: Arc<UserManager<S>>) -> Self {
        Self::with_kind(store, users, CodeKind::Code, BY_DATE_INDEX)
    }

    pub fn with_kind(
        store: Arc<S>,
        users: Arc<UserManager<S>>,
        kind: CodeKind,
        index: &'static str,
    ) -> Self {
        Self {
            store,
            users,
            kind,
            index,
            retention: Retention::Retain,
            allow_unactivated: false,
            post_use: None,
        }
    }

    pub fn retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Let owners redeem before their account is activated
    pub fn allow_unactivated(mut self, allow: bool) -> Self {
        self.allow_unactivated = allow;
        self
    }

    pub fn post_use<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Code, &User, &mut WriteBatch) -> CodeResult<()> + Send + Sync + 'static,
    {
        self.post_use = Some(Box::new(hook));
        self
    }

    /// Validate input and persist a fresh code with its index entry
    /// and key TTL in one batch.
    ///
    /// # Errors
    ///
    /// `NotFound` through the user layer when the owner does not
    /// exist, a validation error when the input fails the schema.
    pub fn add(&self, input: &ValueMap) -> CodeResult<Code> {
        let code = Code::create(self.kind, input)?;
        if !self.users.exists(code.user())? {
            return Err(UserError::NotFound.into());
        }

        let key = code.key();
        let mut batch = WriteBatch::new();
        batch
            .hash_set_all(&key, code.to_hash()?)
            .index_add(self.index, &index_member(&code.created().to_rfc3339(), &key))
            .expire(&key, code.expires());
        self.store.apply(batch)?;

        Ok(code)
    }

    /// Fetch a live code by its code string
    pub fn get(&self, id: &str) -> CodeResult<Code> {
        let key = storage_key(self.kind.prefix(), id);
        let data = self.store.hash_get_all(&key)?.ok_or(CodeError::NotFound)?;
        Code::from_hash(self.kind, &data)
    }

    /// Seconds until the record is reaped, when it still exists
    pub fn ttl(&self, id: &str) -> CodeResult<Option<i64>> {
        let key = storage_key(self.kind.prefix(), id);
        Ok(self.store.ttl(&key)?)
    }

    /// Persist a loaded record; the key TTL is left as it stands
    pub fn save(&self, code: &mut Code) -> CodeResult<()> {
        let mut batch = WriteBatch::new();
        batch.hash_set_all(&code.key(), code.to_hash()?);
        self.store.apply(batch)?;
        code.end_session();
        Ok(())
    }

    /// Drop the record and its index entry
    pub fn delete(&self, id: &str) -> CodeResult<()> {
        let code = self.get(id)?;
        let key = code.key();

        let mut batch = WriteBatch::new();
        batch
            .delete(&key)
            .index_remove(self.index, &index_member(&code.created().to_rfc3339(), &key));
        self.store.apply(batch)?;
        Ok(())
    }

    /// Codes ordered newest first, over the inclusive index range.
    /// Members whose record has expired are skipped.
    pub fn list(&self, start: usize, stop: usize) -> CodeResult<Vec<Code>> {
        let members = self
            .store
            .index_range(self.index, start, stop, IndexOrder::Descending)?;

        let mut codes = Vec::with_capacity(members.len());
        for member in &members {
            let key = match member_storage_key(member) {
                Some(key) => key,
                None => continue,
            };
            match self.store.hash_get_all(key)? {
                Some(data) => codes.push(Code::from_hash(self.kind, &data)?),
                None => continue,
            }
        }
        Ok(codes)
    }

    pub fn count(&self) -> CodeResult<usize> {
        Ok(self.store.index_len(self.index)?)
    }

    /// Redeem a code for its owner.
    ///
    /// The owner's credentials are checked first, so probing for code
    /// existence requires a valid login. The used flag, any retention
    /// cleanup, and the post-use writes land in a single batch.
    ///
    /// # Errors
    ///
    /// `FailedAuthentication` on bad credentials, `NotFound` for a
    /// missing or expired code, `AlreadyUsed` for a redeemed one, and
    /// `UserMismatch` when the code belongs to someone else.
    pub fn consume(&self, id: &str, username: &str, password: &str) -> CodeResult<Code> {
        let user = match self.users.get(username) {
            Ok(user) => user,
            Err(UserError::NotFound) => return Err(CodeError::FailedAuthentication),
            Err(err) => return Err(err.into()),
        };
        if !user.authenticate(password, self.allow_unactivated) {
            return Err(CodeError::FailedAuthentication);
        }

        let mut code = self.get(id)?;
        if code.used() {
            return Err(CodeError::AlreadyUsed);
        }
        if !crypto::constant_time_str_eq(code.user(), username) {
            return Err(CodeError::UserMismatch);
        }

        code.set_used(true);
        let key = code.key();
        let mut batch = WriteBatch::new();
        match self.retention {
            Retention::Retain => {
                batch.hash_set_all(&key, code.to_hash()?);
            }
            Retention::Delete => {
                batch
                    .delete(&key)
                    .index_remove(self.index, &index_member(&code.created().to_rfc3339(), &key));
            }
        }
        if let Some(hook) = &self.post_use {
            hook(&code, &user, &mut batch)?;
        }
        self.store.apply(batch)?;

        code.end_session();
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::super::record::DEFAULT_EXPIRY;
    use super::*;
    use crate::schema::Value;
    use crate::store::MemoryStore;

    fn fixtures() -> (Arc<MemoryStore>, Arc<UserManager<MemoryStore>>) {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(UserManager::new(Arc::clone(&store)));

        let mut input = ValueMap::new();
        input.insert("username".to_string(), Value::from("alice"));
        input.insert("email".to_string(), Value::from("alice@example.com"));
        input.insert("password".to_string(), Value::from("password123"));
        input.insert("activated".to_string(), Value::from(true));
        users.add(&input).unwrap();

        (store, users)
    }

    fn code_input(username: &str) -> ValueMap {
        let mut input = ValueMap::new();
        input.insert("user".to_string(), Value::from(username));
        input
    }

    #[test]
    fn test_add_get_round_trips_and_sets_ttl() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users);

        let added = codes.add(&code_input("alice")).unwrap();
        let fetched = codes.get(added.code()).unwrap();
        assert_eq!(fetched.user(), "alice");
        assert!(!fetched.used());

        let remaining = codes.ttl(added.code()).unwrap().unwrap();
        assert!(remaining > 0 && remaining <= DEFAULT_EXPIRY);
        assert_eq!(codes.count().unwrap(), 1);
    }

    #[test]
    fn test_add_for_unknown_user_is_rejected() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users);

        assert!(matches!(
            codes.add(&code_input("ghost")),
            Err(CodeError::User(UserError::NotFound))
        ));
    }

    #[test]
    fn test_consume_flips_the_flag_once() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users);
        let code = codes.add(&code_input("alice")).unwrap();

        let used = codes.consume(code.code(), "alice", "password123").unwrap();
        assert!(used.used());
        assert!(codes.get(code.code()).unwrap().used());

        assert!(matches!(
            codes.consume(code.code(), "alice", "password123"),
            Err(CodeError::AlreadyUsed)
        ));
    }

    #[test]
    fn test_consume_requires_valid_credentials() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users);
        let code = codes.add(&code_input("alice")).unwrap();

        assert!(matches!(
            codes.consume(code.code(), "alice", "wrong"),
            Err(CodeError::FailedAuthentication)
        ));
        assert!(matches!(
            codes.consume(code.code(), "ghost", "password123"),
            Err(CodeError::FailedAuthentication)
        ));
        assert!(!codes.get(code.code()).unwrap().used());
    }

    #[test]
    fn test_consume_rejects_the_wrong_owner() {
        let (store, users) = fixtures();

        let mut input = ValueMap::new();
        input.insert("username".to_string(), Value::from("bob"));
        input.insert("email".to_string(), Value::from("bob@example.com"));
        input.insert("password".to_string(), Value::from("password456"));
        input.insert("activated".to_string(), Value::from(true));
        users.add(&input).unwrap();

        let codes = CodeManager::new(store, users);
        let code = codes.add(&code_input("alice")).unwrap();

        assert!(matches!(
            codes.consume(code.code(), "bob", "password456"),
            Err(CodeError::UserMismatch)
        ));
    }

    #[test]
    fn test_delete_retention_drops_the_record() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users).retention(Retention::Delete);
        let code = codes.add(&code_input("alice")).unwrap();

        codes.consume(code.code(), "alice", "password123").unwrap();
        assert!(matches!(codes.get(code.code()), Err(CodeError::NotFound)));
        assert_eq!(codes.count().unwrap(), 0);
    }

    #[test]
    fn test_post_use_hook_lands_in_the_same_batch() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(Arc::clone(&store), users).post_use(|code, user, batch| {
            batch.hash_set("audit", code.code(), user.username());
            Ok(())
        });
        let code = codes.add(&code_input("alice")).unwrap();
        codes.consume(code.code(), "alice", "password123").unwrap();

        assert_eq!(
            store.hash_get("audit", code.code()).unwrap().as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_list_is_newest_first() {
        let (store, users) = fixtures();
        let codes = CodeManager::new(store, users);

        let mut early = code_input("alice");
        early.insert(
            "created".to_string(),
            Value::from("2026-01-01T00:00:00+00:00"),
        );
        let mut late = code_input("alice");
        late.insert(
            "created".to_string(),
            Value::from("2026-06-01T00:00:00+00:00"),
        );

        let first = codes.add(&early).unwrap();
        let second = codes.add(&late).unwrap();

        let listed = codes.list(0, 9).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code(), second.code());
        assert_eq!(listed[1].code(), first.code());
    }
}
