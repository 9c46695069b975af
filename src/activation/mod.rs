//! Account activations.
//!
//! An activation is a single-use code whose redemption also flips the
//! owner's activated flag, in the same write batch. Owners may redeem
//! before their account is activated, which is the whole point.

use std::sync::Arc;

use crate::codes::{Code, CodeKind, CodeManager, CodeResult};
use crate::schema::{Value, ValueMap};
use crate::store::KvStore;
use crate::user::UserManager;

/// Sorted index of created::key members, newest first
pub(crate) const BY_DATE_INDEX: &str = "index:activations:by-date";

pub type Activation = Code;

/// Issues and redeems account activations
pub struct ActivationManager<S: KvStore> {
    codes: CodeManager<S>,
}

impl<S: KvStore> ActivationManager<S> {
    pub fn new(store: Arc<S>, users: Arc<UserManager<S>>) -> Self {
        let codes = CodeManager::with_kind(store, users, CodeKind::Activation, BY_DATE_INDEX)
            .allow_unactivated(true)
            .post_use(|_code, user, batch| {
                batch.hash_set(&user.key(), "activated", "1");
                Ok(())
            });
        Self { codes }
    }

    /// Issue a fresh activation for a user
    pub fn add(&self, username: &str) -> CodeResult<Activation> {
        let mut input = ValueMap::new();
        input.insert("user".to_string(), Value::from(username));
        self.codes.add(&input)
    }

    pub fn get(&self, id: &str) -> CodeResult<Activation> {
        self.codes.get(id)
    }

    pub fn ttl(&self, id: &str) -> CodeResult<Option<i64>> {
        self.codes.ttl(id)
    }

    pub fn delete(&self, id: &str) -> CodeResult<()> {
        self.codes.delete(id)
    }

    /// Activations ordered newest first
    pub fn list(&self, start: usize, stop: usize) -> CodeResult<Vec<Activation>> {
        self.codes.list(start, stop)
    }

    pub fn count(&self) -> CodeResult<usize> {
        self.codes.count()
    }

    /// Redeem an activation: the code is marked used and the owner's
    /// account comes out activated.
    pub fn activate(&self, id: &str, username: &str, password: &str) -> CodeResult<Activation> {
        self.codes.consume(id, username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeError;
    use crate::store::MemoryStore;

    fn fixtures() -> (
        Arc<UserManager<MemoryStore>>,
        ActivationManager<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(UserManager::new(Arc::clone(&store)));

        let mut input = ValueMap::new();
        input.insert("username".to_string(), Value::from("alice"));
        input.insert("email".to_string(), Value::from("alice@example.com"));
        input.insert("password".to_string(), Value::from("password123"));
        users.add(&input).unwrap();

        let activations = ActivationManager::new(store, Arc::clone(&users));
        (users, activations)
    }

    #[test]
    fn test_activate_flips_the_account_flag() {
        let (users, activations) = fixtures();
        assert!(!users.get("alice").unwrap().activated());

        let activation = activations.add("alice").unwrap();
        let used = activations
            .activate(activation.code(), "alice", "password123")
            .unwrap();

        assert!(used.used());
        assert!(users.get("alice").unwrap().activated());
    }

    #[test]
    fn test_unactivated_owner_may_redeem_but_not_twice() {
        let (_users, activations) = fixtures();
        let activation = activations.add("alice").unwrap();

        activations
            .activate(activation.code(), "alice", "password123")
            .unwrap();
        assert!(matches!(
            activations.activate(activation.code(), "alice", "password123"),
            Err(CodeError::AlreadyUsed)
        ));
    }

    #[test]
    fn test_wrong_password_leaves_the_account_alone() {
        let (users, activations) = fixtures();
        let activation = activations.add("alice").unwrap();

        assert!(matches!(
            activations.activate(activation.code(), "alice", "wrong"),
            Err(CodeError::FailedAuthentication)
        ));
        assert!(!users.get("alice").unwrap().activated());
        assert!(!activations.get(activation.code()).unwrap().used());
    }

    #[test]
    fn test_uses_the_activation_prefix_and_index() {
        let (_users, activations) = fixtures();
        let activation = activations.add("alice").unwrap();

        assert!(activation.key().starts_with("act:"));
        assert_eq!(activations.count().unwrap(), 1);
        assert_eq!(
            activations.list(0, 9).unwrap()[0].code(),
            activation.code()
        );
    }
}
