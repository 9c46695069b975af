//! User persistence.
//!
//! Two structures sit beside the records: a lookup hash mapping
//! username to storage key, and a sorted index of
//! `username::storage-key` members for listing. Every mutation lands
//! as a single write batch so the record and its index entries move
//! together.

use std::sync::Arc;

use crate::model::{index_member, member_storage_key};
use crate::schema::{Value, ValueMap};
use crate::store::{IndexOrder, KvStore, WriteBatch};

use super::errors::{UserError, UserResult};
use super::record::User;

/// Hash mapping username to storage key
pub(crate) const LOOKUP_INDEX: &str = "index:users:main";

/// Sorted index of username::key members, ascending by username
pub(crate) const BY_USERNAME_INDEX: &str = "index:users:by-username";

/// CRUD and authentication over stored users
pub struct UserManager<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> UserManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate input, reject a taken username, and persist the new
    /// record with its index entries in one batch.
    ///
    /// # Errors
    ///
    /// `UsernameInUse` when the username is already indexed, a
    /// validation error when the input fails the schema.
    pub fn add(&self, input: &ValueMap) -> UserResult<User> {
        let user = User::create(input)?;
        if self.store.hash_get(LOOKUP_INDEX, user.username())?.is_some() {
            return Err(UserError::UsernameInUse);
        }

        let key = user.key();
        let mut batch = WriteBatch::new();
        batch
            .hash_set_all(&key, user.to_hash()?)
            .hash_set(LOOKUP_INDEX, user.username(), &key)
            .index_add(BY_USERNAME_INDEX, &index_member(user.username(), &key));
        self.store.apply(batch)?;

        Ok(user)
    }

    /// Fetch a user by username. A lookup entry whose record is gone
    /// reads as absent.
    pub fn get(&self, username: &str) -> UserResult<User> {
        let key = self
            .store
            .hash_get(LOOKUP_INDEX, username)?
            .ok_or(UserError::NotFound)?;
        let data = self.store.hash_get_all(&key)?.ok_or(UserError::NotFound)?;
        User::from_hash(&data)
    }

    pub fn exists(&self, username: &str) -> UserResult<bool> {
        Ok(self.store.hash_get(LOOKUP_INDEX, username)?.is_some())
    }

    /// Persist a loaded record. When the username changed this
    /// session, the lookup entry and index member for the prior
    /// username are replaced in the same batch.
    ///
    /// # Errors
    ///
    /// `UsernameInUse` when the new username is indexed to another
    /// record.
    pub fn save(&self, user: &mut User) -> UserResult<()> {
        let key = user.key();
        let mut batch = WriteBatch::new();
        batch.hash_set_all(&key, user.to_hash()?);

        if user.changed().contains(&"username") {
            if let Some(owner) = self.store.hash_get(LOOKUP_INDEX, user.username())? {
                if owner != key {
                    return Err(UserError::UsernameInUse);
                }
            }
            if let Some(Value::Str(prior)) = user.old("username") {
                batch
                    .hash_del(LOOKUP_INDEX, prior)
                    .index_remove(BY_USERNAME_INDEX, &index_member(prior, &key));
            }
            batch
                .hash_set(LOOKUP_INDEX, user.username(), &key)
                .index_add(BY_USERNAME_INDEX, &index_member(user.username(), &key));
        }

        self.store.apply(batch)?;
        user.end_session();
        Ok(())
    }

    /// Fetch, apply a partial update, and save
    pub fn modify(&self, username: &str, changes: &ValueMap) -> UserResult<User> {
        let mut user = self.get(username)?;
        user.update(changes)?;
        self.save(&mut user)?;
        Ok(user)
    }

    /// Remove the record and both index entries
    pub fn delete(&self, username: &str) -> UserResult<()> {
        let user = self.get(username)?;
        let key = user.key();

        let mut batch = WriteBatch::new();
        batch
            .delete(&key)
            .hash_del(LOOKUP_INDEX, username)
            .index_remove(BY_USERNAME_INDEX, &index_member(username, &key));
        self.store.apply(batch)?;
        Ok(())
    }

    /// Users ordered ascending by username, over the inclusive index
    /// range. Members whose record has expired are skipped.
    pub fn list(&self, start: usize, stop: usize) -> UserResult<Vec<User>> {
        let members = self
            .store
            .index_range(BY_USERNAME_INDEX, start, stop, IndexOrder::Ascending)?;

        let mut users = Vec::with_capacity(members.len());
        for member in &members {
            let key = match member_storage_key(member) {
                Some(key) => key,
                None => continue,
            };
            match self.store.hash_get_all(key)? {
                Some(data) => users.push(User::from_hash(&data)?),
                None => continue,
            }
        }
        Ok(users)
    }

    pub fn count(&self) -> UserResult<usize> {
        Ok(self.store.index_len(BY_USERNAME_INDEX)?)
    }

    /// Check credentials against the stored record. An unknown
    /// username reads as a failed check rather than an error.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        bypass_activation: bool,
    ) -> UserResult<bool> {
        match self.get(username) {
            Ok(user) => Ok(user.authenticate(password, bypass_activation)),
            Err(UserError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
