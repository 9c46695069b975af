//! In-memory store backend.
//!
//! Hashes are string maps, indexes are ordered string sets, and key
//! deadlines implement TTL. A write lock held for the whole of
//! [`apply`] makes batches atomic with respect to every other caller.
//!
//! Expired keys read as absent and are swept on the next write. Index
//! members pointing at expired keys are not swept; readers treat
//! dangling members as not-found, matching the store contract.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use super::batch::{WriteBatch, WriteOp};
use super::errors::{StoreError, StoreResult};
use super::{IndexOrder, KvStore};

#[derive(Default)]
struct Shelves {
    hashes: HashMap<String, HashMap<String, String>>,
    indexes: HashMap<String, BTreeSet<String>>,
    deadlines: HashMap<String, DateTime<Utc>>,
}

impl Shelves {
    fn is_live(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.deadlines.get(key) {
            Some(deadline) => now < *deadline,
            None => self.hashes.contains_key(key),
        }
    }

    fn live_hash(&self, key: &str, now: DateTime<Utc>) -> Option<&HashMap<String, String>> {
        if self.is_live(key, now) {
            self.hashes.get(key)
        } else {
            None
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.hashes.remove(&key);
            self.deadlines.remove(&key);
        }
    }
}

/// In-memory implementation of [`KvStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Shelves>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Shelves>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Shelves>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl KvStore for MemoryStore {
    fn hash_get_all(&self, key: &str) -> StoreResult<Option<HashMap<String, String>>> {
        let shelves = self.read()?;
        Ok(shelves.live_hash(key, Utc::now()).cloned())
    }

    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let shelves = self.read()?;
        Ok(shelves
            .live_hash(key, Utc::now())
            .and_then(|hash| hash.get(field).cloned()))
    }

    fn hash_has(&self, key: &str, field: &str) -> StoreResult<bool> {
        let shelves = self.read()?;
        Ok(shelves
            .live_hash(key, Utc::now())
            .map(|hash| hash.contains_key(field))
            .unwrap_or(false))
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let shelves = self.read()?;
        Ok(shelves.live_hash(key, Utc::now()).is_some())
    }

    fn ttl(&self, key: &str) -> StoreResult<Option<i64>> {
        let shelves = self.read()?;
        let now = Utc::now();
        if !shelves.is_live(key, now) {
            return Ok(None);
        }
        Ok(shelves
            .deadlines
            .get(key)
            .map(|deadline| (*deadline - now).num_seconds().max(0)))
    }

    fn index_len(&self, index: &str) -> StoreResult<usize> {
        let shelves = self.read()?;
        Ok(shelves.indexes.get(index).map(BTreeSet::len).unwrap_or(0))
    }

    fn index_range(
        &self,
        index: &str,
        start: usize,
        stop: usize,
        order: IndexOrder,
    ) -> StoreResult<Vec<String>> {
        let shelves = self.read()?;
        let members = match shelves.indexes.get(index) {
            Some(members) => members,
            None => return Ok(Vec::new()),
        };

        if start >= members.len() || stop < start {
            return Ok(Vec::new());
        }
        let take = stop - start + 1;

        let slice = match order {
            IndexOrder::Ascending => members.iter().skip(start).take(take).cloned().collect(),
            IndexOrder::Descending => members
                .iter()
                .rev()
                .skip(start)
                .take(take)
                .cloned()
                .collect(),
        };
        Ok(slice)
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut shelves = self.write()?;
        let now = Utc::now();
        shelves.sweep(now);

        for op in batch.into_ops() {
            match op {
                WriteOp::SetHash { key, fields } => {
                    shelves.hashes.entry(key).or_default().extend(fields);
                }
                WriteOp::SetField { key, field, value } => {
                    shelves.hashes.entry(key).or_default().insert(field, value);
                }
                WriteOp::DeleteField { key, field } => {
                    if let Some(hash) = shelves.hashes.get_mut(&key) {
                        hash.remove(&field);
                    }
                }
                WriteOp::AddMember { index, member } => {
                    shelves.indexes.entry(index).or_default().insert(member);
                }
                WriteOp::RemoveMember { index, member } => {
                    if let Some(members) = shelves.indexes.get_mut(&index) {
                        members.remove(&member);
                    }
                }
                WriteOp::DeleteKey { key } => {
                    shelves.hashes.remove(&key);
                    shelves.deadlines.remove(&key);
                }
                WriteOp::Expire { key, seconds } => {
                    shelves
                        .deadlines
                        .insert(key, now + Duration::seconds(seconds));
                }
            }
        }
        Ok(())
    }
}
