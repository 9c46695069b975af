//! Key-value store contract and the in-memory backend.
//!
//! The record managers see the store only through [`KvStore`]: hashes
//! keyed by string, ordered secondary indexes, per-key TTL, and atomic
//! write batches. Reads are individual calls; every write goes through
//! [`WriteBatch`] so one logical operation lands as one unit.
//!
//! # Design Principles
//!
//! - Managers receive a store handle, they never construct one
//! - A batch is all-or-nothing with respect to concurrent readers
//! - TTL is a property of the key, independent of its content
//! - Index members are plain strings in lexicographic order

use std::collections::HashMap;

mod batch;
mod errors;
mod memory;

pub use batch::{WriteBatch, WriteOp};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Iteration direction for ordered index ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    Ascending,
    Descending,
}

/// Store operations required by the record managers
pub trait KvStore: Send + Sync {
    /// Load every field of the hash at `key`; `None` if the key is
    /// absent or expired
    fn hash_get_all(&self, key: &str) -> StoreResult<Option<HashMap<String, String>>>;

    /// Load a single hash field
    fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Whether the hash at `key` has `field`
    fn hash_has(&self, key: &str, field: &str) -> StoreResult<bool>;

    /// Whether `key` is present and unexpired
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remaining seconds before `key` expires; `None` when the key is
    /// absent or has no deadline
    fn ttl(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Number of members in an ordered index
    fn index_len(&self, index: &str) -> StoreResult<usize>;

    /// Members of an ordered index over the zero-based inclusive range
    /// `start..=stop`; out-of-range positions yield an empty result
    fn index_range(
        &self,
        index: &str,
        start: usize,
        stop: usize,
        order: IndexOrder,
    ) -> StoreResult<Vec<String>>;

    /// Apply every write in the batch as one atomic unit
    fn apply(&self, batch: WriteBatch) -> StoreResult<()>;
}
