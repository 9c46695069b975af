//! Write batches.
//!
//! Managers collect every write of one logical operation into a batch
//! and submit it with a single [`apply`](super::KvStore::apply) call,
//! which the backend must make atomic with respect to other callers.

use std::collections::HashMap;

/// One write operation inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Merge fields into the hash at `key`
    SetHash {
        key: String,
        fields: HashMap<String, String>,
    },
    /// Set a single hash field
    SetField {
        key: String,
        field: String,
        value: String,
    },
    /// Remove a single hash field
    DeleteField { key: String, field: String },
    /// Insert a member into an ordered index
    AddMember { index: String, member: String },
    /// Remove a member from an ordered index
    RemoveMember { index: String, member: String },
    /// Remove a key entirely
    DeleteKey { key: String },
    /// Expire a key after the given number of seconds
    Expire { key: String, seconds: i64 },
}

/// Ordered collection of writes applied as one unit
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn hash_set_all(
        &mut self,
        key: impl Into<String>,
        fields: HashMap<String, String>,
    ) -> &mut Self {
        self.ops.push(WriteOp::SetHash {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn hash_set(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(WriteOp::SetField {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn hash_del(&mut self, key: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::DeleteField {
            key: key.into(),
            field: field.into(),
        });
        self
    }

    pub fn index_add(&mut self, index: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::AddMember {
            index: index.into(),
            member: member.into(),
        });
        self
    }

    pub fn index_remove(
        &mut self,
        index: impl Into<String>,
        member: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(WriteOp::RemoveMember {
            index: index.into(),
            member: member.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::DeleteKey { key: key.into() });
        self
    }

    pub fn expire(&mut self, key: impl Into<String>, seconds: i64) -> &mut Self {
        self.ops.push(WriteOp::Expire {
            key: key.into(),
            seconds,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
