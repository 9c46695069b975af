//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a key-value store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A lock guarding shared state was poisoned
    #[error("store lock poisoned")]
    Poisoned,

    /// Backend-specific failure
    #[error("store backend error: {0}")]
    Backend(String),
}
