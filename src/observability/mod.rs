//! Observability.
//!
//! Structured JSON logging only: one line per event, synchronous,
//! deterministic key order. Logging must never affect request
//! handling, so every write failure is swallowed.

mod logger;

pub use logger::{Logger, Severity};
