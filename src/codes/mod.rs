//! Single-use codes.
//!
//! - `record`: the schema-backed code record
//! - `manager`: persistence, listing, and redemption
//! - `errors`: code error types

pub mod errors;
pub mod manager;
pub mod record;

pub use errors::{CodeError, CodeResult};
pub use manager::{CodeManager, PostUseHook, Retention};
pub use record::{Code, CodeKind, DEFAULT_EXPIRY};
