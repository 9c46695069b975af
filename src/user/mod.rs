//! User accounts.
//!
//! - `record`: the schema-backed user record
//! - `manager`: CRUD and authentication over the store
//! - `crypto`: password hashing and constant-time comparison
//! - `errors`: user error types

pub mod crypto;
pub mod errors;
pub mod manager;
pub mod record;

pub use errors::{UserError, UserResult};
pub use manager::UserManager;
pub use record::User;
