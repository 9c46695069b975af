//! # User Errors

use thiserror::Error;

use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for user operations
pub type UserResult<T> = Result<T, UserError>;

/// Errors from the user record and manager
#[derive(Debug, Clone, Error)]
pub enum UserError {
    /// No user under the given username
    #[error("user not found")]
    NotFound,

    /// Username already taken by another record
    #[error("username already in use")]
    UsernameInUse,

    /// Password hashing failed
    #[error("password hashing failed")]
    HashingFailed,

    /// Input rejected by the user schema
    #[error(transparent)]
    Validation(#[from] SchemaError),

    /// Store backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UserError {
    /// HTTP status the service layer maps this error to
    pub fn status_code(&self) -> u16 {
        match self {
            UserError::NotFound => 404,
            UserError::UsernameInUse => 409,
            UserError::Validation(_) => 400,
            UserError::HashingFailed => 500,
            UserError::Store(_) => 500,
        }
    }
}
