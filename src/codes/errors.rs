//! Single-use code error types.

use thiserror::Error;

use crate::schema::SchemaError;
use crate::store::StoreError;
use crate::user::UserError;

pub type CodeResult<T> = Result<T, CodeError>;

#[derive(Debug, Error)]
pub enum CodeError {
    // ==== Lookup ====
    #[error("code not found")]
    NotFound,

    // ==== Redemption ====
    #[error("code has already been used")]
    AlreadyUsed,

    #[error("code belongs to another user")]
    UserMismatch,

    #[error("authentication failed")]
    FailedAuthentication,

    // ==== Wrapped ====
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Validation(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CodeError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyUsed => 409,
            Self::UserMismatch => 403,
            Self::FailedAuthentication => 401,
            Self::User(err) => err.status_code(),
            Self::Validation(_) => 400,
            Self::Store(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CodeError::NotFound.status_code(), 404);
        assert_eq!(CodeError::AlreadyUsed.status_code(), 409);
        assert_eq!(CodeError::UserMismatch.status_code(), 403);
        assert_eq!(CodeError::FailedAuthentication.status_code(), 401);
        assert_eq!(CodeError::User(UserError::NotFound).status_code(), 404);
    }
}
