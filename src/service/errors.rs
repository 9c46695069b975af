//! # Service Errors
//!
//! Error types for the HTTP service layer.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::codes::CodeError;
use crate::image::ImageError;
use crate::jobs::JobError;
use crate::schema::SchemaError;
use crate::store::StoreError;
use crate::user::UserError;

/// Realm reported on 401 responses
const REALM: &str = "Basic realm=\"exifwash\"";

/// Result type for request handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Request handling errors
#[derive(Debug, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed request payload
    #[error("{0}")]
    BadRequest(String),

    /// One or more fields failed validation
    #[error("{0}")]
    Validation(#[from] SchemaError),

    /// Missing or rejected credentials
    #[error("unauthorized")]
    Unauthorized,

    /// No such resource
    #[error("not found")]
    NotFound,

    // ==================
    // Domain Errors
    // ==================
    /// User account error
    #[error("{0}")]
    User(#[from] UserError),

    /// Code or activation error
    #[error("{0}")]
    Code(#[from] CodeError),

    /// Image handling error
    #[error("{0}")]
    Image(#[from] ImageError),

    /// Job queue error
    #[error("{0}")]
    Job(#[from] JobError),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Id generator kept producing taken ids
    #[error("could not allocate an unused id")]
    TooManyRetries,

    /// Store backend failure
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Anything else that should never happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,

            // Domain errors carry their own status
            ApiError::User(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Code(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Image(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Job(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }

            ApiError::TooManyRetries => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    /// Per-field messages, present on validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let fields = match err {
            ApiError::Validation(schema_err) => Some(schema_err.to_json()),
            ApiError::User(UserError::Validation(schema_err)) => Some(schema_err.to_json()),
            ApiError::Code(CodeError::Validation(schema_err)) => Some(schema_err.to_json()),
            _ => None,
        };
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
            fields,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("nope".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::TooManyRetries.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_errors_keep_their_status() {
        let err = ApiError::from(UserError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(CodeError::UserMismatch);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = ApiError::from(CodeError::FailedAuthentication);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unauthorized_carries_challenge_header() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok());
        assert_eq!(challenge, Some(REALM));
    }

    #[test]
    fn test_forbidden_has_no_challenge_header() {
        let response = ApiError::from(CodeError::UserMismatch).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_validation_body_lists_fields() {
        use crate::schema::FieldError;

        let schema_err = SchemaError::single("email", FieldError::Missing);
        let body = ErrorResponse::from(&ApiError::Validation(schema_err));
        assert_eq!(body.code, 400);
        let fields = body.fields.unwrap();
        assert!(fields.get("email").is_some());
    }
}
