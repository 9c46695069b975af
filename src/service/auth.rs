//! # Request Authorization
//!
//! HTTP Basic credential extraction and the access checks handlers
//! call before touching protected resources.
//!
//! Every failure mode maps to a plain 401: a missing header, garbled
//! base64, an unknown username, a wrong password, and an admin check
//! against a regular account all look identical to the caller.

use axum::http::{header, HeaderMap};

use crate::user::{User, UserError};

use super::errors::{ApiError, ApiResult};
use super::state::AppState;

/// Username and password recovered from an Authorization header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Pull Basic credentials out of request headers.
///
/// Returns `None` for anything that is not a well-formed
/// `Authorization: Basic <base64(user:pass)>` header. The password may
/// itself contain colons; only the first one splits.
pub fn credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Authorize a request from an activated account
pub fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<User> {
    check(state, headers, false, false)
}

/// Authorize a request from an admin account
pub fn authorize_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<User> {
    check(state, headers, true, false)
}

/// Authorize a request whose account may not be activated yet.
///
/// Activation redemption uses this; the account being activated cannot
/// already be activated.
pub fn authorize_unactivated(state: &AppState, headers: &HeaderMap) -> ApiResult<User> {
    check(state, headers, false, true)
}

fn check(
    state: &AppState,
    headers: &HeaderMap,
    admin: bool,
    bypass_activation: bool,
) -> ApiResult<User> {
    let creds = credentials(headers).ok_or(ApiError::Unauthorized)?;

    let user = match state.users.get(&creds.username) {
        Ok(user) => user,
        Err(UserError::NotFound) => return Err(ApiError::Unauthorized),
        Err(err) => return Err(err.into()),
    };

    if admin && !user.admin() {
        return Err(ApiError::Unauthorized);
    }

    if !user.authenticate(&creds.password, bypass_activation) {
        return Err(ApiError::Unauthorized);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic_header(raw: &str) -> HeaderMap {
        let encoded =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, raw.as_bytes());
        let mut headers = HeaderMap::new();
        let value = format!("Basic {encoded}");
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_parses_basic_credentials() {
        let headers = basic_header("carol:hunter2");
        let creds = credentials(&headers).unwrap();
        assert_eq!(creds.username, "carol");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn test_password_keeps_embedded_colons() {
        let headers = basic_header("carol:pa:ss:word");
        let creds = credentials(&headers).unwrap();
        assert_eq!(creds.password, "pa:ss:word");
    }

    #[test]
    fn test_rejects_missing_header() {
        assert!(credentials(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_rejects_non_basic_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abcdef"),
        );
        assert!(credentials(&headers).is_none());
    }

    #[test]
    fn test_rejects_garbled_base64() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic %%%not-base64%%%"),
        );
        assert!(credentials(&headers).is_none());
    }

    #[test]
    fn test_rejects_credentials_without_colon() {
        let headers = basic_header("carolhunter2");
        assert!(credentials(&headers).is_none());
    }
}
