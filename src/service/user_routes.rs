//! # User Routes
//!
//! Account management and credential checks:
//!
//! - `GET /users` - paginated listing, admin only
//! - `POST /users` - create an account, admin only
//! - `GET /user/{username}` - admin or the account itself
//! - `PUT /user/{username}` - admin or the account itself
//! - `DELETE /user/{username}` - admin only
//! - `POST /login` - validate the presented credentials

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::observability::Logger;

use super::auth::{authorize, authorize_admin};
use super::errors::{ApiError, ApiResult};
use super::pagination;
use super::request::body_values;
use super::state::AppState;

/// Fields only an admin may set or change
const RESTRICTED_FIELDS: [&str; 3] = ["admin", "activated", "enabled"];

pub fn user_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(list_handler))
        .route("/users", post(add_handler))
        .route("/user/:username", get(get_handler))
        .route("/user/:username", put(modify_handler))
        .route("/user/:username", delete(delete_handler))
        .route("/login", post(login_handler))
        .with_state(state)
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    let nav = pagination::nav(&query, state.users.count()?)?;
    let users = match nav.range() {
        Some((start, stop)) => state.users.list(start, stop)?,
        None => Vec::new(),
    };
    let items: Vec<serde_json::Value> = users.iter().map(|user| user.to_json()).collect();

    Ok(Json(serde_json::json!({
        "users": items,
        "pagination": nav.to_json("/users"),
    })))
}

async fn add_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    authorize_admin(&state, &headers)?;

    let input = body_values(&body)?;
    let user = state.users.add(&input)?;

    Logger::info("user added", &[("username", user.username())]);
    Ok((StatusCode::CREATED, Json(user.to_json())))
}

async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = authorize(&state, &headers)?;
    if !caller.admin() && caller.username() != username {
        return Err(ApiError::Unauthorized);
    }

    let user = state.users.get(&username)?;
    Ok(Json(user.to_json()))
}

async fn modify_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = authorize(&state, &headers)?;
    let changes = body_values(&body)?;

    if !caller.admin() {
        if caller.username() != username {
            return Err(ApiError::Unauthorized);
        }
        if RESTRICTED_FIELDS
            .iter()
            .any(|field| changes.contains_key(*field))
        {
            return Err(ApiError::Unauthorized);
        }
    }

    let user = state.users.modify(&username, &changes)?;
    Logger::info("user modified", &[("username", user.username())]);
    Ok(Json(user.to_json()))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    state.users.delete(&username)?;
    Logger::info("user deleted", &[("username", &username)]);
    Ok(Json(serde_json::Value::Bool(true)))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = authorize(&state, &headers)?;
    Ok(Json(user.to_json()))
}
