//! # Code Routes
//!
//! Single-use codes tied to an owning account:
//!
//! - `GET /codes` - paginated listing, admin only
//! - `POST /codes` - issue a code, admin only
//! - `GET /code/{id}` - admin only
//! - `DELETE /code/{id}` - admin only
//! - `POST /use/{id}` - redeem a code as its owner

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::observability::Logger;

use super::auth::{authorize_admin, credentials};
use super::errors::{ApiError, ApiResult};
use super::pagination;
use super::request::body_values;
use super::state::AppState;

pub fn code_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/codes", get(list_handler))
        .route("/codes", post(add_handler))
        .route("/code/:id", get(get_handler))
        .route("/code/:id", delete(delete_handler))
        .route("/use/:id", post(use_handler))
        .with_state(state)
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    let nav = pagination::nav(&query, state.codes.count()?)?;
    let codes = match nav.range() {
        Some((start, stop)) => state.codes.list(start, stop)?,
        None => Vec::new(),
    };
    let items: Vec<serde_json::Value> = codes.iter().map(|code| code.to_json()).collect();

    Ok(Json(serde_json::json!({
        "codes": items,
        "pagination": nav.to_json("/codes"),
    })))
}

async fn add_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    authorize_admin(&state, &headers)?;

    let input = body_values(&body)?;
    let code = state.codes.add(&input)?;

    Logger::info("code issued", &[("id", code.code()), ("user", code.user())]);
    Ok((StatusCode::CREATED, Json(code.to_json())))
}

async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    let code = state.codes.get(&id)?;
    Ok(Json(code.to_json()))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    state.codes.delete(&id)?;
    Logger::info("code deleted", &[("id", &id)]);
    Ok(Json(serde_json::Value::Bool(true)))
}

/// Redeem a code. The caller proves ownership with their own
/// credentials; the manager enforces the single-use rules.
async fn use_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let creds = credentials(&headers).ok_or(ApiError::Unauthorized)?;

    let code = state.codes.consume(&id, &creds.username, &creds.password)?;
    Logger::info("code used", &[("id", code.code()), ("user", code.user())]);
    Ok(Json(code.to_json()))
}
