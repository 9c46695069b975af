//! # Activation Routes
//!
//! Account activation codes:
//!
//! - `GET /activations` - paginated listing, admin only
//! - `POST /activations` - issue an activation, admin only
//! - `GET /activation/{code}` - admin only
//! - `DELETE /activation/{code}` - admin only
//! - `GET /activate/{code}` - redeem for the calling account
//!
//! Redemption authenticates with the activation requirement bypassed;
//! the account being activated is not activated yet.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::observability::Logger;

use super::auth::{authorize_admin, credentials};
use super::errors::{ApiError, ApiResult};
use super::pagination;
use super::state::AppState;

#[derive(Debug, Deserialize)]
struct NewActivation {
    username: String,
}

pub fn activation_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/activations", get(list_handler))
        .route("/activations", post(add_handler))
        .route("/activation/:code", get(get_handler))
        .route("/activation/:code", delete(delete_handler))
        .route("/activate/:code", get(activate_handler))
        .with_state(state)
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    let nav = pagination::nav(&query, state.activations.count()?)?;
    let activations = match nav.range() {
        Some((start, stop)) => state.activations.list(start, stop)?,
        None => Vec::new(),
    };
    let items: Vec<serde_json::Value> = activations.iter().map(|act| act.to_json()).collect();

    Ok(Json(serde_json::json!({
        "activations": items,
        "pagination": nav.to_json("/activations"),
    })))
}

async fn add_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewActivation>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    authorize_admin(&state, &headers)?;

    let activation = state.activations.add(&body.username)?;
    Logger::info(
        "activation issued",
        &[("code", activation.code()), ("user", activation.user())],
    );
    Ok((StatusCode::CREATED, Json(activation.to_json())))
}

async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    let activation = state.activations.get(&code)?;
    Ok(Json(activation.to_json()))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize_admin(&state, &headers)?;

    state.activations.delete(&code)?;
    Logger::info("activation deleted", &[("code", &code)]);
    Ok(Json(serde_json::Value::Bool(true)))
}

/// Redeem an activation for the calling account
async fn activate_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let creds = credentials(&headers).ok_or(ApiError::Unauthorized)?;

    let activation = state
        .activations
        .activate(&code, &creds.username, &creds.password)?;
    Logger::info("account activated", &[("user", activation.user())]);
    Ok(Json(serde_json::Value::Bool(true)))
}
