//! # Image Cleaning Routes
//!
//! The unauthenticated upload pipeline:
//!
//! - `POST /clean` - submit a JPEG, get back its id
//! - `GET /status/{id}` - job status for an upload
//! - `PUT /cancel/{id}` - cancel a queued job
//! - `GET /data/{name}` - fetch a produced artifact
//!
//! Ids are unguessable; holding one is the only credential these
//! endpoints need.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::image;
use crate::jobs::{JobQueue, JobSpec, PROCESS_JOB};
use crate::observability::Logger;

use super::errors::{ApiError, ApiResult};
use super::state::AppState;

/// Multipart field the upload arrives under
const UPLOAD_FIELD: &str = "input";

pub fn cleaner_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/clean", post(clean_handler))
        .route("/status/:id", get(status_handler))
        .route("/cancel/:id", put(cancel_handler))
        .route("/data/:name", get(data_handler))
        .with_state(state)
}

/// Accept an upload, spool it into the data dir, and queue the
/// processing job under the image's id.
async fn clean_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;

        let id = state.reserve_id()?;
        image::intake(&data, &id, &state.config.data_dir)?;

        let spec = JobSpec::new(PROCESS_JOB, serde_json::json!({ "id": id }));
        state.queue.enqueue(&id, spec)?;

        Logger::info("upload accepted", &[("id", &id)]);
        return Ok(Json(serde_json::json!(id)));
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field '{UPLOAD_FIELD}'"
    )))
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = state.queue.status(&id)?;
    Ok(Json(snapshot.to_json()))
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.queue.cancel(&id)?;
    Logger::info("job cancelled", &[("id", &id)]);
    Ok(Json(serde_json::Value::Bool(true)))
}

/// Serve one produced artifact by its exact file name
async fn data_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<([(header::HeaderName, &'static str); 1], Vec<u8>)> {
    let path = artifact_path(&state.config.data_dir, &name).ok_or(ApiError::NotFound)?;

    let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ApiError::NotFound,
        _ => ApiError::Internal(err.to_string()),
    })?;

    let content_type = if name.ends_with(".json") {
        "application/json"
    } else {
        "image/jpeg"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// Resolve an artifact name inside the data dir.
///
/// Only the three names the pipeline produces are reachable; anything
/// pointing elsewhere resolves to nothing.
fn artifact_path(data_dir: &std::path::Path, name: &str) -> Option<PathBuf> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return None;
    }
    let artifact = name.ends_with(".thumb.jpg") || name.ends_with(".jpg") || name.ends_with(".json");
    if !artifact {
        return None;
    }
    Some(data_dir.join(name))
}
