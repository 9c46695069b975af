//! # HTTP Service Module
//!
//! The exifwash web API: image cleaning, job status, and the
//! account/code management endpoints, served by axum over one shared
//! [`AppState`].
//!
//! # Endpoints
//!
//! - `/clean`, `/status/{id}`, `/cancel/{id}`, `/data/{name}` - pipeline
//! - `/users`, `/user/{username}`, `/login` - accounts
//! - `/codes`, `/code/{id}`, `/use/{id}` - single-use codes
//! - `/activations`, `/activation/{code}`, `/activate/{code}` - activation

mod activation_routes;
mod cleaner_routes;
mod code_routes;
mod request;
mod user_routes;

pub mod auth;
pub mod errors;
pub mod pagination;
pub mod server;
pub mod state;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::ApiServer;
pub use state::AppState;
