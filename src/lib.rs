//! exifwash - a small, self-hostable web service that strips EXIF
//! metadata from JPEG images
//!
//! Uploads go through a validation-schema-backed record layer over an
//! in-process key-value store, a local background job queue processes
//! each image (thumbnail, metadata dump, clean), and an axum HTTP
//! surface exposes the pipeline plus user, code, and activation
//! management.

pub mod activation;
pub mod cli;
pub mod codes;
pub mod config;
pub mod ids;
pub mod image;
pub mod jobs;
pub mod model;
pub mod observability;
pub mod schema;
pub mod service;
pub mod store;
pub mod user;
