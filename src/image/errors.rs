//! Image pipeline error types.

use thiserror::Error;

pub type ImageResult<T> = Result<T, ImageError>;

#[derive(Debug, Error)]
pub enum ImageError {
    // ==== Intake ====
    #[error("file is not a JPEG")]
    NotAJpeg,

    // ==== Parsing ====
    #[error("malformed JPEG: {0}")]
    Malformed(&'static str),

    // ==== Wrapped ====
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ImageError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotAJpeg | Self::Malformed(_) => 400,
            Self::Io(_) | Self::Json(_) => 500,
        }
    }
}
