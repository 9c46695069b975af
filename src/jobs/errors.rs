//! Job queue error types.

use thiserror::Error;

use crate::image::ImageError;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    // ==== Lookup ====
    #[error("job not found")]
    NotFound,

    // ==== Cancellation ====
    #[error("job has already started")]
    AlreadyStarted,

    // ==== Execution ====
    #[error("no handler registered for job '{0}'")]
    UnknownHandler(String),

    #[error("missing or malformed job argument '{0}'")]
    InvalidArgs(&'static str),

    #[error("job failed: {0}")]
    Handler(String),

    // ==== Internal ====
    #[error("job table lock poisoned")]
    Poisoned,
}

impl JobError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::AlreadyStarted => 409,
            Self::UnknownHandler(_) | Self::InvalidArgs(_) | Self::Handler(_) | Self::Poisoned => {
                500
            }
        }
    }
}

impl From<ImageError> for JobError {
    fn from(err: ImageError) -> Self {
        Self::Handler(err.to_string())
    }
}
