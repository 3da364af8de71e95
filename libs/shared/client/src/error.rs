use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized(msg) => AppError::Auth(msg),
            BackendError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
