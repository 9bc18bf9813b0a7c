/// Unified error types for the Oxbow backend
use crate::mirror::GenerationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum OxbowError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed request bodies
    #[error("Validation error: {0}")]
    Validation(String),

    /// Admission checks that fail before any LLM call
    #[error("{0}")]
    Precondition(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mirror assembly failed after all retries
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A required collaborator is not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-LLM upstream failures (push gateway, speech-to-text)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OxbowError {
    /// Taxonomy tag reported as `errorType` in failure bodies
    pub fn error_type(&self) -> &'static str {
        match self {
            OxbowError::Database(_) => "persistence_error",
            OxbowError::Validation(_) => "validation_error",
            OxbowError::Precondition(_) => "precondition_error",
            OxbowError::NotFound(_) => "not_found",
            OxbowError::Generation(e) => e.error_type(),
            OxbowError::Configuration(_) => "configuration_error",
            OxbowError::Upstream(_) => "upstream_error",
            OxbowError::RateLimitExceeded { .. } => "rate_limited",
            OxbowError::Internal(_) | OxbowError::Io(_) => "exception",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OxbowError::Validation(_) | OxbowError::Precondition(_) => StatusCode::BAD_REQUEST,
            OxbowError::NotFound(_) => StatusCode::NOT_FOUND,
            OxbowError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the app
    pub fn public_message(&self) -> String {
        match self {
            OxbowError::Database(_) | OxbowError::Io(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Failure body shared by every entry point
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for OxbowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            success: false,
            error: self.public_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type OxbowResult<T> = Result<T, OxbowError>;
