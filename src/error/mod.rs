//! Centralized error handling for the loan engine
//!
//! Store adapters, notification senders and the scheduler all report failures
//! through [`EngineError`]. The operational HTTP endpoints render it as a JSON
//! error body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Engine error type with stable error codes
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("Job already registered: {0}")]
    DuplicateJob(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl EngineError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::DatabaseError(_) => "DATABASE_ERROR",
            EngineError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            EngineError::InvalidSchedule(_) => "INVALID_SCHEDULE",
            EngineError::DuplicateJob(_) => "DUPLICATE_JOB",
            EngineError::Configuration(_) => "CONFIGURATION_ERROR",
            EngineError::Cancelled => "CANCELLED",
            EngineError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            EngineError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::InvalidSchedule(_) | EngineError::DuplicateJob(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::Configuration(_)
            | EngineError::Cancelled
            | EngineError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => EngineError::NotFound("Record not found".to_string()),
            _ => EngineError::DatabaseError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::ExternalServiceError(err.to_string())
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
