//! Operational HTTP handlers

mod health;
mod jobs;

use serde::Serialize;

pub use health::{health_check, HealthResponse};
pub use jobs::{get_job, list_jobs};

/// Envelope for successful responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
