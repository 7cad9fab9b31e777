use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app_state::AppState;
use crate::db;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub jobs_running: usize,
    pub version: String,
}

/// Liveness plus database reachability; 503 while the database is down
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match db::check_health(&state.db_pool).await {
        Ok(()) => (StatusCode::OK, "healthy", "connected".to_string()),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            format!("error: {}", e),
        ),
    };

    let jobs_running = state
        .job_status
        .snapshot()
        .await
        .iter()
        .filter(|job| job.running)
        .count();

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            jobs_running,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
