use axum::{
    extract::{Path, State},
    Json,
};

use super::ApiResponse;
use crate::error::EngineError;
use crate::jobs::{JobRunInfo, JobStatusBoard};

pub async fn list_jobs(State(board): State<JobStatusBoard>) -> Json<ApiResponse<Vec<JobRunInfo>>> {
    Json(ApiResponse::ok(board.snapshot().await))
}

pub async fn get_job(
    State(board): State<JobStatusBoard>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<JobRunInfo>>, EngineError> {
    let job = board
        .get(&name)
        .await
        .ok_or_else(|| EngineError::NotFound(format!("Job '{}' not registered", name)))?;

    Ok(Json(ApiResponse::ok(job)))
}
