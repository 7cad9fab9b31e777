//! Application state shared across the operational handlers

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::jobs::JobStatusBoard;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub job_status: JobStatusBoard,
}

impl AppState {
    pub fn new(db_pool: PgPool, job_status: JobStatusBoard) -> Self {
        Self {
            db_pool,
            job_status,
        }
    }
}

impl FromRef<AppState> for JobStatusBoard {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.job_status.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
