//! Route definitions for the operational API

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:name", get(get_job))
}
