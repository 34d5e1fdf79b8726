//! Processing job routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
}

#[derive(Debug, Deserialize)]
struct JobListParams {
    document_id: Option<String>,
    limit: Option<usize>,
}

/// GET /api/jobs — recent jobs, optionally for one document.
async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JobListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50);
    match state.store.list_jobs(params.document_id.as_deref(), limit) {
        Ok(jobs) => {
            let total = jobs.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "jobs": jobs, "total": total })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/jobs/:id
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_job(&id) {
        Ok(Some(job)) => (StatusCode::OK, Json(serde_json::json!({ "job": job }))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Job not found" })),
        ),
        Err(e) => error_response(&e),
    }
}
