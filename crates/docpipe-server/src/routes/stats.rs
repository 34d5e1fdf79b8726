//! Dashboard stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(stats))
        .route("/health", get(health))
}

/// GET /api/stats — document/job/model/share counts for the dashboard.
async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.get_stats() {
        Ok(stats) => {
            let by_status: serde_json::Map<String, serde_json::Value> = stats
                .documents_by_status
                .iter()
                .map(|(status, count)| (status.clone(), serde_json::json!(count)))
                .collect();
            let by_type: serde_json::Map<String, serde_json::Value> = stats
                .documents_by_type
                .iter()
                .map(|(doc_type, count)| (doc_type.clone(), serde_json::json!(count)))
                .collect();

            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "documents": stats.total_documents,
                    "documentsByStatus": by_status,
                    "documentsByType": by_type,
                    "jobs": stats.total_jobs,
                    "queuedJobs": stats.queued_jobs,
                    "models": stats.total_models,
                    "activeShares": stats.active_shares,
                    "dbSizeMb": stats.db_size_mb,
                    "dbPath": stats.db_path,
                })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/health — database, OCR engine, and AI backend status.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_ok = state.store.count_documents().is_ok();
    let engines = state.extractor.engines();
    let ai = state.analyzer.client().health().await;

    let status = if database_ok { "ok" } else { "degraded" };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": status,
            "database": database_ok,
            "ocr": {
                "tesseract": engines.tesseract,
                "easyocr": engines.easyocr,
                "pdftoppm": engines.pdftoppm,
                "engines": engines.available(),
            },
            "ai": ai,
        })),
    )
}
