//! Export routes — format/template listing and per-document rendering.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::warn;

use super::{error_response, now_millis};
use crate::state::AppState;
use docpipe_export::{render, template_names, ExportFormat};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/export/formats", get(list_formats))
        .route("/export/templates", get(list_templates))
        .route("/documents/{id}/export", post(export_document))
}

/// GET /api/export/formats
async fn list_formats() -> impl IntoResponse {
    Json(serde_json::json!({
        "formats": [
            { "format": "json", "description": "JSON format with metadata", "extension": ".json" },
            { "format": "csv", "description": "CSV format for spreadsheet applications", "extension": ".csv" },
            { "format": "pdf", "description": "PDF report", "extension": ".pdf" },
            { "format": "xlsx", "description": "Excel workbook with data and summary sheets", "extension": ".xlsx" },
        ]
    }))
}

/// GET /api/export/templates
async fn list_templates() -> impl IntoResponse {
    Json(serde_json::json!({ "templates": template_names() }))
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    format: String,
    template: Option<String>,
    /// Also write a copy into the exports data directory.
    #[serde(default)]
    save: bool,
}

/// POST /api/documents/:id/export — render and download.
async fn export_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> Response {
    let document = match state.store.get_document(&id) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Document not found" })),
            )
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    };

    let format = match ExportFormat::parse(&request.format) {
        Ok(format) => format,
        Err(e) => return error_response(&e).into_response(),
    };
    let template = request.template.as_deref().unwrap_or("generic");

    let file = match render(&document, format, template, now_millis()) {
        Ok(file) => file,
        Err(e) => return error_response(&e).into_response(),
    };

    if request.save {
        let path = state.config.data_paths.exports.join(&file.filename);
        if let Err(e) = std::fs::write(&path, &file.bytes) {
            warn!("Failed to save export copy to {}: {}", path.display(), e);
        }
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response()
}
