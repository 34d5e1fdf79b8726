//! Document routes — upload, list, get, delete, reprocess, tags.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use super::error_response;
use crate::state::AppState;
use docpipe_store::{DocumentFilter, DocumentType, NewDocument, ProcessingStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/documents/upload", post(upload_document))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/process", post(reprocess_document))
        .route("/documents/{id}/tags", get(list_tags).post(add_tag))
        .route("/documents/{id}/tags/{name}", delete(remove_tag))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<String>,
    doc_type: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ListParams {
    fn to_filter(&self) -> DocumentFilter {
        DocumentFilter {
            status: self.status.as_deref().map(ProcessingStatus::parse),
            document_type: self.doc_type.as_deref().map(DocumentType::parse),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// GET /api/documents — list with optional status/type filters.
async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match state.store.list_documents(&params.to_filter()) {
        Ok((documents, total)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "documents": documents, "total": total })),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /api/documents/upload — multipart upload; creates the document row
/// and queues a processing job.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(original_filename) = field.file_name().map(sanitize_filename) else {
            continue;
        };

        let ext = std::path::Path::new(&original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !state.config.is_extension_allowed(&ext) {
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(serde_json::json!({
                    "error": format!("File extension '{}' is not allowed", ext)
                })),
            );
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("Upload read failed: {}", e) })),
                );
            }
        };
        if bytes.len() as u64 > state.config.max_file_size {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(serde_json::json!({ "error": "File exceeds the maximum upload size" })),
            );
        }

        let mime_type = mime_guess::from_path(&original_filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let stored_filename = if ext.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", uuid::Uuid::new_v4(), ext)
        };
        let file_path = state.config.data_paths.uploads.join(&stored_filename);

        if let Err(e) = std::fs::write(&file_path, &bytes) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Write failed: {}", e) })),
            );
        }

        let new_doc = NewDocument {
            filename: stored_filename,
            original_filename: original_filename.clone(),
            file_path: file_path.to_string_lossy().to_string(),
            file_size: bytes.len() as i64,
            mime_type,
        };

        let document = match state.store.insert_document(new_doc) {
            Ok(doc) => doc,
            Err(e) => {
                let _ = std::fs::remove_file(&file_path);
                return error_response(&e);
            }
        };

        let job = match state.store.insert_job(&document.id, None) {
            Ok(job) => job,
            Err(e) => return error_response(&e),
        };
        state.enqueue_job(&job.id);

        info!(
            "Uploaded {} ({} bytes) as document {}, job {}",
            original_filename,
            bytes.len(),
            document.id,
            job.id
        );

        return (
            StatusCode::CREATED,
            Json(serde_json::json!({ "document": document, "job_id": job.id })),
        );
    }

    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "No file in upload request" })),
    )
}

/// GET /api/documents/:id — the document with its tags.
async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_document(&id) {
        Ok(Some(document)) => {
            let tags = state.store.tags_for_document(&id).unwrap_or_default();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "document": document, "tags": tags })),
            )
        }
        Ok(None) => not_found(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/documents/:id — removes the stored file and the row
/// (jobs, shares, and tag links cascade).
async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let document = match state.store.get_document(&id) {
        Ok(Some(doc)) => doc,
        Ok(None) => return not_found(),
        Err(e) => return error_response(&e),
    };

    if let Err(e) = std::fs::remove_file(&document.file_path) {
        warn!("Could not remove file {}: {}", document.file_path, e);
    }

    match state.store.delete_document(&id) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deleted": true, "id": id })),
        ),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReprocessRequest {
    model_id: Option<String>,
}

/// POST /api/documents/:id/process — queue another processing run,
/// optionally through a stored model configuration.
async fn reprocess_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ReprocessRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    match state.store.get_document(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return error_response(&e),
    }

    if let Some(model_id) = &request.model_id {
        match state.store.get_model(model_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({ "error": "Model not found" })),
                )
            }
            Err(e) => return error_response(&e),
        }
    }

    match state.store.insert_job(&id, request.model_id.as_deref()) {
        Ok(job) => {
            state.enqueue_job(&job.id);
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "job": job })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/documents/:id/tags
async fn list_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.tags_for_document(&id) {
        Ok(tags) => (StatusCode::OK, Json(serde_json::json!({ "tags": tags }))),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct TagRequest {
    name: String,
}

/// POST /api/documents/:id/tags
async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<TagRequest>,
) -> impl IntoResponse {
    match state.store.get_document(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return error_response(&e),
    }
    match state.store.add_tag(&id, &request.name) {
        Ok(()) => {
            let tags = state.store.tags_for_document(&id).unwrap_or_default();
            (StatusCode::OK, Json(serde_json::json!({ "tags": tags })))
        }
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/documents/:id/tags/:name
async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.remove_tag(&id, &name) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "removed": true })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Tag not attached to document" })),
        ),
        Err(e) => error_response(&e),
    }
}

fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Document not found" })),
    )
}

/// Sanitize a filename to prevent path traversal.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.replace('/', "").replace('\\', "").replace("..", "");

    std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}
