//! Sharing routes — share management, public token access, API-key reads.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::{error_response, now_millis};
use crate::state::AppState;
use docpipe_export::{render, ExportFormat};
use docpipe_store::{DocumentRecord, ShareRecord};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/documents/{id}/shares",
            get(list_document_shares).post(create_share),
        )
        .route("/shares", get(list_shares))
        .route("/shares/{id}", delete(revoke_share))
        .route("/shared/{token}", get(view_shared))
        .route("/shared/{token}/export", get(export_shared))
        .route("/ext/documents/{id}", get(api_key_read))
}

#[derive(Debug, Deserialize)]
struct ShareCreate {
    recipient_email: Option<String>,
    recipient_name: Option<String>,
    #[serde(default = "default_access_level")]
    access_level: String,
    /// Days until the share expires; omitted means no expiry.
    expires_in_days: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    api_endpoint_enabled: bool,
    export_format: Option<String>,
}

fn default_access_level() -> String {
    "view".to_string()
}

/// Opaque 32-character share token.
fn generate_share_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// API keys carry an `api_` prefix plus 24 opaque characters.
fn generate_api_key() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("api_{}", &raw[..24])
}

/// POST /api/documents/:id/shares
async fn create_share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ShareCreate>,
) -> impl IntoResponse {
    match state.store.get_document(&id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Document not found" })),
            )
        }
        Err(e) => return error_response(&e),
    }

    if request.access_level != "view" && request.access_level != "download" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "access_level must be 'view' or 'download'" })),
        );
    }

    let now = now_millis();
    let share = ShareRecord {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: id.clone(),
        recipient_email: request.recipient_email,
        recipient_name: request.recipient_name,
        access_level: request.access_level,
        share_token: generate_share_token(),
        expires_at: request
            .expires_in_days
            .map(|days| now + days * 24 * 60 * 60 * 1000),
        message: request.message,
        is_active: true,
        api_endpoint_enabled: request.api_endpoint_enabled,
        api_key: request.api_endpoint_enabled.then(generate_api_key),
        export_format: request.export_format,
        created_at: now,
    };

    if let Err(e) = state.store.insert_share(&share) {
        return error_response(&e);
    }

    info!("Created share {} for document {}", share.id, id);
    (StatusCode::CREATED, Json(serde_json::json!({ "share": share })))
}

/// GET /api/documents/:id/shares
async fn list_document_shares(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.list_shares(Some(&id)) {
        Ok(shares) => {
            let total = shares.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "shares": shares, "total": total })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/shares
async fn list_shares(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list_shares(None) {
        Ok(shares) => {
            let total = shares.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "shares": shares, "total": total })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/shares/:id — revoke (deactivate) a share.
async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.deactivate_share(&id) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "revoked": true, "id": id })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Share not found" })),
        ),
        Err(e) => error_response(&e),
    }
}

/// Resolve a share token to its document, enforcing active + expiry.
fn resolve_token(
    state: &AppState,
    token: &str,
) -> Result<(ShareRecord, DocumentRecord), (StatusCode, Json<serde_json::Value>)> {
    let share = match state.store.get_share_by_token(token) {
        Ok(Some(share)) => share,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Share not found" })),
            ))
        }
        Err(e) => return Err(error_response(&e)),
    };

    if !share.is_active {
        return Err((
            StatusCode::GONE,
            Json(serde_json::json!({ "error": "Share has been revoked" })),
        ));
    }
    if let Some(expires_at) = share.expires_at {
        if now_millis() > expires_at {
            return Err((
                StatusCode::GONE,
                Json(serde_json::json!({ "error": "Share has expired" })),
            ));
        }
    }

    let document = match state.store.get_document(&share.document_id) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Document not found" })),
            ))
        }
        Err(e) => return Err(error_response(&e)),
    };

    Ok((share, document))
}

/// Read-only view of a shared document: no file path, no internal error detail.
fn shared_view(share: &ShareRecord, document: &DocumentRecord) -> serde_json::Value {
    serde_json::json!({
        "document": {
            "id": document.id,
            "filename": document.original_filename,
            "mime_type": document.mime_type,
            "document_type": document.document_type,
            "processing_status": document.processing_status,
            "summary": document.summary,
            "fields": document.fields,
            "entities": document.entities,
            "extracted_text": document.extracted_text,
            "ocr_confidence": document.ocr_confidence,
            "created_at": document.created_at,
        },
        "share": {
            "access_level": share.access_level,
            "message": share.message,
            "expires_at": share.expires_at,
        },
    })
}

/// GET /api/shared/:token — public read-only document view.
async fn view_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    match resolve_token(&state, &token) {
        Ok((share, document)) => (StatusCode::OK, Json(shared_view(&share, &document))),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
struct SharedExportParams {
    format: Option<String>,
}

/// GET /api/shared/:token/export — render the shared document, defaulting
/// to the share's configured export format.
async fn export_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(params): Query<SharedExportParams>,
) -> Response {
    let (share, document) = match resolve_token(&state, &token) {
        Ok(pair) => pair,
        Err(response) => return response.into_response(),
    };

    if share.access_level != "download" {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "Share does not permit downloads" })),
        )
            .into_response();
    }

    let format_name = params
        .format
        .or(share.export_format)
        .unwrap_or_else(|| "json".to_string());
    let format = match ExportFormat::parse(&format_name) {
        Ok(format) => format,
        Err(e) => return error_response(&e).into_response(),
    };

    let file = match render(&document, format, "generic", now_millis()) {
        Ok(file) => file,
        Err(e) => return error_response(&e).into_response(),
    };

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

/// GET /api/ext/documents/:id — read-only access via `X-Api-Key`.
async fn api_key_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(api_key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Missing X-Api-Key header" })),
        );
    };

    let share = match state.store.get_share_by_api_key(api_key) {
        Ok(Some(share)) => share,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Invalid API key" })),
            )
        }
        Err(e) => return error_response(&e),
    };

    if !share.is_active || !share.api_endpoint_enabled {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "API access disabled for this share" })),
        );
    }
    if let Some(expires_at) = share.expires_at {
        if now_millis() > expires_at {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Share has expired" })),
            );
        }
    }
    if share.document_id != id {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "API key does not grant access to this document" })),
        );
    }

    match state.store.get_document(&id) {
        Ok(Some(document)) => (StatusCode::OK, Json(shared_view(&share, &document))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Document not found" })),
        ),
        Err(e) => error_response(&e),
    }
}
