//! Full-text search route.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;
use docpipe_store::{DocumentFilter, DocumentType, ProcessingStatus, SearchHit};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    status: Option<String>,
    doc_type: Option<String>,
    limit: Option<usize>,
}

/// GET /api/search — FTS over extracted text + summary; an empty query
/// degrades to a filtered listing.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let filter = DocumentFilter {
        status: params.status.as_deref().map(ProcessingStatus::parse),
        document_type: params.doc_type.as_deref().map(DocumentType::parse),
        limit: params.limit,
        offset: None,
    };

    let query = params.q.trim();
    let results = if query.is_empty() {
        // Listing fallback: same result shape, no ranking.
        match state.store.list_documents(&filter) {
            Ok((documents, _)) => documents
                .into_iter()
                .map(|doc| SearchHit {
                    doc_id: doc.id,
                    filename: doc.original_filename,
                    document_type: doc.document_type,
                    processing_status: doc.processing_status,
                    score: 0.0,
                    snippet: doc.summary.unwrap_or_default(),
                })
                .collect(),
            Err(e) => return error_response(&e),
        }
    } else {
        match state.store.search(query, &filter) {
            Ok(hits) => hits,
            Err(e) => return error_response(&e),
        }
    };

    let total = results.len();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "results": results,
            "total": total,
            "query": params.q,
            "search_type": if query.is_empty() { "listing" } else { "fulltext" },
        })),
    )
}
