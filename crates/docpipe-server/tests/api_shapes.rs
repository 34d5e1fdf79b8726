//! Response-shape and pipeline tests.
//!
//! Shape tests pin the JSON field names the HTTP surface promises; the
//! pipeline tests drive the store through the same transitions the
//! background worker performs, without an HTTP server.

use docpipe_store::{
    DocumentFilter, DocumentType, NewDocument, ProcessingStatus, ShareRecord, Store,
};

fn test_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (store, dir)
}

fn uploaded_document(store: &Store) -> docpipe_store::DocumentRecord {
    store
        .insert_document(NewDocument {
            filename: "stored.pdf".into(),
            original_filename: "Q3 invoice.pdf".into(),
            file_path: "/data/uploads/stored.pdf".into(),
            file_size: 4096,
            mime_type: "application/pdf".into(),
        })
        .unwrap()
}

/// The full worker lifecycle: uploaded → processing → ocr_complete →
/// ai_processing → completed, with the search index updated at the end.
#[test]
fn test_worker_status_lifecycle() {
    let (store, _dir) = test_store();
    let doc = uploaded_document(&store);
    let job = store.insert_job(&doc.id, None).unwrap();

    store.mark_job_processing(&job.id).unwrap();
    store
        .set_document_status(&doc.id, ProcessingStatus::Processing)
        .unwrap();
    store
        .set_document_ocr(&doc.id, "Invoice #Q3-77 Total: $980.00", 0.87, "easyocr")
        .unwrap();
    store
        .set_document_status(&doc.id, ProcessingStatus::AiProcessing)
        .unwrap();

    let report_fields = docpipe_analysis::validate_fields(&docpipe_analysis::extract_fields(
        "Invoice #Q3-77 Total: $980.00",
    ));
    store
        .set_document_analysis(
            &doc.id,
            DocumentType::Invoice,
            "Invoice Q3-77 for $980.00",
            &serde_json::json!({"model_used": "local_fallback", "ai_available": false}),
            &serde_json::to_value(&report_fields).unwrap(),
            &serde_json::json!([]),
        )
        .unwrap();
    store.mark_job_completed(&job.id, 850).unwrap();

    let done = store.get_document(&doc.id).unwrap().unwrap();
    assert_eq!(done.processing_status, ProcessingStatus::Completed);
    assert_eq!(done.document_type, DocumentType::Invoice);
    assert_eq!(done.ocr_engine.as_deref(), Some("easyocr"));
    assert!(done.processed_at.is_some());
    assert!(done.fields.unwrap().get("invoice_number").is_some());

    let hits = store.search("invoice", &DocumentFilter::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, doc.id);
}

/// OCR failure surfaces as a failed document with the error recorded,
/// not as an empty completed one.
#[test]
fn test_ocr_failure_becomes_failed_status() {
    let (store, _dir) = test_store();
    let doc = uploaded_document(&store);
    let job = store.insert_job(&doc.id, None).unwrap();

    store.mark_job_processing(&job.id).unwrap();
    store
        .set_document_failed(&doc.id, "OCR error: no OCR engine available")
        .unwrap();
    store
        .mark_job_failed(&job.id, "OCR error: no OCR engine available", 12)
        .unwrap();

    let failed = store.get_document(&doc.id).unwrap().unwrap();
    assert_eq!(failed.processing_status, ProcessingStatus::Failed);
    assert!(failed.error_message.unwrap().contains("no OCR engine"));

    // Failed documents are not indexed for search.
    assert!(store
        .search("invoice", &DocumentFilter::default())
        .unwrap()
        .is_empty());
}

/// Share flow end to end: token view allowed while active, blocked after
/// revocation; export rendering works off the stored row.
#[test]
fn test_share_and_export_flow() {
    let (store, _dir) = test_store();
    let doc = uploaded_document(&store);
    store
        .set_document_ocr(&doc.id, "Total: $42.00", 0.9, "tesseract")
        .unwrap();
    store
        .set_document_analysis(
            &doc.id,
            DocumentType::Receipt,
            "Receipt for $42.00",
            &serde_json::json!({}),
            &serde_json::json!({"amount": {"value": "42.00", "confidence": 0.85}}),
            &serde_json::json!([]),
        )
        .unwrap();

    let share = ShareRecord {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: doc.id.clone(),
        recipient_email: None,
        recipient_name: None,
        access_level: "download".into(),
        share_token: uuid::Uuid::new_v4().simple().to_string(),
        expires_at: None,
        message: Some("quarterly receipt".into()),
        is_active: true,
        api_endpoint_enabled: false,
        api_key: None,
        export_format: Some("csv".into()),
        created_at: 0,
    };
    store.insert_share(&share).unwrap();
    assert_eq!(share.share_token.len(), 32);

    let resolved = store
        .get_share_by_token(&share.share_token)
        .unwrap()
        .unwrap();
    assert!(resolved.is_active);

    let document = store.get_document(&resolved.document_id).unwrap().unwrap();
    let file = docpipe_export::render(
        &document,
        docpipe_export::ExportFormat::parse(resolved.export_format.as_deref().unwrap()).unwrap(),
        "receipt",
        1_700_000_000_000,
    )
    .unwrap();
    assert_eq!(file.content_type, "text/csv");
    assert!(String::from_utf8(file.bytes).unwrap().contains("42.00"));

    store.deactivate_share(&share.id).unwrap();
    let revoked = store
        .get_share_by_token(&share.share_token)
        .unwrap()
        .unwrap();
    assert!(!revoked.is_active);
}

/// Document list response shape: { documents: [...], total }.
#[test]
fn test_document_list_shape() {
    let (store, _dir) = test_store();
    uploaded_document(&store);

    let (documents, total) = store.list_documents(&DocumentFilter::default()).unwrap();
    assert_eq!(total, 1);

    let value = serde_json::json!({ "documents": documents, "total": total });
    assert!(value["documents"].is_array());
    assert!(value["total"].is_number());

    let doc = &value["documents"][0];
    assert!(doc["id"].is_string());
    assert_eq!(doc["processing_status"], "uploaded");
    assert_eq!(doc["document_type"], "generic");
    assert!(doc["file_size"].is_number());
    // Unset optionals are omitted, not null.
    assert!(doc.get("extracted_text").is_none());
}

/// Search response shape: { results, total, query, search_type }.
#[test]
fn test_search_response_shape() {
    let response = serde_json::json!({
        "results": [
            {
                "doc_id": "3a7c",
                "filename": "invoice.pdf",
                "document_type": "invoice",
                "processing_status": "completed",
                "score": 1.37,
                "snippet": "Invoice [consulting] services …",
            }
        ],
        "total": 1,
        "query": "consulting",
        "search_type": "fulltext",
    });

    assert!(response["results"].is_array());
    assert!(response["total"].is_number());
    assert!(response["query"].is_string());
    assert!(response["search_type"].is_string());

    let hit = &response["results"][0];
    assert!(hit["doc_id"].is_string());
    assert!(hit["score"].is_number());
    assert!(hit["snippet"].is_string());
}

/// Health response shape: { status, database, ocr: {...}, ai: {...} }.
#[test]
fn test_health_response_shape() {
    let response = serde_json::json!({
        "status": "ok",
        "database": true,
        "ocr": {
            "tesseract": true,
            "easyocr": false,
            "pdftoppm": true,
            "engines": ["tesseract"],
        },
        "ai": {
            "status": "degraded",
            "base_url": "http://localhost:11434",
            "model": "llama3.1:8b",
            "model_available": false,
            "available_models": [],
        },
    });

    assert!(response["database"].is_boolean());
    assert!(response["ocr"]["engines"].is_array());
    assert!(response["ai"]["status"].is_string());
}

/// Stats response shape matches the dashboard contract.
#[test]
fn test_stats_response_shape() {
    let response = serde_json::json!({
        "documents": 12,
        "documentsByStatus": { "completed": 10, "failed": 2 },
        "documentsByType": { "invoice": 7, "generic": 5 },
        "jobs": 14,
        "queuedJobs": 0,
        "models": 2,
        "activeShares": 1,
        "dbSizeMb": 0.4,
        "dbPath": "/data/db/docpipe.db",
    });

    assert!(response["documents"].is_number());
    assert!(response["documentsByStatus"].is_object());
    assert!(response["documentsByType"].is_object());
    assert!(response["queuedJobs"].is_number());
    assert!(response["dbSizeMb"].is_number());
}
