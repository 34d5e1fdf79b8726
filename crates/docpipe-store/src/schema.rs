//! Database schema SQL.

/// Core tables: documents, processing_jobs, ai_models, document_shares, tags.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    extracted_text TEXT,
    ocr_confidence REAL,
    ocr_engine TEXT,
    processing_status TEXT NOT NULL DEFAULT 'uploaded',
    document_type TEXT NOT NULL DEFAULT 'generic',
    summary TEXT,
    analysis_json TEXT,
    fields_json TEXT,
    entities_json TEXT,
    error_message TEXT,
    created_at INTEGER NOT NULL,
    processed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(processing_status);
CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(document_type);
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);

CREATE TABLE IF NOT EXISTS ai_models (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    model_type TEXT NOT NULL,
    prompt_template TEXT NOT NULL,
    temperature REAL NOT NULL DEFAULT 0.7,
    max_tokens INTEGER NOT NULL DEFAULT 1000,
    response_format TEXT NOT NULL DEFAULT 'text',
    is_active INTEGER NOT NULL DEFAULT 1,
    usage_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);

CREATE TABLE IF NOT EXISTS processing_jobs (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    model_id TEXT REFERENCES ai_models(id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    error_message TEXT,
    processing_time_ms INTEGER,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_jobs_document ON processing_jobs(document_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON processing_jobs(status);

CREATE TABLE IF NOT EXISTS document_shares (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    recipient_email TEXT,
    recipient_name TEXT,
    access_level TEXT NOT NULL DEFAULT 'view',
    share_token TEXT NOT NULL UNIQUE,
    expires_at INTEGER,
    message TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    api_endpoint_enabled INTEGER NOT NULL DEFAULT 0,
    api_key TEXT,
    export_format TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_shares_token ON document_shares(share_token);
CREATE INDEX IF NOT EXISTS idx_shares_document ON document_shares(document_id);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS document_tags (
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (document_id, tag_id)
);
"#;

/// Standalone FTS5 table over extracted text and summary.
///
/// Not a content= table: document primary keys are TEXT uuids, so rows are
/// written explicitly when analysis completes and removed on delete.
pub const FTS_SCHEMA_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    doc_id UNINDEXED, text, summary,
    tokenize='porter unicode61'
);
"#;
