//! SQLite store for the document intake pipeline.
//!
//! One connection behind a mutex, WAL mode, prepared-statement cache.
//! Search is FTS5 (`porter unicode61`) over extracted text + summary, with
//! SQL filters layered on top.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use tracing::info;

use crate::schema::{FTS_SCHEMA_SQL, SCHEMA_SQL};
use crate::types::*;
use docpipe_core::{Error, Result};

/// SQLite-backed store for documents, jobs, models, shares, and tags.
pub struct Store {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

impl Store {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/docpipe.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("docpipe.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        let full_schema = format!("{}\n{}", SCHEMA_SQL, FTS_SCHEMA_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let doc_count = store.count_documents()?;
        info!(
            "Store initialized: {} documents, path={}",
            doc_count,
            store.db_path.display()
        );

        Ok(store)
    }

    // ---------------------------------------------------------------
    // Document CRUD
    // ---------------------------------------------------------------

    /// Insert a freshly uploaded document. Returns the new row.
    pub fn insert_document(&self, new: NewDocument) -> Result<DocumentRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO documents (id, filename, original_filename, file_path, file_size, \
             mime_type, processing_status, document_type, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'uploaded', 'generic', ?7)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            id,
            new.filename,
            new.original_filename,
            new.file_path,
            new.file_size,
            new.mime_type,
            now,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        self.get_document(&id)?
            .ok_or_else(|| Error::Internal("Inserted document not found".into()))
    }

    /// Get a document by ID.
    pub fn get_document(&self, doc_id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM documents WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![doc_id], |row| Ok(Self::row_to_document(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List documents with optional status/type filters. Returns (docs, total).
    pub fn list_documents(&self, filter: &DocumentFilter) -> Result<(Vec<DocumentRecord>, i64)> {
        let mut where_clauses: Vec<&str> = Vec::new();
        let mut bind: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            where_clauses.push("processing_status = ?");
            bind.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(doc_type) = filter.document_type {
            where_clauses.push("document_type = ?");
            bind.push(Value::Text(doc_type.as_str().to_string()));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let conn = self.conn.lock();
        let count_sql = format!("SELECT COUNT(*) FROM documents{}", where_sql);
        let total: i64 = conn
            .prepare(&count_sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params_from_iter(bind.iter()), |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;

        let limit = filter.limit.unwrap_or(50);
        let offset = filter.offset.unwrap_or(0);
        let list_sql = format!(
            "SELECT * FROM documents{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            where_sql
        );
        bind.push(Value::Integer(limit as i64));
        bind.push(Value::Integer(offset as i64));

        let mut stmt = conn
            .prepare(&list_sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok(Self::row_to_document(row))
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok((rows.filter_map(|r| r.ok()).collect(), total))
    }

    /// Delete a document; jobs, shares, and tag links cascade.
    pub fn delete_document(&self, doc_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM documents_fts WHERE doc_id = ?1",
            params![doc_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        let count = conn
            .execute("DELETE FROM documents WHERE id = ?1", params![doc_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Transition a document to a new processing status.
    pub fn set_document_status(&self, doc_id: &str, status: ProcessingStatus) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET processing_status = ?1 WHERE id = ?2",
                params![status.as_str(), doc_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Record OCR output and advance to `ocr_complete`.
    pub fn set_document_ocr(
        &self,
        doc_id: &str,
        text: &str,
        confidence: f64,
        engine: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET extracted_text = ?1, ocr_confidence = ?2, \
                 ocr_engine = ?3, processing_status = 'ocr_complete' WHERE id = ?4",
                params![text, confidence, engine, doc_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Record analysis output, mark the document completed, and index it for search.
    pub fn set_document_analysis(
        &self,
        doc_id: &str,
        document_type: DocumentType,
        summary: &str,
        analysis: &serde_json::Value,
        fields: &serde_json::Value,
        entities: &serde_json::Value,
    ) -> Result<bool> {
        let now = now_millis();
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET document_type = ?1, summary = ?2, analysis_json = ?3, \
                 fields_json = ?4, entities_json = ?5, processing_status = 'completed', \
                 error_message = NULL, processed_at = ?6 WHERE id = ?7",
                params![
                    document_type.as_str(),
                    summary,
                    serde_json::to_string(analysis)?,
                    serde_json::to_string(fields)?,
                    serde_json::to_string(entities)?,
                    now,
                    doc_id,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        if count == 0 {
            return Ok(false);
        }

        let text: Option<String> = conn
            .prepare_cached("SELECT extracted_text FROM documents WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![doc_id], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?
            .flatten();

        // Refresh the FTS row
        conn.execute(
            "DELETE FROM documents_fts WHERE doc_id = ?1",
            params![doc_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO documents_fts (doc_id, text, summary) VALUES (?1, ?2, ?3)",
            params![doc_id, text.unwrap_or_default(), summary],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(true)
    }

    /// Mark a document failed with an error message.
    pub fn set_document_failed(&self, doc_id: &str, error: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE documents SET processing_status = 'failed', error_message = ?1 \
                 WHERE id = ?2",
                params![error, doc_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count total documents.
    pub fn count_documents(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    // ---------------------------------------------------------------
    // Processing jobs
    // ---------------------------------------------------------------

    /// Create a queued job for a document.
    pub fn insert_job(&self, document_id: &str, model_id: Option<&str>) -> Result<JobRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO processing_jobs (id, document_id, model_id, status, created_at) \
             VALUES (?1, ?2, ?3, 'queued', ?4)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![id, document_id, model_id, now])
        .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        self.get_job(&id)?
            .ok_or_else(|| Error::Internal("Inserted job not found".into()))
    }

    /// Get a job by ID.
    pub fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM processing_jobs WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![job_id], |row| Ok(Self::row_to_job(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List jobs, optionally for a single document, newest first.
    pub fn list_jobs(&self, document_id: Option<&str>, limit: usize) -> Result<Vec<JobRecord>> {
        let conn = self.conn.lock();
        let rows = match document_id {
            Some(doc_id) => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT * FROM processing_jobs WHERE document_id = ?1 \
                         ORDER BY created_at DESC LIMIT ?2",
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map(params![doc_id, limit as i64], |row| {
                        Ok(Self::row_to_job(row))
                    })
                    .map_err(|e| Error::Database(e.to_string()))?;
                rows.filter_map(|r| r.ok()).collect()
            }
            None => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT * FROM processing_jobs ORDER BY created_at DESC LIMIT ?1",
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map(params![limit as i64], |row| Ok(Self::row_to_job(row)))
                    .map_err(|e| Error::Database(e.to_string()))?;
                rows.filter_map(|r| r.ok()).collect()
            }
        };
        Ok(rows)
    }

    /// Mark a job as running.
    pub fn mark_job_processing(&self, job_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE processing_jobs SET status = 'processing', started_at = ?1 WHERE id = ?2",
                params![now_millis(), job_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Mark a job completed with its wall-clock duration.
    pub fn mark_job_completed(&self, job_id: &str, processing_time_ms: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE processing_jobs SET status = 'completed', processing_time_ms = ?1, \
                 completed_at = ?2 WHERE id = ?3",
                params![processing_time_ms, now_millis(), job_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Mark a job failed with an error message.
    pub fn mark_job_failed(
        &self,
        job_id: &str,
        error: &str,
        processing_time_ms: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE processing_jobs SET status = 'failed', error_message = ?1, \
                 processing_time_ms = ?2, completed_at = ?3 WHERE id = ?4",
                params![error, processing_time_ms, now_millis(), job_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Re-queue jobs left queued or mid-processing by a previous run.
    /// Returns the jobs that need to be enqueued again.
    pub fn requeue_stale_jobs(&self) -> Result<Vec<JobRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT * FROM processing_jobs WHERE status IN ('queued', 'processing') \
                 ORDER BY created_at ASC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let stale: Vec<JobRecord> = stmt
            .query_map([], |row| Ok(Self::row_to_job(row)))
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        conn.execute(
            "UPDATE processing_jobs SET status = 'queued', started_at = NULL \
             WHERE status = 'processing'",
            [],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(stale)
    }

    // ---------------------------------------------------------------
    // AI models
    // ---------------------------------------------------------------

    /// Create a model configuration.
    pub fn insert_model(&self, new: NewModel) -> Result<ModelRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO ai_models (id, name, description, model_type, prompt_template, \
             temperature, max_tokens, response_format, is_active, usage_count, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 0, ?9)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            id,
            new.name,
            new.description,
            new.model_type.as_str(),
            new.prompt_template,
            new.temperature.unwrap_or(0.7),
            new.max_tokens.unwrap_or(1000),
            new.response_format.as_deref().unwrap_or("text"),
            now,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        self.get_model(&id)?
            .ok_or_else(|| Error::Internal("Inserted model not found".into()))
    }

    /// Get a model by ID.
    pub fn get_model(&self, model_id: &str) -> Result<Option<ModelRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT * FROM ai_models WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![model_id], |row| Ok(Self::row_to_model(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List model configurations, newest first.
    pub fn list_models(&self, active_only: bool) -> Result<Vec<ModelRecord>> {
        let conn = self.conn.lock();
        let sql = if active_only {
            "SELECT * FROM ai_models WHERE is_active = 1 ORDER BY created_at DESC"
        } else {
            "SELECT * FROM ai_models ORDER BY created_at DESC"
        };
        let mut stmt = conn.prepare(sql).map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_model(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Update the mutable fields of a model configuration.
    pub fn update_model(&self, model_id: &str, update: NewModel, is_active: bool) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE ai_models SET name = ?1, description = ?2, model_type = ?3, \
                 prompt_template = ?4, temperature = ?5, max_tokens = ?6, \
                 response_format = ?7, is_active = ?8, updated_at = ?9 WHERE id = ?10",
                params![
                    update.name,
                    update.description,
                    update.model_type.as_str(),
                    update.prompt_template,
                    update.temperature.unwrap_or(0.7),
                    update.max_tokens.unwrap_or(1000),
                    update.response_format.as_deref().unwrap_or("text"),
                    is_active,
                    now_millis(),
                    model_id,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Delete a model; jobs referencing it keep a NULL model_id.
    pub fn delete_model(&self, model_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM ai_models WHERE id = ?1", params![model_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Bump a model's usage counter after a successful run.
    pub fn increment_model_usage(&self, model_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE ai_models SET usage_count = usage_count + 1 WHERE id = ?1",
                params![model_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Document shares
    // ---------------------------------------------------------------

    /// Insert a share row (token and optional API key are caller-generated).
    pub fn insert_share(&self, share: &ShareRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO document_shares (id, document_id, recipient_email, recipient_name, \
             access_level, share_token, expires_at, message, is_active, \
             api_endpoint_enabled, api_key, export_format, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            share.id,
            share.document_id,
            share.recipient_email,
            share.recipient_name,
            share.access_level,
            share.share_token,
            share.expires_at,
            share.message,
            share.is_active,
            share.api_endpoint_enabled,
            share.api_key,
            share.export_format,
            share.created_at,
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a share by ID.
    pub fn get_share(&self, share_id: &str) -> Result<Option<ShareRecord>> {
        self.share_by("id", share_id)
    }

    /// Look up a share by its public token.
    pub fn get_share_by_token(&self, token: &str) -> Result<Option<ShareRecord>> {
        self.share_by("share_token", token)
    }

    /// Look up a share by its API key.
    pub fn get_share_by_api_key(&self, api_key: &str) -> Result<Option<ShareRecord>> {
        self.share_by("api_key", api_key)
    }

    fn share_by(&self, column: &str, value: &str) -> Result<Option<ShareRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT * FROM document_shares WHERE {} = ?1", column);
        let row = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![value], |row| Ok(Self::row_to_share(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// List shares, optionally for a single document, newest first.
    pub fn list_shares(&self, document_id: Option<&str>) -> Result<Vec<ShareRecord>> {
        let conn = self.conn.lock();
        let rows = match document_id {
            Some(doc_id) => {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT * FROM document_shares WHERE document_id = ?1 \
                         ORDER BY created_at DESC",
                    )
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map(params![doc_id], |row| Ok(Self::row_to_share(row)))
                    .map_err(|e| Error::Database(e.to_string()))?;
                rows.filter_map(|r| r.ok()).collect()
            }
            None => {
                let mut stmt = conn
                    .prepare_cached("SELECT * FROM document_shares ORDER BY created_at DESC")
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map([], |row| Ok(Self::row_to_share(row)))
                    .map_err(|e| Error::Database(e.to_string()))?;
                rows.filter_map(|r| r.ok()).collect()
            }
        };
        Ok(rows)
    }

    /// Revoke a share (kept as an inactive row for bookkeeping).
    pub fn deactivate_share(&self, share_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "UPDATE document_shares SET is_active = 0 WHERE id = ?1",
                params![share_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    // ---------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------

    /// Attach a tag to a document, creating the tag row if needed.
    pub fn add_tag(&self, doc_id: &str, name: &str) -> Result<()> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::Internal("Empty tag name".into()));
        }
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1)",
            params![name],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute(
            "INSERT OR IGNORE INTO document_tags (document_id, tag_id) \
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![doc_id, name],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Detach a tag from a document.
    pub fn remove_tag(&self, doc_id: &str, name: &str) -> Result<bool> {
        let name = name.trim().to_lowercase();
        let conn = self.conn.lock();
        let count = conn
            .execute(
                "DELETE FROM document_tags WHERE document_id = ?1 \
                 AND tag_id IN (SELECT id FROM tags WHERE name = ?2)",
                params![doc_id, name],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Tag names attached to a document.
    pub fn tags_for_document(&self, doc_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT t.name FROM tags t \
                 JOIN document_tags dt ON dt.tag_id = t.id \
                 WHERE dt.document_id = ?1 ORDER BY t.name",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![doc_id], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Full-text search
    // ---------------------------------------------------------------

    /// Full-text search over extracted text + summary with bm25 ranking,
    /// plus optional status/type filters.
    pub fn search(&self, query: &str, filter: &DocumentFilter) -> Result<Vec<SearchHit>> {
        let fts_query = Self::sanitize_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT d.id, d.original_filename, d.document_type, d.processing_status, \
             documents_fts.rank AS bm25_score, \
             snippet(documents_fts, 1, '[', ']', '…', 16) AS snip \
             FROM documents_fts \
             JOIN documents d ON d.id = documents_fts.doc_id \
             WHERE documents_fts MATCH ?",
        );
        let mut bind: Vec<Value> = vec![Value::Text(fts_query)];

        if let Some(status) = filter.status {
            sql.push_str(" AND d.processing_status = ?");
            bind.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(doc_type) = filter.document_type {
            sql.push_str(" AND d.document_type = ?");
            bind.push(Value::Text(doc_type.as_str().to_string()));
        }
        sql.push_str(" ORDER BY documents_fts.rank LIMIT ?");
        bind.push(Value::Integer(filter.limit.unwrap_or(20) as i64));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                let bm25_score: f64 = row.get("bm25_score").unwrap_or(0.0);
                Ok(SearchHit {
                    doc_id: row.get("id")?,
                    filename: row.get("original_filename")?,
                    document_type: DocumentType::parse(
                        &row.get::<_, String>("document_type").unwrap_or_default(),
                    ),
                    processing_status: ProcessingStatus::parse(
                        &row.get::<_, String>("processing_status").unwrap_or_default(),
                    ),
                    score: -bm25_score, // FTS5 rank is negative; negate for positive
                    snippet: row.get("snip").unwrap_or_default(),
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Sanitize a user query for FTS5 MATCH syntax.
    /// Wraps each token in double quotes and joins with OR.
    fn sanitize_fts_query(query: &str) -> String {
        let tokens: Vec<String> = query
            .split_whitespace()
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t.replace('"', "")))
            .collect();
        if tokens.is_empty() {
            return String::new();
        }
        tokens.join(" OR ")
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    /// Get store statistics for the dashboard.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_documents = self.count_documents()?;

        let conn = self.conn.lock();

        let mut by_status = Vec::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT processing_status, COUNT(*) FROM documents \
                     GROUP BY processing_status",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| Error::Database(e.to_string()))?;
            by_status.extend(rows.filter_map(|r| r.ok()));
        }

        let mut by_type = Vec::new();
        {
            let mut stmt = conn
                .prepare("SELECT document_type, COUNT(*) FROM documents GROUP BY document_type")
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| Error::Database(e.to_string()))?;
            by_type.extend(rows.filter_map(|r| r.ok()));
        }

        let total_jobs: i64 = conn
            .query_row("SELECT COUNT(*) FROM processing_jobs", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        let queued_jobs: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM processing_jobs WHERE status = 'queued'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let total_models: i64 = conn
            .query_row("SELECT COUNT(*) FROM ai_models", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        let active_shares: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM document_shares WHERE is_active = 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);

        Ok(StoreStats {
            total_documents,
            documents_by_status: by_status,
            documents_by_type: by_type,
            total_jobs,
            queued_jobs,
            total_models,
            active_shares,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_document(row: &rusqlite::Row<'_>) -> DocumentRecord {
        DocumentRecord {
            id: row.get("id").unwrap_or_default(),
            filename: row.get("filename").unwrap_or_default(),
            original_filename: row.get("original_filename").unwrap_or_default(),
            file_path: row.get("file_path").unwrap_or_default(),
            file_size: row.get("file_size").unwrap_or(0),
            mime_type: row.get("mime_type").unwrap_or_default(),
            extracted_text: row.get("extracted_text").ok().flatten(),
            ocr_confidence: row.get("ocr_confidence").ok().flatten(),
            ocr_engine: row.get("ocr_engine").ok().flatten(),
            processing_status: ProcessingStatus::parse(
                &row.get::<_, String>("processing_status").unwrap_or_default(),
            ),
            document_type: DocumentType::parse(
                &row.get::<_, String>("document_type").unwrap_or_default(),
            ),
            summary: row.get("summary").ok().flatten(),
            analysis: row
                .get::<_, Option<String>>("analysis_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            fields: row
                .get::<_, Option<String>>("fields_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            entities: row
                .get::<_, Option<String>>("entities_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            error_message: row.get("error_message").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            processed_at: row.get("processed_at").ok().flatten(),
        }
    }

    fn row_to_job(row: &rusqlite::Row<'_>) -> JobRecord {
        JobRecord {
            id: row.get("id").unwrap_or_default(),
            document_id: row.get("document_id").unwrap_or_default(),
            model_id: row.get("model_id").ok().flatten(),
            status: JobStatus::parse(&row.get::<_, String>("status").unwrap_or_default()),
            error_message: row.get("error_message").ok().flatten(),
            processing_time_ms: row.get("processing_time_ms").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            started_at: row.get("started_at").ok().flatten(),
            completed_at: row.get("completed_at").ok().flatten(),
        }
    }

    fn row_to_model(row: &rusqlite::Row<'_>) -> ModelRecord {
        ModelRecord {
            id: row.get("id").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            description: row.get("description").ok().flatten(),
            model_type: ModelType::parse(&row.get::<_, String>("model_type").unwrap_or_default()),
            prompt_template: row.get("prompt_template").unwrap_or_default(),
            temperature: row.get("temperature").unwrap_or(0.7),
            max_tokens: row.get("max_tokens").unwrap_or(1000),
            response_format: row.get("response_format").unwrap_or_else(|_| "text".into()),
            is_active: row.get("is_active").unwrap_or(true),
            usage_count: row.get("usage_count").unwrap_or(0),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").ok().flatten(),
        }
    }

    fn row_to_share(row: &rusqlite::Row<'_>) -> ShareRecord {
        ShareRecord {
            id: row.get("id").unwrap_or_default(),
            document_id: row.get("document_id").unwrap_or_default(),
            recipient_email: row.get("recipient_email").ok().flatten(),
            recipient_name: row.get("recipient_name").ok().flatten(),
            access_level: row.get("access_level").unwrap_or_else(|_| "view".into()),
            share_token: row.get("share_token").unwrap_or_default(),
            expires_at: row.get("expires_at").ok().flatten(),
            message: row.get("message").ok().flatten(),
            is_active: row.get("is_active").unwrap_or(false),
            api_endpoint_enabled: row.get("api_endpoint_enabled").unwrap_or(false),
            api_key: row.get("api_key").ok().flatten(),
            export_format: row.get("export_format").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (store, dir)
    }

    fn test_document(store: &Store) -> DocumentRecord {
        store
            .insert_document(NewDocument {
                filename: "abc123.pdf".into(),
                original_filename: "invoice.pdf".into(),
                file_path: "/data/uploads/abc123.pdf".into(),
                file_size: 1024,
                mime_type: "application/pdf".into(),
            })
            .unwrap()
    }

    #[test]
    fn test_insert_and_get_document() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);

        assert_eq!(doc.processing_status, ProcessingStatus::Uploaded);
        assert_eq!(doc.document_type, DocumentType::Generic);

        let fetched = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.original_filename, "invoice.pdf");
    }

    #[test]
    fn test_status_transitions() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);

        store
            .set_document_status(&doc.id, ProcessingStatus::Processing)
            .unwrap();
        store
            .set_document_ocr(&doc.id, "Invoice #INV-1 total $42.00", 0.91, "tesseract")
            .unwrap();

        let fetched = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.processing_status, ProcessingStatus::OcrComplete);
        assert_eq!(fetched.ocr_engine.as_deref(), Some("tesseract"));
        assert_eq!(fetched.ocr_confidence, Some(0.91));
    }

    #[test]
    fn test_analysis_completes_and_indexes() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);
        store
            .set_document_ocr(&doc.id, "Invoice for consulting services, total $500", 0.8, "tesseract")
            .unwrap();

        store
            .set_document_analysis(
                &doc.id,
                DocumentType::Invoice,
                "Invoice for consulting services",
                &serde_json::json!({"model_used": "local_fallback"}),
                &serde_json::json!({"amount": {"value": "500", "confidence": 0.85}}),
                &serde_json::json!([]),
            )
            .unwrap();

        let fetched = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.processing_status, ProcessingStatus::Completed);
        assert_eq!(fetched.document_type, DocumentType::Invoice);
        assert!(fetched.processed_at.is_some());

        let hits = store.search("consulting", &DocumentFilter::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, doc.id);
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn test_search_filters_by_type() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);
        store
            .set_document_ocr(&doc.id, "quarterly financial report findings", 0.9, "direct")
            .unwrap();
        store
            .set_document_analysis(
                &doc.id,
                DocumentType::Report,
                "Quarterly report",
                &serde_json::json!({}),
                &serde_json::json!({}),
                &serde_json::json!([]),
            )
            .unwrap();

        let filter = DocumentFilter {
            document_type: Some(DocumentType::Invoice),
            ..Default::default()
        };
        assert!(store.search("report", &filter).unwrap().is_empty());

        let filter = DocumentFilter {
            document_type: Some(DocumentType::Report),
            ..Default::default()
        };
        assert_eq!(store.search("report", &filter).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_cascades() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);
        let job = store.insert_job(&doc.id, None).unwrap();
        store.add_tag(&doc.id, "Finance").unwrap();

        assert!(store.delete_document(&doc.id).unwrap());
        assert!(store.get_document(&doc.id).unwrap().is_none());
        assert!(store.get_job(&job.id).unwrap().is_none());
    }

    #[test]
    fn test_job_lifecycle() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);
        let job = store.insert_job(&doc.id, None).unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        store.mark_job_processing(&job.id).unwrap();
        let running = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(running.status, JobStatus::Processing);
        assert!(running.started_at.is_some());

        store.mark_job_completed(&job.id, 1234).unwrap();
        let done = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processing_time_ms, Some(1234));
    }

    #[test]
    fn test_requeue_stale_jobs() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);
        let job = store.insert_job(&doc.id, None).unwrap();
        store.mark_job_processing(&job.id).unwrap();

        let stale = store.requeue_stale_jobs().unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, job.id);

        let requeued = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);
    }

    #[test]
    fn test_share_token_lookup_and_revoke() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);

        let share = ShareRecord {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            recipient_email: Some("a@example.com".into()),
            recipient_name: None,
            access_level: "view".into(),
            share_token: "tok_abcdef".into(),
            expires_at: None,
            message: None,
            is_active: true,
            api_endpoint_enabled: true,
            api_key: Some("api_key123".into()),
            export_format: Some("json".into()),
            created_at: 0,
        };
        store.insert_share(&share).unwrap();

        let by_token = store.get_share_by_token("tok_abcdef").unwrap().unwrap();
        assert_eq!(by_token.document_id, doc.id);
        let by_key = store.get_share_by_api_key("api_key123").unwrap().unwrap();
        assert_eq!(by_key.id, share.id);

        store.deactivate_share(&share.id).unwrap();
        assert!(!store.get_share(&share.id).unwrap().unwrap().is_active);
    }

    #[test]
    fn test_tags_roundtrip() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);

        store.add_tag(&doc.id, "Finance").unwrap();
        store.add_tag(&doc.id, "finance").unwrap(); // dedup via lowercase
        store.add_tag(&doc.id, "2024").unwrap();

        let tags = store.tags_for_document(&doc.id).unwrap();
        assert_eq!(tags, vec!["2024".to_string(), "finance".to_string()]);

        assert!(store.remove_tag(&doc.id, "finance").unwrap());
        assert_eq!(store.tags_for_document(&doc.id).unwrap().len(), 1);
    }

    #[test]
    fn test_model_crud_and_usage() {
        let (store, _dir) = test_store();
        let model = store
            .insert_model(NewModel {
                name: "Invoice extractor".into(),
                description: None,
                model_type: ModelType::Extractor,
                prompt_template: "Extract fields from: {text}".into(),
                temperature: Some(0.2),
                max_tokens: None,
                response_format: Some("json".into()),
            })
            .unwrap();
        assert!(model.is_active);
        assert_eq!(model.usage_count, 0);

        store.increment_model_usage(&model.id).unwrap();
        let fetched = store.get_model(&model.id).unwrap().unwrap();
        assert_eq!(fetched.usage_count, 1);

        assert!(store.delete_model(&model.id).unwrap());
        assert!(store.get_model(&model.id).unwrap().is_none());
    }

    #[test]
    fn test_failed_status_records_error() {
        let (store, _dir) = test_store();
        let doc = test_document(&store);

        store
            .set_document_failed(&doc.id, "no OCR engine available")
            .unwrap();
        let fetched = store.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.processing_status, ProcessingStatus::Failed);
        assert_eq!(
            fetched.error_message.as_deref(),
            Some("no OCR engine available")
        );
    }
}
