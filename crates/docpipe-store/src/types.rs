//! Row types and status enums for the document store.

use serde::{Deserialize, Serialize};

/// Document processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Uploaded,
    Processing,
    OcrComplete,
    AiProcessing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::OcrComplete => "ocr_complete",
            Self::AiProcessing => "ai_processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status string; unknown values map to `Uploaded`.
    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "ocr_complete" => Self::OcrComplete,
            "ai_processing" => Self::AiProcessing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Uploaded,
        }
    }
}

/// Document category assigned by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Contract,
    Form,
    Receipt,
    Letter,
    Report,
    Generic,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Contract => "contract",
            Self::Form => "form",
            Self::Receipt => "receipt",
            Self::Letter => "letter",
            Self::Report => "report",
            Self::Generic => "generic",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "invoice" => Self::Invoice,
            "contract" => Self::Contract,
            "form" => Self::Form,
            "receipt" => Self::Receipt,
            "letter" => Self::Letter,
            "report" => Self::Report,
            _ => Self::Generic,
        }
    }
}

/// Processing job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Queued,
        }
    }
}

/// Kind of AI model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Interpreter,
    Summarizer,
    Extractor,
    Qa,
    Custom,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interpreter => "interpreter",
            Self::Summarizer => "summarizer",
            Self::Extractor => "extractor",
            Self::Qa => "qa",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "interpreter" => Self::Interpreter,
            "summarizer" => Self::Summarizer,
            "extractor" => Self::Extractor,
            "qa" => Self::Qa,
            _ => Self::Custom,
        }
    }
}

/// A document row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_engine: Option<String>,
    pub processing_status: ProcessingStatus,
    pub document_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
}

/// Fields required to create a document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// A processing job row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<i64>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// An AI model configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model_type: ModelType,
    pub prompt_template: String,
    pub temperature: f64,
    pub max_tokens: i64,
    pub response_format: String,
    pub is_active: bool,
    pub usage_count: i64,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Fields required to create a model row.
#[derive(Debug, Clone, Deserialize)]
pub struct NewModel {
    pub name: String,
    pub description: Option<String>,
    pub model_type: ModelType,
    pub prompt_template: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub response_format: Option<String>,
}

/// A document share row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub access_level: String,
    pub share_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_active: bool,
    pub api_endpoint_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_format: Option<String>,
    pub created_at: i64,
}

/// Filters for document listing and search.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<ProcessingStatus>,
    pub document_type: Option<DocumentType>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// A full-text search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub filename: String,
    pub document_type: DocumentType,
    pub processing_status: ProcessingStatus,
    pub score: f64,
    pub snippet: String,
}

/// Store-level statistics for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: i64,
    pub documents_by_status: Vec<(String, i64)>,
    pub documents_by_type: Vec<(String, i64)>,
    pub total_jobs: i64,
    pub queued_jobs: i64,
    pub total_models: i64,
    pub active_shares: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
