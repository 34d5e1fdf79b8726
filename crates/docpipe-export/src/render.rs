//! Export dispatch and the JSON/CSV renderers.

use chrono::{TimeZone, Utc};
use serde_json::json;
use tracing::info;

use crate::pdf::render_pdf;
use crate::templates::{template, ExportTemplate};
use crate::xlsx::render_xlsx;
use docpipe_core::{Error, Result};
use docpipe_store::DocumentRecord;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
    Xlsx,
}

impl ExportFormat {
    /// Parse from a request string (`excel` is accepted for xlsx).
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(Error::Export(format!("unsupported export format: {}", other))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
            Self::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

/// A rendered export ready to download or write to disk.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Render a document + analysis in the requested format.
pub fn render(
    doc: &DocumentRecord,
    format: ExportFormat,
    template_name: &str,
    now_millis: i64,
) -> Result<ExportFile> {
    let tpl = template(template_name);
    let stamp = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .unwrap_or_else(Utc::now);
    let filename = format!(
        "document_analysis_{}_{}.{}",
        tpl.name,
        stamp.format("%Y%m%d_%H%M%S"),
        format.extension()
    );

    let bytes = match format {
        ExportFormat::Json => render_json(doc, now_millis)?,
        ExportFormat::Csv => render_csv(doc, tpl)?,
        ExportFormat::Pdf => render_pdf(doc, tpl, now_millis)?,
        ExportFormat::Xlsx => render_xlsx(doc, tpl, now_millis)?,
    };

    info!(
        "rendered {} export for document {} ({} bytes)",
        format.as_str(),
        doc.id,
        bytes.len()
    );

    Ok(ExportFile {
        bytes,
        content_type: format.content_type(),
        filename,
    })
}

/// JSON export: the full record inside a metadata envelope.
fn render_json(doc: &DocumentRecord, now_millis: i64) -> Result<Vec<u8>> {
    let exported_at = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339();
    let envelope = json!({
        "export_info": {
            "exported_at": exported_at,
            "format": "json",
            "version": "1.0",
        },
        "data": doc,
    });
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// CSV export: one row with the template's field columns.
fn render_csv(doc: &DocumentRecord, tpl: &ExportTemplate) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&tpl.fields)
        .map_err(|e| Error::Export(e.to_string()))?;

    let row: Vec<String> = tpl
        .fields
        .iter()
        .map(|field| template_value(doc, field))
        .collect();
    writer
        .write_record(&row)
        .map_err(|e| Error::Export(e.to_string()))?;

    writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))
}

/// Resolve a template field against the document row, extracted fields,
/// and entities. Nested objects are JSON-encoded, lists joined with `; `.
pub(crate) fn template_value(doc: &DocumentRecord, field: &str) -> String {
    match field {
        "document_type" => return doc.document_type.as_str().to_string(),
        "summary" => return doc.summary.clone().unwrap_or_default(),
        "confidence" => {
            return doc
                .ocr_confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_default()
        }
        "key_entities" => {
            if let Some(entities) = doc.entities.as_ref().and_then(|e| e.as_array()) {
                return entities
                    .iter()
                    .filter_map(|e| e.get("value").and_then(|v| v.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ");
            }
            return String::new();
        }
        _ => {}
    }

    let Some(value) = doc.fields.as_ref().and_then(|f| f.get(field)) else {
        return String::new();
    };
    flatten_value(value)
}

pub(crate) fn flatten_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            // Extracted fields carry {value, confidence, ...}; prefer the value.
            match map.get("value").and_then(|v| v.as_str()) {
                Some(v) => v.to_string(),
                None => serde_json::to_string(value).unwrap_or_default(),
            }
        }
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .collect::<Vec<_>>()
            .join("; "),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Delete export files older than `max_age_days`. Returns how many were removed.
pub fn cleanup_old_exports(dir: &std::path::Path, max_age_days: u64) -> Result<usize> {
    let cutoff = std::time::SystemTime::now()
        .checked_sub(std::time::Duration::from_secs(max_age_days * 24 * 60 * 60));
    let Some(cutoff) = cutoff else {
        return Ok(0);
    };

    let mut deleted = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if let Ok(modified) = meta.modified() {
            if modified < cutoff {
                std::fs::remove_file(entry.path())?;
                deleted += 1;
            }
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_store::{DocumentType, ProcessingStatus};

    pub(crate) fn sample_document() -> DocumentRecord {
        DocumentRecord {
            id: "doc-1".into(),
            filename: "abc.pdf".into(),
            original_filename: "invoice.pdf".into(),
            file_path: "/data/uploads/abc.pdf".into(),
            file_size: 2048,
            mime_type: "application/pdf".into(),
            extracted_text: Some("Invoice #77 Total: $40.00".into()),
            ocr_confidence: Some(0.92),
            ocr_engine: Some("tesseract".into()),
            processing_status: ProcessingStatus::Completed,
            document_type: DocumentType::Invoice,
            summary: Some("Invoice from Acme".into()),
            analysis: Some(serde_json::json!({"model_used": "local_fallback"})),
            fields: Some(serde_json::json!({
                "invoice_number": {"value": "77", "confidence": 0.7, "source": "regex"},
                "amount": {"value": "40.00", "confidence": 0.85, "source": "regex"},
            })),
            entities: Some(serde_json::json!([
                {"type": "amount", "value": "40.00", "confidence": 0.9, "source": "regex"},
            ])),
            error_message: None,
            created_at: 1_700_000_000_000,
            processed_at: Some(1_700_000_100_000),
        }
    }

    #[test]
    fn test_json_envelope_shape() {
        let doc = sample_document();
        let file = render(&doc, ExportFormat::Json, "generic", 1_700_000_200_000).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&file.bytes).unwrap();

        assert_eq!(parsed["export_info"]["format"], "json");
        assert_eq!(parsed["export_info"]["version"], "1.0");
        assert_eq!(parsed["data"]["id"], "doc-1");
        assert_eq!(parsed["data"]["document_type"], "invoice");
        assert!(file.filename.starts_with("document_analysis_generic_"));
        assert!(file.filename.ends_with(".json"));
    }

    #[test]
    fn test_csv_uses_template_columns() {
        let doc = sample_document();
        let file = render(&doc, ExportFormat::Csv, "invoice", 1_700_000_200_000).unwrap();
        let text = String::from_utf8(file.bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "invoice_number,date,amount,vendor,customer,due_date"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("77,"));
        assert!(row.contains("40.00"));
    }

    #[test]
    fn test_generic_template_values() {
        let doc = sample_document();
        assert_eq!(template_value(&doc, "document_type"), "invoice");
        assert_eq!(template_value(&doc, "key_entities"), "40.00");
        assert_eq!(template_value(&doc, "confidence"), "0.92");
        assert_eq!(template_value(&doc, "nonexistent_field"), "");
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(ExportFormat::parse("docx").is_err());
        assert_eq!(ExportFormat::parse("excel").unwrap(), ExportFormat::Xlsx);
    }

    #[test]
    fn test_cleanup_ignores_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("export.json"), "{}").unwrap();
        let deleted = cleanup_old_exports(dir.path(), 30).unwrap();
        assert_eq!(deleted, 0);
        assert!(dir.path().join("export.json").exists());
    }
}
