//! PDF report rendering via lopdf.
//!
//! A plain text report: title, export info, summary, extracted fields, and
//! entities, paginated onto A4 pages with a single Helvetica font.

use chrono::{TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::render::flatten_value;
use crate::templates::ExportTemplate;
use docpipe_core::{Error, Result};
use docpipe_store::DocumentRecord;

const PAGE_WIDTH: i64 = 595; // A4
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LEADING: i64 = 14;
const WRAP_COLUMNS: usize = 90;

/// Render the report as PDF bytes.
pub fn render_pdf(
    doc: &DocumentRecord,
    tpl: &ExportTemplate,
    now_millis: i64,
) -> Result<Vec<u8>> {
    let lines = report_lines(doc, tpl, now_millis);

    let mut pdf = Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;
    let mut page_ids: Vec<Object> = Vec::new();

    for page_lines in lines.chunks(lines_per_page.max(1)) {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()],
            ),
        ];
        for line in page_lines {
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
            ops.push(Operation::new("Td", vec![0.into(), (-LEADING).into()]));
        }
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::Export(format!("PDF content encoding failed: {}", e)))?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    pdf.save_to(&mut buf)
        .map_err(|e| Error::Export(format!("PDF save failed: {}", e)))?;
    Ok(buf)
}

/// Flatten the report into printable lines.
fn report_lines(doc: &DocumentRecord, tpl: &ExportTemplate, now_millis: i64) -> Vec<String> {
    let exported_at = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let mut lines = vec![
        tpl.title.clone(),
        tpl.description.clone(),
        String::new(),
        format!("Export Date: {}", exported_at),
        format!("Template: {}", tpl.name),
        format!("Document: {}", doc.original_filename),
        format!("Type: {}", doc.document_type.as_str()),
        String::new(),
    ];

    if let Some(summary) = &doc.summary {
        lines.push("Summary".to_string());
        lines.extend(wrap(summary, WRAP_COLUMNS));
        lines.push(String::new());
    }

    if let Some(fields) = doc.fields.as_ref().and_then(|f| f.as_object()) {
        if !fields.is_empty() {
            lines.push("Extracted Fields".to_string());
            for (name, value) in fields {
                let confidence = value
                    .get("confidence")
                    .and_then(|c| c.as_f64())
                    .map(|c| format!(" (confidence {:.2})", c))
                    .unwrap_or_default();
                lines.push(format!("  {}: {}{}", name, flatten_value(value), confidence));
            }
            lines.push(String::new());
        }
    }

    if let Some(entities) = doc.entities.as_ref().and_then(|e| e.as_array()) {
        if !entities.is_empty() {
            lines.push("Recognized Entities".to_string());
            for entity in entities {
                let kind = entity.get("type").and_then(|t| t.as_str()).unwrap_or("");
                let value = entity.get("value").and_then(|v| v.as_str()).unwrap_or("");
                let confidence = entity
                    .get("confidence")
                    .and_then(|c| c.as_f64())
                    .map(|c| format!(" (confidence {:.2})", c))
                    .unwrap_or_default();
                lines.push(format!("  {}: {}{}", kind, value, confidence));
            }
        }
    }

    lines
}

/// Greedy word wrap.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::template;
    use docpipe_store::{DocumentType, ProcessingStatus};

    fn sample() -> DocumentRecord {
        DocumentRecord {
            id: "doc-2".into(),
            filename: "r.pdf".into(),
            original_filename: "receipt.pdf".into(),
            file_path: "/tmp/r.pdf".into(),
            file_size: 10,
            mime_type: "application/pdf".into(),
            extracted_text: None,
            ocr_confidence: Some(0.5),
            ocr_engine: None,
            processing_status: ProcessingStatus::Completed,
            document_type: DocumentType::Receipt,
            summary: Some("A receipt with a (parenthesized) note".into()),
            analysis: None,
            fields: Some(serde_json::json!({
                "amount": {"value": "12.00", "confidence": 0.85, "source": "regex"},
            })),
            entities: None,
            error_message: None,
            created_at: 0,
            processed_at: None,
        }
    }

    #[test]
    fn test_pdf_has_header_and_pages() {
        let bytes = render_pdf(&sample(), template("receipt"), 1_700_000_000_000).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn test_wrap_long_text() {
        let text = "word ".repeat(60);
        let lines = wrap(&text, 20);
        assert!(lines.len() > 10);
        assert!(lines.iter().all(|l| l.len() <= 20));
    }

    #[test]
    fn test_report_lines_include_fields() {
        let lines = report_lines(&sample(), template("receipt"), 0);
        assert!(lines.iter().any(|l| l.contains("amount: 12.00")));
        assert!(lines.iter().any(|l| l == "Summary"));
    }
}
