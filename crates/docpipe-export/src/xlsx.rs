//! XLSX workbook rendering via rust_xlsxwriter.

use chrono::{TimeZone, Utc};
use rust_xlsxwriter::Workbook;

use crate::render::template_value;
use crate::templates::ExportTemplate;
use docpipe_core::{Error, Result};
use docpipe_store::DocumentRecord;

/// Render a two-sheet workbook: extracted data plus an export summary.
pub fn render_xlsx(
    doc: &DocumentRecord,
    tpl: &ExportTemplate,
    now_millis: i64,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let data_sheet = workbook.add_worksheet();
    data_sheet
        .set_name("Extracted_Data")
        .map_err(|e| Error::Export(e.to_string()))?;
    for (col, field) in tpl.fields.iter().enumerate() {
        data_sheet
            .write_string(0, col as u16, field.as_str())
            .map_err(|e| Error::Export(e.to_string()))?;
        data_sheet
            .write_string(1, col as u16, template_value(doc, field))
            .map_err(|e| Error::Export(e.to_string()))?;
    }

    let exported_at = Utc
        .timestamp_millis_opt(now_millis)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let summary_sheet = workbook.add_worksheet();
    summary_sheet
        .set_name("Export_Summary")
        .map_err(|e| Error::Export(e.to_string()))?;
    let rows: [(&str, String); 4] = [
        ("Export Date", exported_at),
        ("Template Used", tpl.name.clone()),
        ("Document", doc.original_filename.clone()),
        ("Format", "Excel".to_string()),
    ];
    for (row, (label, value)) in rows.iter().enumerate() {
        summary_sheet
            .write_string(row as u32, 0, *label)
            .map_err(|e| Error::Export(e.to_string()))?;
        summary_sheet
            .write_string(row as u32, 1, value.as_str())
            .map_err(|e| Error::Export(e.to_string()))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| Error::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::template;
    use docpipe_store::{DocumentType, ProcessingStatus};

    fn sample() -> DocumentRecord {
        DocumentRecord {
            id: "doc-3".into(),
            filename: "c.pdf".into(),
            original_filename: "contract.pdf".into(),
            file_path: "/tmp/c.pdf".into(),
            file_size: 10,
            mime_type: "application/pdf".into(),
            extracted_text: None,
            ocr_confidence: None,
            ocr_engine: None,
            processing_status: ProcessingStatus::Completed,
            document_type: DocumentType::Contract,
            summary: None,
            analysis: None,
            fields: None,
            entities: None,
            error_message: None,
            created_at: 0,
            processed_at: None,
        }
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let bytes = render_xlsx(&sample(), template("contract"), 1_700_000_000_000).unwrap();
        // XLSX files are ZIP archives: PK magic.
        assert_eq!(&bytes[..2], b"PK");
    }
}
