//! Export template registry.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Field selection and labeling for an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportTemplate {
    pub name: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<String>,
}

static TEMPLATES: Lazy<Vec<ExportTemplate>> = Lazy::new(|| {
    vec![
        ExportTemplate {
            name: "invoice".into(),
            title: "Invoice Data Export".into(),
            description: "Structured invoice information extracted from documents".into(),
            fields: vec![
                "invoice_number".into(),
                "date".into(),
                "amount".into(),
                "vendor".into(),
                "customer".into(),
                "due_date".into(),
            ],
        },
        ExportTemplate {
            name: "contract".into(),
            title: "Contract Data Export".into(),
            description: "Contract information and key terms extracted from documents".into(),
            fields: vec![
                "contract_number".into(),
                "parties".into(),
                "start_date".into(),
                "end_date".into(),
                "value".into(),
                "terms".into(),
            ],
        },
        ExportTemplate {
            name: "receipt".into(),
            title: "Receipt Data Export".into(),
            description: "Receipt and transaction data extracted from documents".into(),
            fields: vec![
                "receipt_number".into(),
                "date".into(),
                "amount".into(),
                "vendor".into(),
                "items".into(),
                "payment_method".into(),
            ],
        },
        ExportTemplate {
            name: "generic".into(),
            title: "Document Analysis Export".into(),
            description: "General document analysis and extracted information".into(),
            fields: vec![
                "document_type".into(),
                "date".into(),
                "key_entities".into(),
                "summary".into(),
                "confidence".into(),
            ],
        },
    ]
});

/// Look up a template by name, falling back to `generic`.
pub fn template(name: &str) -> &'static ExportTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| TEMPLATES.iter().find(|t| t.name == "generic").unwrap())
}

/// All registered templates.
pub fn template_names() -> Vec<&'static ExportTemplate> {
    TEMPLATES.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_generic() {
        assert_eq!(template("invoice").name, "invoice");
        assert_eq!(template("nonexistent").name, "generic");
    }
}
