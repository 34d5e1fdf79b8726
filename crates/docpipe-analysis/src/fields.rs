//! Regex-based key-value field extraction.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid field pattern")
}

/// Ordered per-field pattern lists; the first matching pattern wins.
static FIELD_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    vec![
        (
            "invoice_number",
            vec![
                ci(r"invoice\s*#?\s*([A-Z0-9\-]+)"),
                ci(r"inv\s*#?\s*([A-Z0-9\-]+)"),
                ci(r"bill\s*#?\s*([A-Z0-9\-]+)"),
            ],
        ),
        (
            "date",
            vec![
                ci(r"date\s*:?\s*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
                ci(r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
                ci(r"(\d{4}-\d{2}-\d{2})"),
            ],
        ),
        (
            "amount",
            vec![
                ci(r"total\s*:?\s*\$?([\d,]+\.?\d*)"),
                ci(r"amount\s*:?\s*\$?([\d,]+\.?\d*)"),
                ci(r"\$([\d,]+\.?\d*)"),
            ],
        ),
        (
            "email",
            vec![ci(r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})")],
        ),
        (
            "phone",
            vec![
                ci(r"(\d{3}[-.\s]?\d{3}[-.\s]?\d{4})"),
                ci(r"(\(\d{3}\)\s*\d{3}[-.\s]?\d{4})"),
            ],
        ),
    ]
});

static AMOUNT_FORMAT: Lazy<Regex> = Lazy::new(|| ci(r"^\$?[\d,]+\.?\d*$"));
static DATE_FORMAT: Lazy<Regex> = Lazy::new(|| ci(r"^\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}$"));
static EMAIL_FORMAT: Lazy<Regex> =
    Lazy::new(|| ci(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"));

/// An extracted field value with its confidence estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub confidence: f64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
}

/// Extract key-value pairs from text; for each field the first matching
/// pattern supplies the value.
pub fn extract_fields(text: &str) -> BTreeMap<String, FieldValue> {
    let mut extracted = BTreeMap::new();

    for (field_name, patterns) in FIELD_PATTERNS.iter() {
        for pattern in patterns {
            if let Some(caps) = pattern.captures(text) {
                let value = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or_else(|| caps.get(0).map(|m| m.as_str()).unwrap_or(""))
                    .to_string();
                let confidence = field_confidence(field_name, &value);
                extracted.insert(
                    field_name.to_string(),
                    FieldValue {
                        value,
                        confidence,
                        source: "regex".to_string(),
                        is_valid: None,
                        formatted_value: None,
                    },
                );
                break;
            }
        }
    }

    extracted
}

/// Hand-tuned base confidence boosted by simple format checks.
fn field_confidence(field_name: &str, value: &str) -> f64 {
    let mut confidence: f64 = 0.7;

    match field_name {
        "email" if value.contains('@') => confidence += 0.2,
        "amount" if AMOUNT_FORMAT.is_match(value) => confidence += 0.15,
        "date" if DATE_FORMAT.is_match(value) => confidence += 0.1,
        _ => {}
    }

    confidence.min(1.0)
}

/// Validate and format extracted fields, filling `is_valid`/`formatted_value`.
pub fn validate_fields(fields: &BTreeMap<String, FieldValue>) -> BTreeMap<String, FieldValue> {
    let mut validated = BTreeMap::new();

    for (name, field) in fields {
        let mut out = field.clone();
        match name.as_str() {
            "email" => {
                if EMAIL_FORMAT.is_match(&field.value) {
                    out.is_valid = Some(true);
                    out.formatted_value = Some(field.value.to_lowercase());
                } else {
                    out.is_valid = Some(false);
                    out.formatted_value = Some(field.value.clone());
                }
            }
            "amount" => {
                let clean: String = field
                    .value
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                    .collect();
                match clean.replace(',', "").parse::<f64>() {
                    Ok(amount) => {
                        out.is_valid = Some(true);
                        out.formatted_value = Some(format!("${:.2}", amount));
                    }
                    Err(_) => {
                        out.is_valid = Some(false);
                        out.formatted_value = Some(field.value.clone());
                    }
                }
            }
            _ => {
                out.is_valid = Some(true);
                out.formatted_value = Some(field.value.clone());
            }
        }
        validated.insert(name.clone(), out);
    }

    validated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_invoice_fields() {
        let text = "Invoice #INV-2024-001\nDate: 03/15/2024\nTotal: $1,250.50\nContact: billing@acme.com";
        let fields = extract_fields(text);

        assert_eq!(fields["invoice_number"].value, "INV-2024-001");
        assert_eq!(fields["date"].value, "03/15/2024");
        assert_eq!(fields["amount"].value, "1,250.50");
        assert_eq!(fields["email"].value, "billing@acme.com");
    }

    #[test]
    fn test_pattern_order_priority() {
        // the "total" pattern outranks the bare "$" pattern even when a
        // dollar figure appears earlier in the text
        let text = "Deposit of $10.00 received. Total: $99.95";
        let fields = extract_fields(text);
        assert_eq!(fields["amount"].value, "99.95");
    }

    #[test]
    fn test_confidence_boosts() {
        let text = "Date: 03/15/2024 reach me at bob@example.com amount $42.00";
        let fields = extract_fields(text);

        assert!((fields["email"].confidence - 0.9).abs() < 1e-9);
        assert!((fields["amount"].confidence - 0.85).abs() < 1e-9);
        assert!((fields["date"].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fields_absent() {
        let fields = extract_fields("no structured data here");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_validate_amount_and_email() {
        let fields = extract_fields("Total: $1,250.5 email BILLING@Acme.Com");
        let validated = validate_fields(&fields);

        let amount = &validated["amount"];
        assert_eq!(amount.is_valid, Some(true));
        assert_eq!(amount.formatted_value.as_deref(), Some("$1250.50"));

        let email = &validated["email"];
        assert_eq!(email.is_valid, Some(true));
        assert_eq!(email.formatted_value.as_deref(), Some("billing@acme.com"));
    }

    #[test]
    fn test_phone_extraction() {
        let fields = extract_fields("Call 555-123-4567 for support");
        assert_eq!(fields["phone"].value, "555-123-4567");
    }
}
