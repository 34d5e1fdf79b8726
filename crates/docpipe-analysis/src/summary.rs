//! Local summary composition for when no language model is reachable.
//!
//! Builds a one-line digest from word counts, the classification, and
//! per-category insight extraction.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::entities::Entity;
use crate::fields::FieldValue;

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid summary pattern")
}

static PARTY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"between\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
        ci(r"(\w+(?:\s+&\s+\w+)*\s+(?:LLC|Inc|Corp|Ltd|Company|Corporation))"),
        ci(r"(\w+(?:\s+\w+)*\s+(?:Associates|Partners|Group))"),
    ]
});

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"\$([\d,]+\.?\d*)"),
        ci(r"(\d+\.?\d*)\s*(?:dollars?|USD|EUR|GBP)"),
        ci(r"(\d+\.?\d*)\s*(?:million|billion|thousand)"),
    ]
});

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
        ci(r"(\d{4}-\d{2}-\d{2})"),
        ci(r"((?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4})"),
    ]
});

static CONTRACT_TERM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"(confidentiality|non-disclosure|termination|renewal|breach|liability|indemnification)"),
        ci(r"(payment terms|delivery|warranty|insurance|force majeure)"),
    ]
});

static VENDOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"from:\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
        ci(r"vendor:\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
        ci(r"bill\s+to:\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
    ]
});

static DUE_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"due\s+date[:\s]*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
        ci(r"payment\s+due[:\s]*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
        ci(r"pay\s+by[:\s]*(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4})"),
    ]
});

static AUTHOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"by\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
        ci(r"author[:\s]*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
        ci(r"prepared\s+by[:\s]*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)"),
    ]
});

static FINDING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        ci(r"finding[s]?[:\s]+([^.]+)"),
        ci(r"result[s]?[:\s]+([^.]+)"),
        ci(r"conclusion[s]?[:\s]+([^.]+)"),
    ]
});

static LINE_ITEM_AMOUNT: Lazy<Regex> = Lazy::new(|| ci(r"\$\d+\.?\d*"));

/// Collect deduplicated capture-group matches across a pattern list.
fn collect(patterns: &[Regex], text: &str, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let value = caps[1].trim().to_string();
            if !value.is_empty() && !out.contains(&value) {
                out.push(value);
            }
        }
    }
    out.truncate(cap);
    out
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text).map(|c| c[1].trim().to_string()))
}

/// Invoice-style line items: lines carrying a dollar figure.
fn extract_line_items(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| LINE_ITEM_AMOUNT.is_match(line) && line.trim().len() > 10)
        .take(5)
        .map(|line| line.trim().to_string())
        .collect()
}

/// Compose the local fallback summary line.
pub fn local_summary(
    text: &str,
    category: &str,
    confidence: f64,
    fields: &BTreeMap<String, FieldValue>,
    entities: &[Entity],
) -> String {
    let word_count = text.split_whitespace().count();
    let char_count = text.chars().count();

    let mut insights: Vec<String> = Vec::new();

    match category {
        "contract" => {
            let parties = collect(&PARTY_PATTERNS, text, 5);
            if !parties.is_empty() {
                insights.push(format!("Parties: {}", parties[..parties.len().min(3)].join(", ")));
            }
            let amounts = collect(&AMOUNT_PATTERNS, text, 5);
            if !amounts.is_empty() {
                insights.push(format!("Key amounts: {}", amounts[..amounts.len().min(3)].join(", ")));
            }
            let dates = collect(&DATE_PATTERNS, text, 5);
            if !dates.is_empty() {
                insights.push(format!("Important dates: {}", dates[..dates.len().min(3)].join(", ")));
            }
            let terms = collect(&CONTRACT_TERM_PATTERNS, text, 5);
            if !terms.is_empty() {
                insights.push(format!("Key terms: {}", terms[..terms.len().min(3)].join(", ")));
            }
        }
        "invoice" | "receipt" => {
            if let Some(vendor) = first_match(&VENDOR_PATTERNS, text) {
                insights.push(format!("Vendor: {}", vendor));
            }
            let amounts = collect(&AMOUNT_PATTERNS, text, 5);
            if !amounts.is_empty() {
                insights.push(format!("Total amount: {}", amounts[0]));
            }
            let due = collect(&DUE_DATE_PATTERNS, text, 3);
            if !due.is_empty() {
                insights.push(format!("Due date: {}", due[0]));
            }
            let items = extract_line_items(text);
            if !items.is_empty() {
                insights.push(format!("Items: {} line items", items.len()));
            }
        }
        "report" => {
            let authors = collect(&AUTHOR_PATTERNS, text, 3);
            if !authors.is_empty() {
                insights.push(format!("Authors: {}", authors[..authors.len().min(2)].join(", ")));
            }
            let findings = collect(&FINDING_PATTERNS, text, 3);
            if !findings.is_empty() {
                insights.push(format!("Key findings: {} identified", findings.len()));
            }
            let dates = collect(&DATE_PATTERNS, text, 3);
            if !dates.is_empty() {
                insights.push(format!("Report date: {}", dates[0]));
            }
        }
        _ => {}
    }

    if !fields.is_empty() {
        let names: Vec<&str> = fields.keys().take(3).map(|k| k.as_str()).collect();
        insights.push(format!("Key fields: {}", names.join(", ")));
    }

    if !entities.is_empty() {
        let mut by_type: Vec<(String, Vec<&str>)> = Vec::new();
        for entity in entities {
            match by_type.iter_mut().find(|(t, _)| *t == entity.entity_type) {
                Some((_, values)) => values.push(&entity.value),
                None => by_type.push((entity.entity_type.clone(), vec![&entity.value])),
            }
        }
        let parts: Vec<String> = by_type
            .iter()
            .map(|(t, values)| format!("{}: {}", t, values[..values.len().min(2)].join(", ")))
            .collect();
        insights.push(format!("Entities: {}", parts.join("; ")));
    }

    let complexity = if word_count > 1000 {
        "complex"
    } else if word_count > 500 {
        "moderate"
    } else {
        "simple"
    };

    let mut parts = vec![
        format!("{} words ({} characters)", word_count, char_count),
        format!("Type: {} (confidence {:.0}%)", category, confidence * 100.0),
        format!("Complexity: {}", complexity),
    ];
    parts.extend(insights);
    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract_entities, extract_fields};

    #[test]
    fn test_invoice_summary_insights() {
        let text = "Invoice #77\nVendor: Acme Corp\nWidget assembly ........ $40.00\nTotal: $40.00\nDue date: 04/01/2024";
        let fields = extract_fields(text);
        let entities = extract_entities(text);
        let summary = local_summary(text, "invoice", 0.6, &fields, &entities);

        assert!(summary.contains("Type: invoice"));
        assert!(summary.contains("Vendor: Acme"));
        assert!(summary.contains("Due date: 04/01/2024"));
        assert!(summary.contains("Key fields:"));
    }

    #[test]
    fn test_contract_summary_lists_terms() {
        let text = "This agreement between Acme Corp and Jane Doe covers termination and liability. Effective 2024-01-01.";
        let summary = local_summary(text, "contract", 0.4, &BTreeMap::new(), &[]);

        assert!(summary.contains("Key terms:"));
        assert!(summary.contains("termination"));
        assert!(summary.contains("Important dates:"));
        assert!(summary.contains("2024-01-01"));
    }

    #[test]
    fn test_complexity_banding() {
        let short = local_summary("tiny", "generic", 0.5, &BTreeMap::new(), &[]);
        assert!(short.contains("Complexity: simple"));

        let long_text = "word ".repeat(600);
        let medium = local_summary(&long_text, "generic", 0.5, &BTreeMap::new(), &[]);
        assert!(medium.contains("Complexity: moderate"));
    }
}
