//! Keyword-overlap document classification.

use once_cell::sync::Lazy;

/// Category → keyword table. Score = matched keywords / table size.
static DOCUMENT_KEYWORDS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "invoice",
            vec!["invoice", "bill", "statement", "amount due", "payment"],
        ),
        (
            "contract",
            vec!["contract", "agreement", "terms", "conditions", "parties"],
        ),
        (
            "form",
            vec!["form", "application", "questionnaire", "survey"],
        ),
        (
            "receipt",
            vec!["receipt", "purchase", "transaction", "paid"],
        ),
        (
            "letter",
            vec!["dear", "sincerely", "regards", "correspondence"],
        ),
        (
            "report",
            vec!["report", "analysis", "findings", "conclusion", "summary"],
        ),
    ]
});

/// Best score below this falls back to `generic`.
const MIN_SCORE: f64 = 0.3;

/// Classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Category name (`invoice`, `contract`, …, or `generic`).
    pub category: String,
    /// Fraction of the category's keywords found in the text, or 0.5 for
    /// the generic fallback.
    pub confidence: f64,
}

/// Classify document text by keyword overlap against the category table.
pub fn classify(text: &str) -> Classification {
    let text_lower = text.to_lowercase();

    let mut best: (&str, f64) = ("generic", 0.0);
    for (category, keywords) in DOCUMENT_KEYWORDS.iter() {
        let matched = keywords.iter().filter(|kw| text_lower.contains(*kw)).count();
        let score = matched as f64 / keywords.len() as f64;
        if score > best.1 {
            best = (category, score);
        }
    }

    if best.1 < MIN_SCORE {
        Classification {
            category: "generic".to_string(),
            confidence: 0.5,
        }
    } else {
        Classification {
            category: best.0.to_string(),
            confidence: best.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invoice() {
        let result = classify("Invoice #42. Amount due: $300. Please submit payment by Friday.");
        assert_eq!(result.category, "invoice");
        assert!(result.confidence >= 0.3);
    }

    #[test]
    fn test_classify_contract() {
        let result =
            classify("This agreement between the parties sets out the terms and conditions.");
        assert_eq!(result.category, "contract");
    }

    #[test]
    fn test_classify_generic_below_threshold() {
        let result = classify("lorem ipsum dolor sit amet");
        assert_eq!(result.category, "generic");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_classify_letter() {
        let result = classify("Dear Ms. Chen, thank you for your note. Kind regards, Sam. Sincerely yours.");
        assert_eq!(result.category, "letter");
    }
}
