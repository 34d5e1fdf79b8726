//! Heuristic named-entity recognition — amounts and person names.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A recognized entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
    pub confidence: f64,
    pub source: String,
}

static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([\d,]+\.?\d*)").unwrap());
static CURRENCY_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"(\d+\.?\d*)\s*(?:dollars?|USD|EUR|GBP)")
        .case_insensitive(true)
        .build()
        .unwrap()
});
static PERSON_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][a-z]+ [A-Z][a-z]+)").unwrap());

const MAX_NAMES: usize = 5;

/// Recognize amounts and likely person names in text.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    for caps in DOLLAR_AMOUNT.captures_iter(text) {
        entities.push(Entity {
            entity_type: "amount".to_string(),
            value: caps[1].to_string(),
            confidence: 0.9,
            source: "regex".to_string(),
        });
    }
    for caps in CURRENCY_AMOUNT.captures_iter(text) {
        entities.push(Entity {
            entity_type: "amount".to_string(),
            value: caps[1].to_string(),
            confidence: 0.9,
            source: "regex".to_string(),
        });
    }

    for caps in PERSON_NAME.captures_iter(text).take(MAX_NAMES) {
        entities.push(Entity {
            entity_type: "person".to_string(),
            value: caps[1].to_string(),
            confidence: 0.7,
            source: "regex".to_string(),
        });
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_amounts() {
        let entities = extract_entities("Paid $1,200.00 plus a fee of 35 USD");
        let amounts: Vec<_> = entities
            .iter()
            .filter(|e| e.entity_type == "amount")
            .collect();
        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].value, "1,200.00");
        assert_eq!(amounts[1].value, "35");
    }

    #[test]
    fn test_extract_person_names_capped() {
        let text = "Alice Smith met Bob Jones, Carol White, Dan Brown, Eve Black and Frank Green.";
        let entities = extract_entities(text);
        let people: Vec<_> = entities
            .iter()
            .filter(|e| e.entity_type == "person")
            .collect();
        assert_eq!(people.len(), 5);
        assert_eq!(people[0].value, "Alice Smith");
    }

    #[test]
    fn test_no_entities() {
        assert!(extract_entities("nothing of note here").is_empty());
    }
}
