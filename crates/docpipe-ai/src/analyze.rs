//! Document analysis: local heuristics merged with optional AI enrichment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{GenerateOptions, OllamaClient};
use docpipe_analysis::{
    classify, extract_entities, extract_fields, local_summary, validate_fields, Entity, FieldValue,
};

const ANALYZE_SYSTEM_PROMPT: &str =
    "You are an expert document analyst. Analyze the document and provide insights.";
const CLASSIFY_SYSTEM_PROMPT: &str =
    "You are an expert at classifying document types. Return only the classification in JSON format.";

/// Text sent to the model is truncated to keep prompts bounded.
const ANALYZE_TEXT_LIMIT: usize = 3000;
const CLASSIFY_TEXT_LIMIT: usize = 1000;

/// Prompt configuration taken from a stored model row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Template with a `{text}` placeholder.
    pub template: String,
    pub temperature: f64,
    pub max_tokens: i64,
}

impl PromptSpec {
    /// Substitute the document text into the template.
    pub fn render(&self, text: &str) -> String {
        self.template.replace("{text}", text)
    }
}

/// Combined analysis result for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub classification: String,
    pub classification_confidence: f64,
    pub fields: BTreeMap<String, FieldValue>,
    pub entities: Vec<Entity>,
    pub overall_confidence: f64,
    /// Model name, or `local_fallback` when no AI call succeeded.
    pub model_used: String,
    pub ai_available: bool,
}

/// Runs local heuristics and layers AI output on top when reachable.
#[derive(Debug, Clone)]
pub struct DocumentAnalyzer {
    client: OllamaClient,
}

impl DocumentAnalyzer {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Analyze document text.
    ///
    /// The local pass always runs first so there is a complete result even
    /// when every AI call fails. When the model answers, its summary and
    /// classification override the heuristic ones; fields and entities
    /// always come from the regex extractors.
    pub async fn analyze(&self, text: &str) -> AnalysisReport {
        let classification = classify(text);
        let fields = validate_fields(&extract_fields(text));
        let entities = extract_entities(text);

        let mut category = classification.category;
        let mut category_confidence = classification.confidence;
        let mut ai_available = false;

        let ai_summary = self.ai_summary(text).await;
        if ai_summary.is_some() {
            ai_available = true;
        }

        if let Some((ai_type, ai_confidence)) = self.ai_classify(text).await {
            debug!("AI classification: {} ({:.2})", ai_type, ai_confidence);
            category = ai_type;
            category_confidence = ai_confidence;
            ai_available = true;
        }

        let summary = match ai_summary {
            Some(s) => s,
            None => local_summary(text, &category, category_confidence, &fields, &entities),
        };

        let mut confidences = vec![category_confidence];
        confidences.extend(fields.values().map(|f| f.confidence));
        confidences.extend(entities.iter().map(|e| e.confidence));
        let overall_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;

        let model_used = if ai_available {
            self.client.model().to_string()
        } else {
            "local_fallback".to_string()
        };

        info!(
            "analysis complete: type={} ({:.2}), {} fields, {} entities, model={}",
            category,
            category_confidence,
            fields.len(),
            entities.len(),
            model_used
        );

        AnalysisReport {
            summary,
            classification: category,
            classification_confidence: category_confidence,
            fields,
            entities,
            overall_confidence,
            model_used,
            ai_available,
        }
    }

    /// Free-form analysis prompt; the raw model response becomes the summary.
    async fn ai_summary(&self, text: &str) -> Option<String> {
        let prompt = format!(
            "Analyze this document and provide detailed insights about:\n\
             - What the document is about\n\
             - Key information found\n\
             - Important details\n\
             - Any notable findings\n\n\
             Document text:\n{}\n\n\
             Provide a comprehensive analysis in clear, readable text.",
            truncate_chars(text, ANALYZE_TEXT_LIMIT)
        );
        self.client
            .generate(&prompt, Some(ANALYZE_SYSTEM_PROMPT), &GenerateOptions::default())
            .await
    }

    /// JSON classification prompt; malformed responses are discarded.
    async fn ai_classify(&self, text: &str) -> Option<(String, f64)> {
        let prompt = format!(
            "Classify this document into one of these categories:\n\
             - invoice\n- contract\n- report\n- letter\n- form\n- receipt\n- generic\n\n\
             Document text:\n{}\n\n\
             Return the classification in this JSON format:\n\
             {{\"document_type\": \"classified_type\", \"confidence\": 0.95}}",
            truncate_chars(text, CLASSIFY_TEXT_LIMIT)
        );
        let response = self
            .client
            .generate(&prompt, Some(CLASSIFY_SYSTEM_PROMPT), &GenerateOptions::default())
            .await?;

        let parsed: serde_json::Value = serde_json::from_str(extract_json(&response)?).ok()?;
        let doc_type = parsed.get("document_type")?.as_str()?.to_lowercase();
        let confidence = parsed
            .get("confidence")
            .and_then(|c| c.as_f64())
            .unwrap_or(0.5);
        Some((doc_type, confidence))
    }

    /// Run a stored prompt template against document text.
    pub async fn run_prompt(&self, spec: &PromptSpec, text: &str) -> Option<String> {
        let options = GenerateOptions {
            temperature: spec.temperature,
            num_predict: Some(spec.max_tokens),
            ..Default::default()
        };
        self.client
            .generate(&spec.render(truncate_chars(text, ANALYZE_TEXT_LIMIT)), None, &options)
            .await
    }
}

/// Char-boundary-safe truncation.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Models often wrap JSON in prose or code fences; pull out the first
/// top-level object.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end > start {
        Some(&response[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_render() {
        let spec = PromptSpec {
            template: "Summarize: {text}".into(),
            temperature: 0.2,
            max_tokens: 256,
        };
        assert_eq!(spec.render("hello"), "Summarize: hello");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_extract_json_from_fenced_response() {
        let response = "Here you go:\n```json\n{\"document_type\": \"invoice\", \"confidence\": 0.9}\n```";
        let json = extract_json(response).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["document_type"], "invoice");
    }

    #[tokio::test]
    async fn test_analyze_falls_back_without_endpoint() {
        // Port 9 is discard; nothing is listening.
        let client = OllamaClient::new("http://127.0.0.1:9", "phi3", 1);
        let analyzer = DocumentAnalyzer::new(client);

        let report = analyzer
            .analyze("Invoice #9 total $12.00 amount due on receipt of payment")
            .await;

        assert!(!report.ai_available);
        assert_eq!(report.model_used, "local_fallback");
        assert_eq!(report.classification, "invoice");
        assert!(report.fields.contains_key("amount"));
        assert!(report.overall_confidence > 0.0);
    }
}
