//! Ollama HTTP client with soft-failure semantics.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

/// Sampling options forwarded to `/api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    /// Token budget; maps to Ollama's `num_predict`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            num_predict: None,
        }
    }
}

/// Health report for the AI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiHealth {
    /// `healthy`, `degraded` (endpoint up, model missing), or `unhealthy`.
    pub status: String,
    pub base_url: String,
    pub model: String,
    pub model_available: bool,
    pub available_models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for a local Ollama endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Non-streaming generation. Returns `None` on any transport or API
    /// failure; the caller is expected to fall back to local heuristics.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        options: &GenerateOptions,
    ) -> Option<String> {
        let url = format!("{}/api/generate", self.base_url);
        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        let response = match self.http.post(&url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Ollama request failed ({}): {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Ollama returned HTTP {}", response.status());
            return None;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Ollama response decode failed: {}", e);
                return None;
            }
        };

        body.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Check the endpoint and whether the configured model is pulled.
    pub async fn health(&self) -> AiHealth {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let body: serde_json::Value = response.json().await.unwrap_or_default();
                let available_models: Vec<String> = body
                    .get("models")
                    .and_then(|m| m.as_array())
                    .map(|models| {
                        models
                            .iter()
                            .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                            .map(|s| s.to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                let model_available = available_models.iter().any(|m| *m == self.model);
                AiHealth {
                    status: if model_available {
                        "healthy".to_string()
                    } else {
                        "degraded".to_string()
                    },
                    base_url: self.base_url.clone(),
                    model: self.model.clone(),
                    model_available,
                    available_models,
                    error: None,
                }
            }
            Ok(response) => AiHealth {
                status: "unhealthy".to_string(),
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                model_available: false,
                available_models: Vec::new(),
                error: Some(format!("HTTP {}", response.status())),
            },
            Err(e) => AiHealth {
                status: "unhealthy".to_string(),
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                model_available: false,
                available_models: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}
