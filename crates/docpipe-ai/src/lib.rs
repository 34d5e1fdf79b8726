//! Docpipe AI — local LLM adapter (Ollama) with heuristic fallback.
//!
//! Every call degrades softly: when the Ollama endpoint is unreachable or
//! times out, analysis falls back to the pure-text heuristics in
//! `docpipe-analysis` and says so in `model_used`.

pub mod analyze;
pub mod client;

pub use analyze::{AnalysisReport, DocumentAnalyzer, PromptSpec};
pub use client::{AiHealth, GenerateOptions, OllamaClient};
