//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all docpipe data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// Uploaded source files (`data/uploads/`).
    pub uploads: PathBuf,
    /// Rendered export files (`data/exports/`).
    pub exports: PathBuf,
    /// Scratch space for page rasters and engine output (`data/tmp/`).
    pub tmp: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            uploads: root.join("uploads"),
            exports: root.join("exports"),
            tmp: root.join("tmp"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Create all required directories.
    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.uploads)?;
        std::fs::create_dir_all(&self.exports)?;
        std::fs::create_dir_all(&self.tmp)?;
        Ok(())
    }
}

/// Top-level docpipe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocpipeConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
    /// File extensions accepted by the upload endpoint.
    pub allowed_extensions: Vec<String>,
    /// Maximum PDF pages processed per document.
    pub ocr_max_pages: usize,
    /// Confidence below which the primary OCR engine result is retried
    /// with the secondary engine.
    pub ocr_confidence_threshold: f64,
    /// Base URL of the local Ollama endpoint.
    pub ollama_base_url: String,
    /// Model name requested from Ollama.
    pub ollama_model: String,
    /// Per-request timeout for AI calls, in seconds.
    pub ai_timeout_secs: u64,
}

const DEFAULT_EXTENSIONS: &str = "pdf,png,jpg,jpeg,bmp,tiff,txt,md";

impl DocpipeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8085);

        let max_file_size = std::env::var("MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50 * 1024 * 1024);

        let allowed_extensions = std::env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string())
            .split(',')
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        let ollama_base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        let ollama_model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1:8b".to_string());

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            max_file_size,
            allowed_extensions,
            ocr_max_pages: 10,
            ocr_confidence_threshold: 0.5,
            ollama_base_url,
            ollama_model,
            ai_timeout_secs: 10,
        })
    }

    /// Whether a file extension (without dot, any case) is accepted.
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.db.is_dir());
        assert!(paths.uploads.is_dir());
        assert!(paths.exports.is_dir());
        assert!(paths.tmp.is_dir());
    }

    #[test]
    fn test_extension_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = DocpipeConfig::from_env(dir.path()).unwrap();
        assert!(config.is_extension_allowed("pdf"));
        assert!(config.is_extension_allowed(".PNG"));
        assert!(!config.is_extension_allowed("exe"));
    }
}
