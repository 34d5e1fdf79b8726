//! Text extraction orchestration: file-type dispatch, per-page PDF
//! handling, and the engine fallback chain.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{self, EngineKind, OcrEngines};
use crate::filetype::FileKind;
use crate::pdf;
use docpipe_core::{Error, Result};

/// A page whose text layer is shorter than this is treated as image-based.
const MIN_TEXT_LAYER_CHARS: usize = 50;

const PAGE_PLACEHOLDER: &str = "[Page could not be processed]";
const EMPTY_PDF_PLACEHOLDER: &str = "[No text could be extracted from this PDF]";

/// Result of text extraction for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    /// Mean per-page (or per-token) confidence in [0, 1].
    pub confidence: f64,
    /// `direct`, `tesseract`, `easyocr`, or `none`.
    pub engine: String,
    pub pages_processed: usize,
    pub total_pages: usize,
}

/// Orchestrates extraction for uploaded files.
pub struct TextExtractor {
    engines: OcrEngines,
    tmp_dir: PathBuf,
    max_pages: usize,
    confidence_threshold: f64,
}

impl TextExtractor {
    pub fn new(
        engines: OcrEngines,
        tmp_dir: impl AsRef<Path>,
        max_pages: usize,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            engines,
            tmp_dir: tmp_dir.as_ref().to_path_buf(),
            max_pages,
            confidence_threshold,
        }
    }

    pub fn engines(&self) -> &OcrEngines {
        &self.engines
    }

    /// Extract text from a file.
    ///
    /// Per-page OCR failures degrade to placeholder text with zero
    /// confidence; an extraction that produces no text at all while an
    /// engine error occurred is returned as `Err` so the caller records a
    /// failed document instead of an empty completed one.
    pub async fn extract(&self, path: &Path, mime_type: &str) -> Result<OcrOutcome> {
        match FileKind::detect(path, mime_type) {
            FileKind::PlainText => self.extract_plain_text(path),
            FileKind::Pdf => self.extract_pdf(path).await,
            FileKind::Image => self.extract_image(path).await,
            FileKind::Unknown => Err(Error::Unsupported(format!(
                "unsupported file type: {}",
                mime_type
            ))),
        }
    }

    fn extract_plain_text(&self, path: &Path) -> Result<OcrOutcome> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Ocr(format!("text file read failed: {}", e)))?;
        Ok(OcrOutcome {
            text: text.trim().to_string(),
            confidence: 1.0,
            engine: "direct".to_string(),
            pages_processed: 1,
            total_pages: 1,
        })
    }

    async fn extract_image(&self, path: &Path) -> Result<OcrOutcome> {
        let (text, confidence, engine) = self.ocr_image_with_fallback(path).await?;
        Ok(OcrOutcome {
            text,
            confidence,
            engine: engine.as_str().to_string(),
            pages_processed: 1,
            total_pages: 1,
        })
    }

    async fn extract_pdf(&self, path: &Path) -> Result<OcrOutcome> {
        // Text layer first; an unparseable PDF can still be rasterized.
        let text_layer = match pdf::text_layer_by_pages(path).await {
            Ok(pages) => Some(pages),
            Err(e) => {
                warn!("{}; falling back to rasterization", e);
                None
            }
        };

        let total_pages = match &text_layer {
            Some(pages) => pages.len(),
            None => pdf::page_count(path).await?,
        };
        let process_pages = total_pages.min(self.max_pages);
        if total_pages > self.max_pages {
            info!(
                "PDF has {} pages, processing first {} only",
                total_pages, self.max_pages
            );
        }

        let work_dir = tempfile::tempdir_in(&self.tmp_dir)
            .map_err(|e| Error::Ocr(format!("tempdir failed: {}", e)))?;

        let mut text = String::new();
        let mut confidences = Vec::with_capacity(process_pages);
        let mut ocr_engine: Option<EngineKind> = None;
        let mut engine_error: Option<Error> = None;

        for page_num in 1..=process_pages {
            let layer_text = text_layer
                .as_ref()
                .and_then(|pages| pages.get(page_num - 1))
                .map(|t| t.trim())
                .unwrap_or("");

            if layer_text.len() > MIN_TEXT_LAYER_CHARS {
                text.push_str(&format!("\n--- Page {} ---\n{}", page_num, layer_text));
                confidences.push(1.0);
                continue;
            }

            // Image-based page: rasterize and OCR it.
            let page_result = match pdf::rasterize_page(path, page_num, work_dir.path()).await {
                Ok(image) => self.ocr_image_with_fallback(&image).await,
                Err(e) => Err(e),
            };

            match page_result {
                Ok((page_text, page_conf, engine)) if !page_text.trim().is_empty() => {
                    text.push_str(&format!("\n--- Page {} ---\n{}", page_num, page_text));
                    confidences.push(page_conf);
                    ocr_engine = Some(engine);
                }
                Ok(_) => {
                    text.push_str(&format!("\n--- Page {} ---\n{}", page_num, PAGE_PLACEHOLDER));
                    confidences.push(0.0);
                }
                Err(e) => {
                    warn!("page {} OCR failed: {}", page_num, e);
                    text.push_str(&format!("\n--- Page {} ---\n{}", page_num, PAGE_PLACEHOLDER));
                    confidences.push(0.0);
                    engine_error = Some(e);
                }
            }
        }

        let confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        let produced_text = text
            .lines()
            .any(|l| !l.is_empty() && !l.starts_with("--- Page") && l != PAGE_PLACEHOLDER);

        if !produced_text {
            // Nothing extracted: an engine failure is a hard error, a
            // genuinely blank document is a low-confidence placeholder.
            if let Some(e) = engine_error {
                return Err(e);
            }
            return Ok(OcrOutcome {
                text: EMPTY_PDF_PLACEHOLDER.to_string(),
                confidence: 0.0,
                engine: "none".to_string(),
                pages_processed: process_pages,
                total_pages,
            });
        }

        let engine = match ocr_engine {
            Some(kind) => kind.as_str().to_string(),
            None => "direct".to_string(),
        };

        info!(
            "PDF extraction complete: {} pages, confidence {:.2}, engine {}",
            process_pages, confidence, engine
        );

        Ok(OcrOutcome {
            text: text.trim().to_string(),
            confidence,
            engine,
            pages_processed: process_pages,
            total_pages,
        })
    }

    /// OCR a raster image, primary engine first, retrying with the
    /// secondary engine when confidence lands below the threshold.
    async fn ocr_image_with_fallback(
        &self,
        image: &Path,
    ) -> Result<(String, f64, EngineKind)> {
        let mut primary: Option<(String, f64)> = None;

        if self.engines.easyocr {
            match engine::run_easyocr(image).await {
                Ok(result) => {
                    if result.confidence > self.confidence_threshold {
                        return Ok((result.text, result.confidence, EngineKind::EasyOcr));
                    }
                    primary = Some((result.text, result.confidence));
                }
                Err(e) => warn!("easyocr failed, falling back to tesseract: {}", e),
            }
        }

        if self.engines.tesseract {
            match engine::run_tesseract(image).await {
                Ok(result) => {
                    // Keep whichever engine scored better.
                    if let Some((easy_text, easy_conf)) = &primary {
                        if *easy_conf > result.confidence && !easy_text.is_empty() {
                            return Ok((easy_text.clone(), *easy_conf, EngineKind::EasyOcr));
                        }
                    }
                    return Ok((result.text, result.confidence, EngineKind::Tesseract));
                }
                Err(e) => {
                    if let Some((easy_text, easy_conf)) = primary {
                        if !easy_text.is_empty() {
                            return Ok((easy_text, easy_conf, EngineKind::EasyOcr));
                        }
                    }
                    return Err(e);
                }
            }
        }

        if let Some((easy_text, easy_conf)) = primary {
            return Ok((easy_text, easy_conf, EngineKind::EasyOcr));
        }

        Err(Error::Ocr("no OCR engine available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_engines() -> OcrEngines {
        OcrEngines {
            tesseract: false,
            easyocr: false,
            pdftoppm: false,
        }
    }

    #[tokio::test]
    async fn test_plain_text_direct_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.txt");
        std::fs::write(&file, "hello docpipe\n").unwrap();

        let extractor = TextExtractor::new(no_engines(), dir.path(), 10, 0.5);
        let outcome = extractor.extract(&file, "text/plain").await.unwrap();

        assert_eq!(outcome.text, "hello docpipe");
        assert_eq!(outcome.confidence, 1.0);
        assert_eq!(outcome.engine, "direct");
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.bin");
        std::fs::write(&file, b"\x00\x01").unwrap();

        let extractor = TextExtractor::new(no_engines(), dir.path(), 10, 0.5);
        let result = extractor.extract(&file, "application/octet-stream").await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_image_without_engines_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.png");
        std::fs::write(&file, b"png-bytes").unwrap();

        let extractor = TextExtractor::new(no_engines(), dir.path(), 10, 0.5);
        let result = extractor.extract(&file, "image/png").await;
        assert!(matches!(result, Err(Error::Ocr(_))));
    }
}
