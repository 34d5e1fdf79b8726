//! External OCR engine adapters.
//!
//! Both engines run as subprocesses so the server carries no native OCR
//! bindings: `tesseract` for text plus TSV word confidences, and the
//! `easyocr` CLI when it is installed. Availability is probed once at
//! startup.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use docpipe_core::{Error, Result};

/// Which engine produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    EasyOcr,
    Tesseract,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EasyOcr => "easyocr",
            Self::Tesseract => "tesseract",
        }
    }
}

/// Text plus averaged per-token confidence in [0, 1].
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub text: String,
    pub confidence: f64,
}

/// Probed engine availability.
#[derive(Debug, Clone, Copy)]
pub struct OcrEngines {
    pub tesseract: bool,
    pub easyocr: bool,
    pub pdftoppm: bool,
}

impl OcrEngines {
    /// Probe which external binaries respond to `--version`.
    pub async fn probe() -> Self {
        let engines = Self {
            tesseract: probe_binary("tesseract").await,
            easyocr: probe_binary("easyocr").await,
            pdftoppm: probe_binary("pdftoppm").await,
        };
        debug!(
            "OCR engines probed: tesseract={}, easyocr={}, pdftoppm={}",
            engines.tesseract, engines.easyocr, engines.pdftoppm
        );
        engines
    }

    /// Engines usable for raster OCR, primary first.
    pub fn available(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.easyocr {
            names.push("easyocr");
        }
        if self.tesseract {
            names.push("tesseract");
        }
        names
    }

    pub fn any(&self) -> bool {
        self.tesseract || self.easyocr
    }
}

async fn probe_binary(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Run Tesseract on an image: one pass for text, one TSV pass for word
/// confidences (conf column, -1 rows excluded), averaged to [0, 1].
pub async fn run_tesseract(image: &Path) -> Result<EngineResult> {
    let text_out = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .args(["--oem", "3", "--psm", "6"])
        .output()
        .await
        .map_err(|e| Error::Ocr(format!("tesseract spawn failed: {}", e)))?;

    if !text_out.status.success() {
        let stderr = String::from_utf8_lossy(&text_out.stderr);
        return Err(Error::Ocr(format!("tesseract failed: {}", stderr.trim())));
    }
    let text = String::from_utf8_lossy(&text_out.stdout).trim().to_string();

    let tsv_out = Command::new("tesseract")
        .arg(image)
        .arg("stdout")
        .args(["--oem", "3", "--psm", "6", "tsv"])
        .output()
        .await
        .map_err(|e| Error::Ocr(format!("tesseract spawn failed: {}", e)))?;

    let confidence = if tsv_out.status.success() {
        parse_tsv_confidence(&String::from_utf8_lossy(&tsv_out.stdout))
    } else {
        warn!("tesseract tsv pass failed, reporting zero confidence");
        0.0
    };

    Ok(EngineResult { text, confidence })
}

/// Average the `conf` column of Tesseract TSV output; -1 marks non-word rows.
fn parse_tsv_confidence(tsv: &str) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        if let Ok(conf) = cols[10].parse::<f64>() {
            if conf >= 0.0 {
                sum += conf;
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) / 100.0
    }
}

// easyocr CLI prints one detection tuple per line:
//   ([[x1, y1], ...], 'recognized text', 0.9731...)
static EASYOCR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'(.*)',\s*(?:np\.float64\()?([0-9]*\.?[0-9]+)\)?\)\s*$").unwrap());

/// Run the EasyOCR CLI on an image and parse its detection tuples.
pub async fn run_easyocr(image: &Path) -> Result<EngineResult> {
    let output = Command::new("easyocr")
        .args(["-l", "en", "--gpu", "False", "-f"])
        .arg(image)
        .output()
        .await
        .map_err(|e| Error::Ocr(format!("easyocr spawn failed: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Ocr(format!("easyocr failed: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut parts = Vec::new();
    let mut confidences = Vec::new();
    for line in stdout.lines() {
        if let Some(caps) = EASYOCR_LINE.captures(line) {
            parts.push(caps[1].to_string());
            if let Ok(conf) = caps[2].parse::<f64>() {
                confidences.push(conf);
            }
        }
    }

    if parts.is_empty() {
        return Ok(EngineResult {
            text: String::new(),
            confidence: 0.0,
        });
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    Ok(EngineResult {
        text: parts.join("\n"),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_confidence_averaging() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t5\t5\t40\t12\t90\tInvoice\n\
                   5\t1\t1\t1\t1\t2\t50\t5\t40\t12\t70\ttotal\n";
        let conf = parse_tsv_confidence(tsv);
        assert!((conf - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_tsv_confidence_empty() {
        assert_eq!(parse_tsv_confidence("header\n"), 0.0);
    }

    #[test]
    fn test_easyocr_line_parse() {
        let line = "([[10, 10], [80, 10], [80, 30], [10, 30]], 'Total due', 0.9731)";
        let caps = EASYOCR_LINE.captures(line).unwrap();
        assert_eq!(&caps[1], "Total due");
        assert_eq!(&caps[2], "0.9731");
    }

    #[test]
    fn test_easyocr_line_numpy_wrapper() {
        let line = "([[0, 0], [5, 0], [5, 5], [0, 5]], 'hi', np.float64(0.88))";
        let caps = EASYOCR_LINE.captures(line).unwrap();
        assert_eq!(&caps[2], "0.88");
    }
}
