//! PDF helpers: text layer, page count, and page rasterization.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use docpipe_core::{Error, Result};

/// Extract the embedded text layer, one string per page.
///
/// Runs on the blocking pool; parsing large PDFs is CPU-bound. pdf-extract
/// (via its font parsing) can panic on malformed glyph tables, so the call
/// is wrapped in catch_unwind and reported as an ordinary error.
pub async fn text_layer_by_pages(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(Error::Ocr(format!("PDF text layer extraction failed: {}", e))),
            Err(_panic) => Err(Error::Ocr(
                "PDF text layer extraction panicked (malformed fonts?)".to_string(),
            )),
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}

/// Page count via `pdfinfo`, for PDFs whose text layer cannot be parsed.
pub async fn page_count(path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(path)
        .output()
        .await
        .map_err(|e| Error::Ocr(format!("pdfinfo spawn failed: {}", e)))?;

    if !output.status.success() {
        return Err(Error::Ocr("pdfinfo failed".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            if let Ok(count) = rest.trim().parse::<usize>() {
                return Ok(count);
            }
        }
    }
    Err(Error::Ocr("pdfinfo output missing page count".to_string()))
}

/// Rasterize a single page (1-indexed) to a PNG in `work_dir` via `pdftoppm`.
/// Returns the generated image path.
pub async fn rasterize_page(path: &Path, page: usize, work_dir: &Path) -> Result<PathBuf> {
    let prefix = work_dir.join(format!("page{}", page));
    let status = Command::new("pdftoppm")
        .args(["-png", "-r", "150"])
        .args(["-f", &page.to_string(), "-l", &page.to_string()])
        .arg(path)
        .arg(&prefix)
        .status()
        .await
        .map_err(|e| Error::Ocr(format!("pdftoppm spawn failed: {}", e)))?;

    if !status.success() {
        return Err(Error::Ocr(format!("pdftoppm failed for page {}", page)));
    }

    // pdftoppm appends its own page suffix with version-dependent zero
    // padding, so discover the file rather than guessing the name.
    let stem = format!("page{}", page);
    for entry in std::fs::read_dir(work_dir)? {
        let entry = entry?;
        let p = entry.path();
        let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with(&stem) && name.ends_with(".png") {
            debug!("rasterized page {} -> {}", page, p.display());
            return Ok(p);
        }
    }

    Err(Error::Ocr(format!(
        "pdftoppm produced no image for page {}",
        page
    )))
}
