//! Docpipe OCR — text extraction with engine fallback.
//!
//! Plain text is read directly, PDFs prefer the embedded text layer page by
//! page, and raster content goes through external OCR engines (EasyOCR when
//! installed, Tesseract otherwise) with a confidence-threshold fallback.

pub mod engine;
pub mod extractor;
pub mod filetype;
pub mod pdf;

pub use engine::{EngineKind, EngineResult, OcrEngines};
pub use extractor::{OcrOutcome, TextExtractor};
pub use filetype::FileKind;
