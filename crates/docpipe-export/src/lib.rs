//! Docpipe Export — render a document and its analysis to JSON, CSV, PDF,
//! or XLSX.

pub mod pdf;
pub mod render;
pub mod templates;
pub mod xlsx;

pub use render::{cleanup_old_exports, render, ExportFile, ExportFormat};
pub use templates::{template, template_names, ExportTemplate};
