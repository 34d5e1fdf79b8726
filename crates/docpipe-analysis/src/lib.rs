//! Docpipe Analysis — pure-text heuristics over extracted document text.
//!
//! Keyword-overlap classification, regex field extraction, entity
//! recognition, and local summary composition. No I/O; everything here is
//! the deterministic fallback the AI adapter reaches for when the language
//! model backend is unavailable.

pub mod classify;
pub mod entities;
pub mod fields;
pub mod summary;

pub use classify::{classify, Classification};
pub use entities::{extract_entities, Entity};
pub use fields::{extract_fields, validate_fields, FieldValue};
pub use summary::local_summary;
