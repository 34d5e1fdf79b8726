//! Docpipe Store — SQLite persistence for documents, jobs, models, shares, tags.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::Store;
pub use types::*;
