//! Docpipe Core — configuration, data paths, shared error types.

pub mod config;
pub mod error;

pub use config::{DataPaths, DocpipeConfig};
pub use error::{Error, Result};
