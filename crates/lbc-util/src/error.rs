//! Typed errors for operations in this crate that can fail independently of
//! the [`crate::diagnostic`] pipeline (e.g. loading a file from disk).
//!
//! This is separate from user-facing diagnostics: a [`SourceLoadError`] is
//! something the driver turns *into* a diagnostic (or an `anyhow::Error` at
//! the CLI boundary), not something threaded through the analyzer.

use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum SourceLoadError {
    #[error("could not read '{path}': {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("'{path}' is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

pub type Result<T, E = SourceLoadError> = std::result::Result<T, E>;
