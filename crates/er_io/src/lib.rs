//! crates/er_io/src/lib.rs
//! Minimal, single-source-of-truth I/O crate.
//!
//! - Shared error type (`IoError`) used across modules.
//! - Loaders for reference data and raw tally snapshots (local JSON files only).
//! - Canonical JSON bytes and SHA-256 digests for snapshot versioning.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod loader;

/// Unified error for er_io.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON shape / syntax error, with the file it came from (if any).
    #[error("json error in {path}: {msg}")]
    Json { path: String, msg: String },

    /// Reference data parsed but violates a domain rule.
    #[error("invalid reference data: {0}")]
    Reference(String),

    /// Rejects anything that looks like a URL; inputs are local files.
    #[error("non-local path: {0}")]
    NonLocal(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl IoError {
    pub(crate) fn json(path: impl Into<String>, e: serde_json::Error) -> Self {
        IoError::Json { path: path.into(), msg: e.to_string() }
    }
}

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    s.trim().contains("://")
}

pub mod prelude {
    pub use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
    pub use crate::hasher::{sha256_canonical, sha256_hex};
    pub use crate::loader::{load_raw_tally, load_reference, load_tallies, ReferenceData};
    pub use crate::{looks_like_url_strict, IoError, IoResult};
}
