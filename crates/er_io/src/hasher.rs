//! crates/er_io/src/hasher.rs
//!
//! SHA-256 digests over canonical JSON. The snapshot digest is the version key
//! callers use to memoize aggregation passes.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::IoResult;

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Lowercase hex SHA-256 of the canonical JSON encoding of `value`.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Short form for logs.
pub fn short_hex(hex64: &str) -> &str {
    &hex64[..hex64.len().min(12)]
}
