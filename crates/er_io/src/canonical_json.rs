//! Canonical JSON utilities (er_io)
//! - Objects: keys sorted lexicographically (UTF-8 byte order)
//! - Arrays: order preserved (caller is responsible for stable ordering)
//! - Output: compact (no extra spaces, no trailing newline)
//! - Atomic write: temp file in same dir + fsync(temp) + rename; fsync(dir) on Unix
//! - Fallback: if rename fails (e.g., cross-device), write directly to target,
//!   fsync(target), then remove temp.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::{IoError, IoResult};

/// Convert a serde_json `Value` to canonical JSON bytes.
pub fn to_canonical_json_bytes(v: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(1024);
    write_canonical_value(v, &mut out);
    out
}

/// Serialize any value to canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let v = serde_json::to_value(value).map_err(|e| IoError::json("<memory>", e))?;
    Ok(to_canonical_json_bytes(&v))
}

/// Write canonical JSON of `value` to `path` atomically.
pub fn write_canonical_file<T: Serialize>(path: &Path, value: &T) -> IoResult<()> {
    let bytes = to_canonical_bytes(value)?;
    write_atomic(path, &bytes).map_err(|source| IoError::Write { path: path.to_path_buf(), source })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp = make_unique_tmp_path(path);
    let mut tf = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    tf.write_all(bytes)?;
    tf.sync_all()?;
    drop(tf);

    match fs::rename(&tmp, path) {
        Ok(()) => {
            let _ = fsync_dir(&parent);
            Ok(())
        }
        Err(_) => {
            let res: io::Result<()> = (|| {
                let mut f = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
                f.write_all(bytes)?;
                f.sync_all()
            })();
            let _ = fs::remove_file(&tmp);
            res?;
            let _ = fsync_dir(&parent);
            Ok(())
        }
    }
}

fn write_canonical_value(v: &Value, out: &mut Vec<u8>) {
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        // `Value`'s Display produces a correctly escaped literal.
        Value::String(_) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Array(arr) => {
            out.push(b'[');
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_value(elem, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(k.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical_value(&map[k.as_str()], out);
            }
            out.push(b'}');
        }
    }
}

/// Create a unique temp path next to `target`: "<filename>.<pid>.<counter>.tmp"
fn make_unique_tmp_path(target: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let fname = target.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    let tmp_name = format!("{fname}.{pid}.{n}.tmp");

    match target.parent() {
        Some(dir) => dir.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let df = OpenOptions::new().read(true).open(dir)?;
    df.sync_all()
}

#[cfg(not(unix))]
#[inline]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_are_sorted_arrays_preserved() {
        let v = json!({
            "b": 1,
            "a": { "y": 1, "x": 2 },
            "arr": [ {"k":2,"j":1}, 3, "z" ]
        });
        let s = String::from_utf8(to_canonical_json_bytes(&v)).unwrap();
        assert_eq!(s, r#"{"a":{"x":2,"y":1},"arr":[{"j":1,"k":2},3,"z"],"b":1}"#);
    }

    #[test]
    fn strings_are_escaped() {
        let v = json!({"q\"k": "line\nbreak"});
        let s = String::from_utf8(to_canonical_json_bytes(&v)).unwrap();
        assert_eq!(s, r#"{"q\"k":"line\nbreak"}"#);
    }

    #[test]
    fn atomic_write_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        write_canonical_file(&path, &json!({"z": 1, "a": [true, null]})).unwrap();
        let got = std::fs::read_to_string(&path).unwrap();
        assert_eq!(got, r#"{"a":[true,null],"z":1}"#);
        assert!(!got.ends_with('\n'));
    }
}
