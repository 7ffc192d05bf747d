//! Loader: read local JSON inputs (reference data, tally snapshots, single
//! tallies) into `er_core` types. No network I/O; URL-like paths are refused.
//!
//! Reference file shape (every section optional; missing sections fall back to
//! the built-in national tables and default constants):
//!
//! ```json
//! { "constants": { "total_seats": 300, "required_majority": 151, "total_registered_voters": 0 },
//!   "parties":   [ { "id": "bnp", "display_name": "...", "short_name": "BNP", "color": "#..." } ],
//!   "alliances": [ { "id": "bnp", "display_name": "...", "color": "#..." } ],
//!   "geography": { "divisions": [] } }
//! ```
//!
//! Snapshot file shape: either a bare array of tallies or `{ "tallies": [...] }`.

use std::fs;
use std::path::Path;

use er_core::{entities::builtin, Alliance, ElectionConstants, Geography, Party, RawTally};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{looks_like_url_strict, IoError, IoResult};

/// Reference sections resolved against the built-in defaults.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferenceData {
    pub constants: ElectionConstants,
    pub parties: Vec<Party>,
    pub alliances: Vec<Alliance>,
    pub geography: Geography,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            constants: ElectionConstants::default(),
            parties: builtin::parties(),
            alliances: builtin::alliances(),
            geography: Geography::default(),
        }
    }
}

/// On-disk shape: every section optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferenceFile {
    #[serde(default)]
    constants: Option<ElectionConstants>,
    #[serde(default)]
    parties: Option<Vec<Party>>,
    #[serde(default)]
    alliances: Option<Vec<Alliance>>,
    #[serde(default)]
    geography: Option<Geography>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Bare(Vec<RawTally>),
    Wrapped { tallies: Vec<RawTally> },
}

// ----------------------------- Public API -----------------------------

pub fn load_reference(path: &Path) -> IoResult<ReferenceData> {
    let file: ReferenceFile = read_json(path)?;
    let data = resolve_reference(file);
    data.constants
        .validate()
        .map_err(|e| IoError::Reference(format!("{}: {e}", path.display())))?;
    debug!(
        path = %path.display(),
        parties = data.parties.len(),
        alliances = data.alliances.len(),
        constituencies = data.geography.constituency_count(),
        "reference data loaded"
    );
    Ok(data)
}

/// Parse reference data from an in-memory JSON string.
pub fn parse_reference(json: &str) -> IoResult<ReferenceData> {
    let file: ReferenceFile = serde_json::from_str(json).map_err(|e| IoError::json("<memory>", e))?;
    let data = resolve_reference(file);
    data.constants.validate().map_err(|e| IoError::Reference(e.to_string()))?;
    Ok(data)
}

pub fn load_tallies(path: &Path) -> IoResult<Vec<RawTally>> {
    let file: SnapshotFile = read_json(path)?;
    let tallies = match file {
        SnapshotFile::Bare(t) => t,
        SnapshotFile::Wrapped { tallies } => tallies,
    };
    debug!(path = %path.display(), tallies = tallies.len(), "snapshot loaded");
    Ok(tallies)
}

pub fn load_raw_tally(path: &Path) -> IoResult<RawTally> {
    read_json(path)
}

// ----------------------------- helpers -----------------------------

fn resolve_reference(file: ReferenceFile) -> ReferenceData {
    let d = ReferenceData::default();
    ReferenceData {
        constants: file.constants.unwrap_or(d.constants),
        parties: file.parties.unwrap_or(d.parties),
        alliances: file.alliances.unwrap_or(d.alliances),
        geography: file.geography.unwrap_or(d.geography),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> IoResult<T> {
    let shown = path.display().to_string();
    if looks_like_url_strict(&shown) {
        return Err(IoError::NonLocal(shown));
    }
    let bytes = fs::read(path).map_err(|source| IoError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&bytes).map_err(|e| IoError::json(shown, e))
}
