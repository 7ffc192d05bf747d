//! Versioned tally snapshot: constituency id → latest raw tally.
//!
//! The digest (SHA-256 over canonical JSON of the tallies) is the memo key for
//! aggregation. `version` counts accepted writes and never goes backwards.

use std::collections::BTreeMap;

use er_core::{ConstituencyId, RawTally};
use er_io::hasher::sha256_canonical;
use serde::Serialize;

use crate::PipelineError;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    version: u64,
    tallies: BTreeMap<ConstituencyId, RawTally>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the constituency's tally (last writer wins) and bump the version.
    /// Returns the tally that was displaced, if any.
    pub fn upsert(&mut self, id: ConstituencyId, raw: RawTally) -> Option<RawTally> {
        self.version += 1;
        self.tallies.insert(id, raw)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    pub fn get(&self, id: &ConstituencyId) -> Option<&RawTally> {
        self.tallies.get(id)
    }

    /// Tallies in constituency id order.
    pub fn tallies(&self) -> impl Iterator<Item = &RawTally> {
        self.tallies.values()
    }

    /// Content digest. Independent of `version`: two snapshots holding the same
    /// tallies hash the same regardless of how many writes produced them.
    pub fn digest(&self) -> Result<String, PipelineError> {
        Ok(sha256_canonical(&self.tallies)?)
    }
}
