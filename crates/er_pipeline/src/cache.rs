//! Single-slot memo for aggregation passes, keyed by snapshot digest.
//!
//! A hit hands back the stored `Aggregation` unchanged, including its
//! `last_updated`, which therefore reads as "time of last recompute".

use std::sync::Arc;

use er_engine::Aggregation;
use tracing::debug;

#[derive(Debug, Default)]
pub struct AggregateCache {
    slot: Option<(String, Arc<Aggregation>)>,
    hits: u64,
    misses: u64,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored aggregation for `digest`, or compute, store and return a fresh one.
    pub fn get_or_compute<F>(&mut self, digest: &str, compute: F) -> Arc<Aggregation>
    where
        F: FnOnce() -> Aggregation,
    {
        if let Some((key, agg)) = &self.slot {
            if key == digest {
                self.hits += 1;
                debug!(digest = %short(digest), hits = self.hits, "aggregate cache hit");
                return Arc::clone(agg);
            }
        }
        self.misses += 1;
        debug!(digest = %short(digest), misses = self.misses, "aggregate cache miss");
        let agg = Arc::new(compute());
        self.slot = Some((digest.to_owned(), Arc::clone(&agg)));
        agg
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    pub fn is_warm(&self) -> bool {
        self.slot.is_some()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

fn short(digest: &str) -> &str {
    er_io::hasher::short_hex(digest)
}
