//! Dashboard state: the write path (validate → normalize → store) and the
//! memoized read path (digest → cached aggregation).
//!
//! Single-owner: callers that share a dashboard across threads wrap it in a
//! lock. Every write is checked before anything is stored, so a rejected write
//! leaves state untouched.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use er_core::{ConstituencyId, RawTally};
use er_engine::{
    aggregate, aggregate_by_division, normalize_result, validate_tally, Aggregation, ConstituencyResult,
    DivisionSummary, Registry,
};
use tracing::{debug, info};

use crate::cache::AggregateCache;
use crate::snapshot::Snapshot;
use crate::validate::{validate_snapshot, ValidationReport};
use crate::PipelineError;

#[derive(Debug)]
pub struct Dashboard {
    registry: Registry,
    snapshot: Snapshot,
    results: BTreeMap<ConstituencyId, ConstituencyResult>,
    cache: AggregateCache,
}

impl Dashboard {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            snapshot: Snapshot::new(),
            results: BTreeMap::new(),
            cache: AggregateCache::new(),
        }
    }

    /// Seed from a loaded snapshot. Fails with the full report if any entry is
    /// in error; otherwise every tally is recorded in input order.
    pub fn from_tallies(registry: Registry, tallies: Vec<RawTally>) -> Result<(Self, ValidationReport), PipelineError> {
        let report = validate_snapshot(&tallies, &registry);
        if !report.pass {
            return Err(PipelineError::Validation(report));
        }
        let mut dash = Self::new(registry);
        for raw in tallies {
            dash.record_write(raw)?;
        }
        Ok((dash, report))
    }

    /// Accept one raw tally. Last writer wins per constituency.
    pub fn record_write(&mut self, raw: RawTally) -> Result<&ConstituencyResult, PipelineError> {
        validate_tally(&raw)?;
        let result = normalize_result(&raw, &self.registry)?;
        let id = result.constituency_id.clone();

        // an identical rewrite keeps the digest, so the memoized summary stays valid
        match self.snapshot.upsert(id.clone(), raw.clone()) {
            Some(prev) if prev == raw => debug!(constituency = %id, "identical tally rewritten"),
            Some(_) => {
                debug!(constituency = %id, "tally replaced");
                self.cache.invalidate();
            }
            None => self.cache.invalidate(),
        }
        debug!(
            constituency = %id,
            version = self.snapshot.version(),
            winner = ?result.winner_party_id,
            "write recorded"
        );

        let slot = match self.results.entry(id) {
            Entry::Occupied(mut e) => {
                e.insert(result);
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(result),
        };
        Ok(slot)
    }

    /// National aggregation, memoized by snapshot digest. `as_of` is only used
    /// when a recompute happens.
    pub fn summary(&mut self, as_of: DateTime<Utc>) -> Result<Arc<Aggregation>, PipelineError> {
        let digest = self.snapshot.digest()?;
        let (registry, stored) = (&self.registry, &self.results);
        let agg = self.cache.get_or_compute(&digest, || {
            let results: Vec<ConstituencyResult> = stored.values().cloned().collect();
            info!(results = results.len(), "recomputing aggregation");
            aggregate(&results, registry, as_of)
        });
        Ok(agg)
    }

    /// Per-division roll-up; cheap enough to compute on demand.
    pub fn divisions(&self) -> Vec<DivisionSummary> {
        let results: Vec<ConstituencyResult> = self.results.values().cloned().collect();
        aggregate_by_division(&results, &self.registry)
    }

    pub fn result(&self, id: &ConstituencyId) -> Option<&ConstituencyResult> {
        self.results.get(id)
    }

    /// Results in constituency id order.
    pub fn results(&self) -> impl Iterator<Item = &ConstituencyResult> {
        self.results.values()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use er_core::{PartyId, ResultStatus};
    use er_engine::NormalizeError;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn pid(s: &str) -> PartyId {
        s.parse().unwrap()
    }

    #[test]
    fn write_then_read() {
        let mut d = Dashboard::new(Registry::builtin());
        let r = d
            .record_write(RawTally::new("c-1", ResultStatus::Completed).vote("BNP", 50).vote("al", 40))
            .unwrap();
        assert_eq!(r.winner_party_id, Some(pid("bnp")));
        let agg = d.summary(t(10)).unwrap();
        assert_eq!(agg.summary.declared_seats, 1);
        assert_eq!(agg.party_seat_counts[0].party_id, pid("bnp"));
    }

    #[test]
    fn last_writer_wins() {
        let mut d = Dashboard::new(Registry::builtin());
        d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 50).vote("al", 40)).unwrap();
        d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 10).vote("al", 40)).unwrap();
        let id: ConstituencyId = "c-1".parse().unwrap();
        assert_eq!(d.result(&id).and_then(|r| r.winner_party_id.clone()), Some(pid("al")));
        assert_eq!(d.results().count(), 1);
        assert_eq!(d.snapshot().version(), 2);
    }

    #[test]
    fn rejected_write_leaves_state_untouched() {
        let mut d = Dashboard::new(Registry::builtin());
        d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 5)).unwrap();
        let before = d.snapshot().clone();
        let err = d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", -5)).unwrap_err();
        assert!(matches!(err, PipelineError::Normalize(NormalizeError::NegativeVotes { .. })));
        assert_eq!(d.snapshot(), &before);
    }

    #[test]
    fn summary_is_memoized_until_next_write() {
        let mut d = Dashboard::new(Registry::builtin());
        d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 5)).unwrap();
        let a = d.summary(t(1)).unwrap();
        let b = d.summary(t(2)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.summary.last_updated, t(1));

        d.record_write(RawTally::new("c-2", ResultStatus::Partial).vote("al", 3)).unwrap();
        let c = d.summary(t(3)).unwrap();
        assert_eq!(c.summary.last_updated, t(3));
        assert_eq!(c.summary.declared_seats, 1);
        assert_eq!(d.cache_stats(), (1, 2));
    }

    #[test]
    fn identical_rewrite_keeps_the_memoized_summary() {
        let mut d = Dashboard::new(Registry::builtin());
        let raw = RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 5).vote("al", 2);
        d.record_write(raw.clone()).unwrap();
        let a = d.summary(t(1)).unwrap();

        d.record_write(raw).unwrap();
        assert_eq!(d.snapshot().version(), 2);
        let b = d.summary(t(2)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(d.cache_stats(), (1, 1));

        d.record_write(RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 5).vote("al", 3)).unwrap();
        let c = d.summary(t(3)).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(d.cache_stats(), (1, 2));
    }

    #[test]
    fn from_tallies_rejects_errors() {
        let ts = vec![
            RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 1),
            RawTally::new("c-1", ResultStatus::Completed).vote("al", 1),
        ];
        match Dashboard::from_tallies(Registry::builtin(), ts) {
            Err(PipelineError::Validation(rep)) => assert_eq!(rep.issues[0].code, "Tally.DuplicateConstituency"),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
