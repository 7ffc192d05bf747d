//! National aggregator: canonical results → party / alliance seat counts and the
//! national summary.
//!
//! Pure total function over its domain: no I/O, no errors. Unknown party ids in
//! a result are routed into the `other` bucket. All observable orderings are
//! explicit sorts (seats desc, votes desc, id asc).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use er_core::{
    determinism::{cmp_seats_then_votes, leader},
    rounding::percent,
    AllianceId, PartyId, ResultStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::ConstituencyResult;
use crate::reference::Registry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeatCount {
    pub party_id: PartyId,
    pub alliance_id: AllianceId,
    /// Completed constituencies won.
    pub seats: u32,
    /// Partial constituencies currently led.
    pub leading_seats: u32,
    pub total_votes: u64,
    pub vote_percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllianceSeatCount {
    pub alliance_id: AllianceId,
    pub seats: u32,
    pub leading_seats: u32,
    pub total_votes: u64,
    /// Recomputed from the alliance vote total, not summed from member percentages.
    pub vote_percentage: f64,
    pub parties: Vec<SeatCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub total_seats: u32,
    pub declared_seats: u32,
    pub remaining_seats: u32,
    pub required_majority: u32,
    pub party_seat_counts: Vec<SeatCount>,
    pub total_votes_cast: u64,
    pub total_registered_voters: u64,
    pub national_turnout: f64,
    /// A real party (not `other`, not independents) holding a majority of seats.
    pub majority_party: Option<PartyId>,
    /// A named alliance (not `others`) holding a majority of seats.
    pub majority_alliance: Option<AllianceId>,
    pub last_updated: DateTime<Utc>,
}

/// Everything the read/render collaborator needs from one pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub party_seat_counts: Vec<SeatCount>,
    pub alliance_seat_counts: Vec<AllianceSeatCount>,
    pub summary: ElectionSummary,
}

// -------------------------------------------------------------------------------------------------
// Public API
// -------------------------------------------------------------------------------------------------

/// Aggregate a (possibly sparse) set of results. `as_of` becomes `last_updated`;
/// the same inputs always produce the same output.
pub fn aggregate(results: &[ConstituencyResult], registry: &Registry, as_of: DateTime<Utc>) -> Aggregation {
    let tally = tally_parties(results.iter(), registry);
    let party_seat_counts = tally.rows.clone();
    let alliance_seat_counts = group_by_alliance(&party_seat_counts, tally.total_votes);

    let c = registry.constants();
    let majority_party = party_seat_counts
        .iter()
        .filter(|s| !s.party_id.is_other())
        .filter(|s| !registry.party(&s.party_id).map(|p| p.is_independent).unwrap_or(false))
        .find(|s| s.seats >= c.required_majority)
        .map(|s| s.party_id.clone());
    let majority_alliance = alliance_seat_counts
        .iter()
        .filter(|a| !a.alliance_id.is_others())
        .find(|a| a.seats >= c.required_majority)
        .map(|a| a.alliance_id.clone());

    debug!(
        results = results.len(),
        declared = tally.declared,
        total_votes = tally.total_votes,
        parties = party_seat_counts.len(),
        "aggregation pass complete"
    );

    let summary = ElectionSummary {
        total_seats: c.total_seats,
        declared_seats: tally.declared,
        remaining_seats: c.total_seats.saturating_sub(tally.declared),
        required_majority: c.required_majority,
        party_seat_counts: party_seat_counts.clone(),
        total_votes_cast: tally.total_votes,
        total_registered_voters: c.total_registered_voters,
        national_turnout: percent(tally.total_votes, c.total_registered_voters),
        majority_party,
        majority_alliance,
        last_updated: as_of,
    };

    Aggregation { party_seat_counts, alliance_seat_counts, summary }
}

// -------------------------------------------------------------------------------------------------
// Internals (shared with the geography roll-up)
// -------------------------------------------------------------------------------------------------

pub(crate) struct PartyTally {
    /// Filtered (non-zero activity) and sorted.
    pub rows: Vec<SeatCount>,
    pub total_votes: u64,
    pub declared: u32,
}

pub(crate) fn tally_parties<'a, I>(results: I, registry: &Registry) -> PartyTally
where
    I: Iterator<Item = &'a ConstituencyResult>,
{
    // 1) zero row for every known party
    let mut rows: BTreeMap<PartyId, SeatCount> = registry
        .parties()
        .iter()
        .map(|p| (p.id.clone(), zero_row(p.id.clone(), registry)))
        .collect();

    let mut total_votes: u64 = 0;
    let mut declared: u32 = 0;

    // 2) accumulate
    for r in results {
        total_votes = total_votes.saturating_add(r.total_votes);

        // unknown ids merge into `other` before votes are summed or a leader is picked
        let routed = routed_votes(&r.party_votes, registry);
        for (party, &votes) in &routed {
            let row = row_for(&mut rows, party, registry);
            row.total_votes = row.total_votes.saturating_add(votes);
        }

        match r.status {
            ResultStatus::Completed => {
                declared += 1;
                if let Some(w) = &r.winner_party_id {
                    row_for(&mut rows, w, registry).seats += 1;
                }
            }
            ResultStatus::Partial => {
                if let Some((lead, _)) = leader(&routed) {
                    row_for(&mut rows, lead, registry).leading_seats += 1;
                }
            }
            ResultStatus::Pending => {}
        }
    }

    // 3) percentages, 4) filter + sort
    let mut out: Vec<SeatCount> = rows
        .into_values()
        .filter(|s| s.seats > 0 || s.leading_seats > 0 || s.total_votes > 0)
        .map(|mut s| {
            s.vote_percentage = percent(s.total_votes, total_votes);
            s
        })
        .collect();
    out.sort_by(|a, b| {
        cmp_seats_then_votes((&a.party_id, a.seats, a.total_votes), (&b.party_id, b.seats, b.total_votes))
    });

    PartyTally { rows: out, total_votes, declared }
}

fn zero_row(party_id: PartyId, registry: &Registry) -> SeatCount {
    SeatCount {
        alliance_id: registry.alliance_of(&party_id),
        party_id,
        seats: 0,
        leading_seats: 0,
        total_votes: 0,
        vote_percentage: 0.0,
    }
}

fn routed_votes(party_votes: &BTreeMap<PartyId, u64>, registry: &Registry) -> BTreeMap<PartyId, u64> {
    let mut out: BTreeMap<PartyId, u64> = BTreeMap::new();
    for (party, &votes) in party_votes {
        let slot = out.entry(registry.resolve_party(party)).or_insert(0);
        *slot = slot.saturating_add(votes);
    }
    out
}

/// Row for `party`, routing unknown ids into `other` (created on demand if the
/// reference table has no `other` party).
fn row_for<'m>(
    rows: &'m mut BTreeMap<PartyId, SeatCount>,
    party: &PartyId,
    registry: &Registry,
) -> &'m mut SeatCount {
    let id = registry.resolve_party(party);
    rows.entry(id.clone()).or_insert_with(|| zero_row(id, registry))
}

/// 5) group the filtered party rows by alliance.
fn group_by_alliance(rows: &[SeatCount], national_votes: u64) -> Vec<AllianceSeatCount> {
    let mut groups: BTreeMap<AllianceId, Vec<SeatCount>> = BTreeMap::new();
    for s in rows {
        groups.entry(s.alliance_id.clone()).or_default().push(s.clone());
    }

    let mut out: Vec<AllianceSeatCount> = groups
        .into_iter()
        .map(|(alliance_id, mut parties)| {
            parties.sort_by(|a, b| {
                cmp_seats_then_votes((&a.party_id, a.seats, a.total_votes), (&b.party_id, b.seats, b.total_votes))
            });
            let seats = parties.iter().map(|p| p.seats).sum();
            let leading_seats = parties.iter().map(|p| p.leading_seats).sum();
            let total_votes = parties.iter().fold(0u64, |acc, p| acc.saturating_add(p.total_votes));
            AllianceSeatCount {
                alliance_id,
                seats,
                leading_seats,
                total_votes,
                vote_percentage: percent(total_votes, national_votes),
                parties,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        cmp_seats_then_votes((&a.alliance_id, a.seats, a.total_votes), (&b.alliance_id, b.seats, b.total_votes))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_result;
    use chrono::TimeZone;
    use er_core::{ElectionConstants, RawTally};

    fn pid(s: &str) -> PartyId { s.parse().unwrap() }
    fn ts() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 2, 12, 18, 0, 0).unwrap() }

    fn res(r: &Registry, raw: RawTally) -> ConstituencyResult {
        normalize_result(&raw, r).unwrap()
    }

    #[test]
    fn scenario_d_completed_and_partial() {
        let r = Registry::builtin();
        let results = vec![
            res(&r, RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 900).vote("al", 100)),
            res(&r, RawTally::new("c-2", ResultStatus::Partial).vote("al", 300).vote("bnp", 200)),
        ];
        let agg = aggregate(&results, &r, ts());
        let row = |id: &str| agg.party_seat_counts.iter().find(|s| s.party_id == pid(id)).cloned().unwrap();
        assert_eq!(row("bnp").seats, 1);
        assert_eq!(row("bnp").leading_seats, 0);
        assert_eq!(row("al").seats, 0);
        assert_eq!(row("al").leading_seats, 1);
        assert_eq!(agg.party_seat_counts.len(), 2);
        assert_eq!(agg.party_seat_counts[0].party_id, pid("bnp"));
        assert_eq!(agg.summary.declared_seats, 1);
        assert_eq!(agg.summary.remaining_seats, 299);
        assert_eq!(agg.summary.total_votes_cast, 1_500);
    }

    #[test]
    fn scenario_e_independent_in_others() {
        let r = Registry::builtin();
        let results = vec![
            res(&r, RawTally::new("c-1", ResultStatus::Completed).vote("independent", 90_000).vote("bnp", 10)),
            res(&r, RawTally::new("c-2", ResultStatus::Completed).vote("Independent", 80_000).vote("jamaat", 5)),
        ];
        let agg = aggregate(&results, &r, ts());
        let others = agg.alliance_seat_counts.iter().find(|a| a.alliance_id.is_others()).unwrap();
        assert_eq!(others.seats, 2);
        assert!(others.parties.iter().any(|p| p.party_id == pid("independent")));
        for a in &agg.alliance_seat_counts {
            if !a.alliance_id.is_others() {
                assert!(a.parties.iter().all(|p| p.party_id != pid("independent")));
                assert_eq!(a.seats, 0);
            }
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let r = Registry::builtin();
        let agg = aggregate(&[], &r, ts());
        assert!(agg.party_seat_counts.is_empty());
        assert!(agg.alliance_seat_counts.is_empty());
        assert_eq!(agg.summary.total_votes_cast, 0);
        assert_eq!(agg.summary.declared_seats, 0);
        assert_eq!(agg.summary.national_turnout, 0.0);
        assert_eq!(agg.summary.total_seats, 300);
        assert_eq!(agg.summary.required_majority, 151);
        assert_eq!(agg.summary.last_updated, ts());
    }

    #[test]
    fn unknown_party_ids_route_to_other() {
        let r = Registry::builtin();
        let mut malformed = res(&r, RawTally::new("c-9", ResultStatus::Completed).vote("bnp", 3));
        malformed.party_votes.insert(pid("ghost"), 7);
        malformed.total_votes = 10;
        malformed.winner_party_id = Some(pid("ghost"));
        let agg = aggregate(&[malformed], &r, ts());
        let other = agg.party_seat_counts.iter().find(|s| s.party_id.is_other()).unwrap();
        assert_eq!(other.total_votes, 7);
        assert_eq!(other.seats, 1);
        assert!(agg.party_seat_counts.iter().all(|s| s.party_id != pid("ghost")));
    }

    #[test]
    fn partial_leader_is_picked_after_routing() {
        let r = Registry::builtin();
        let mut malformed = res(&r, RawTally::new("c-7", ResultStatus::Partial).vote("al", 10));
        malformed.party_votes.insert(pid("ghost"), 6);
        malformed.party_votes.insert(pid("zulu"), 6);
        malformed.total_votes = 22;
        let agg = aggregate(&[malformed], &r, ts());
        let row = |id: &str| agg.party_seat_counts.iter().find(|s| s.party_id == pid(id)).cloned().unwrap();
        assert_eq!((row("other").total_votes, row("other").leading_seats), (12, 1));
        assert_eq!((row("al").total_votes, row("al").leading_seats), (10, 0));
        assert_eq!(agg.party_seat_counts[0].party_id, pid("other"));
        assert_eq!(agg.alliance_seat_counts.iter().map(|a| a.leading_seats).sum::<u32>(), 1);
    }

    #[test]
    fn alliance_percentage_from_totals() {
        let r = Registry::builtin();
        let results = vec![res(
            &r,
            RawTally::new("c-1", ResultStatus::Completed).vote("jamaat", 1).vote("ncp", 1).vote("bnp", 1),
        )];
        let agg = aggregate(&results, &r, ts());
        let j = agg.alliance_seat_counts.iter().find(|a| a.alliance_id.as_str() == "jamaat").unwrap();
        assert_eq!(j.total_votes, 2);
        assert!((j.vote_percentage - 200.0 / 3.0).abs() < 1e-9);
        let ids: Vec<&str> = j.parties.iter().map(|p| p.party_id.as_str()).collect();
        assert_eq!(ids, vec!["jamaat", "ncp"]);
        // three-way tie: bnp takes the seat lexically, so its alliance sorts first
        assert_eq!(agg.alliance_seat_counts[0].alliance_id.as_str(), "bnp");
    }

    #[test]
    fn majority_detection() {
        let r = Registry::builtin()
            .with_constants(ElectionConstants { total_seats: 3, required_majority: 2, total_registered_voters: 100 })
            .unwrap();
        let results = vec![
            res(&r, RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 10)),
            res(&r, RawTally::new("c-2", ResultStatus::Completed).vote("bnp", 10)),
            res(&r, RawTally::new("c-3", ResultStatus::Partial).vote("al", 10)),
        ];
        let agg = aggregate(&results, &r, ts());
        assert_eq!(agg.summary.majority_party, Some(pid("bnp")));
        assert_eq!(agg.summary.majority_alliance.as_ref().map(|a| a.as_str()), Some("bnp"));
        assert_eq!(agg.summary.national_turnout, 30.0);
        assert_eq!(agg.summary.remaining_seats, 1);
    }

    #[test]
    fn independents_never_hold_a_party_majority() {
        let r = Registry::builtin()
            .with_constants(ElectionConstants { total_seats: 1, required_majority: 1, total_registered_voters: 0 })
            .unwrap();
        let results = vec![res(&r, RawTally::new("c-1", ResultStatus::Completed).vote("independent", 10))];
        let agg = aggregate(&results, &r, ts());
        assert_eq!(agg.summary.majority_party, None);
        assert_eq!(agg.summary.majority_alliance, None);
    }

    #[test]
    fn pending_results_count_votes_only() {
        let r = Registry::builtin();
        let results = vec![res(&r, RawTally::new("c-1", ResultStatus::Pending).vote("jp", 40))];
        let agg = aggregate(&results, &r, ts());
        assert_eq!(agg.party_seat_counts.len(), 1);
        let jp = &agg.party_seat_counts[0];
        assert_eq!((jp.seats, jp.leading_seats, jp.total_votes), (0, 0, 40));
        assert_eq!(jp.vote_percentage, 100.0);
        assert_eq!(agg.summary.declared_seats, 0);
    }
}
