//! Per-constituency normalizer: raw tally → canonical [`ConstituencyResult`].
//!
//! Contract:
//! - Raw keys are normalized through the registry; keys that land on the same
//!   canonical id are **summed**, never overwritten.
//! - Negative or non-integer counts are rejected with [`NormalizeError`]; nothing
//!   is clamped.
//! - First/second place come from an explicit sort (votes desc, id asc).
//! - `winner_alliance_id` is always re-derived from the winner and the registry.
//! - No NaN / infinity in outputs: zero denominators give `0.0`.

use std::collections::BTreeMap;

use er_core::{
    determinism::ranked, rounding::percent, AllianceId, ConstituencyId, CoreError, PartyId,
    RawTally, ResultStatus,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reference::Registry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid constituency id: {0:?}")]
    InvalidConstituencyId(String),
    #[error("negative vote count for {party_key:?} in {constituency_id}")]
    NegativeVotes { constituency_id: String, party_key: String },
    #[error("non-integer vote count for {party_key:?} in {constituency_id}")]
    NonIntegerVotes { constituency_id: String, party_key: String },
    #[error("vote total overflows in {0}")]
    Overflow(String),
}

/// Canonical per-constituency result. Recomputed from scratch on every pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstituencyResult {
    pub constituency_id: ConstituencyId,
    pub party_votes: BTreeMap<PartyId, u64>,
    pub alliance_votes: BTreeMap<AllianceId, u64>,
    pub winner_party_id: Option<PartyId>,
    pub winner_alliance_id: Option<AllianceId>,
    pub total_votes: u64,
    pub margin: u64,
    pub margin_percentage: f64,
    pub status: ResultStatus,
    /// `total_votes / registered_voters × 100` when the seat's roll size is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnout_percentage: Option<f64>,
}

/// Write-path check usable before persisting: shape and count validity only.
/// Unknown party keys are *not* an error (they resolve to `other`).
pub fn validate_tally(raw: &RawTally) -> Result<(), NormalizeError> {
    checked_counts(raw).map(|_| ())
}

/// Normalize one raw tally against the reference registry.
pub fn normalize_result(raw: &RawTally, registry: &Registry) -> Result<ConstituencyResult, NormalizeError> {
    let counts = checked_counts(raw)?;
    let constituency_id = parse_constituency_id(&raw.constituency_id)?;

    let mut party_votes: BTreeMap<PartyId, u64> = BTreeMap::new();
    for (key, votes) in counts {
        let id = registry.normalize_party_key(key);
        let slot = party_votes.entry(id).or_insert(0);
        *slot = slot
            .checked_add(votes)
            .ok_or_else(|| NormalizeError::Overflow(raw.constituency_id.clone()))?;
    }

    derive_result(constituency_id, party_votes, raw.status, registry)
}

/// Build the derived fields from party votes keyed by id.
///
/// Also the self-healing path for persisted results: ids missing from the
/// registry are merged into `other` before ranking, and any stale
/// winner/alliance is discarded.
pub fn derive_result(
    constituency_id: ConstituencyId,
    party_votes: BTreeMap<PartyId, u64>,
    status: ResultStatus,
    registry: &Registry,
) -> Result<ConstituencyResult, NormalizeError> {
    let overflow = || NormalizeError::Overflow(constituency_id.to_string());

    let mut routed: BTreeMap<PartyId, u64> = BTreeMap::new();
    for (party, v) in party_votes {
        let slot = routed.entry(registry.resolve_party(&party)).or_insert(0);
        *slot = slot.checked_add(v).ok_or_else(overflow)?;
    }
    let party_votes = routed;

    let mut total_votes: u64 = 0;
    for &v in party_votes.values() {
        total_votes = total_votes.checked_add(v).ok_or_else(overflow)?;
    }

    let standings = ranked(&party_votes);
    let first = standings.first().map(|(_, n)| *n).unwrap_or(0);
    let non_zero = standings.iter().filter(|(_, n)| *n > 0).count();
    let margin = if non_zero >= 2 { first - standings[1].1 } else { first };

    let winner_party_id = match (status, standings.first()) {
        (ResultStatus::Completed, Some((id, n))) if *n > 0 => Some((*id).clone()),
        _ => None,
    };
    let winner_alliance_id = winner_party_id.as_ref().map(|p| registry.alliance_of(p));

    let mut alliance_votes: BTreeMap<AllianceId, u64> = BTreeMap::new();
    for (party, &v) in &party_votes {
        *alliance_votes.entry(registry.alliance_of(party)).or_insert(0) += v;
    }

    let turnout_percentage = registry
        .registered_voters(&constituency_id)
        .filter(|&rv| rv > 0)
        .map(|rv| percent(total_votes, rv));

    Ok(ConstituencyResult {
        constituency_id,
        party_votes,
        alliance_votes,
        winner_party_id,
        winner_alliance_id,
        total_votes,
        margin,
        margin_percentage: percent(margin, total_votes),
        status,
        turnout_percentage,
    })
}

impl ConstituencyResult {
    /// Current leader by votes regardless of status (lexical tie-break).
    pub fn leader(&self) -> Option<&PartyId> {
        er_core::determinism::leader(&self.party_votes).map(|(id, _)| id)
    }

    /// Second-placed party, if any votes beyond the leader exist.
    pub fn runner_up(&self) -> Option<&PartyId> {
        ranked(&self.party_votes)
            .into_iter()
            .nth(1)
            .filter(|(_, n)| *n > 0)
            .map(|(id, _)| id)
    }
}

/* -------------------------------------------------------------------------- */
/*                                   helpers                                   */
/* -------------------------------------------------------------------------- */

fn parse_constituency_id(raw: &str) -> Result<ConstituencyId, NormalizeError> {
    raw.trim()
        .parse::<ConstituencyId>()
        .map_err(|_| NormalizeError::InvalidConstituencyId(raw.to_owned()))
}

/// Convert every raw count, rejecting the first invalid one in key order.
fn checked_counts(raw: &RawTally) -> Result<Vec<(&str, u64)>, NormalizeError> {
    parse_constituency_id(&raw.constituency_id)?;
    raw.votes
        .iter()
        .map(|(key, count)| match count.to_votes() {
            Ok(v) => Ok((key.as_str(), v)),
            Err(CoreError::NegativeCount) => Err(NormalizeError::NegativeVotes {
                constituency_id: raw.constituency_id.clone(),
                party_key: key.clone(),
            }),
            Err(_) => Err(NormalizeError::NonIntegerVotes {
                constituency_id: raw.constituency_id.clone(),
                party_key: key.clone(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use er_core::RawCount;

    fn pid(s: &str) -> PartyId { s.parse().unwrap() }

    #[test]
    fn scenario_a_two_party_completed() {
        let r = Registry::builtin();
        let raw = RawTally::new("dhaka-1", ResultStatus::Completed).vote("al", 50_000).vote("bnp", 48_000);
        let res = normalize_result(&raw, &r).unwrap();
        assert_eq!(res.winner_party_id, Some(pid("al")));
        assert!(res.winner_alliance_id.as_ref().unwrap().is_others());
        assert_eq!(res.total_votes, 98_000);
        assert_eq!(res.margin, 2_000);
        assert!((res.margin_percentage - 2.0408).abs() < 1e-3);
    }

    #[test]
    fn scenario_b_empty_pending() {
        let r = Registry::builtin();
        let res = normalize_result(&RawTally::new("dhaka-2", ResultStatus::Pending), &r).unwrap();
        assert_eq!(res.total_votes, 0);
        assert_eq!(res.winner_party_id, None);
        assert_eq!(res.winner_alliance_id, None);
        assert_eq!(res.margin, 0);
        assert_eq!(res.margin_percentage, 0.0);
        assert!(res.party_votes.is_empty() && res.alliance_votes.is_empty());
        assert_eq!(res.status, ResultStatus::Pending);
    }

    #[test]
    fn empty_completed_has_no_winner() {
        let r = Registry::builtin();
        let res = normalize_result(&RawTally::new("dhaka-3", ResultStatus::Completed), &r).unwrap();
        assert_eq!(res.status, ResultStatus::Completed);
        assert!(res.winner_party_id.is_none());
    }

    #[test]
    fn scenario_c_display_name_merges() {
        let r = Registry::builtin();
        let raw = RawTally::new("bogura-6", ResultStatus::Completed)
            .vote("Bangladesh Nationalist Party", 1_000)
            .vote("bnp", 500)
            .vote("jamaat", 1_200);
        let res = normalize_result(&raw, &r).unwrap();
        assert_eq!(res.party_votes.get(&pid("bnp")), Some(&1_500));
        assert_eq!(res.party_votes.len(), 2);
        assert_eq!(res.winner_party_id, Some(pid("bnp")));
        assert_eq!(res.margin, 300);
    }

    #[test]
    fn unknown_keys_merge_into_other() {
        let r = Registry::builtin();
        let raw = RawTally::new("x-1", ResultStatus::Partial).vote("Party A", 10).vote("Party B", 5).vote("al", 3);
        let res = normalize_result(&raw, &r).unwrap();
        assert_eq!(res.party_votes.get(&PartyId::other()), Some(&15));
        assert_eq!(res.total_votes, 18);
        assert!(res.winner_party_id.is_none());
        assert_eq!(res.leader(), Some(&PartyId::other()));
        assert_eq!(res.runner_up(), Some(&pid("al")));
    }

    #[test]
    fn stored_votes_with_unknown_ids_are_rerouted() {
        let r = Registry::builtin();
        let stored: BTreeMap<PartyId, u64> = [(pid("ghost"), 9), (pid("bnp"), 4)].into_iter().collect();
        let res = derive_result("d-1".parse().unwrap(), stored, ResultStatus::Completed, &r).unwrap();
        assert!(res.party_votes.keys().all(|id| r.is_known_party(id)));
        assert_eq!(res.party_votes.get(&PartyId::other()), Some(&9));
        assert_eq!(res.winner_party_id, Some(PartyId::other()));
        assert!(res.winner_alliance_id.as_ref().unwrap().is_others());
        assert_eq!((res.total_votes, res.margin), (13, 5));

        // two unknown ids collapse into one bucket and overtake a real party
        let stored: BTreeMap<PartyId, u64> =
            [(pid("ghost"), 6), (pid("zulu"), 6), (pid("al"), 10)].into_iter().collect();
        let res = derive_result("d-2".parse().unwrap(), stored, ResultStatus::Partial, &r).unwrap();
        assert_eq!(res.party_votes.len(), 2);
        assert_eq!(res.leader(), Some(&PartyId::other()));
        assert_eq!(res.margin, 2);
    }

    #[test]
    fn tie_breaks_lexically() {
        let r = Registry::builtin();
        let raw = RawTally::new("t-1", ResultStatus::Completed).vote("jp", 100).vote("al", 100);
        let res = normalize_result(&raw, &r).unwrap();
        assert_eq!(res.winner_party_id, Some(pid("al")));
        assert_eq!(res.margin, 0);
    }

    #[test]
    fn single_party_margin_is_its_votes() {
        let r = Registry::builtin();
        let raw = RawTally::new("s-1", ResultStatus::Completed).vote("bnp", 700).vote("al", 0);
        let res = normalize_result(&raw, &r).unwrap();
        assert_eq!(res.margin, 700);
        assert_eq!(res.margin_percentage, 100.0);
    }

    #[test]
    fn alliance_rollup_partitions_votes() {
        let r = Registry::builtin();
        let raw = RawTally::new("c-1", ResultStatus::Partial)
            .vote("bnp", 10)
            .vote("jamaat", 7)
            .vote("ncp", 3)
            .vote("independent", 4)
            .vote("al", 2);
        let res = normalize_result(&raw, &r).unwrap();
        let get = |a: &str| res.alliance_votes.get(&a.parse::<AllianceId>().unwrap()).copied();
        assert_eq!(get("bnp"), Some(10));
        assert_eq!(get("jamaat"), Some(10));
        assert_eq!(get("others"), Some(6));
        assert_eq!(res.alliance_votes.values().sum::<u64>(), res.total_votes);
    }

    #[test]
    fn negative_and_fractional_rejected() {
        let r = Registry::builtin();
        let neg = RawTally::new("n-1", ResultStatus::Partial).vote("bnp", -1);
        assert!(matches!(normalize_result(&neg, &r), Err(NormalizeError::NegativeVotes { .. })));
        assert!(validate_tally(&neg).is_err());

        let mut frac = RawTally::new("n-2", ResultStatus::Partial);
        frac.votes.insert("bnp".into(), RawCount::Fractional(10.5));
        assert!(matches!(validate_tally(&frac), Err(NormalizeError::NonIntegerVotes { .. })));
    }

    #[test]
    fn bad_constituency_id_rejected() {
        let r = Registry::builtin();
        let raw = RawTally::new("  ", ResultStatus::Pending);
        assert!(matches!(normalize_result(&raw, &r), Err(NormalizeError::InvalidConstituencyId(_))));
        let spaced = RawTally::new("dhaka 1", ResultStatus::Pending);
        assert!(validate_tally(&spaced).is_err());
    }

    #[test]
    fn stale_winner_alliance_is_rederived() {
        let r = Registry::builtin();
        // A persisted record claiming an `al` win under the bnp alliance.
        let votes: BTreeMap<PartyId, u64> = [(pid("al"), 9), (pid("bnp"), 4)].into_iter().collect();
        let res = derive_result("d-1".parse().unwrap(), votes, ResultStatus::Completed, &r).unwrap();
        assert_eq!(res.winner_party_id, Some(pid("al")));
        assert!(res.winner_alliance_id.unwrap().is_others());
    }

    #[test]
    fn overflow_is_an_error() {
        let r = Registry::builtin();
        let raw = RawTally::new("o-1", ResultStatus::Partial).vote("bnp", i64::MAX).vote("BNP ", i64::MAX).vote("Bangladesh Nationalist Party", i64::MAX);
        assert!(matches!(normalize_result(&raw, &r), Err(NormalizeError::Overflow(_))));
    }
}
