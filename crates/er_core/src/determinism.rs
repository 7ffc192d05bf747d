//! Determinism utilities: stable ordering for standings.
//!
//! Every observable ordering in the engine goes through these helpers, so no
//! output ever depends on map iteration or insertion order.

use core::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ids::{AllianceId, ConstituencyId, PartyId};

/* -------------------------------------------------------------------------- */
/*                               Stable Ordering                              */
/* -------------------------------------------------------------------------- */

/// Provide a **total**, stable order for values that must sort canonically.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

impl StableOrd for PartyId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl StableOrd for AllianceId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl StableOrd for ConstituencyId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/* -------------------------------------------------------------------------- */
/*                               Vote standings                                */
/* -------------------------------------------------------------------------- */

/// Votes descending, then id ascending.
#[inline]
pub fn cmp_votes_desc<K: StableOrd>(a: (&K, u64), b: (&K, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.stable_cmp(b.0))
}

/// Seats descending, then votes descending, then id ascending.
#[inline]
pub fn cmp_seats_then_votes<K: StableOrd>(a: (&K, u32, u64), b: (&K, u32, u64)) -> Ordering {
    b.1.cmp(&a.1)
        .then_with(|| b.2.cmp(&a.2))
        .then_with(|| a.0.stable_cmp(b.0))
}

/// Entries of a tally ranked by [`cmp_votes_desc`].
pub fn ranked<K: StableOrd + Ord>(tally: &BTreeMap<K, u64>) -> Vec<(&K, u64)> {
    let mut v: Vec<(&K, u64)> = tally.iter().map(|(k, n)| (k, *n)).collect();
    v.sort_by(|a, b| cmp_votes_desc(*a, *b));
    v
}

/// Top entry with a strictly positive count; lexical tie-break.
pub fn leader<K: StableOrd + Ord>(tally: &BTreeMap<K, u64>) -> Option<(&K, u64)> {
    ranked(tally).into_iter().next().filter(|(_, n)| *n > 0)
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PartyId { s.parse().unwrap() }

    #[test]
    fn ranked_breaks_ties_lexically() {
        let m: BTreeMap<PartyId, u64> =
            [(pid("jp"), 10), (pid("bnp"), 20), (pid("al"), 20), (pid("ncp"), 0)].into_iter().collect();
        let got: Vec<(&str, u64)> = ranked(&m).into_iter().map(|(k, n)| (k.as_str(), n)).collect();
        assert_eq!(got, vec![("al", 20), ("bnp", 20), ("jp", 10), ("ncp", 0)]);
    }

    #[test]
    fn leader_requires_votes() {
        let empty: BTreeMap<PartyId, u64> = BTreeMap::new();
        assert!(leader(&empty).is_none());
        let zeros: BTreeMap<PartyId, u64> = [(pid("al"), 0)].into_iter().collect();
        assert!(leader(&zeros).is_none());
        let one: BTreeMap<PartyId, u64> = [(pid("al"), 0), (pid("jp"), 1)].into_iter().collect();
        assert_eq!(leader(&one).map(|(k, _)| k.as_str()), Some("jp"));
    }

    #[test]
    fn seats_then_votes_then_id() {
        let (a, b, c) = (pid("a"), pid("b"), pid("c"));
        let mut v = vec![(&c, 1u32, 5u64), (&b, 2, 1), (&a, 1, 5)];
        v.sort_by(|x, y| cmp_seats_then_votes(*x, *y));
        let got: Vec<&str> = v.iter().map(|x| x.0.as_str()).collect();
        assert_eq!(got, vec!["b", "a", "c"]);
    }
}
