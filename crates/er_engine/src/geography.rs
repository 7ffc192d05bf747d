//! Divisional roll-up: the national tally repeated per administrative division.
//! Divisions come out in reference order; results for constituencies missing
//! from the geography are gathered into a trailing `unassigned` row.

use er_core::DivisionId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{tally_parties, SeatCount};
use crate::normalize::ConstituencyResult;
use crate::reference::Registry;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivisionSummary {
    /// `None` for the unassigned row.
    pub division_id: Option<DivisionId>,
    pub name: String,
    /// Seats the geography lists for this division (0 for unassigned).
    pub total_constituencies: u32,
    pub declared_seats: u32,
    pub total_votes: u64,
    /// Percentages are relative to this division's own vote total.
    pub party_seat_counts: Vec<SeatCount>,
}

pub fn aggregate_by_division(results: &[ConstituencyResult], registry: &Registry) -> Vec<DivisionSummary> {
    let divisions = &registry.geography().divisions;
    let mut buckets: Vec<Vec<&ConstituencyResult>> = vec![Vec::new(); divisions.len()];
    let mut unassigned: Vec<&ConstituencyResult> = Vec::new();

    for r in results {
        match registry.division_index_of(&r.constituency_id) {
            Some(i) => buckets[i].push(r),
            None => unassigned.push(r),
        }
    }

    let mut out: Vec<DivisionSummary> = divisions
        .iter()
        .zip(buckets)
        .map(|(dv, members)| {
            let seats: usize = dv.districts.iter().map(|d| d.constituencies.len()).sum();
            summarize(Some(dv.id.clone()), dv.name.clone(), seats as u32, &members, registry)
        })
        .collect();

    if !unassigned.is_empty() {
        out.push(summarize(None, "Unassigned".to_owned(), 0, &unassigned, registry));
    }
    out
}

fn summarize(
    division_id: Option<DivisionId>,
    name: String,
    total_constituencies: u32,
    members: &[&ConstituencyResult],
    registry: &Registry,
) -> DivisionSummary {
    let tally = tally_parties(members.iter().copied(), registry);
    DivisionSummary {
        division_id,
        name,
        total_constituencies,
        declared_seats: tally.declared,
        total_votes: tally.total_votes,
        party_seat_counts: tally.rows,
    }
}
