//! er_report — pure offline report model + renderers (JSON / plain text).
//!
//! Determinism rules:
//! - No I/O, no clock. Everything comes from an already-computed aggregation.
//! - Percent strings are two-decimal, built from integer hundredths; renderers
//!   never format floats.
//! - Stable section order and field names.

#![deny(unsafe_code)]

use std::fmt;

use chrono::SecondsFormat;
use er_core::{rounding::percent_string, AllianceId, PartyId};
use er_engine::{Aggregation, DivisionSummary, Registry, SeatCount};

#[cfg(feature = "render_json")]
pub mod render_json;
#[cfg(feature = "render_text")]
pub mod render_text;

#[cfg(feature = "render_json")]
pub use render_json::render_json;
#[cfg(feature = "render_text")]
pub use render_text::render_text;

// ===== Errors =====
#[derive(Debug)]
pub enum ReportError {
    Render(&'static str),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Render(what) => write!(f, "render failed: {what}"),
        }
    }
}

impl std::error::Error for ReportError {}

// ===== Model =====
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportModel {
    pub headline: SectionHeadline,
    pub parties: Vec<PartyRow>,
    pub alliances: Vec<AllianceRow>,
    pub divisions: Vec<DivisionRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionHeadline {
    pub title: String,
    /// RFC 3339, second precision, `Z` suffix.
    pub as_of: String,
    pub total_seats: u32,
    pub declared_seats: u32,
    pub remaining_seats: u32,
    pub required_majority: u32,
    pub total_votes_cast: u64,
    pub total_registered_voters: u64,
    pub turnout_pct: String,
    /// Display names, not ids.
    pub majority_party: Option<String>,
    pub majority_alliance: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartyRow {
    pub party_id: String,
    pub name: String,
    pub short_name: String,
    pub color: String,
    pub alliance_id: String,
    pub seats: u32,
    pub leading_seats: u32,
    pub votes: u64,
    pub vote_pct: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllianceRow {
    pub alliance_id: String,
    pub name: String,
    pub color: String,
    pub seats: u32,
    pub leading_seats: u32,
    pub votes: u64,
    pub vote_pct: String,
    /// Member short names in the alliance's own member order.
    pub members: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivisionRow {
    /// Empty for the unassigned row.
    pub division_id: String,
    pub name: String,
    pub total_constituencies: u32,
    pub declared_seats: u32,
    pub votes: u64,
    /// Short name of the top party by seats, then votes.
    pub leader: Option<String>,
}

// ===== API =====

/// Build the report model from one aggregation pass (pure, offline).
///
/// Names and colors come from the registry; ids the registry does not know
/// fall back to the id itself and a neutral color.
pub fn build_model(agg: &Aggregation, divisions: &[DivisionSummary], registry: &Registry) -> ReportModel {
    let s = &agg.summary;
    let total = s.total_votes_cast;

    let headline = SectionHeadline {
        title: "Election results".to_string(),
        as_of: s.last_updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        total_seats: s.total_seats,
        declared_seats: s.declared_seats,
        remaining_seats: s.remaining_seats,
        required_majority: s.required_majority,
        total_votes_cast: total,
        total_registered_voters: s.total_registered_voters,
        turnout_pct: percent_string(total, s.total_registered_voters),
        majority_party: s.majority_party.as_ref().map(|p| party_names(registry, p).0),
        majority_alliance: s.majority_alliance.as_ref().map(|a| alliance_names(registry, a).0),
    };

    let parties = agg.party_seat_counts.iter().map(|c| party_row(c, total, registry)).collect();

    let alliances = agg
        .alliance_seat_counts
        .iter()
        .map(|a| {
            let (name, color) = alliance_names(registry, &a.alliance_id);
            AllianceRow {
                alliance_id: a.alliance_id.to_string(),
                name,
                color,
                seats: a.seats,
                leading_seats: a.leading_seats,
                votes: a.total_votes,
                vote_pct: percent_string(a.total_votes, total),
                members: a.parties.iter().map(|p| party_names(registry, &p.party_id).1).collect(),
            }
        })
        .collect();

    let divisions = divisions
        .iter()
        .map(|d| DivisionRow {
            division_id: d.division_id.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            name: d.name.clone(),
            total_constituencies: d.total_constituencies,
            declared_seats: d.declared_seats,
            votes: d.total_votes,
            leader: d.party_seat_counts.first().map(|c| party_names(registry, &c.party_id).1),
        })
        .collect();

    ReportModel { headline, parties, alliances, divisions }
}

// ===== Helpers =====

const NEUTRAL_COLOR: &str = "#9e9e9e";

fn party_row(c: &SeatCount, total: u64, registry: &Registry) -> PartyRow {
    let (name, short_name) = party_names(registry, &c.party_id);
    let color = registry
        .party(&c.party_id)
        .map(|p| p.color.clone())
        .unwrap_or_else(|| NEUTRAL_COLOR.to_string());
    PartyRow {
        party_id: c.party_id.to_string(),
        name,
        short_name,
        color,
        alliance_id: c.alliance_id.to_string(),
        seats: c.seats,
        leading_seats: c.leading_seats,
        votes: c.total_votes,
        vote_pct: percent_string(c.total_votes, total),
    }
}

/// (display name, short name)
fn party_names(registry: &Registry, id: &PartyId) -> (String, String) {
    match registry.party(id) {
        Some(p) => (p.display_name.clone(), p.short_name.clone()),
        None => (id.to_string(), id.to_string()),
    }
}

/// (display name, color)
fn alliance_names(registry: &Registry, id: &AllianceId) -> (String, String) {
    match registry.alliance(id) {
        Some(a) => (a.display_name.clone(), a.color.clone()),
        None => (id.to_string(), NEUTRAL_COLOR.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use er_core::{RawTally, ResultStatus};
    use er_engine::{aggregate, aggregate_by_division, normalize_result};

    fn model() -> ReportModel {
        let r = Registry::builtin();
        let results: Vec<_> = [
            RawTally::new("c-1", ResultStatus::Completed).vote("bnp", 2).vote("al", 1),
            RawTally::new("c-2", ResultStatus::Partial).vote("al", 3),
        ]
        .iter()
        .map(|t| normalize_result(t, &r).unwrap())
        .collect();
        let as_of = Utc.with_ymd_and_hms(2026, 2, 12, 18, 30, 0).unwrap();
        let agg = aggregate(&results, &r, as_of);
        build_model(&agg, &aggregate_by_division(&results, &r), &r)
    }

    #[test]
    fn headline_strings() {
        let m = model();
        assert_eq!(m.headline.as_of, "2026-02-12T18:30:00Z");
        assert_eq!(m.headline.turnout_pct, "0.00");
        assert_eq!(m.headline.declared_seats, 1);
        assert_eq!(m.headline.majority_party, None);
    }

    #[test]
    fn rows_join_registry_names() {
        let m = model();
        assert_eq!(m.parties[0].short_name, "BNP");
        assert_eq!(m.parties[0].vote_pct, "33.33");
        assert_eq!(m.parties[1].name, "Bangladesh Awami League");
        assert_eq!(m.parties[1].vote_pct, "66.67");
        assert_eq!(m.alliances[0].name, "BNP-led Alliance");
        assert_eq!(m.alliances[1].members, vec!["AL".to_string()]);
    }

    #[test]
    fn unassigned_division_has_empty_id() {
        let m = model();
        assert_eq!(m.divisions.len(), 1);
        assert_eq!(m.divisions[0].division_id, "");
        assert_eq!(m.divisions[0].leader.as_deref(), Some("BNP"));
    }
}
