//! render_json.rs — report JSON renderer (headline → parties → alliances → divisions).
//!
//! Key order is part of the output contract, so this crate builds with
//! `serde_json`'s `preserve_order` feature and inserts keys explicitly.

use serde_json::{Map as JsonMap, Value};

use crate::{AllianceRow, DivisionRow, PartyRow, ReportError, ReportModel, SectionHeadline};

/// Pretty-printed report JSON with a trailing newline.
pub fn render_json(m: &ReportModel) -> Result<String, ReportError> {
    let mut s = serde_json::to_string_pretty(&report_value(m)).map_err(|_| ReportError::Render("json_serialize"))?;
    s.push('\n');
    Ok(s)
}

/// The report as an ordered JSON value.
pub fn report_value(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("headline".into(), headline_json(&m.headline));
    root.insert("parties".into(), Value::Array(m.parties.iter().map(party_json).collect()));
    root.insert("alliances".into(), Value::Array(m.alliances.iter().map(alliance_json).collect()));
    root.insert("divisions".into(), Value::Array(m.divisions.iter().map(division_json).collect()));
    Value::Object(root)
}

/* ----------------------------- sections ----------------------------- */

fn headline_json(h: &SectionHeadline) -> Value {
    let mut o = obj();
    o.insert("title".into(), h.title.clone().into());
    o.insert("as_of".into(), h.as_of.clone().into());

    let mut seats = obj();
    seats.insert("total".into(), h.total_seats.into());
    seats.insert("declared".into(), h.declared_seats.into());
    seats.insert("remaining".into(), h.remaining_seats.into());
    seats.insert("required_majority".into(), h.required_majority.into());
    o.insert("seats".into(), Value::Object(seats));

    let mut turnout = obj();
    turnout.insert("votes_cast".into(), h.total_votes_cast.into());
    turnout.insert("registered".into(), h.total_registered_voters.into());
    turnout.insert("pct".into(), h.turnout_pct.clone().into());
    o.insert("turnout".into(), Value::Object(turnout));

    o.insert("majority_party".into(), opt_str(&h.majority_party));
    o.insert("majority_alliance".into(), opt_str(&h.majority_alliance));
    Value::Object(o)
}

fn party_json(p: &PartyRow) -> Value {
    let mut o = obj();
    o.insert("party_id".into(), p.party_id.clone().into());
    o.insert("name".into(), p.name.clone().into());
    o.insert("short_name".into(), p.short_name.clone().into());
    o.insert("color".into(), p.color.clone().into());
    o.insert("alliance_id".into(), p.alliance_id.clone().into());
    o.insert("seats".into(), p.seats.into());
    o.insert("leading".into(), p.leading_seats.into());
    o.insert("votes".into(), p.votes.into());
    o.insert("vote_pct".into(), p.vote_pct.clone().into());
    Value::Object(o)
}

fn alliance_json(a: &AllianceRow) -> Value {
    let mut o = obj();
    o.insert("alliance_id".into(), a.alliance_id.clone().into());
    o.insert("name".into(), a.name.clone().into());
    o.insert("color".into(), a.color.clone().into());
    o.insert("seats".into(), a.seats.into());
    o.insert("leading".into(), a.leading_seats.into());
    o.insert("votes".into(), a.votes.into());
    o.insert("vote_pct".into(), a.vote_pct.clone().into());
    o.insert(
        "members".into(),
        Value::Array(a.members.iter().cloned().map(Value::String).collect()),
    );
    Value::Object(o)
}

fn division_json(d: &DivisionRow) -> Value {
    let mut o = obj();
    // unassigned row: id omitted
    if !d.division_id.is_empty() {
        o.insert("division_id".into(), d.division_id.clone().into());
    }
    o.insert("name".into(), d.name.clone().into());
    o.insert("constituencies".into(), d.total_constituencies.into());
    o.insert("declared".into(), d.declared_seats.into());
    o.insert("votes".into(), d.votes.into());
    o.insert("leader".into(), opt_str(&d.leader));
    Value::Object(o)
}

/* ----------------------------- helpers ----------------------------- */

#[inline]
fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}

fn opt_str(s: &Option<String>) -> Value {
    s.clone().map(Value::String).unwrap_or(Value::Null)
}
