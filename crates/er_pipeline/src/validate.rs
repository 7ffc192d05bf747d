//! crates/er_pipeline/src/validate.rs
//! Structural & semantic validation of a tally snapshot before any computation.
//! Deterministic outputs; pure integer reasoning; never mutates its input.
//!
//! Errors block the run (`pass == false`). Warnings are reported and the run
//! proceeds: unknown party keys fold into `other`, and tallies for seats the
//! geography does not list land in the unassigned division row.

use std::collections::BTreeMap;

use er_core::{ConstituencyId, CoreError, RawTally};
use er_engine::Registry;
use serde::Serialize;

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred (kept small & deterministic).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    /// Position in the input array; used when the id itself is unusable.
    Entry { index: usize },
    Constituency { id: String },
    PartyKey { constituency_id: String, key: String },
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
}

/// Deterministic report: pass = (no Error); ordering of issues is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Top-level entry point. `tallies` is the snapshot exactly as loaded, so
/// duplicate and malformed constituency ids are still visible here.
pub fn validate_snapshot(tallies: &[RawTally], registry: &Registry) -> ValidationReport {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    issues.extend(check_constituency_ids(tallies));
    issues.extend(check_counts(tallies));
    issues.extend(check_geography(tallies, registry));
    issues.extend(check_party_keys(tallies, registry));

    sort_issues_stably(&mut issues);

    ValidationReport {
        pass: !issues.iter().any(|i| i.severity == Severity::Error),
        issues,
    }
}

// ------------------------------------------------------------------------------------------------
// Checks
// ------------------------------------------------------------------------------------------------

/// Errors:
/// - "Tally.EmptyConstituencyId" when the id is blank
/// - "Tally.InvalidConstituencyId" when the id is not a token
/// - "Tally.DuplicateConstituency" when two entries name the same seat
fn check_constituency_ids(tallies: &[RawTally]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut first_seen: BTreeMap<ConstituencyId, usize> = BTreeMap::new();

    for (index, t) in tallies.iter().enumerate() {
        let raw = t.constituency_id.trim();
        if raw.is_empty() {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Tally.EmptyConstituencyId",
                message: format!("entry {index} has no constituency id"),
                where_: EntityRef::Entry { index },
            });
            continue;
        }
        let Ok(id) = raw.parse::<ConstituencyId>() else {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Tally.InvalidConstituencyId",
                message: format!("entry {index}: {raw:?} is not a valid constituency id"),
                where_: EntityRef::Entry { index },
            });
            continue;
        };
        if let Some(first) = first_seen.get(&id) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Tally.DuplicateConstituency",
                message: format!("entry {index} repeats constituency {id} (first at entry {first})"),
                where_: EntityRef::Constituency { id: id.to_string() },
            });
        } else {
            first_seen.insert(id, index);
        }
    }
    issues
}

/// Errors:
/// - "Tally.NegativeVotes"
/// - "Tally.NonIntegerVotes" (fractional, NaN or infinite)
fn check_counts(tallies: &[RawTally]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for t in tallies {
        for (key, count) in &t.votes {
            let (code, what) = match count.to_votes() {
                Ok(_) => continue,
                Err(CoreError::NegativeCount) => ("Tally.NegativeVotes", "negative"),
                Err(_) => ("Tally.NonIntegerVotes", "non-integer"),
            };
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code,
                message: format!("{what} count for {key:?} in {}", t.constituency_id),
                where_: EntityRef::PartyKey {
                    constituency_id: t.constituency_id.clone(),
                    key: key.clone(),
                },
            });
        }
    }
    issues
}

/// Warning "Tally.UnknownConstituency": id is well-formed but the geography,
/// when one is configured, does not list it.
fn check_geography(tallies: &[RawTally], registry: &Registry) -> Vec<ValidationIssue> {
    if registry.geography().constituency_count() == 0 {
        return Vec::new();
    }
    tallies
        .iter()
        .filter_map(|t| t.constituency_id.trim().parse::<ConstituencyId>().ok())
        .filter(|id| registry.constituency(id).is_none())
        .map(|id| ValidationIssue {
            severity: Severity::Warning,
            code: "Tally.UnknownConstituency",
            message: format!("constituency {id} is not in the reference geography"),
            where_: EntityRef::Constituency { id: id.to_string() },
        })
        .collect()
}

/// Warning "Tally.UnknownPartyKey": the key matches no party id, name,
/// short name or alias and will be counted under `other`.
fn check_party_keys(tallies: &[RawTally], registry: &Registry) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for t in tallies {
        for key in t.votes.keys() {
            if registry.match_party_key(key).is_some() {
                continue;
            }
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "Tally.UnknownPartyKey",
                message: format!("party key {key:?} in {} is unknown; counted as other", t.constituency_id),
                where_: EntityRef::PartyKey {
                    constituency_id: t.constituency_id.clone(),
                    key: key.clone(),
                },
            });
        }
    }
    issues
}

// ------------------------------------------------------------------------------------------------
// Utilities
// ------------------------------------------------------------------------------------------------

/// Severity first (errors on top), then code, location, message.
fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}
