//! crates/er_core/src/entities.rs
//! Reference entities (parties, alliances, geography, constants) and the raw
//! write-path tally record. Plain data; lookups live in `er_engine::reference`.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::{AllianceId, ConstituencyId, DistrictId, DivisionId, PartyId};

/* -------------------------------------------------------------------------- */
/*                               Reference tables                              */
/* -------------------------------------------------------------------------- */

/// Immutable party record. `color` is carried through untouched for the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Party {
    pub id: PartyId,
    pub display_name: String,
    pub short_name: String,
    pub color: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub alliance_id: Option<AllianceId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_independent: bool,
    /// Extra free-text spellings accepted by key normalization.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alliance {
    pub id: AllianceId,
    pub display_name: String,
    pub color: String,
}

/// Fixed national constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ElectionConstants {
    pub total_seats: u32,
    pub required_majority: u32,
    pub total_registered_voters: u64,
}

impl Default for ElectionConstants {
    fn default() -> Self {
        Self { total_seats: 300, required_majority: 151, total_registered_voters: 0 }
    }
}

impl ElectionConstants {
    /// `total_seats > 0` and `1 <= required_majority <= total_seats`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total_seats == 0 {
            return Err(CoreError::DomainOutOfRange("total_seats"));
        }
        if self.required_majority == 0 || self.required_majority > self.total_seats {
            return Err(CoreError::DomainOutOfRange("required_majority"));
        }
        Ok(())
    }
}

/* -------------------------------- Geography -------------------------------- */

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geography {
    #[cfg_attr(feature = "serde", serde(default))]
    pub divisions: Vec<Division>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub districts: Vec<District>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub constituencies: Vec<Constituency>,
}

/// One electoral seat. `number` is the national seat number (1..=total_seats).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constituency {
    pub id: ConstituencyId,
    pub number: u16,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub registered_voters: Option<u64>,
}

impl Geography {
    /// Iterate `(division, district, constituency)` in reference order.
    pub fn iter_constituencies(&self) -> impl Iterator<Item = (&Division, &District, &Constituency)> {
        self.divisions.iter().flat_map(|dv| {
            dv.districts
                .iter()
                .flat_map(move |ds| ds.constituencies.iter().map(move |c| (dv, ds, c)))
        })
    }

    pub fn constituency_count(&self) -> usize {
        self.iter_constituencies().count()
    }
}

/* -------------------------------------------------------------------------- */
/*                              Write-path input                               */
/* -------------------------------------------------------------------------- */

/// Counting progress of one constituency. Only `Completed` yields a binding winner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResultStatus {
    #[default]
    Pending,
    Partial,
    Completed,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::Partial => "partial",
            ResultStatus::Completed => "completed",
        }
    }
}

impl core::str::FromStr for ResultStatus {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ResultStatus::Pending),
            "partial" => Ok(ResultStatus::Partial),
            "completed" => Ok(ResultStatus::Completed),
            _ => Err(CoreError::InvalidStatus),
        }
    }
}

impl core::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vote count as it arrives from the outside world: JSON numbers may be
/// negative or fractional and must be rejected, not coerced.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawCount {
    Integer(i64),
    Fractional(f64),
}

impl RawCount {
    /// Accept non-negative integers only. A fractional value with a zero
    /// fraction (e.g. `120.0` from a JS client) is accepted.
    pub fn to_votes(self) -> Result<u64, CoreError> {
        match self {
            RawCount::Integer(n) if n < 0 => Err(CoreError::NegativeCount),
            RawCount::Integer(n) => Ok(n as u64),
            RawCount::Fractional(f) if f.is_nan() => Err(CoreError::NonIntegerCount),
            RawCount::Fractional(f) if f < 0.0 => Err(CoreError::NegativeCount),
            RawCount::Fractional(f) if !f.is_finite() || f.fract() != 0.0 || f > u64::MAX as f64 => {
                Err(CoreError::NonIntegerCount)
            }
            RawCount::Fractional(f) => Ok(f as u64),
        }
    }
}

impl From<i64> for RawCount {
    fn from(v: i64) -> Self {
        RawCount::Integer(v)
    }
}

/// Raw per-constituency tally as supplied by the data-access collaborator.
/// Keys are free text; `constituency_id` is checked at the normalizer boundary.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawTally {
    pub constituency_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ResultStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub votes: BTreeMap<String, RawCount>,
}

impl RawTally {
    pub fn new(constituency_id: impl Into<String>, status: ResultStatus) -> Self {
        Self { constituency_id: constituency_id.into(), status, votes: BTreeMap::new() }
    }

    /// Builder helper; a repeated key overwrites, as a JSON object would.
    pub fn vote(mut self, party_key: impl Into<String>, votes: i64) -> Self {
        self.votes.insert(party_key.into(), RawCount::Integer(votes));
        self
    }
}

/* -------------------------------------------------------------------------- */
/*                           Built-in reference tables                         */
/* -------------------------------------------------------------------------- */

/// Built-in Bangladesh national election tables, used when a reference file
/// omits a section.
pub mod builtin {
    use super::*;

    fn party(
        id: &str,
        display_name: &str,
        short_name: &str,
        color: &str,
        alliance: Option<&str>,
        is_independent: bool,
        aliases: &[&str],
    ) -> Party {
        Party {
            id: PartyId::try_from(id).unwrap_or_else(|_| PartyId::other()),
            display_name: display_name.to_owned(),
            short_name: short_name.to_owned(),
            color: color.to_owned(),
            alliance_id: alliance.and_then(|a| AllianceId::try_from(a).ok()),
            is_independent,
            aliases: aliases.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    pub fn parties() -> Vec<Party> {
        vec![
            party("bnp", "Bangladesh Nationalist Party", "BNP", "#006a4e", Some("bnp"), false, &[]),
            party("al", "Bangladesh Awami League", "AL", "#1e8449", None, false, &["Awami League", "BAL"]),
            party("jamaat", "Bangladesh Jamaat-e-Islami", "Jamaat", "#2e7d32", Some("jamaat"), false, &["Jamaat-e-Islami", "BJI"]),
            party("jp", "Jatiya Party (Ershad)", "JP", "#c0392b", None, false, &["Jatiya Party"]),
            party("ncp", "National Citizen Party", "NCP", "#e67e22", Some("jamaat"), false, &[]),
            party("independent", "Independent", "IND", "#7f8c8d", None, true, &["Independent Candidate"]),
            party("other", "Other", "OTH", "#95a5a6", None, false, &["Others"]),
        ]
    }

    pub fn alliances() -> Vec<Alliance> {
        let a = |id: &str, name: &str, color: &str| Alliance {
            id: AllianceId::try_from(id).unwrap_or_else(|_| AllianceId::others()),
            display_name: name.to_owned(),
            color: color.to_owned(),
        };
        vec![
            a("bnp", "BNP-led Alliance", "#006a4e"),
            a("jamaat", "Jamaat-led Alliance", "#2e7d32"),
            a("others", "Others", "#95a5a6"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_count_rejects_negative_and_fractional() {
        assert_eq!(RawCount::Integer(42).to_votes(), Ok(42));
        assert_eq!(RawCount::Integer(-1).to_votes(), Err(CoreError::NegativeCount));
        assert_eq!(RawCount::Fractional(120.0).to_votes(), Ok(120));
        assert_eq!(RawCount::Fractional(1.5).to_votes(), Err(CoreError::NonIntegerCount));
        assert_eq!(RawCount::Fractional(-0.5).to_votes(), Err(CoreError::NegativeCount));
        assert_eq!(RawCount::Fractional(f64::NAN).to_votes(), Err(CoreError::NonIntegerCount));
        assert_eq!(RawCount::Fractional(f64::INFINITY).to_votes(), Err(CoreError::NonIntegerCount));
    }

    #[test]
    fn constants_domain() {
        assert!(ElectionConstants::default().validate().is_ok());
        let bad = ElectionConstants { required_majority: 301, ..Default::default() };
        assert_eq!(bad.validate(), Err(CoreError::DomainOutOfRange("required_majority")));
        let zero = ElectionConstants { total_seats: 0, ..Default::default() };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn status_parse() {
        assert_eq!(" Completed ".parse::<ResultStatus>(), Ok(ResultStatus::Completed));
        assert!("final".parse::<ResultStatus>().is_err());
        assert_eq!(ResultStatus::default(), ResultStatus::Pending);
    }

    #[test]
    fn builtin_tables_are_well_formed() {
        let parties = builtin::parties();
        assert!(parties.iter().any(|p| p.id.is_other()));
        let ind = parties.iter().find(|p| p.id.as_str() == "independent").unwrap();
        assert!(ind.is_independent && ind.alliance_id.is_none());
        assert!(builtin::alliances().iter().any(|a| a.id.is_others()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn raw_tally_from_json() {
        let t: RawTally = serde_json::from_str(
            r#"{"constituency_id":"dhaka-1","status":"partial","votes":{"BNP":10,"al":2.5,"jp":-3}}"#,
        )
        .unwrap();
        assert_eq!(t.status, ResultStatus::Partial);
        assert_eq!(t.votes["BNP"], RawCount::Integer(10));
        assert_eq!(t.votes["al"], RawCount::Fractional(2.5));
        assert_eq!(t.votes["jp"], RawCount::Integer(-3));

        let bare: RawTally = serde_json::from_str(r#"{"constituency_id":"dhaka-2"}"#).unwrap();
        assert_eq!(bare.status, ResultStatus::Pending);
        assert!(bare.votes.is_empty());
    }
}
