//! Reference data provider: immutable party / alliance / geography tables.
//!
//! Contract:
//! - Lookups return `Option` (explicit not-found), never panic.
//! - [`Registry::normalize_party_key`] is total: every raw key maps to *some*
//!   canonical id, unknown keys to the `other` bucket.
//! - [`Registry::alliance_of`] is total: independents, unaligned parties,
//!   unknown ids and dangling alliance references all land in `others`.

use std::collections::BTreeMap;

use er_core::{
    entities::builtin, Alliance, AllianceId, Constituency, ConstituencyId, CoreError, District,
    Division, ElectionConstants, Geography, Party, PartyId,
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("duplicate party id: {0}")]
    DuplicateParty(PartyId),
    #[error("duplicate alliance id: {0}")]
    DuplicateAlliance(AllianceId),
    #[error("duplicate constituency id: {0}")]
    DuplicateConstituency(ConstituencyId),
    #[error("duplicate constituency number: {0}")]
    DuplicateSeatNumber(u16),
    #[error("constants: {0}")]
    Constants(CoreError),
}

/// Position of a constituency inside the geography tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SeatPos {
    division: usize,
    district: usize,
    constituency: usize,
}

/// Loaded once, never mutated.
#[derive(Clone, Debug)]
pub struct Registry {
    parties: Vec<Party>,
    alliances: Vec<Alliance>,
    constants: ElectionConstants,
    geography: Geography,
    party_index: BTreeMap<PartyId, usize>,
    alliance_index: BTreeMap<AllianceId, usize>,
    /// folded key (id / display name / short name / alias) → party id
    key_index: BTreeMap<String, PartyId>,
    seat_index: BTreeMap<ConstituencyId, SeatPos>,
    number_index: BTreeMap<u16, ConstituencyId>,
}

/// Trim, collapse internal whitespace, lowercase.
pub fn fold_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Registry {
    pub fn new(
        parties: Vec<Party>,
        alliances: Vec<Alliance>,
        constants: ElectionConstants,
        geography: Geography,
    ) -> Result<Self, ReferenceError> {
        constants.validate().map_err(ReferenceError::Constants)?;

        let mut party_index = BTreeMap::new();
        for (i, p) in parties.iter().enumerate() {
            if party_index.insert(p.id.clone(), i).is_some() {
                return Err(ReferenceError::DuplicateParty(p.id.clone()));
            }
        }

        let mut alliance_index = BTreeMap::new();
        for (i, a) in alliances.iter().enumerate() {
            if alliance_index.insert(a.id.clone(), i).is_some() {
                return Err(ReferenceError::DuplicateAlliance(a.id.clone()));
            }
        }

        for p in &parties {
            if let Some(a) = &p.alliance_id {
                if !alliance_index.contains_key(a) && !a.is_others() {
                    warn!(party = %p.id, alliance = %a, "party references unknown alliance; grouped under others");
                }
            }
        }

        // Ids take precedence over names, names over short names, short names over aliases.
        let mut key_index: BTreeMap<String, PartyId> = BTreeMap::new();
        let passes: [fn(&Party) -> Vec<&str>; 4] = [
            |p| vec![p.id.as_str()],
            |p| vec![p.display_name.as_str()],
            |p| vec![p.short_name.as_str()],
            |p| p.aliases.iter().map(String::as_str).collect(),
        ];
        for pass in passes {
            for p in &parties {
                for k in pass(p) {
                    let folded = fold_key(k);
                    if folded.is_empty() {
                        continue;
                    }
                    key_index.entry(folded).or_insert_with(|| p.id.clone());
                }
            }
        }

        let mut seat_index = BTreeMap::new();
        let mut number_index = BTreeMap::new();
        for (di, dv) in geography.divisions.iter().enumerate() {
            for (si, ds) in dv.districts.iter().enumerate() {
                for (ci, c) in ds.constituencies.iter().enumerate() {
                    let pos = SeatPos { division: di, district: si, constituency: ci };
                    if seat_index.insert(c.id.clone(), pos).is_some() {
                        return Err(ReferenceError::DuplicateConstituency(c.id.clone()));
                    }
                    if number_index.insert(c.number, c.id.clone()).is_some() {
                        return Err(ReferenceError::DuplicateSeatNumber(c.number));
                    }
                }
            }
        }

        Ok(Self {
            parties,
            alliances,
            constants,
            geography,
            party_index,
            alliance_index,
            key_index,
            seat_index,
            number_index,
        })
    }

    /// Built-in national tables, default constants, empty geography.
    pub fn builtin() -> Self {
        let parties = builtin::parties();
        let alliances = builtin::alliances();
        Self::new(parties, alliances, ElectionConstants::default(), Geography::default())
            .unwrap_or_else(|e| unreachable!("built-in reference tables are consistent: {e}"))
    }

    /// Same tables, different constants / geography.
    pub fn with_constants(self, constants: ElectionConstants) -> Result<Self, ReferenceError> {
        Self::new(self.parties, self.alliances, constants, self.geography)
    }

    pub fn with_geography(self, geography: Geography) -> Result<Self, ReferenceError> {
        Self::new(self.parties, self.alliances, self.constants, geography)
    }

    /* ------------------------------- tables ------------------------------- */

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn alliances(&self) -> &[Alliance] {
        &self.alliances
    }

    pub fn constants(&self) -> &ElectionConstants {
        &self.constants
    }

    pub fn geography(&self) -> &Geography {
        &self.geography
    }

    /* ------------------------------- lookups ------------------------------ */

    pub fn party(&self, id: &PartyId) -> Option<&Party> {
        self.party_index.get(id).map(|&i| &self.parties[i])
    }

    pub fn alliance(&self, id: &AllianceId) -> Option<&Alliance> {
        self.alliance_index.get(id).map(|&i| &self.alliances[i])
    }

    pub fn is_known_party(&self, id: &PartyId) -> bool {
        self.party_index.contains_key(id)
    }

    /// Exact (folded) match only; `None` when the key is not recognized.
    pub fn match_party_key(&self, raw: &str) -> Option<&PartyId> {
        self.key_index.get(&fold_key(raw))
    }

    /// Canonical id for a free-text party key; unknown keys → `other`.
    pub fn normalize_party_key(&self, raw: &str) -> PartyId {
        match self.match_party_key(raw) {
            Some(id) => id.clone(),
            None => {
                debug!(raw_key = raw, "unrecognized party key; using fallback bucket");
                PartyId::other()
            }
        }
    }

    /// Route an already-canonical id: known ids pass through, others → `other`.
    pub fn resolve_party(&self, id: &PartyId) -> PartyId {
        if self.is_known_party(id) {
            id.clone()
        } else {
            debug!(party = %id, "unknown party id; routed to fallback bucket");
            PartyId::other()
        }
    }

    /// Alliance bucket for a party id. Total.
    pub fn alliance_of(&self, id: &PartyId) -> AllianceId {
        let Some(p) = self.party(id) else {
            return AllianceId::others();
        };
        if p.is_independent {
            return AllianceId::others();
        }
        match &p.alliance_id {
            Some(a) if self.alliance_index.contains_key(a) => a.clone(),
            _ => AllianceId::others(),
        }
    }

    /* ------------------------------ geography ----------------------------- */

    pub fn constituency(&self, id: &ConstituencyId) -> Option<(&Division, &District, &Constituency)> {
        let pos = self.seat_index.get(id)?;
        let dv = &self.geography.divisions[pos.division];
        let ds = &dv.districts[pos.district];
        Some((dv, ds, &ds.constituencies[pos.constituency]))
    }

    pub fn constituency_by_number(&self, number: u16) -> Option<&Constituency> {
        let id = self.number_index.get(&number)?;
        self.constituency(id).map(|(_, _, c)| c)
    }

    pub fn division_of(&self, id: &ConstituencyId) -> Option<&Division> {
        self.constituency(id).map(|(dv, _, _)| dv)
    }

    /// Index of the division in reference order.
    pub(crate) fn division_index_of(&self, id: &ConstituencyId) -> Option<usize> {
        self.seat_index.get(id).map(|p| p.division)
    }

    pub fn registered_voters(&self, id: &ConstituencyId) -> Option<u64> {
        self.constituency(id).and_then(|(_, _, c)| c.registered_voters)
    }
}
