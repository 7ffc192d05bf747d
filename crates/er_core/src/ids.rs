//! crates/er_core/src/ids.rs
//! Reference-table token ids (parties, alliances, geography).
//! Deterministic, ASCII-only, strict shapes; no I/O.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const TOKEN_MAX_LEN: usize = 64;

/// Fallback party id for every unrecognized raw party key.
pub const OTHER_PARTY: &str = "other";
/// Catch-all alliance for independents, unaligned and unknown parties.
pub const OTHERS_ALLIANCE: &str = "others";

/// Token: ^[A-Za-z0-9_.:-]{1,64}$ (ASCII only)
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let bs = s.as_bytes();
    if bs.is_empty() || bs.len() > TOKEN_MAX_LEN {
        return false;
    }
    bs.iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
}

macro_rules! token_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if is_valid_token(s) { Ok($name(s.to_owned())) } else { Err(CoreError::InvalidToken) }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                if is_valid_token(&value) { Ok($name(value)) } else { Err(CoreError::InvalidToken) }
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(v: $name) -> String { v.0 }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str { &self.0 }
        }
    }
}

token_newtype!(
    /// Stable short party key, e.g. `bnp`.
    PartyId
);
token_newtype!(
    /// Alliance grouping key, e.g. `jamaat`.
    AllianceId
);
token_newtype!(
    /// Electoral seat key, e.g. `dhaka-10`.
    ConstituencyId
);
token_newtype!(
    /// Administrative division key.
    DivisionId
);
token_newtype!(
    /// Administrative district key.
    DistrictId
);

impl PartyId {
    /// The fallback bucket every unknown party key resolves to.
    #[inline]
    pub fn other() -> Self {
        PartyId(OTHER_PARTY.to_owned())
    }

    #[inline]
    pub fn is_other(&self) -> bool {
        self.0 == OTHER_PARTY
    }
}

impl AllianceId {
    /// The catch-all alliance bucket.
    #[inline]
    pub fn others() -> Self {
        AllianceId(OTHERS_ALLIANCE.to_owned())
    }

    #[inline]
    pub fn is_others(&self) -> bool {
        self.0 == OTHERS_ALLIANCE
    }
}
