//! er_core — Core types, reference entities, raw tallies, ordering and rounding helpers.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! workspace (`er_engine`, `er_io`, `er_pipeline`, `er_report`, `er_cli`).
//!
//! - Token ids: `PartyId`, `AllianceId`, `ConstituencyId`, `DivisionId`, `DistrictId`
//! - Reference entities: `Party`, `Alliance`, `Geography`, `ElectionConstants`
//! - Write-path input: `RawTally` / `RawCount`, and `ResultStatus`
//! - Deterministic ordering helpers and integer-first percent helpers
//!
//! Serialization derives are gated behind the `serde` feature (on by default).

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod ids;
pub mod rounding;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidToken,
        InvalidStatus,
        NegativeCount,
        NonIntegerCount,
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::InvalidStatus => write!(f, "invalid status"),
                CoreError::NegativeCount => write!(f, "negative vote count"),
                CoreError::NonIntegerCount => write!(f, "non-integer vote count"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub use entities::{
    Alliance, Constituency, District, Division, ElectionConstants, Geography, Party, RawCount,
    RawTally, ResultStatus,
};
pub use errors::CoreError;
pub use ids::{AllianceId, ConstituencyId, DistrictId, DivisionId, PartyId};
