// crates/er_engine/src/lib.rs
//! er_engine — the pure result aggregation engine.
//!
//! Three layers, each depending only on the one below:
//! 1. [`reference`]: immutable party / alliance / geography tables and key normalization
//! 2. [`normalize`]: raw tally → canonical [`ConstituencyResult`]
//! 3. [`aggregate`] (+ [`geography`]): results → seat counts, alliance roll-ups, summary
//!
//! No I/O, no clocks, no shared state. Callers pass the `as_of` timestamp in.
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod geography;
pub mod normalize;
pub mod reference;

pub use aggregate::{aggregate, AllianceSeatCount, Aggregation, ElectionSummary, SeatCount};
pub use geography::{aggregate_by_division, DivisionSummary};
pub use normalize::{derive_result, normalize_result, validate_tally, ConstituencyResult, NormalizeError};
pub use reference::{ReferenceError, Registry};

// Core types callers need alongside the engine surface.
pub use er_core::{
    AllianceId, ConstituencyId, ElectionConstants, Party, PartyId, RawCount, RawTally, ResultStatus,
};
