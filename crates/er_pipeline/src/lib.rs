//! er_pipeline — deterministic pipeline surface (load → validate → normalize → aggregate → roll-up)
//! plus the long-lived dashboard state used by the write path.
//!
//! This crate stays thin: JSON/hashing live in `er_io`, math in `er_engine`.

#![forbid(unsafe_code)]

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use er_engine::{Aggregation, ConstituencyResult, DivisionSummary, NormalizeError, ReferenceError, Registry};
use er_io::loader::{self, ReferenceData};
use er_io::IoError;
use serde::Serialize;
use tracing::info;

pub mod cache;
pub mod dashboard;
pub mod snapshot;
pub mod validate;

pub use cache::AggregateCache;
pub use dashboard::Dashboard;
pub use snapshot::Snapshot;
pub use validate::{validate_snapshot, EntityRef, Severity, ValidationIssue, ValidationReport};

/// Single error surface for the pipeline orchestration.
#[derive(Debug)]
pub enum PipelineError {
    Io(IoError),
    Reference(ReferenceError),
    /// Snapshot failed validation; the report lists every issue.
    Validation(ValidationReport),
    Normalize(NormalizeError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "io: {e}"),
            PipelineError::Reference(e) => write!(f, "reference: {e}"),
            PipelineError::Validation(r) => {
                let n = r.errors().count();
                write!(f, "validation failed with {n} error(s)")
            }
            PipelineError::Normalize(e) => write!(f, "normalize: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            PipelineError::Reference(e) => Some(e),
            PipelineError::Normalize(e) => Some(e),
            PipelineError::Validation(_) => None,
        }
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        PipelineError::Io(e)
    }
}

impl From<ReferenceError> for PipelineError {
    fn from(e: ReferenceError) -> Self {
        PipelineError::Reference(e)
    }
}

impl From<NormalizeError> for PipelineError {
    fn from(e: NormalizeError) -> Self {
        PipelineError::Normalize(e)
    }
}

/// Everything one run produces; the report/CLI layers render from this.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutputs {
    pub aggregation: Aggregation,
    pub divisions: Vec<DivisionSummary>,
    /// Constituency id order.
    pub results: Vec<ConstituencyResult>,
    /// Warnings only; a report with errors never reaches here.
    pub validation: ValidationReport,
    pub snapshot_digest: String,
}

/// Resolve loaded reference sections into an indexed registry.
pub fn build_registry(data: ReferenceData) -> Result<Registry, PipelineError> {
    Ok(Registry::new(data.parties, data.alliances, data.constants, data.geography)?)
}

/// Validate, normalize and aggregate a whole snapshot in one pass.
pub fn run_snapshot(
    registry: Registry,
    tallies: Vec<er_core::RawTally>,
    as_of: DateTime<Utc>,
) -> Result<PipelineOutputs, PipelineError> {
    let (mut dash, validation) = Dashboard::from_tallies(registry, tallies)?;
    let aggregation = dash.summary(as_of)?;
    let snapshot_digest = dash.snapshot().digest()?;
    info!(
        digest = %er_io::hasher::short_hex(&snapshot_digest),
        results = dash.snapshot().len(),
        warnings = validation.issues.len(),
        "snapshot aggregated"
    );
    Ok(PipelineOutputs {
        aggregation: (*aggregation).clone(),
        divisions: dash.divisions(),
        results: dash.results().cloned().collect(),
        validation,
        snapshot_digest,
    })
}

/// Load both inputs from disk, then [`run_snapshot`].
pub fn run_from_files(reference: &Path, tallies: &Path, as_of: DateTime<Utc>) -> Result<PipelineOutputs, PipelineError> {
    let registry = build_registry(loader::load_reference(reference)?)?;
    let tallies = loader::load_tallies(tallies)?;
    run_snapshot(registry, tallies, as_of)
}
