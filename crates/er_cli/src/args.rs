// crates/er_cli/src/args.rs
//
// Deterministic, offline CLI argument surface.
//
// Rules:
// - No networked paths (reject any scheme:// like http/https/file)
// - Input files must exist and be regular files; --out may not exist yet
// - --as-of is RFC 3339; omitted means "now", which is the only clock read

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "er",
    version,
    disable_help_subcommand = true,
    about = "Offline, deterministic election results aggregation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level logs on stderr (RUST_LOG takes precedence when set).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Suppress non-essential stderr messages.
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Validate a tally snapshot against reference data; prints the report as JSON.
    Validate(InputArgs),
    /// Normalize, aggregate and roll up a snapshot.
    Aggregate(AggregateArgs),
    /// Normalize a single raw tally and print the canonical result.
    Normalize(NormalizeArgs),
}

#[derive(Debug, ClapArgs, Clone)]
pub struct InputArgs {
    /// Reference data JSON (parties, alliances, constants, geography).
    #[arg(long)]
    pub reference: PathBuf,
    /// Tally snapshot JSON (array, or object with a `tallies` array).
    #[arg(long)]
    pub tallies: PathBuf,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output directory for canonical artifacts (summary.json, results.json, divisions.json).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Human/report rendering; written to --out when given, else stdout.
    #[arg(long, value_enum)]
    pub render: Option<RenderFormat>,

    /// Timestamp recorded as `last_updated` (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_as_of)]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct NormalizeArgs {
    #[arg(long)]
    pub reference: PathBuf,
    /// One raw tally JSON object.
    #[arg(long)]
    pub tally: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Json,
    Text,
}

/// Errors surfaced by argument validation (after clap parsing).
/// Keep messages short/stable (handy for scripts/tests).
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// `--as-of` parser: RFC 3339 with any offset, normalized to UTC.
pub fn parse_as_of(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Cli, CliError> {
    validate(Cli::parse())
}

fn validate(mut cli: Cli) -> Result<Cli, CliError> {
    match &mut cli.command {
        Command::Validate(input) => check_inputs(input)?,
        Command::Aggregate(a) => {
            check_inputs(&mut a.input)?;
            if let Some(out) = a.out.take() {
                ensure_local_path(&out)?;
                a.out = Some(normalize_path(&out));
            }
        }
        Command::Normalize(n) => {
            ensure_local_exists(&n.reference, "--reference")?;
            ensure_local_exists(&n.tally, "--tally")?;
            n.reference = normalize_path(&n.reference);
            n.tally = normalize_path(&n.tally);
        }
    }
    Ok(cli)
}

fn check_inputs(input: &mut InputArgs) -> Result<(), CliError> {
    ensure_local_exists(&input.reference, "--reference")?;
    ensure_local_exists(&input.tallies, "--tallies")?;
    input.reference = normalize_path(&input.reference);
    input.tallies = normalize_path(&input.tallies);
    Ok(())
}

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

/// Ensure a path is local (no scheme) and exists as a regular file.
fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Best-effort normalization to an absolute path.
/// If canonicalize fails (e.g., path doesn't exist yet), join onto CWD.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
