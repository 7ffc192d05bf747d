// crates/er_cli/src/main.rs
//
// Exit codes, typed error mapping, logging setup and the three subcommands.
// Stdout carries data only (JSON or rendered text); diagnostics go to stderr.

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const IO: u8 = 4;
    pub const ENGINE: u8 = 5;
}

use std::path::Path;
use std::process::ExitCode;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate, AggregateArgs, CliError, Command, InputArgs, NormalizeArgs, RenderFormat};
use er_engine::{normalize_result, NormalizeError, Registry};
use er_io::{canonical_json, loader, IoError};
use er_pipeline::{build_registry, run_snapshot, validate_snapshot, PipelineError, PipelineOutputs, ValidationReport};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Bad input data: JSON shape, failed snapshot validation, invalid counts.
    Validation(String),
    /// Read/write/path failures.
    Io(String),
    /// Inconsistent reference tables or arithmetic overflow.
    Engine(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Engine(m) => write!(f, "engine: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_and_validate() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("er: error: {e}");
            let rc = match e {
                CliError::NotFound(_) => exitcodes::IO,
                CliError::NonLocalPath(_) => exitcodes::VALIDATION,
            };
            return ExitCode::from(rc);
        }
    };

    init_tracing(cli.verbose);

    let res = match &cli.command {
        Command::Validate(a) => run_validate(a, cli.quiet),
        Command::Aggregate(a) => run_aggregate(a, cli.quiet),
        Command::Normalize(a) => run_normalize(a),
    };

    match res {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            eprintln!("er: error: {e}");
            ExitCode::from(map_error(&e))
        }
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with --verbose.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .init();
}

fn map_error(e: &MainError) -> u8 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::Io(_) => IO,
        MainError::Engine(_) => ENGINE,
    }
}

// ------------------------------------------------------------------------------------------------
// Subcommands
// ------------------------------------------------------------------------------------------------

/// Prints the full report (errors and warnings) as JSON; exit 2 when it fails.
fn run_validate(a: &InputArgs, quiet: bool) -> Result<(), MainError> {
    let registry = load_registry(&a.reference)?;
    let tallies = loader::load_tallies(&a.tallies).map_err(map_io_err)?;
    let report = validate_snapshot(&tallies, &registry);
    print_json(&report)?;

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if !quiet {
        eprintln!("validate: {} tallies, {errors} error(s), {warnings} warning(s)", tallies.len());
    }
    if report.pass {
        Ok(())
    } else {
        Err(MainError::Validation(format!("{errors} error(s) in snapshot")))
    }
}

fn run_aggregate(a: &AggregateArgs, quiet: bool) -> Result<(), MainError> {
    let as_of = a.as_of.unwrap_or_else(Utc::now);
    let registry = load_registry(&a.input.reference)?;
    let tallies = loader::load_tallies(&a.input.tallies).map_err(map_io_err)?;

    let outs = run_snapshot(registry.clone(), tallies, as_of).map_err(map_pipeline_err)?;
    for w in outs.validation.warnings() {
        warn!(code = w.code, "{}", w.message);
    }

    if let Some(dir) = &a.out {
        write_artifacts(dir, &outs)?;
    }

    match a.render {
        Some(fmt) => render_report(fmt, &outs, &registry, a.out.as_deref())?,
        // Nothing else requested: the summary goes to stdout.
        None if a.out.is_none() => {
            let bytes = canonical_json::to_canonical_bytes(&outs.aggregation).map_err(map_io_err)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        None => {}
    }

    if !quiet {
        let s = &outs.aggregation.summary;
        eprintln!(
            "aggregate: {}/{} seats declared, {} votes, snapshot {}",
            s.declared_seats,
            s.total_seats,
            s.total_votes_cast,
            er_io::hasher::short_hex(&outs.snapshot_digest)
        );
        if let Some(dir) = &a.out {
            eprintln!("aggregate: artifacts written to {}", dir.display());
        }
    }
    Ok(())
}

fn run_normalize(a: &NormalizeArgs) -> Result<(), MainError> {
    let registry = load_registry(&a.reference)?;
    let raw = loader::load_raw_tally(&a.tally).map_err(map_io_err)?;
    let result = normalize_result(&raw, &registry).map_err(map_normalize_err)?;
    debug!(constituency = %result.constituency_id, total = result.total_votes, "normalized");
    print_json(&result)
}

// ------------------------------------------------------------------------------------------------
// Artifacts & rendering
// ------------------------------------------------------------------------------------------------

fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    canonical_json::write_canonical_file(&out_dir.join("summary.json"), &outs.aggregation).map_err(map_io_err)?;
    canonical_json::write_canonical_file(&out_dir.join("results.json"), &outs.results).map_err(map_io_err)?;
    canonical_json::write_canonical_file(&out_dir.join("divisions.json"), &outs.divisions).map_err(map_io_err)?;
    Ok(())
}

fn render_report(
    fmt: RenderFormat,
    outs: &PipelineOutputs,
    registry: &Registry,
    out_dir: Option<&Path>,
) -> Result<(), MainError> {
    let model = er_report::build_model(&outs.aggregation, &outs.divisions, registry);
    let (text, file) = match fmt {
        RenderFormat::Json => (
            er_report::render_json(&model).map_err(|e| MainError::Engine(e.to_string()))?,
            "report.json",
        ),
        RenderFormat::Text => (er_report::render_text(&model), "report.txt"),
    };
    match out_dir {
        Some(dir) => {
            let path = dir.join(file);
            std::fs::write(&path, text).map_err(|e| MainError::Io(format!("write {}: {e}", path.display())))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Helpers / error mapping
// ------------------------------------------------------------------------------------------------

fn load_registry(path: &Path) -> Result<Registry, MainError> {
    let data = loader::load_reference(path).map_err(map_io_err)?;
    build_registry(data).map_err(map_pipeline_err)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), MainError> {
    let s = serde_json::to_string_pretty(value).map_err(|e| MainError::Engine(format!("serialize: {e}")))?;
    println!("{s}");
    Ok(())
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Json { .. } | IoError::Reference(_) => MainError::Validation(e.to_string()),
        IoError::Read { .. } | IoError::Write { .. } | IoError::NonLocal(_) => MainError::Io(e.to_string()),
    }
}

fn map_normalize_err(e: NormalizeError) -> MainError {
    match e {
        NormalizeError::Overflow(_) => MainError::Engine(e.to_string()),
        _ => MainError::Validation(e.to_string()),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Io(e) => map_io_err(e),
        PipelineError::Reference(e) => MainError::Engine(format!("reference data: {e}")),
        PipelineError::Normalize(e) => map_normalize_err(e),
        PipelineError::Validation(report) => MainError::Validation(describe_failures(&report)),
    }
}

/// One line per error, in report order.
fn describe_failures(report: &ValidationReport) -> String {
    let lines: Vec<String> = report.errors().map(|i| format!("{}: {}", i.code, i.message)).collect();
    format!("snapshot rejected\n  {}", lines.join("\n  "))
}
