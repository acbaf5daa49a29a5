//! edgeloop-bench: CLI tool for outline reconstruction experiments and diagnostics.
//!
//! Loads a board description from JSON, rebuilds the board or footprint
//! outline with configurable tolerances, and prints a diagnostics report.
//! Useful for:
//!
//! - Finding the gap or crossing that makes an outline fall back
//! - Tuning the chaining tolerance for sloppy drawings
//! - Comparing arc error bounds against resulting vertex counts
//! - Rendering the result (or its problem points) to SVG
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin edgeloop-bench -- [OPTIONS] <BOARD_JSON>
//! ```
//!
//! Set `RUST_LOG=edgeloop_outline=debug` to trace the reconstruction.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use edgeloop_outline::{
    Board, OutlineConfig, OutlineDiagnostics, PolygonWithHoles, build_board_outline,
    build_footprint_outline,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Outline reconstruction experiments and diagnostics for edgeloop.
///
/// Rebuilds the board (or first footprint) outline from a JSON board
/// description and prints what was found.
#[derive(Parser)]
#[command(name = "edgeloop-bench", version)]
struct Cli {
    /// Path to the board description (JSON).
    board_path: PathBuf,

    /// Which outline to rebuild.
    #[arg(long, value_enum, default_value_t = Mode::Board)]
    mode: Mode,

    /// Maximum Manhattan distance at which two endpoints join.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Maximum chord error when tessellating arcs, circles and curves.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_MAX_ARC_ERROR)]
    max_arc_error: f64,

    /// Half-size added to a zero-area fallback box.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_DEGENERATE_INFLATION)]
    degenerate_inflation: f64,

    /// Fraction of width/height added around the footprint fallback box.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_FOOTPRINT_MARGIN_RATIO)]
    footprint_margin_ratio: f64,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Mark discontinuities and intersections in the SVG output.
    #[arg(long)]
    diagnostic_svg: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output the result as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when the board outline fell back to a bounding
    /// box, or the footprint outline fell back or self-intersects.
    #[arg(long)]
    strict: bool,

    /// Full outline config as a JSON string.
    ///
    /// When provided, all other tolerance flags are ignored. The JSON must
    /// be a valid `OutlineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Outline selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// The board outline from its edge-cuts items.
    Board,
    /// The outline of the first footprint on the board.
    Footprint,
}

/// Build an [`OutlineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<OutlineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(OutlineConfig {
        tolerance: cli.tolerance,
        max_arc_error: cli.max_arc_error,
        degenerate_inflation: cli.degenerate_inflation,
        footprint_margin_ratio: cli.footprint_margin_ratio,
    })
}

/// Outcome of one run, whichever mode produced it.
#[derive(Serialize)]
struct RunOutcome {
    polygon: PolygonWithHoles,
    success: bool,
    /// `--strict` turns this outcome into exit status 2.
    rejected: bool,
    verdict: String,
    diagnostics: OutlineDiagnostics,
}

fn run_once(board: &Board, config: &OutlineConfig, mode: Mode) -> Result<RunOutcome, String> {
    match mode {
        Mode::Board => {
            let outline = build_board_outline(board, config).map_err(|e| e.to_string())?;
            let verdict = match outline.fallback {
                None if outline.self_intersecting => "self-intersecting outline".to_owned(),
                None => "closed outline".to_owned(),
                Some(reason) => format!("fallback rectangle ({reason:?})"),
            };
            Ok(RunOutcome {
                polygon: outline.polygon,
                success: outline.success,
                rejected: outline.fallback.is_some(),
                verdict,
                diagnostics: outline.diagnostics,
            })
        }
        Mode::Footprint => {
            let outline = build_footprint_outline(board, config).map_err(|e| e.to_string())?;
            let verdict = if outline.self_intersecting {
                format!("{:?} (self-intersecting)", outline.resolution)
            } else {
                format!("{:?}", outline.resolution)
            };
            let rejected = !outline.is_reconstructed() || outline.self_intersecting;
            Ok(RunOutcome {
                success: !rejected,
                rejected,
                verdict,
                polygon: outline.polygon,
                diagnostics: outline.diagnostics,
            })
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let board_json = match std::fs::read_to_string(&cli.board_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.board_path.display());
            return ExitCode::FAILURE;
        }
    };
    let board: Board = match serde_json::from_str(&board_json) {
        Ok(board) => board,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.board_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Board: {} ({} items, {} footprints)",
        cli.board_path.display(),
        board.items.len(),
        board.footprints.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut outcomes = Vec::with_capacity(cli.runs);
    for _ in 0..cli.runs {
        match run_once(&board, &config, cli.mode) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                eprintln!("Reconstruction error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    let Some(outcome) = outcomes.first() else {
        return ExitCode::FAILURE;
    };

    if cli.json {
        match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", outcome.diagnostics.report());
        println!();
        println!("Result: {}", outcome.verdict);
    }

    if let Some(ref svg_path) = cli.svg {
        write_svg(&cli, &config, outcome, svg_path);
    }

    if cli.runs > 1 {
        print_multi_run_summary(&outcomes);
    }

    if cli.strict && outcome.rejected {
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn write_svg(cli: &Cli, config: &OutlineConfig, outcome: &RunOutcome, svg_path: &Path) {
    let title = cli
        .board_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("board");
    let config_json = serde_json::to_string(config).ok();
    let metadata = edgeloop_export::SvgMetadata {
        title: Some(title),
        description: Some(&outcome.verdict),
        config_json: config_json.as_deref(),
    };
    let svg = if cli.diagnostic_svg {
        edgeloop_export::to_diagnostic_svg(&outcome.polygon, &outcome.diagnostics, &metadata)
    } else {
        edgeloop_export::to_svg(&outcome.polygon, &metadata)
    };
    match std::fs::write(svg_path, &svg) {
        Ok(()) => {
            eprintln!(
                "SVG written to {} ({} bytes)",
                svg_path.display(),
                svg.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
        }
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&OutlineDiagnostics) -> Option<std::time::Duration>;

/// Print mean stage durations across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(outcomes: &[RunOutcome]) {
    println!();
    println!("Summary ({} runs)\n{}", outcomes.len(), "=".repeat(60));
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Chain Walk", |d| d.walk.as_ref().map(|s| s.duration)),
        ("Intersection Scan", |d| {
            d.intersection_scan.as_ref().map(|s| s.duration)
        }),
    ];

    for (name, extractor) in stage_extractors {
        let durations: Vec<f64> = outcomes
            .iter()
            .filter_map(|o| extractor(&o.diagnostics))
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if durations.is_empty() {
            continue;
        }

        let mean = durations.iter().sum::<f64>() / durations.len() as f64;
        println!("{name:<24} {mean:>10.3}ms");
    }
}
