#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line harness for the incident normalization pipeline.
//!
//! ```text
//! fire_response_cli detect <file> [--input-format csv|json]
//! fire_response_cli normalize <file> [--schema full-export] [--format <source>]
//! fire_response_cli stats <file> [--group-by priority|incident_type|responding_unit]
//! ```
//!
//! Output is JSON on stdout; logging goes to stderr via `RUST_LOG`.

mod input;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use clap::{Parser, Subcommand};
use fire_response_format::{
    NormalizeError, RandomIdGenerator, canonicalize, detect_format, parse_target_schema,
};
use fire_response_incident_models::{
    CanonicalIncident, RawRow, SourceFormat, TargetSchema,
};
use fire_response_metrics::{
    MetricField, NFPA_1710_TRAVEL_SECONDS, NFPA_1710_TURNOUT_SECONDS, ResponseTimeMetrics,
    ResponseTimeStatistics, StatisticsGroup, compliance_rate, compute_metrics,
    compute_statistics, compute_statistics_by,
};
use serde::Serialize;
use thiserror::Error;

use crate::input::{InputFormat, load_rows};

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading the input file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that couldn't be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The pipeline rejected the input.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// The input has no header row.
    #[error("Input contains no header row")]
    EmptyInput,

    /// `--input-format` wasn't given and the extension is unrecognized.
    #[error("Can't tell whether {path} is CSV or JSON; pass --input-format")]
    UnknownInputFormat {
        /// Path of the input file.
        path: String,
    },

    /// `--format` named an unknown source format.
    #[error("Unknown source format '{requested}' (expected one of: {expected})")]
    UnknownSourceFormat {
        /// The identifier given.
        requested: String,
        /// Comma-separated valid identifiers.
        expected: String,
    },

    /// `--group-by` named an unknown grouping.
    #[error("Unknown grouping '{requested}' (expected one of: {expected})")]
    UnknownGroup {
        /// The identifier given.
        requested: String,
        /// Comma-separated valid identifiers.
        expected: String,
    },
}

#[derive(Parser)]
#[command(
    name = "fire_response_cli",
    about = "Normalize fire/EMS incident exports and compute response-time statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected source format of an export
    Detect {
        /// CSV or JSON export
        path: PathBuf,
        /// Input layout (inferred from the extension when omitted)
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },
    /// Print canonical incidents as JSON
    Normalize {
        /// CSV or JSON export
        path: PathBuf,
        /// Target schema (response-times, unit-workload, call-mapping, full-export)
        #[arg(long, default_value = "full-export")]
        schema: String,
        /// Skip detection and map with this source format
        #[arg(long)]
        format: Option<String>,
        /// Input layout (inferred from the extension when omitted)
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },
    /// Print response-time statistics as JSON
    Stats {
        /// CSV or JSON export
        path: PathBuf,
        /// Also break statistics down by priority, `incident_type`, or `responding_unit`
        #[arg(long)]
        group_by: Option<String>,
        /// Skip detection and map with this source format
        #[arg(long)]
        format: Option<String>,
        /// Input layout (inferred from the extension when omitted)
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },
}

/// Fraction of incidents meeting NFPA 1710 benchmarks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Compliance {
    turnout_time: Option<f64>,
    travel_time: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    source_format: SourceFormat,
    incidents: usize,
    overall: ResponseTimeStatistics,
    nfpa_1710_compliance: Compliance,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<BTreeMap<String, ResponseTimeStatistics>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { path, input_format } => {
            let rows = load_rows(&path, input_format)?;
            let format = detect_format(&rows);
            println!("{format}");
        }
        Commands::Normalize {
            path,
            schema,
            format,
            input_format,
        } => {
            let schema = parse_target_schema(&schema)?;
            let rows = load_rows(&path, input_format)?;
            let (_, incidents) = run_pipeline(&rows, format.as_deref(), schema)?;
            println!("{}", serde_json::to_string_pretty(&incidents)?);
        }
        Commands::Stats {
            path,
            group_by,
            format,
            input_format,
        } => {
            let group = group_by.as_deref().map(parse_group).transpose()?;
            let report = stats_report(&path, input_format, format.as_deref(), group)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Detects (or takes the override for) the source format, then
/// canonicalizes every row.
fn run_pipeline(
    rows: &[RawRow],
    format_override: Option<&str>,
    schema: TargetSchema,
) -> Result<(SourceFormat, Vec<CanonicalIncident>), CliError> {
    let format = match format_override {
        Some(id) => parse_source_format(id)?,
        None => detect_format(rows),
    };
    log::info!("Mapping {} rows as {format} for {schema}", rows.len());
    let incidents = canonicalize(rows, format, schema, &mut RandomIdGenerator);
    Ok((format, incidents))
}

fn stats_report(
    path: &Path,
    input_format: Option<InputFormat>,
    format_override: Option<&str>,
    group: Option<StatisticsGroup>,
) -> Result<StatsReport, CliError> {
    let rows = load_rows(path, input_format)?;
    let (source_format, incidents) =
        run_pipeline(&rows, format_override, TargetSchema::ResponseTimes)?;
    let metrics: Vec<ResponseTimeMetrics> = incidents.iter().map(compute_metrics).collect();

    Ok(StatsReport {
        source_format,
        incidents: incidents.len(),
        overall: compute_statistics(&metrics),
        nfpa_1710_compliance: Compliance {
            turnout_time: compliance_rate(
                &metrics,
                MetricField::TurnoutTime,
                NFPA_1710_TURNOUT_SECONDS,
            ),
            travel_time: compliance_rate(
                &metrics,
                MetricField::TravelTime,
                NFPA_1710_TRAVEL_SECONDS,
            ),
        },
        groups: group.map(|g| compute_statistics_by(&incidents, g)),
    })
}

fn parse_source_format(id: &str) -> Result<SourceFormat, CliError> {
    SourceFormat::from_str(id.trim()).map_err(|_| CliError::UnknownSourceFormat {
        requested: id.to_string(),
        expected: SourceFormat::all()
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(", "),
    })
}

fn parse_group(id: &str) -> Result<StatisticsGroup, CliError> {
    StatisticsGroup::from_str(id.trim()).map_err(|_| CliError::UnknownGroup {
        requested: id.to_string(),
        expected: StatisticsGroup::all()
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(", "),
    })
}
