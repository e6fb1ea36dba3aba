//! CLI argument definitions for `ehr-merge`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use ehr_core::{DEFAULT_OUTPUT_PATH, DEFAULT_RAW_DIR, DEFAULT_SAMPLE_ROWS};

pub const DEFAULT_FEATURES_PATH: &str = "data/processed/features.csv";

#[derive(Parser)]
#[command(
    name = "ehr-merge",
    version,
    about = "Merge raw EHR extracts into one row per patient encounter",
    long_about = "Merge raw EHR extracts into one row per patient encounter.\n\n\
                  Each source is loaded, imputed and deduplicated or aggregated,\n\
                  then left-joined onto the encounter table. The merged dataset is\n\
                  written only if every (patient, encounter) key is unique."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include patient-level values in diagnostics samples and logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline and write the merged dataset.
    Merge(MergeArgs),

    /// List the sources of the schema registry.
    Sources(SourcesArgs),

    /// Derive model features from a merged dataset.
    Features(FeaturesArgs),
}

#[derive(Parser)]
pub struct MergeArgs {
    /// Directory holding the raw CSV extracts.
    #[arg(value_name = "RAW_DIR", default_value = DEFAULT_RAW_DIR)]
    pub raw_dir: PathBuf,

    /// Path of the merged CSV.
    #[arg(long = "output", value_name = "PATH", default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Registry TOML file to use instead of the built-in one.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Prepare sources in parallel.
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Skip the table snapshots taken after every stage.
    #[arg(long = "no-check")]
    pub no_check: bool,

    /// Where table snapshots go.
    #[arg(long = "report", value_enum, default_value = "console")]
    pub report: ReportArg,

    /// Rows included in each snapshot sample.
    #[arg(long = "sample-rows", value_name = "N", default_value_t = DEFAULT_SAMPLE_ROWS)]
    pub sample_rows: usize,

    /// Validate the merged dataset without writing it.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct SourcesArgs {
    /// Registry TOML file to use instead of the built-in one.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Listing format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ListFormatArg,
}

#[derive(Parser)]
pub struct FeaturesArgs {
    /// Merged dataset produced by `merge`.
    #[arg(value_name = "INPUT", default_value = DEFAULT_OUTPUT_PATH)]
    pub input: PathBuf,

    /// Path of the feature CSV.
    #[arg(value_name = "OUTPUT", default_value = DEFAULT_FEATURES_PATH)]
    pub output: PathBuf,

    /// Reference date for ages (YYYY-MM-DD, default today).
    #[arg(long = "as-of", value_name = "DATE")]
    pub as_of: Option<NaiveDate>,
}

/// Diagnostics sink choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportArg {
    /// Print snapshot tables to stdout.
    Console,
    /// Emit snapshots as log events.
    Log,
    /// Print one JSON object per snapshot to stdout.
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormatArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
