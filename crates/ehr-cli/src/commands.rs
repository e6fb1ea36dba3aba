use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::{info, info_span};

use ehr_core::{PipelineOptions, PipelineOutput, run_pipeline};
use ehr_features::{FeatureOptions, FeatureSummary, derive_features};
use ehr_ingest::read_text_table;
use ehr_model::ColumnName;
use ehr_report::{
    ConsoleReporter, DiagnosticsReporter, JsonLinesReporter, NullReporter, TracingReporter,
    write_table_csv,
};
use ehr_schema::{Registry, default_registry};

use crate::cli::{FeaturesArgs, ListFormatArg, MergeArgs, ReportArg, SourcesArgs};
use crate::summary::registry_table;

pub fn load_registry(schema: Option<&Path>) -> Result<Registry> {
    match schema {
        Some(path) => Registry::from_toml_path(path)
            .with_context(|| format!("load registry {}", path.display())),
        None => default_registry().context("load built-in registry"),
    }
}

pub fn merge_options(args: &MergeArgs) -> PipelineOptions {
    let output = (!args.dry_run).then(|| args.output.clone());
    PipelineOptions::new(&args.raw_dir)
        .with_output(output)
        .with_parallel(args.parallel)
        .with_diagnostics(!args.no_check)
        .with_sample_rows(args.sample_rows)
}

/// Table samples stay redacted unless `log_data` is set.
fn reporter<W: Write + 'static>(
    kind: ReportArg,
    log_data: bool,
    out: W,
) -> Box<dyn DiagnosticsReporter> {
    match kind {
        ReportArg::Console => Box::new(ConsoleReporter::new(out, log_data)),
        ReportArg::Log => Box::new(TracingReporter {
            include_samples: log_data,
        }),
        ReportArg::Json => Box::new(JsonLinesReporter::new(out, log_data)),
    }
}

pub fn run_merge(args: &MergeArgs, log_data: bool) -> Result<PipelineOutput> {
    let registry = load_registry(args.schema.as_deref())?;
    let options = merge_options(args);
    let mut sink: Box<dyn DiagnosticsReporter> = if options.diagnostics {
        reporter(args.report, log_data, io::stdout())
    } else {
        Box::new(NullReporter)
    };
    let output = run_pipeline(&registry, &options, sink.as_mut())?;
    Ok(output)
}

#[derive(Serialize)]
struct SourceListing<'a> {
    name: &'a str,
    file: String,
    role: &'a str,
    key: Vec<&'a str>,
    columns: Vec<ColumnListing<'a>>,
}

#[derive(Serialize)]
struct ColumnListing<'a> {
    raw: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

pub fn sources_json(registry: &Registry) -> Result<String> {
    let listing: Vec<SourceListing<'_>> = registry
        .sources()
        .iter()
        .map(|source| SourceListing {
            name: &source.name,
            file: source.file.display().to_string(),
            role: source.key.label(),
            key: source.key.columns().iter().map(ColumnName::as_str).collect(),
            columns: source
                .columns
                .iter()
                .map(|c| ColumnListing {
                    raw: &c.raw,
                    name: c.name.as_str(),
                    kind: c.kind.as_str(),
                })
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&listing).context("serialize registry listing")
}

pub fn run_sources(args: &SourcesArgs) -> Result<()> {
    let registry = load_registry(args.schema.as_deref())?;
    match args.format {
        ListFormatArg::Table => println!("{}", registry_table(&registry)),
        ListFormatArg::Json => println!("{}", sources_json(&registry)?),
    }
    Ok(())
}

pub fn run_features(args: &FeaturesArgs) -> Result<FeatureSummary> {
    let span = info_span!("features", input = %args.input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let table = read_text_table(&args.input, "merged")
        .with_context(|| format!("read {}", args.input.display()))?;
    let options = FeatureOptions {
        as_of: args.as_of.unwrap_or_else(|| Local::now().date_naive()),
    };
    let (features, summary) = derive_features(&table, &options)
        .with_context(|| format!("derive features from {}", args.input.display()))?;
    write_table_csv(&features, &args.output)
        .with_context(|| format!("write {}", args.output.display()))?;
    info!(
        output = %args.output.display(),
        rows = summary.output_rows,
        duration_ms = start.elapsed().as_millis(),
        "feature dataset written"
    );
    Ok(summary)
}
