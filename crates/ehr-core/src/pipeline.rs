//! End-to-end run: prepare every source, merge, validate, write.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, info_span};

use ehr_model::Table;
use ehr_report::{DiagnosticsReporter, TableSnapshot, write_table_csv};
use ehr_schema::Registry;
use ehr_transform::{JoinStats, JoinStep, merge_tables};
use ehr_validate::{UniquenessReport, validate_unique_keys};

use crate::error::{PipelineError, Stage};
use crate::options::PipelineOptions;
use crate::prepare::{PreparedSource, SourceSummary, prepare_source};

/// Stage label used for the snapshot of the merged dataset.
pub const FINAL_STAGE: &str = "final";

#[derive(Debug)]
pub struct PipelineOutput {
    pub table: Table,
    /// In registry order.
    pub sources: Vec<SourceSummary>,
    /// In merge-plan order.
    pub joins: Vec<JoinStats>,
    pub uniqueness: UniquenessReport,
    pub output_path: Option<PathBuf>,
}

/// Prepares every registry source, in parallel when requested.
///
/// The result keeps registry order either way. The first failing source
/// aborts the run.
pub fn prepare_sources(
    registry: &Registry,
    options: &PipelineOptions,
) -> Result<Vec<PreparedSource>, PipelineError> {
    if options.parallel {
        registry
            .sources()
            .par_iter()
            .map(|spec| prepare_source(spec, options))
            .collect()
    } else {
        registry
            .sources()
            .iter()
            .map(|spec| prepare_source(spec, options))
            .collect()
    }
}

/// Runs the whole pipeline.
///
/// The merged dataset is written only after the key uniqueness check passes,
/// so a failed run never leaves a partial or invalid output behind.
pub fn run_pipeline(
    registry: &Registry,
    options: &PipelineOptions,
    reporter: &mut dyn DiagnosticsReporter,
) -> Result<PipelineOutput, PipelineError> {
    let span = info_span!(
        "pipeline",
        raw_dir = %options.raw_dir.display(),
        parallel = options.parallel
    );
    let _guard = span.enter();
    let start = Instant::now();
    info!(sources = registry.sources().len(), "preparing sources");

    let prepared = prepare_sources(registry, options)?;

    let mut sources = Vec::with_capacity(prepared.len());
    let mut tables: BTreeMap<String, Table> = BTreeMap::new();
    for source in prepared {
        for (stage, snapshot) in &source.snapshots {
            reporter.report(stage.as_str(), snapshot);
        }
        sources.push(source.summary);
        tables.insert(source.name, source.table);
    }

    let plan = registry.merge_plan();
    let (merged, joins) = info_span!("merge").in_scope(|| {
        let merge_start = Instant::now();
        let base = tables
            .remove(&plan.base)
            .ok_or_else(|| PipelineError::MissingSource(plan.base.clone()))?;
        let mut steps = Vec::with_capacity(plan.joins.len());
        for join in &plan.joins {
            let table = tables
                .remove(&join.source)
                .ok_or_else(|| PipelineError::MissingSource(join.source.clone()))?;
            steps.push(JoinStep::new(table, join.on.clone()));
        }
        let (merged, joins) =
            merge_tables(base, steps).map_err(|source| PipelineError::Transform {
                stage: Stage::Merge,
                source_name: plan.base.clone(),
                source,
            })?;
        info!(
            rows = merged.height(),
            columns = merged.width(),
            joins = joins.len(),
            duration_ms = merge_start.elapsed().as_millis(),
            "merge complete"
        );
        Ok::<_, PipelineError>((merged, joins))
    })?;

    let uniqueness = info_span!("validate")
        .in_scope(|| validate_unique_keys(&merged, &plan.key))
        .map_err(PipelineError::Validation)?;

    let output_path = match &options.output_path {
        Some(path) => {
            info_span!("write", path = %path.display())
                .in_scope(|| write_table_csv(&merged, path))
                .map_err(PipelineError::Output)?;
            Some(path.clone())
        }
        None => None,
    };

    if options.diagnostics {
        reporter.report(
            FINAL_STAGE,
            &TableSnapshot::capture(&merged, options.sample_rows),
        );
    }

    info!(
        rows = merged.height(),
        columns = merged.width(),
        duration_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(PipelineOutput {
        table: merged,
        sources,
        joins,
        uniqueness,
        output_path,
    })
}
