//! Per-source preparation: load, impute, dedupe or aggregate.

use std::time::Instant;

use tracing::{debug, info, info_span};

use ehr_ingest::{LoadedSource, load_source};
use ehr_model::Table;
use ehr_report::TableSnapshot;
use ehr_schema::{KeyRole, SourceSpec};
use ehr_transform::{TransformError, aggregate_child, dedupe_by_primary_key, impute_missing};

use crate::error::{PipelineError, Stage};
use crate::options::PipelineOptions;

/// Row accounting for one prepared source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub source: String,
    pub role: &'static str,
    pub raw_rows: usize,
    pub prepared_rows: usize,
    pub columns: usize,
    pub imputed_cells: usize,
    /// Rows removed by primary-key dedupe, or folded away by aggregation.
    pub dropped_rows: usize,
}

/// A source ready to be merged, with the snapshots taken along the way.
#[derive(Debug)]
pub struct PreparedSource {
    pub name: String,
    pub table: Table,
    pub summary: SourceSummary,
    pub snapshots: Vec<(Stage, TableSnapshot)>,
}

struct Snapshots {
    enabled: bool,
    sample_rows: usize,
    taken: Vec<(Stage, TableSnapshot)>,
}

impl Snapshots {
    fn new(options: &PipelineOptions) -> Self {
        Self {
            enabled: options.diagnostics,
            sample_rows: options.sample_rows,
            taken: Vec::new(),
        }
    }

    fn take(&mut self, stage: Stage, table: &Table) {
        if self.enabled {
            self.taken
                .push((stage, TableSnapshot::capture(table, self.sample_rows)));
        }
    }
}

fn transform_error(stage: Stage, spec: &SourceSpec, source: TransformError) -> PipelineError {
    PipelineError::Transform {
        stage,
        source_name: spec.name.clone(),
        source,
    }
}

/// Loads one source and brings it into merge shape.
///
/// Primary-keyed sources are deduplicated on their key; foreign-keyed
/// sources are aggregated to one row per key. Every source is imputed first.
pub fn prepare_source(
    spec: &SourceSpec,
    options: &PipelineOptions,
) -> Result<PreparedSource, PipelineError> {
    let span = info_span!("prepare", source = %spec.name, role = spec.key.label());
    let _guard = span.enter();
    let start = Instant::now();
    let mut snapshots = Snapshots::new(options);

    let LoadedSource { mut table, summary } =
        load_source(spec, options.raw_dir()).map_err(|source| PipelineError::Ingest {
            stage: Stage::Load,
            source_name: spec.name.clone(),
            source,
        })?;
    let raw_rows = summary.rows;
    snapshots.take(Stage::Load, &table);

    let imputed_cells = impute_missing(&mut table, &spec.impute_overrides());
    debug!(source = %spec.name, imputed_cells, "impute complete");
    snapshots.take(Stage::Impute, &table);

    let table = match &spec.key {
        KeyRole::Primary(_) => {
            let dropped = dedupe_by_primary_key(&mut table, spec.primary_key())
                .map_err(|e| transform_error(Stage::Dedupe, spec, e))?;
            debug!(source = %spec.name, dropped, "dedupe complete");
            snapshots.take(Stage::Dedupe, &table);
            table
        }
        KeyRole::Foreign(key) => {
            let aggregated = aggregate_child(table, key, &spec.value_columns())
                .map_err(|e| transform_error(Stage::Aggregate, spec, e))?;
            snapshots.take(Stage::Aggregate, &aggregated);
            aggregated
        }
    };

    let summary = SourceSummary {
        source: spec.name.clone(),
        role: spec.key.label(),
        raw_rows,
        prepared_rows: table.height(),
        columns: table.width(),
        imputed_cells,
        dropped_rows: raw_rows - table.height(),
    };
    info!(
        source = %summary.source,
        raw_rows = summary.raw_rows,
        prepared_rows = summary.prepared_rows,
        duration_ms = start.elapsed().as_millis(),
        "source prepared"
    );
    Ok(PreparedSource {
        name: spec.name.clone(),
        table,
        summary,
        snapshots: snapshots.taken,
    })
}
