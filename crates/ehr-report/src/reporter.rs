//! Pluggable sinks for table diagnostics.
//!
//! The pipeline hands every sink a stage label and a [`TableSnapshot`]; what
//! happens next (logging, printing, collecting) is up to the sink.

use std::io::Write;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table as ComfyTable};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::snapshot::TableSnapshot;

pub trait DiagnosticsReporter {
    fn report(&mut self, stage: &str, snapshot: &TableSnapshot);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl DiagnosticsReporter for NullReporter {
    fn report(&mut self, _stage: &str, _snapshot: &TableSnapshot) {}
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingReporter {
    pub entries: Vec<(String, TableSnapshot)>,
}

impl CollectingReporter {
    pub fn stages(&self) -> Vec<&str> {
        self.entries.iter().map(|(stage, _)| stage.as_str()).collect()
    }

    pub fn find(&self, stage: &str, table: &str) -> Option<&TableSnapshot> {
        self.entries
            .iter()
            .find(|(s, snapshot)| s == stage && snapshot.table == table)
            .map(|(_, snapshot)| snapshot)
    }
}

impl DiagnosticsReporter for CollectingReporter {
    fn report(&mut self, stage: &str, snapshot: &TableSnapshot) {
        self.entries.push((stage.to_string(), snapshot.clone()));
    }
}

/// Emits snapshots as structured `tracing` events.
///
/// Sample rows are only logged when `include_samples` is set, since they
/// carry patient-level values.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter {
    pub include_samples: bool,
}

impl DiagnosticsReporter for TracingReporter {
    fn report(&mut self, stage: &str, snapshot: &TableSnapshot) {
        info!(
            stage,
            table = %snapshot.table,
            rows = snapshot.rows,
            columns = snapshot.columns.len(),
            missing = snapshot.total_missing(),
            duplicate_rows = snapshot.duplicate_rows,
            "table snapshot"
        );
        for nulls in snapshot.null_counts.iter().filter(|n| n.missing > 0) {
            debug!(
                stage,
                table = %snapshot.table,
                column = %nulls.column,
                missing = nulls.missing,
                "missing values"
            );
        }
        let sample = if self.include_samples {
            snapshot.sample.clone()
        } else {
            snapshot.redacted().sample
        };
        debug!(stage, table = %snapshot.table, sample = ?sample, "sample rows");
    }
}

/// Prints human-readable snapshot tables.
pub struct ConsoleReporter<W: Write> {
    out: W,
    include_samples: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, include_samples: bool) -> Self {
        Self {
            out,
            include_samples,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_snapshot(&mut self, stage: &str, snapshot: &TableSnapshot) -> std::io::Result<()> {
        let (rows, columns) = snapshot.shape();
        writeln!(
            self.out,
            "=== {} [{stage}] ===",
            snapshot.table.to_uppercase()
        )?;
        writeln!(self.out, "Shape: ({rows}, {columns})")?;
        writeln!(self.out, "Columns: {}", snapshot.columns.join(", "))?;

        let mut nulls = ComfyTable::new();
        nulls.set_header(vec![Cell::new("Column"), Cell::new("Missing")]);
        apply_style(&mut nulls);
        for entry in &snapshot.null_counts {
            nulls.add_row(vec![
                Cell::new(&entry.column),
                Cell::new(entry.missing).set_alignment(CellAlignment::Right),
            ]);
        }
        writeln!(self.out, "{nulls}")?;
        writeln!(self.out, "Duplicate rows: {}", snapshot.duplicate_rows)?;

        let sample = if self.include_samples {
            snapshot.sample.clone()
        } else {
            snapshot.redacted().sample
        };
        if !sample.is_empty() {
            let mut rows_table = ComfyTable::new();
            rows_table.set_header(snapshot.columns.clone());
            apply_style(&mut rows_table);
            for row in sample {
                rows_table.add_row(row);
            }
            writeln!(self.out, "Sample rows:")?;
            writeln!(self.out, "{rows_table}")?;
        }
        writeln!(self.out, "{}", "-".repeat(50))
    }
}

impl<W: Write> DiagnosticsReporter for ConsoleReporter<W> {
    fn report(&mut self, stage: &str, snapshot: &TableSnapshot) {
        if let Err(error) = self.write_snapshot(stage, snapshot) {
            warn!(stage, table = %snapshot.table, %error, "failed to print table snapshot");
        }
    }
}

/// Writes one JSON object per snapshot, for machine consumption.
pub struct JsonLinesReporter<W: Write> {
    out: W,
    include_samples: bool,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    stage: &'a str,
    snapshot: &'a TableSnapshot,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W, include_samples: bool) -> Self {
        Self {
            out,
            include_samples,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DiagnosticsReporter for JsonLinesReporter<W> {
    fn report(&mut self, stage: &str, snapshot: &TableSnapshot) {
        let redacted;
        let snapshot = if self.include_samples {
            snapshot
        } else {
            redacted = snapshot.redacted();
            &redacted
        };
        let line = JsonLine { stage, snapshot };
        let result = serde_json::to_writer(&mut self.out, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(error) = result {
            warn!(stage, table = %snapshot.table, %error, "failed to write table snapshot");
        }
    }
}

fn apply_style(table: &mut ComfyTable) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}
