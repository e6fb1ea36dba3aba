#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use ehr_model::{CellValue, Column, ColumnName, Table};
use ehr_schema::SourceSpec;

use crate::error::IngestError;

/// Row and column counts of a freshly loaded source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub source: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug)]
pub struct LoadedSource {
    pub table: Table,
    pub summary: LoadSummary,
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

/// Maps each normalized header to its first position in the file.
fn header_positions(headers: &StringRecord) -> BTreeMap<String, usize> {
    let mut positions = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        positions.entry(normalize_header(header)).or_insert(idx);
    }
    positions
}

/// Short records are padded with missing fields; longer ones are rejected.
fn check_field_count(
    path: &Path,
    record: &StringRecord,
    record_number: u64,
    expected: usize,
) -> Result<(), IngestError> {
    if record.len() > expected {
        return Err(IngestError::TooManyFields {
            path: path.to_path_buf(),
            record: record_number,
            expected,
            actual: record.len(),
        });
    }
    Ok(())
}

fn open_reader(
    source_name: &str,
    path: &Path,
) -> Result<csv::Reader<File>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::SourceNotFound {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

/// Reads the file named by `spec` under `base_dir`, keeps only the declared
/// raw columns, and renames them to their canonical names.
///
/// Output columns follow declaration order. Empty fields load as
/// [`CellValue::Missing`]; nothing is imputed or deduplicated here.
pub fn load_source(spec: &SourceSpec, base_dir: &Path) -> Result<LoadedSource, IngestError> {
    let path = base_dir.join(&spec.file);
    let mut reader = open_reader(&spec.name, &path)?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError::csv(&path, e))?
        .clone();
    let positions = header_positions(&headers);

    let mut projection = Vec::with_capacity(spec.columns.len());
    for column in &spec.columns {
        let idx = positions
            .get(normalize_header(&column.raw).as_str())
            .copied()
            .ok_or_else(|| IngestError::SchemaMismatch {
                source_name: spec.name.clone(),
                path: path.clone(),
                column: column.raw.clone(),
            })?;
        projection.push(idx);
    }
    debug!(
        source = %spec.name,
        file_columns = headers.len(),
        projected = projection.len(),
        "projected declared columns"
    );

    let columns: Vec<Column> = spec.columns.iter().map(|c| c.column()).collect();
    let mut table = Table::new(&spec.name, columns);
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| IngestError::csv(&path, e))?;
        let record_number = (idx as u64) + 1;
        check_field_count(&path, &record, record_number, headers.len())?;
        let mut cells = Vec::with_capacity(projection.len());
        for (column, &field) in spec.columns.iter().zip(&projection) {
            let raw = record.get(field).unwrap_or("");
            let cell =
                CellValue::parse(raw, column.kind).map_err(|source| IngestError::InvalidValue {
                    path: path.clone(),
                    record: record_number,
                    column: column.raw.clone(),
                    source,
                })?;
            cells.push(cell);
        }
        table
            .push_row(cells)
            .map_err(|source| IngestError::InvalidValue {
                path: path.clone(),
                record: record_number,
                column: String::new(),
                source,
            })?;
    }

    if table.height() == 0 {
        warn!(source = %spec.name, path = %path.display(), "source has no records");
    }
    let summary = LoadSummary {
        source: spec.name.clone(),
        path,
        rows: table.height(),
        columns: table.width(),
    };
    info!(
        source = %summary.source,
        rows = summary.rows,
        columns = summary.columns,
        "source loaded"
    );
    Ok(LoadedSource { table, summary })
}

/// Reads every column of a CSV file as text, e.g. a previously merged dataset.
pub fn read_text_table(path: &Path, name: &str) -> Result<Table, IngestError> {
    let mut reader = open_reader(name, path)?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError::csv(path, e))?
        .clone();
    let mut columns = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let column_name =
            ColumnName::new(normalize_header(header)).map_err(|source| {
                IngestError::InvalidValue {
                    path: path.to_path_buf(),
                    record: 0,
                    column: format!("#{}", idx + 1),
                    source,
                }
            })?;
        columns.push(Column::text(column_name));
    }

    let mut table = Table::new(name, columns);
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| IngestError::csv(path, e))?;
        check_field_count(path, &record, (idx as u64) + 1, headers.len())?;
        let cells = (0..headers.len())
            .map(|pos| {
                let value = record.get(pos).unwrap_or("").trim();
                if value.is_empty() {
                    CellValue::Missing
                } else {
                    CellValue::text(value)
                }
            })
            .collect();
        table
            .push_row(cells)
            .map_err(|source| IngestError::InvalidValue {
                path: path.to_path_buf(),
                record: (idx as u64) + 1,
                column: String::new(),
                source,
            })?;
    }
    Ok(table)
}
