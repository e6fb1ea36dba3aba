//! Publishing tables as CSV.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use ehr_model::{CellValue, ColumnName, Table};

use crate::error::ReportError;

/// Writes the header and every row; missing cells become empty fields.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(table.column_names().map(ColumnName::as_str))?;
    for row in &table.rows {
        writer.write_record(row.cells.iter().map(CellValue::render))?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders a table as CSV text.
pub fn table_to_csv_string(table: &Table) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_table(&mut buffer, table)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn partial_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.partial"))
}

/// Writes `table` to `path` atomically: the data goes to a hidden sibling file
/// that is renamed into place only once fully written.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let partial = partial_path(path);
    let file = fs::File::create(&partial).map_err(|source| ReportError::Io {
        path: partial.clone(),
        source,
    })?;
    if let Err(source) = write_table(file, table) {
        let _ = fs::remove_file(&partial);
        return Err(ReportError::Csv {
            path: path.to_path_buf(),
            source,
        });
    }
    fs::rename(&partial, path).map_err(|source| {
        let _ = fs::remove_file(&partial);
        ReportError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "wrote table"
    );
    Ok(())
}
