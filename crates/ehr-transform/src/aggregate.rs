//! Collapsing one-to-many child records into one row per key.

use std::collections::{BTreeMap, BTreeSet};

use ehr_model::{CellValue, Column, ColumnName, KeyTuple, Table};
use tracing::debug;

use crate::TransformError;

/// Separator between distinct values in an aggregated summary.
pub const SUMMARY_SEPARATOR: &str = ", ";

struct Group {
    key_cells: Vec<CellValue>,
    values: Vec<BTreeSet<String>>,
}

/// Sorted, deduplicated, comma-joined summary of the non-missing values.
///
/// An input with no present values yields an empty string.
pub fn summarize<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let distinct: BTreeSet<String> = values.into_iter().filter_map(CellValue::key_part).collect();
    join_summary(&distinct)
}

fn join_summary(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
}

/// Groups `table` by `key` and reduces every value column to its summary.
///
/// The output has exactly one row per distinct key tuple, ordered by key,
/// with the key columns (input types) followed by the value columns
/// (text). Input row order has no influence on the result.
pub fn aggregate_child(
    table: Table,
    key: &[ColumnName],
    value_columns: &[ColumnName],
) -> Result<Table, TransformError> {
    if let Some(overlap) = value_columns.iter().find(|column| key.contains(column)) {
        return Err(TransformError::KeyValueOverlap {
            table: table.name.clone(),
            column: overlap.to_string(),
        });
    }
    let key_indices = table.key_indices(key)?;
    let value_indices = table.key_indices(value_columns)?;

    let mut groups: BTreeMap<KeyTuple, Group> = BTreeMap::new();
    for row in &table.rows {
        let tuple = KeyTuple::project(row, &key_indices);
        let group = groups.entry(tuple).or_insert_with(|| Group {
            key_cells: key_indices.iter().map(|&idx| row.cells[idx].clone()).collect(),
            values: vec![BTreeSet::new(); value_indices.len()],
        });
        for (slot, &idx) in group.values.iter_mut().zip(&value_indices) {
            if let Some(value) = row.cells[idx].key_part() {
                slot.insert(value);
            }
        }
    }

    let mut columns: Vec<Column> = key_indices
        .iter()
        .map(|&idx| table.columns[idx].clone())
        .collect();
    columns.extend(value_columns.iter().cloned().map(Column::text));

    let mut output = Table::new(table.name.clone(), columns);
    for group in groups.into_values() {
        let mut cells = group.key_cells;
        cells.extend(
            group
                .values
                .iter()
                .map(|values| CellValue::Text(join_summary(values))),
        );
        output.push_row(cells)?;
    }
    debug!(
        table = %output.name,
        input_rows = table.height(),
        groups = output.height(),
        "aggregated child table"
    );
    Ok(output)
}
