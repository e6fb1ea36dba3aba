//! Left outer joins that fold prepared tables into the merged dataset.

use std::collections::BTreeMap;

use ehr_model::{CellValue, ColumnName, KeyTuple, Table};
use tracing::debug;

use crate::TransformError;

/// One right-hand table and the key columns it is joined on.
#[derive(Debug)]
pub struct JoinStep {
    pub table: Table,
    pub on: Vec<ColumnName>,
}

impl JoinStep {
    pub fn new(table: Table, on: Vec<ColumnName>) -> Self {
        Self { table, on }
    }
}

/// Match statistics of one join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStats {
    pub right: String,
    pub left_rows: usize,
    pub matched_rows: usize,
    pub output_rows: usize,
}

/// Left outer join of `left` with `right` on `on`.
///
/// Every left row is kept. Right columns other than the join key are appended
/// in right-table order; they are filled from each matching right row, or with
/// [`CellValue::Missing`] when nothing matches. A left row that matches several
/// right rows is repeated once per match, in right-table order.
///
/// Unmatched cells stay [`CellValue::Missing`] in memory and are written as
/// empty fields (`""`) when the merged table is saved as CSV.
pub fn left_join(
    left: Table,
    right: &Table,
    on: &[ColumnName],
) -> Result<(Table, JoinStats), TransformError> {
    let left_indices = left.key_indices(on)?;
    let right_indices = right.key_indices(on)?;

    let attached: Vec<usize> = (0..right.width())
        .filter(|idx| !right_indices.contains(idx))
        .collect();
    for &idx in &attached {
        let name = &right.columns[idx].name;
        if left.column_index(name.as_str()).is_some() {
            return Err(TransformError::ColumnCollision {
                left: left.name.clone(),
                right: right.name.clone(),
                column: name.to_string(),
            });
        }
    }

    let mut index: BTreeMap<KeyTuple, Vec<usize>> = BTreeMap::new();
    for (pos, row) in right.rows.iter().enumerate() {
        index
            .entry(KeyTuple::project(row, &right_indices))
            .or_default()
            .push(pos);
    }

    let Table {
        name,
        mut columns,
        rows,
    } = left;
    let left_rows = rows.len();
    columns.extend(attached.iter().map(|&idx| right.columns[idx].clone()));
    let mut merged = Table::new(name, columns);

    let mut matched_rows = 0usize;
    for row in rows {
        let tuple = KeyTuple::project(&row, &left_indices);
        match index.get(&tuple) {
            Some(matches) => {
                matched_rows += 1;
                for &pos in matches {
                    let mut cells = row.cells.clone();
                    let right_row = &right.rows[pos];
                    cells.extend(attached.iter().map(|&idx| right_row.cells[idx].clone()));
                    merged.push_row(cells)?;
                }
            }
            None => {
                let mut cells = row.cells;
                cells.extend(attached.iter().map(|_| CellValue::Missing));
                merged.push_row(cells)?;
            }
        }
    }

    let stats = JoinStats {
        right: right.name.clone(),
        left_rows,
        matched_rows,
        output_rows: merged.height(),
    };
    debug!(
        left = %merged.name,
        right = %stats.right,
        left_rows = stats.left_rows,
        matched_rows = stats.matched_rows,
        output_rows = stats.output_rows,
        "left join"
    );
    Ok((merged, stats))
}

/// Applies the joins in order, each against the growing merged table.
/// With no joins the base table passes through unchanged.
pub fn merge_tables(
    base: Table,
    joins: Vec<JoinStep>,
) -> Result<(Table, Vec<JoinStats>), TransformError> {
    let mut stats = Vec::with_capacity(joins.len());
    let mut merged = base;
    for step in joins {
        let (next, step_stats) = left_join(merged, &step.table, &step.on)?;
        merged = next;
        stats.push(step_stats);
    }
    Ok((merged, stats))
}
