use std::collections::BTreeSet;

use serde::Serialize;

use ehr_model::{KeyTuple, Table};

/// Placeholder used when row-level values must not be emitted.
pub const REDACTED_VALUE: &str = "[REDACTED]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnNulls {
    pub column: String,
    pub missing: usize,
}

/// Point-in-time description of a table: shape, columns, missing cells,
/// duplicate rows and the first few rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub null_counts: Vec<ColumnNulls>,
    /// Rows identical in every column to an earlier row.
    pub duplicate_rows: usize,
    pub sample: Vec<Vec<String>>,
}

impl TableSnapshot {
    pub fn capture(table: &Table, sample_rows: usize) -> Self {
        let columns: Vec<String> = table.column_names().map(ToString::to_string).collect();
        let null_counts = columns
            .iter()
            .zip(table.null_counts())
            .map(|(column, missing)| ColumnNulls {
                column: column.clone(),
                missing,
            })
            .collect();

        let all: Vec<usize> = (0..table.width()).collect();
        let mut seen = BTreeSet::new();
        let duplicate_rows = table
            .rows
            .iter()
            .filter(|row| !seen.insert(KeyTuple::project(row, &all)))
            .count();

        let sample = table
            .rows
            .iter()
            .take(sample_rows)
            .map(|row| row.cells.iter().map(ToString::to_string).collect())
            .collect();

        Self {
            table: table.name.clone(),
            rows: table.height(),
            columns,
            null_counts,
            duplicate_rows,
            sample,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn total_missing(&self) -> usize {
        self.null_counts.iter().map(|nulls| nulls.missing).sum()
    }

    /// Copy with every sampled value replaced by [`REDACTED_VALUE`].
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for row in &mut copy.sample {
            for value in row.iter_mut() {
                *value = REDACTED_VALUE.to_string();
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehr_model::{CellValue, Column, column_names};

    fn table() -> Table {
        let names = column_names(["patient_id", "gender"]).unwrap();
        let mut table = Table::new("patient", names.into_iter().map(Column::text).collect());
        table.push_row(vec!["P1".into(), "F".into()]).unwrap();
        table.push_row(vec!["P1".into(), "F".into()]).unwrap();
        table.push_row(vec!["P2".into(), CellValue::Missing]).unwrap();
        table
    }

    #[test]
    fn captures_shape_nulls_duplicates_and_sample() {
        let snapshot = TableSnapshot::capture(&table(), 2);
        assert_eq!(snapshot.shape(), (3, 2));
        assert_eq!(snapshot.null_counts[1].missing, 1);
        assert_eq!(snapshot.total_missing(), 1);
        assert_eq!(snapshot.duplicate_rows, 1);
        assert_eq!(snapshot.sample, vec![vec!["P1", "F"], vec!["P1", "F"]]);
    }

    #[test]
    fn redaction_hides_sample_values_only() {
        let snapshot = TableSnapshot::capture(&table(), 3).redacted();
        assert!(snapshot.sample.iter().flatten().all(|v| v == REDACTED_VALUE));
        assert_eq!(snapshot.rows, 3);
        assert_eq!(snapshot.sample[2].len(), 2);
    }
}
