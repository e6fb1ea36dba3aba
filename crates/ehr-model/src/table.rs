#![deny(unsafe_code)]

use std::fmt;

use crate::{CellValue, ColumnName, ColumnType, ModelError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: ColumnName,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: ColumnName, kind: ColumnType) -> Self {
        Self { name, kind }
    }

    pub fn text(name: ColumnName) -> Self {
        Self::new(name, ColumnType::Text)
    }
}

/// Cells of one record, aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// Projection of a row onto key columns. Missing cells project to `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyTuple(Vec<Option<String>>);

impl KeyTuple {
    pub fn project(row: &Row, indices: &[usize]) -> Self {
        Self(
            indices
                .iter()
                .map(|&idx| row.get(idx).and_then(CellValue::key_part))
                .collect(),
        )
    }

    pub fn parts(&self) -> &[Option<String>] {
        &self.0
    }
}

impl fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (pos, part) in self.0.iter().enumerate() {
            if pos > 0 {
                f.write_str(", ")?;
            }
            match part {
                Some(value) => f.write_str(value)?,
                None => f.write_str("<missing>")?,
            }
        }
        f.write_str(")")
    }
}

/// An ordered sequence of rows sharing one column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, rejecting it when its arity differs from the schema.
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<(), ModelError> {
        if cells.len() != self.columns.len() {
            return Err(ModelError::RowArity {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: cells.len(),
            });
        }
        self.rows.push(Row::new(cells));
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &ColumnName> {
        self.columns.iter().map(|column| &column.name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name.as_str() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ModelError> {
        self.column_index(name)
            .ok_or_else(|| ModelError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Resolves key columns to positions, failing on the first unknown name.
    pub fn key_indices(&self, key: &[ColumnName]) -> Result<Vec<usize>, ModelError> {
        key.iter()
            .map(|name| self.require_column(name.as_str()))
            .collect()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Key tuples for every row, in row order.
    pub fn key_tuples(&self, key: &[ColumnName]) -> Result<Vec<KeyTuple>, ModelError> {
        let indices = self.key_indices(key)?;
        Ok(self
            .rows
            .iter()
            .map(|row| KeyTuple::project(row, &indices))
            .collect())
    }

    /// Number of missing cells per column, in column order.
    pub fn null_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.columns.len()];
        for row in &self.rows {
            for (idx, cell) in row.cells.iter().enumerate() {
                if cell.is_missing() {
                    counts[idx] += 1;
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_names;

    fn encounters() -> Table {
        let names = column_names(["patient_id", "encounter_id", "encounter_class"]).unwrap();
        let mut table = Table::new("encounter", names.into_iter().map(Column::text).collect());
        table
            .push_row(vec!["P1".into(), "E1".into(), CellValue::Missing])
            .unwrap();
        table
            .push_row(vec!["P1".into(), "E2".into(), "wellness".into()])
            .unwrap();
        table
    }

    #[test]
    fn rejects_rows_with_wrong_arity() {
        let mut table = encounters();
        let err = table.push_row(vec!["P2".into()]).unwrap_err();
        assert_eq!(
            err,
            ModelError::RowArity {
                table: "encounter".to_string(),
                expected: 3,
                actual: 1
            }
        );
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn projects_key_tuples() {
        let table = encounters();
        let key = column_names(["patient_id", "encounter_class"]).unwrap();
        let tuples = table.key_tuples(&key).unwrap();
        assert_eq!(tuples[0].parts(), &[Some("P1".to_string()), None]);
        assert_eq!(tuples[0].to_string(), "(P1, <missing>)");
        assert_ne!(tuples[0], tuples[1]);
    }

    #[test]
    fn unknown_key_column_is_an_error() {
        let table = encounters();
        let key = column_names(["visit_id"]).unwrap();
        assert!(matches!(
            table.key_indices(&key),
            Err(ModelError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn counts_missing_cells_per_column() {
        assert_eq!(encounters().null_counts(), vec![0, 0, 1]);
    }
}
