//! Missing-value imputation.

use std::collections::BTreeMap;

use ehr_model::{CellValue, ColumnName, Table};
use tracing::debug;

/// Replaces every missing cell with the column's override value if one is
/// given, otherwise with the type default (`0`, `1900-01-01`, `"Unknown"`).
///
/// Returns the number of cells filled. Re-running on an imputed table fills
/// nothing.
pub fn impute_missing(table: &mut Table, overrides: &BTreeMap<ColumnName, CellValue>) -> usize {
    let fills: Vec<CellValue> = table
        .columns
        .iter()
        .map(|column| {
            overrides
                .get(&column.name)
                .cloned()
                .unwrap_or_else(|| column.kind.default_fill())
        })
        .collect();

    let mut filled = vec![0usize; fills.len()];
    for row in &mut table.rows {
        for (idx, cell) in row.cells.iter_mut().enumerate() {
            if cell.is_missing() {
                *cell = fills[idx].clone();
                filled[idx] += 1;
            }
        }
    }

    for (column, count) in table.columns.iter().zip(&filled) {
        if *count > 0 {
            debug!(table = %table.name, column = %column.name, filled = count, "imputed column");
        }
    }
    filled.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehr_model::{Column, ColumnType, SENTINEL_DATE};

    fn patients() -> Table {
        let mut table = Table::new(
            "patient",
            vec![
                Column::text(ColumnName::new("patient_id").unwrap()),
                Column::new(ColumnName::new("birthdate").unwrap(), ColumnType::Date),
                Column::new(ColumnName::new("income").unwrap(), ColumnType::Numeric),
                Column::text(ColumnName::new("marital_status").unwrap()),
            ],
        );
        table
            .push_row(vec![
                "P1".into(),
                CellValue::Missing,
                CellValue::Missing,
                CellValue::Missing,
            ])
            .unwrap();
        table
            .push_row(vec!["P2".into(), SENTINEL_DATE.into(), 10.0.into(), "M".into()])
            .unwrap();
        table
    }

    #[test]
    fn fills_type_defaults() {
        let mut table = patients();
        let filled = impute_missing(&mut table, &BTreeMap::new());
        assert_eq!(filled, 3);
        assert_eq!(table.value(0, "birthdate"), Some(&CellValue::Date(SENTINEL_DATE)));
        assert_eq!(table.value(0, "income"), Some(&CellValue::Number(0.0)));
        assert_eq!(table.value(0, "marital_status"), Some(&CellValue::text("Unknown")));
        assert_eq!(table.value(1, "marital_status"), Some(&CellValue::text("M")));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut table = patients();
        let overrides =
            BTreeMap::from([(ColumnName::new("marital_status").unwrap(), CellValue::text("S"))]);
        impute_missing(&mut table, &overrides);
        assert_eq!(table.value(0, "marital_status"), Some(&CellValue::text("S")));
        assert_eq!(table.value(0, "income"), Some(&CellValue::Number(0.0)));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut table = patients();
        impute_missing(&mut table, &BTreeMap::new());
        let once = table.clone();
        assert_eq!(impute_missing(&mut table, &BTreeMap::new()), 0);
        assert_eq!(table, once);
    }
}
