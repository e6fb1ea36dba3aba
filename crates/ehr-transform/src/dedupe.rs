use std::collections::BTreeSet;

use ehr_model::{ColumnName, KeyTuple, Table};

use crate::TransformError;

/// Drops rows whose primary-key tuple was already seen, keeping the first
/// occurrence and the relative order of retained rows.
///
/// Without a primary key this is a no-op. Returns the number of dropped rows.
pub fn dedupe_by_primary_key(
    table: &mut Table,
    primary_key: Option<&[ColumnName]>,
) -> Result<usize, TransformError> {
    let Some(key) = primary_key else {
        return Ok(0);
    };
    let indices = table.key_indices(key)?;
    let before = table.height();
    let mut seen = BTreeSet::new();
    table
        .rows
        .retain(|row| seen.insert(KeyTuple::project(row, &indices)));
    Ok(before - table.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehr_model::{CellValue, Column, column_names};

    fn encounters(rows: &[(&str, &str, &str)]) -> Table {
        let names = column_names(["patient_id", "encounter_id", "encounter_class"]).unwrap();
        let mut table = Table::new("encounter", names.into_iter().map(Column::text).collect());
        for (patient, encounter, class) in rows {
            table
                .push_row(vec![(*patient).into(), (*encounter).into(), (*class).into()])
                .unwrap();
        }
        table
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut table = encounters(&[
            ("P1", "E1", "wellness"),
            ("P1", "E2", "ambulatory"),
            ("P1", "E1", "inpatient"),
            ("P2", "E1", "wellness"),
        ]);
        let key = column_names(["patient_id", "encounter_id"]).unwrap();
        let dropped = dedupe_by_primary_key(&mut table, Some(&key)).unwrap();
        assert_eq!(dropped, 1);
        let classes: Vec<&CellValue> = table.rows.iter().map(|row| &row.cells[2]).collect();
        assert_eq!(
            classes,
            [
                &CellValue::text("wellness"),
                &CellValue::text("ambulatory"),
                &CellValue::text("wellness")
            ]
        );
    }

    #[test]
    fn no_primary_key_is_a_no_op() {
        let mut table = encounters(&[("P1", "E1", "a"), ("P1", "E1", "a")]);
        assert_eq!(dedupe_by_primary_key(&mut table, None).unwrap(), 0);
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn unknown_key_column_is_an_error() {
        let mut table = encounters(&[("P1", "E1", "a")]);
        let key = column_names(["visit_id"]).unwrap();
        assert!(dedupe_by_primary_key(&mut table, Some(&key)).is_err());
    }
}
