use chrono::NaiveDate;
use tracing::{debug, info};

use ehr_model::{
    CellValue, Column, ColumnName, ColumnType, SENTINEL_DATE, SENTINEL_TEXT, Table, parse_date,
};

use crate::FeatureError;

/// Indicator columns and the aggregated code column each one is derived from.
pub const CODE_INDICATORS: &[(&str, &str)] = &[
    ("has_condition", "condition_code"),
    ("has_allergy", "allergy_code"),
    ("has_observation", "observation_code"),
    ("has_medication", "medication_code"),
    ("has_procedure", "procedure_code"),
    ("has_careplan", "careplan_code"),
];

const ENCOUNTER_CLASSES: &[(&str, &str)] = &[
    ("is_inpatient", "inpatient"),
    ("is_ambulatory", "ambulatory"),
    ("is_wellness", "wellness"),
];

pub const MAX_AGE: i64 = 100;
const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Clone, Copy)]
pub struct FeatureOptions {
    /// Reference date for `age`.
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSummary {
    pub input_rows: usize,
    /// Rows without a usable birthdate or encounter class.
    pub dropped_incomplete: usize,
    /// Rows whose age falls outside `0..=MAX_AGE`.
    pub dropped_age: usize,
    pub output_rows: usize,
}

/// True when an aggregated code summary names at least one real code.
///
/// Missing cells, empty summaries and summaries made only of the `Unknown`
/// fill value count as absent.
pub fn has_code(value: &CellValue) -> bool {
    match value {
        CellValue::Missing => false,
        CellValue::Text(summary) => summary
            .split(',')
            .map(str::trim)
            .any(|code| !code.is_empty() && code != SENTINEL_TEXT),
        CellValue::Number(_) | CellValue::Date(_) => true,
    }
}

fn birthdate(value: &CellValue) -> Option<NaiveDate> {
    let date = match value {
        CellValue::Date(date) => Some(*date),
        CellValue::Text(text) => parse_date(text),
        CellValue::Number(_) | CellValue::Missing => None,
    };
    date.filter(|date| *date != SENTINEL_DATE)
}

fn flag(value: bool) -> CellValue {
    CellValue::Number(if value { 1.0 } else { 0.0 })
}

/// Cleans `table` and appends the derived feature columns.
///
/// Derived columns, in order: one `has_*` indicator per entry of
/// [`CODE_INDICATORS`], `age`, the encounter-class flags and
/// `clinical_burden` (`has_allergy + has_observation`). All are numeric.
pub fn derive_features(
    table: &Table,
    options: &FeatureOptions,
) -> Result<(Table, FeatureSummary), FeatureError> {
    let birthdate_idx = table.require_column("birthdate")?;
    let class_idx = table.require_column("encounter_class")?;
    let code_indices = CODE_INDICATORS
        .iter()
        .map(|(_, code)| table.require_column(code))
        .collect::<Result<Vec<_>, _>>()?;

    let mut derived_names: Vec<&str> = CODE_INDICATORS.iter().map(|(name, _)| *name).collect();
    derived_names.push("age");
    derived_names.extend(ENCOUNTER_CLASSES.iter().map(|(name, _)| *name));
    derived_names.push("clinical_burden");

    let mut columns = table.columns.clone();
    for name in derived_names {
        if table.column_index(name).is_some() {
            return Err(FeatureError::ColumnExists {
                table: table.name.clone(),
                column: name.to_string(),
            });
        }
        columns.push(Column::new(ColumnName::new(name)?, ColumnType::Numeric));
    }

    let mut output = Table::new(table.name.clone(), columns);
    let mut summary = FeatureSummary {
        input_rows: table.height(),
        ..FeatureSummary::default()
    };
    for row in &table.rows {
        let class = &row.cells[class_idx];
        let Some(born) = birthdate(&row.cells[birthdate_idx]).filter(|_| !class.is_missing())
        else {
            summary.dropped_incomplete += 1;
            continue;
        };
        let age = (options.as_of - born).num_days() / DAYS_PER_YEAR;
        if !(0..=MAX_AGE).contains(&age) {
            summary.dropped_age += 1;
            continue;
        }

        let indicators: Vec<bool> = code_indices
            .iter()
            .map(|&idx| has_code(&row.cells[idx]))
            .collect();
        let class = class.as_text().unwrap_or_default();
        let burden = u8::from(indicators[1]) + u8::from(indicators[2]);

        let mut cells = row.cells.clone();
        cells.extend(indicators.iter().map(|&present| flag(present)));
        cells.push(CellValue::Number(age as f64));
        cells.extend(
            ENCOUNTER_CLASSES
                .iter()
                .map(|(_, expected)| flag(class == *expected)),
        );
        cells.push(CellValue::Number(f64::from(burden)));
        output.push_row(cells)?;
    }
    summary.output_rows = output.height();

    debug!(
        dropped_incomplete = summary.dropped_incomplete,
        dropped_age = summary.dropped_age,
        "feature rows filtered"
    );
    info!(
        table = %output.name,
        input_rows = summary.input_rows,
        output_rows = summary.output_rows,
        as_of = %options.as_of,
        "features derived"
    );
    Ok((output, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_code_ignores_fill_values() {
        assert!(!has_code(&CellValue::Missing));
        assert!(!has_code(&CellValue::text("")));
        assert!(!has_code(&CellValue::text("Unknown")));
        assert!(has_code(&CellValue::text("Unknown, 44054006")));
        assert!(has_code(&CellValue::text("44054006")));
    }

    #[test]
    fn sentinel_birthdate_is_unusable() {
        assert_eq!(birthdate(&CellValue::text("1900-01-01")), None);
        assert_eq!(birthdate(&CellValue::text("not a date")), None);
        assert_eq!(
            birthdate(&CellValue::text("1980-05-02")),
            NaiveDate::from_ymd_opt(1980, 5, 2)
        );
    }
}
