use std::fs;
use std::path::{Path, PathBuf};

use ehr_ingest::{IngestError, load_source, read_text_table};
use ehr_model::{CellValue, ColumnName, ColumnType, SENTINEL_DATE};
use ehr_schema::{ColumnSpec, KeyRole, SourceSpec};

fn name(value: &str) -> ColumnName {
    ColumnName::new(value).unwrap()
}

fn patient_spec() -> SourceSpec {
    SourceSpec {
        name: "patient".to_string(),
        file: PathBuf::from("patients.csv"),
        columns: vec![
            ColumnSpec::new("Id", name("patient_id"), ColumnType::Text),
            ColumnSpec::new("BIRTHDATE", name("birthdate"), ColumnType::Date),
            ColumnSpec::new("INCOME", name("income"), ColumnType::Numeric),
        ],
        key: KeyRole::Primary(vec![name("patient_id")]),
    }
}

fn write(dir: &Path, file: &str, contents: &str) {
    fs::write(dir.join(file), contents).unwrap();
}

#[test]
fn projects_and_renames_declared_columns_in_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "patients.csv",
        "INCOME,FIRST,BIRTHDATE,Id\n52000,Ana,1985-03-07,P1\n,Bo,,P2\n",
    );

    let loaded = load_source(&patient_spec(), dir.path()).unwrap();
    let table = &loaded.table;
    let names: Vec<&str> = table.column_names().map(ColumnName::as_str).collect();
    assert_eq!(names, ["patient_id", "birthdate", "income"]);
    assert_eq!(table.height(), 2);
    assert_eq!(loaded.summary.rows, 2);
    assert_eq!(loaded.summary.columns, 3);

    assert_eq!(table.value(0, "income"), Some(&CellValue::Number(52000.0)));
    assert_eq!(table.value(1, "birthdate"), Some(&CellValue::Missing));
    assert_eq!(table.value(1, "income"), Some(&CellValue::Missing));
    assert_ne!(
        table.value(1, "birthdate"),
        Some(&CellValue::Date(SENTINEL_DATE))
    );
}

#[test]
fn missing_declared_column_is_a_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "patients.csv", "Id,BIRTHDATE\nP1,1985-03-07\n");

    let err = load_source(&patient_spec(), dir.path()).unwrap_err();
    match err {
        IngestError::SchemaMismatch {
            source_name,
            column,
            ..
        } => {
            assert_eq!(source_name, "patient");
            assert_eq!(column, "INCOME");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_source_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_source(&patient_spec(), dir.path()).unwrap_err();
    assert!(matches!(err, IngestError::SourceNotFound { .. }));
}

#[test]
fn unparseable_typed_value_names_record_and_column() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "patients.csv",
        "Id,BIRTHDATE,INCOME\nP1,1985-03-07,10\nP2,yesterday,20\n",
    );
    let err = load_source(&patient_spec(), dir.path()).unwrap_err();
    match err {
        IngestError::InvalidValue { record, column, .. } => {
            assert_eq!(record, 2);
            assert_eq!(column, "BIRTHDATE");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn short_records_load_trailing_fields_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "patients.csv", "Id,BIRTHDATE,INCOME\nP1\n");
    let loaded = load_source(&patient_spec(), dir.path()).unwrap();
    assert_eq!(loaded.table.value(0, "patient_id"), Some(&CellValue::text("P1")));
    assert_eq!(loaded.table.value(0, "income"), Some(&CellValue::Missing));
}

#[test]
fn reads_merged_files_as_text() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "final.csv", "patient_id,age\nP1,40\nP2,\n");
    let table = read_text_table(&dir.path().join("final.csv"), "final").unwrap();
    assert_eq!(table.width(), 2);
    assert_eq!(table.value(0, "age"), Some(&CellValue::text("40")));
    assert_eq!(table.value(1, "age"), Some(&CellValue::Missing));
}

#[test]
fn unquoted_comma_in_a_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "conditions.csv",
        "PATIENT,ENCOUNTER,CODE,DESCRIPTION\nP1,E1,123,Cough, chronic\n",
    );
    let spec = SourceSpec {
        name: "conditions".to_string(),
        file: PathBuf::from("conditions.csv"),
        columns: vec![
            ColumnSpec::new("PATIENT", name("patient_id"), ColumnType::Text),
            ColumnSpec::new("ENCOUNTER", name("encounter_id"), ColumnType::Text),
            ColumnSpec::new("CODE", name("condition_code"), ColumnType::Text),
            ColumnSpec::new("DESCRIPTION", name("condition_description"), ColumnType::Text),
        ],
        key: KeyRole::Foreign(vec![name("patient_id"), name("encounter_id")]),
    };

    let err = load_source(&spec, dir.path()).unwrap_err();
    assert!(err.to_string().contains("record 1 has 5 fields but the header has 4"));
    match err {
        IngestError::TooManyFields {
            path,
            record,
            expected,
            actual,
        } => {
            assert_eq!(path, dir.path().join("conditions.csv"));
            assert_eq!(record, 1);
            assert_eq!(expected, 4);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected error: {other}"),
    }

    write(dir.path(), "final.csv", "patient_id,age\nP1,40,extra\n");
    let err = read_text_table(&dir.path().join("final.csv"), "final").unwrap_err();
    assert!(matches!(err, IngestError::TooManyFields { record: 1, .. }));
}
