use std::fs;

use ehr_model::{CellValue, ColumnType};
use ehr_schema::{KeyRole, Registry, SchemaError};

const HEADER: &str = r#"
[registry]
schema = "ehr-merge.registry"
schema_version = 1
"#;

fn registry(body: &str) -> Result<Registry, SchemaError> {
    Registry::from_toml_str(&format!("{HEADER}{body}"), "test")
}

const TWO_SOURCES: &str = r#"
[[sources]]
name = "encounter"
file = "encounters.csv"
primary_key = ["patient_id", "encounter_id"]
columns = [
    { raw = "Id", name = "encounter_id" },
    { raw = "PATIENT", name = "patient_id" },
    { raw = "COST", name = "cost", type = "numeric", fill = "-1" },
]

[[sources]]
name = "conditions"
file = "conditions.csv"
foreign_key = ["patient_id", "encounter_id"]
columns = [
    { raw = "PATIENT", name = "patient_id" },
    { raw = "ENCOUNTER", name = "encounter_id" },
    { raw = "CODE", name = "condition_code" },
]

[merge]
base = "encounter"
key = ["patient_id", "encounter_id"]

[[merge.joins]]
source = "conditions"
on = ["patient_id", "encounter_id"]
"#;

#[test]
fn parses_roles_types_and_fill_overrides() {
    let registry = registry(TWO_SOURCES).expect("valid registry");
    let encounter = registry.source("encounter").unwrap();
    assert!(matches!(encounter.key, KeyRole::Primary(_)));
    let cost = encounter.column("cost").unwrap();
    assert_eq!(cost.kind, ColumnType::Numeric);
    assert_eq!(cost.fill, Some(CellValue::Number(-1.0)));
    assert_eq!(encounter.impute_overrides().len(), 1);

    let conditions = registry.source("conditions").unwrap();
    assert!(conditions.key.is_child());
    assert_eq!(conditions.foreign_key().unwrap().len(), 2);
}

#[test]
fn rejects_non_injective_rename_map() {
    let body = TWO_SOURCES.replace(
        r#"{ raw = "CODE", name = "condition_code" },"#,
        r#"{ raw = "CODE", name = "condition_code" },
    { raw = "DESCRIPTION", name = "condition_code" },"#,
    );
    let err = registry(&body).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"source `conditions` maps both `CODE` and `DESCRIPTION` to canonical column `condition_code`"
    );
}

#[test]
fn rejects_duplicate_raw_columns() {
    let body = TWO_SOURCES.replace(
        r#"{ raw = "CODE", name = "condition_code" },"#,
        r#"{ raw = "CODE", name = "condition_code" },
    { raw = "CODE", name = "condition_code_2" },"#,
    );
    assert!(matches!(
        registry(&body),
        Err(SchemaError::DuplicateRawColumn { .. })
    ));
}

#[test]
fn rejects_key_columns_outside_the_rename_map() {
    let body = TWO_SOURCES.replace(
        r#"foreign_key = ["patient_id", "encounter_id"]"#,
        r#"foreign_key = ["patient_id", "visit_id"]"#,
    );
    let err = registry(&body).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"source `conditions` key column `visit_id` is not a declared column"
    );
}

#[test]
fn rejects_sources_with_both_or_no_key_roles() {
    let both = TWO_SOURCES.replace(
        r#"foreign_key = ["patient_id", "encounter_id"]"#,
        r#"foreign_key = ["patient_id", "encounter_id"]
primary_key = ["patient_id"]"#,
    );
    assert!(matches!(
        registry(&both),
        Err(SchemaError::AmbiguousKeyRole { .. })
    ));
}

#[test]
fn rejects_fill_literals_that_do_not_parse() {
    let body = TWO_SOURCES.replace(r#"fill = "-1""#, r#"fill = "n/a""#);
    assert!(matches!(
        registry(&body),
        Err(SchemaError::InvalidFill { .. })
    ));
}

#[test]
fn rejects_sources_missing_from_the_merge_plan() {
    let body = TWO_SOURCES.replace(
        r#"[[merge.joins]]
source = "conditions"
on = ["patient_id", "encounter_id"]"#,
        "",
    );
    assert!(matches!(
        registry(&body),
        Err(SchemaError::UnmergedSource { name }) if name == "conditions"
    ));
}

#[test]
fn rejects_joins_that_would_collide_on_column_names() {
    let body = TWO_SOURCES.replace(
        r#"{ raw = "CODE", name = "condition_code" },"#,
        r#"{ raw = "CODE", name = "condition_code" },
    { raw = "COST", name = "cost" },"#,
    );
    assert!(matches!(
        registry(&body),
        Err(SchemaError::ColumnCollision { column, .. }) if column == "cost"
    ));
}

#[test]
fn rejects_unknown_schema_version() {
    let contents = format!("{HEADER}{TWO_SOURCES}").replace("schema_version = 1", "schema_version = 2");
    assert!(matches!(
        Registry::from_toml_str(&contents, "test"),
        Err(SchemaError::InvalidManifest { .. })
    ));
}

#[test]
fn loads_registry_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.toml");
    fs::write(&path, format!("{HEADER}{TWO_SOURCES}")).unwrap();
    let registry = Registry::from_toml_path(&path).unwrap();
    assert_eq!(registry.sources().len(), 2);

    let missing = Registry::from_toml_path(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, SchemaError::Io { .. }));
}
