use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Parser;
use tempfile::TempDir;

use ehr_cli::cli::{Cli, Command, FeaturesArgs, MergeArgs, ReportArg};
use ehr_cli::commands::{load_registry, merge_options, run_features, run_merge, sources_json};
use ehr_cli::summary::{merge_summary_table, registry_table};
use ehr_schema::default_registry;

const EXTRACTS: &[(&str, &str)] = &[
    (
        "patients.csv",
        "Id,BIRTHDATE,FIRST,LAST,MARITAL,RACE,ETHNICITY,GENDER\n\
         P1,1980-06-15,Ann,Lee,M,white,nonhispanic,F\n\
         P2,,Bo,Kim,S,asian,nonhispanic,M\n",
    ),
    (
        "encounters.csv",
        "Id,PATIENT,ENCOUNTERCLASS,CODE,DESCRIPTION\n\
         E1,P1,ambulatory,185345009,Visit\n\
         E2,P1,inpatient,32485007,Admission\n\
         E3,P2,wellness,410620009,Check\n",
    ),
    (
        "conditions.csv",
        "PATIENT,ENCOUNTER,CODE,DESCRIPTION\nP1,E1,44054006,Diabetes\n",
    ),
    (
        "allergies.csv",
        "PATIENT,ENCOUNTER,CODE,DESCRIPTION,TYPE,CATEGORY\n\
         P1,E2,91930004,Eggs,allergy,food\n",
    ),
    (
        "observations.csv",
        "PATIENT,ENCOUNTER,CATEGORY,CODE,DESCRIPTION\n\
         P1,E2,vital-signs,8302-2,Height\n",
    ),
    ("medications.csv", "PATIENT,ENCOUNTER,CODE,DESCRIPTION\n"),
    ("procedures.csv", "PATIENT,ENCOUNTER,CODE,DESCRIPTION\n"),
    ("careplans.csv", "PATIENT,ENCOUNTER,CODE,DESCRIPTION\n"),
];

fn raw_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in EXTRACTS {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

fn merge_args(raw: &Path, output: PathBuf) -> MergeArgs {
    MergeArgs {
        raw_dir: raw.to_path_buf(),
        output,
        schema: None,
        parallel: true,
        no_check: true,
        report: ReportArg::Console,
        sample_rows: 3,
        dry_run: false,
    }
}

#[test]
fn merge_defaults_match_the_documented_layout() {
    let cli = Cli::try_parse_from(["ehr-merge", "merge"]).unwrap();
    let Command::Merge(args) = cli.command else {
        panic!("expected merge command");
    };
    assert_eq!(args.raw_dir, PathBuf::from("data/raw"));
    assert_eq!(
        args.output,
        PathBuf::from("data/processed/final_healthcare_dataset.csv")
    );
    assert_eq!(args.report, ReportArg::Console);
    assert!(!cli.log_data);

    let options = merge_options(&args);
    assert!(options.diagnostics);
    assert!(!options.parallel);
    assert_eq!(options.output_path, Some(args.output.clone()));
}

#[test]
fn dry_run_and_no_check_shape_the_options() {
    let cli = Cli::try_parse_from([
        "ehr-merge",
        "merge",
        "extracts",
        "--dry-run",
        "--no-check",
        "--parallel",
        "--log-data",
    ])
    .unwrap();
    assert!(cli.log_data);
    let Command::Merge(args) = cli.command else {
        panic!("expected merge command");
    };
    let options = merge_options(&args);
    assert_eq!(options.raw_dir, PathBuf::from("extracts"));
    assert_eq!(options.output_path, None);
    assert!(!options.diagnostics);
    assert!(options.parallel);
}

#[test]
fn features_accepts_an_as_of_date() {
    let cli =
        Cli::try_parse_from(["ehr-merge", "features", "in.csv", "out.csv", "--as-of", "2024-03-01"])
            .unwrap();
    let Command::Features(args) = cli.command else {
        panic!("expected features command");
    };
    assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert!(Cli::try_parse_from(["ehr-merge", "features", "--as-of", "March"]).is_err());
}

#[test]
fn merge_then_features_round_trip() {
    let raw = raw_dir();
    let out = TempDir::new().unwrap();
    let merged_path = out.path().join("final.csv");

    let output = run_merge(&merge_args(raw.path(), merged_path.clone()), false).unwrap();
    assert_eq!(output.table.height(), 3);
    assert!(merged_path.exists());
    let rendered = merge_summary_table(&output.sources).to_string();
    assert!(rendered.contains("conditions"));
    assert!(rendered.contains("TOTAL"));

    let features_path = out.path().join("features.csv");
    let summary = run_features(&FeaturesArgs {
        input: merged_path,
        output: features_path.clone(),
        as_of: NaiveDate::from_ymd_opt(2025, 1, 1),
    })
    .unwrap();
    assert_eq!(summary.input_rows, 3);
    assert_eq!(summary.dropped_incomplete, 1);
    assert_eq!(summary.output_rows, 2);

    let csv = fs::read_to_string(&features_path).unwrap();
    let mut lines = csv.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let column = |name: &str| header.iter().position(|h| *h == name).unwrap();
    let rows: Vec<Vec<&str>> = lines.map(|line| line.split(',').collect()).collect();
    let admission = rows
        .iter()
        .find(|row| row[column("encounter_id")] == "E2")
        .unwrap();
    assert_eq!(admission[column("has_allergy")], "1");
    assert_eq!(admission[column("has_condition")], "0");
    assert_eq!(admission[column("is_inpatient")], "1");
    assert_eq!(admission[column("clinical_burden")], "2");
    assert_eq!(admission[column("age")], "44");
}

#[test]
fn failed_merge_leaves_no_output() {
    let raw = raw_dir();
    fs::remove_file(raw.path().join("encounters.csv")).unwrap();
    let out = TempDir::new().unwrap();
    let merged_path = out.path().join("final.csv");

    let err = run_merge(&merge_args(raw.path(), merged_path.clone()), false).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("load stage failed for source `encounter`"));
    assert!(!merged_path.exists());
}

#[test]
fn registry_listing_covers_every_source() {
    let registry = default_registry().unwrap();
    let json: serde_json::Value = serde_json::from_str(&sources_json(&registry).unwrap()).unwrap();
    let sources = json.as_array().unwrap();
    assert_eq!(sources.len(), 8);
    assert_eq!(sources[0]["name"], "patient");
    assert_eq!(sources[0]["role"], "primary");
    assert_eq!(sources[0]["columns"][1]["type"], "date");
    assert_eq!(sources[2]["key"], serde_json::json!(["patient_id", "encounter_id"]));

    let rendered = registry_table(&registry).to_string();
    assert!(rendered.contains("careplans.csv"));
}

#[test]
fn unreadable_schema_names_the_file() {
    let err = load_registry(Some(Path::new("does/not/exist.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.toml"));
}
