//! File-level conversion through the library side of the binary.

use std::fs;
use std::path::Path;

use roster_cli::convert::{FileJob, convert_file};
use roster_cli::output::{default_output_path, render_roster};
use roster_core::{
    AutoDecisions, DecisionMaker, DecisionRequest, DecisionResponse, PipelineError, Stage,
};
use roster_model::{ConvertOptions, DefaultOverrides};
use roster_standards::{Standards, load_default_standards};

fn standards() -> Standards {
    load_default_standards().expect("bundled standards")
}

fn write_input(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write input");
    path
}

const ROSTER: &str = "\
Club roster export,,,,,
First Name,Surname,Gender,DOB,Post Code,Email
ann,Lee,f,13/02/2010,sw1a1aa,ann@x.com
Bob,Ray,M,2010-02-14,LS1 1AA,bob@x.com
Total,2,,,,
";

#[test]
fn converts_to_all_quoted_csv_beside_the_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(dir.path(), "club.csv", ROSTER);
    let standards = standards();
    let job = FileJob::new(&input);
    let outcome = convert_file(&job, &standards, &ConvertOptions::default(), &mut AutoDecisions)
        .expect("convert");

    let output = dir.path().join("club.converted.csv");
    assert_eq!(outcome.output.as_deref(), Some(output.as_path()));
    let text = fs::read_to_string(&output).expect("read output");
    insta::assert_snapshot!(text, @r#"
    "Sport Passport ID","First Name*","Surname*","Gender*","ClassifiedAsDisabled*","MedicalConditions","DateOfBirth*","Address1","Address2","PhoneNumber","TownCity","County","Postcode*","Country","EmergencyContactName","EmergencyContactPhone","EmergencyContactPhone2","Email*","SchoolYear","CourseID"
    "","Ann","Lee","Female","No","","13/02/2010","","","","","","SW1A 1AA","","","","","ann@x.com","",""
    "","Bob","Ray","Male","No","","14/02/2010","","","","","","LS1 1AA","","","","","bob@x.com","",""
    "#);
    assert_eq!(outcome.conversion.report.rows_skipped.total(), 2);
}

#[test]
fn dry_run_writes_only_the_corrections_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(dir.path(), "club.csv", ROSTER);
    let log_path = dir.path().join("corrections.json");
    let standards = standards();
    let job = FileJob::new(&input)
        .with_corrections_log(Some(log_path.clone()))
        .with_dry_run(true);
    let outcome = convert_file(&job, &standards, &ConvertOptions::default(), &mut AutoDecisions)
        .expect("convert");

    assert!(outcome.output.is_none());
    assert!(!default_output_path(&input).exists());
    let log: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&log_path).expect("read log")).expect("json");
    assert!(log["output"].is_null());
    let corrections = log["corrections"].as_array().expect("corrections");
    assert_eq!(corrections.len(), outcome.conversion.log.len());
    assert!(
        corrections
            .iter()
            .any(|entry| entry["field"] == "postcode" && entry["new"] == "SW1A 1AA")
    );
    assert_eq!(log["report"]["rows_output"], 2);
}

#[test]
fn failed_conversion_leaves_no_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(
        dir.path(),
        "no_surname.csv",
        "First Name,Gender,DOB,Postcode,Email\nAnn,F,13/02/2010,SW1A 1AA,ann@x.com\n",
    );
    let standards = standards();
    let err = convert_file(
        &FileJob::new(&input),
        &standards,
        &ConvertOptions::default(),
        &mut AutoDecisions,
    )
    .expect_err("schema violation");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SchemaViolation { .. })
    ));
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("no_surname.csv")]);
}

#[test]
fn email_default_fills_a_missing_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(
        dir.path(),
        "roster.csv",
        "First Name;Surname;Gender;DateOfBirth;Postcode\nAnn;Lee;Female;13/02/2010;SW1A 1AA\n",
    );
    let output = dir.path().join("out").join("roster.csv");
    fs::create_dir(dir.path().join("out")).expect("mkdir");
    let standards = standards();
    let mut defaults = DefaultOverrides::new();
    defaults
        .insert(&standards.schema, "email", "Office@Club.org")
        .expect("eligible");
    let options = ConvertOptions::default().with_defaults(defaults);
    let outcome = convert_file(
        &FileJob::new(&input).with_output(Some(output.clone())),
        &standards,
        &options,
        &mut AutoDecisions,
    )
    .expect("convert");

    let rendered = render_roster(&standards.schema, &outcome.conversion.table).expect("render");
    assert_eq!(fs::read_to_string(&output).expect("read output"), rendered);
    assert!(rendered.contains(r#""office@club.org","",""#));
}

#[test]
fn unreadable_workbook_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(dir.path(), "roster.xlsx", "not really a workbook");
    let err = convert_file(
        &FileJob::new(&input),
        &standards(),
        &ConvertOptions::default(),
        &mut AutoDecisions,
    )
    .expect_err("broken workbook");
    let message = format!("{err:#}");
    assert!(message.contains("failed to read workbook"), "{message}");
    assert!(message.contains("roster.xlsx"), "{message}");
}

/// Takes every default except the export confirmation.
struct RefuseExport(DecisionResponse);

impl DecisionMaker for RefuseExport {
    fn decide(&mut self, request: &DecisionRequest) -> DecisionResponse {
        match request {
            DecisionRequest::ConfirmExport { .. } => self.0.clone(),
            other => other.default_response(),
        }
    }
}

#[test]
fn declined_export_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(dir.path(), "club.csv", ROSTER);
    let log_path = dir.path().join("corrections.json");
    let job = FileJob::new(&input).with_corrections_log(Some(log_path.clone()));
    let outcome = convert_file(
        &job,
        &standards(),
        &ConvertOptions::default(),
        &mut RefuseExport(DecisionResponse::Decline),
    )
    .expect("convert");

    assert!(outcome.declined);
    assert!(outcome.output.is_none());
    assert_eq!(outcome.conversion.report.rows_output, 2);
    assert!(!default_output_path(&input).exists());
    assert!(!log_path.exists());
}

#[test]
fn aborted_export_stops_at_the_export_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_input(dir.path(), "club.csv", ROSTER);
    let err = convert_file(
        &FileJob::new(&input),
        &standards(),
        &ConvertOptions::default(),
        &mut RefuseExport(DecisionResponse::Abort),
    )
    .expect_err("abort");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Aborted {
            stage: Stage::Export
        })
    ));
    assert!(!default_output_path(&input).exists());
}
