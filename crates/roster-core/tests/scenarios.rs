//! End-to-end runs of the pipeline over small in-memory rosters.

use proptest::prelude::*;

use roster_core::{
    AutoDecisions, DecisionResponse, Pipeline, PipelineError, ScriptedDecisions, Stage,
};
use roster_model::{
    AmbiguousDatePolicy, Classification, ConvertOptions, CorrectionSource, DefaultOverrides,
    FieldKey, FixKind, MandatoryCellPolicy, MatchKind, OptionalCellPolicy, RawTable,
    StructuralChange, SynthesisReason, UnresolvedPolicy,
};
use roster_standards::{Standards, load_default_standards};

fn standards() -> Standards {
    load_default_standards().expect("bundled standards")
}

fn key(value: &str) -> FieldKey {
    FieldKey::new(value).expect("key")
}

const EXACT_HEADERS: [&str; 7] = [
    "First Name",
    "Surname",
    "Gender",
    "DateOfBirth",
    "Postcode",
    "Email",
    "ClassifiedAsDisabled",
];

fn roster(dates: &[&str]) -> RawTable {
    let mut records = vec![EXACT_HEADERS.to_vec()];
    for date in dates {
        records.push(vec![
            "Ann",
            "Lee",
            "Female",
            date,
            "SW1A 1AA",
            "ann@x.com",
            "No",
        ]);
    }
    RawTable::from_records(records)
}

#[test]
fn variation_headers_are_confirmed_and_cells_corrected() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["First Name", "Surname", "Gender", "DOB", "Post Code", "Email"],
        vec!["Ann", "Lee", "F", "03/04/2010", "sw1a1aa", "ann@x.com"],
    ]);
    let mut decisions = ScriptedDecisions::new([
        DecisionResponse::Accept,
        DecisionResponse::Accept,
        DecisionResponse::Accept,
        DecisionResponse::Value("03/04/2010".to_string()),
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let conversion = pipeline.run(&raw, &mut decisions).expect("conversion");

    assert_eq!(
        decisions.asked(),
        [
            "confirm_variation_matches",
            "confirm_synthesized_column",
            "review_autofixes",
            "manual_value",
        ]
    );
    assert_eq!(decisions.remaining(), 0);
    assert_eq!(conversion.mapping.field_for(3), Some(&key("date_of_birth")));
    assert_eq!(conversion.mapping.field_for(4), Some(&key("postcode")));
    assert_eq!(conversion.mapping.count_by_kind(MatchKind::Variation), 2);

    let records: Vec<String> = conversion
        .records(&standards.schema)
        .iter()
        .map(|record| record.join(","))
        .collect();
    insta::assert_snapshot!(records.join("\n"), @",Ann,Lee,Female,No,,03/04/2010,,,,,,SW1A 1AA,,,,,ann@x.com,,");

    let sources: Vec<(&str, CorrectionSource)> = conversion
        .log
        .entries()
        .iter()
        .map(|entry| (entry.field.as_str(), entry.source))
        .collect();
    assert_eq!(
        sources,
        vec![
            ("gender", CorrectionSource::Auto),
            ("date_of_birth", CorrectionSource::Manual),
            ("postcode", CorrectionSource::Auto),
        ]
    );
    assert_eq!(conversion.report.manual_fixes, 1);
    assert_eq!(conversion.report.mapping.synthesized, vec![key("classified_as_disabled")]);
}

#[test]
fn gender_token_is_proposed_as_canonical_value() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        EXACT_HEADERS.to_vec(),
        vec!["Ann", "Lee", "m", "13/02/2010", "SW1A 1AA", "ann@x.com", "No"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let conversion = pipeline.run(&raw, &mut AutoDecisions).expect("conversion");

    assert_eq!(conversion.issues.len(), 1);
    assert_eq!(
        conversion.issues[0].classification,
        Classification::autofix("Male", FixKind::ChoiceToken)
    );
    assert_eq!(conversion.table.value(0, &key("gender")), Some("Male"));
}

#[test]
fn date_cells_are_classified_by_permutation() {
    let standards = standards();
    let raw = roster(&["13/02/2010", "02/13/2010", "05/06/2010"]);
    let options = ConvertOptions::default().with_unresolved(UnresolvedPolicy {
        mandatory: MandatoryCellPolicy::DropRow,
        optional: OptionalCellPolicy::Blank,
    });
    let pipeline = Pipeline::new(&standards, options);
    let conversion = pipeline.run(&raw, &mut AutoDecisions).expect("conversion");

    let classified: Vec<(usize, bool, Option<&str>)> = conversion
        .issues
        .iter()
        .map(|issue| (issue.line, issue.is_manual(), issue.proposed()))
        .collect();
    assert_eq!(
        classified,
        vec![(3, false, Some("13/02/2010")), (4, true, None)]
    );
    assert_eq!(conversion.issues[0].fix_kind(), Some(FixKind::UsToUkDate));
    assert_eq!(conversion.table.len(), 2);
    assert_eq!(conversion.table.value(1, &key("date_of_birth")), Some("13/02/2010"));
    assert_eq!(conversion.report.rows_dropped.len(), 1);
    assert_eq!(conversion.report.rows_dropped[0].line, 4);
}

#[test]
fn postcode_default_adds_a_populated_column() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["First Name", "Surname", "Gender", "DateOfBirth", "Email", "ClassifiedAsDisabled"],
        vec!["Ann", "Lee", "Female", "13/02/2010", "ann@x.com", "No"],
        vec!["Bob", "Ray", "Male", "14/02/2010", "bob@x.com", "No"],
    ]);
    let mut defaults = DefaultOverrides::new();
    defaults
        .insert(&standards.schema, "postcode", "SW1A 1AA")
        .expect("eligible");
    let pipeline = Pipeline::new(&standards, ConvertOptions::default().with_defaults(defaults));
    let mut decisions = ScriptedDecisions::new([]);
    let conversion = pipeline.run(&raw, &mut decisions).expect("conversion");

    assert!(decisions.asked().is_empty());
    for row in 0..2 {
        assert_eq!(conversion.table.value(row, &key("postcode")), Some("SW1A 1AA"));
    }
    assert!(conversion.log.structural().contains(&StructuralChange::ColumnSynthesized {
        field: key("postcode"),
        value: "SW1A 1AA".to_string(),
        reason: SynthesisReason::DefaultOverride,
        rows: 2,
    }));
    assert_eq!(conversion.report.override_applications, 2);
}

#[test]
fn missing_required_field_is_a_schema_violation() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["First Name", "Gender", "DOB", "Postcode", "Email"],
        vec!["Ann", "Female", "13/02/2010", "SW1A 1AA", "ann@x.com"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let err = pipeline.run(&raw, &mut AutoDecisions).expect_err("violation");
    let PipelineError::SchemaViolation { fields, .. } = &err else {
        panic!("expected a schema violation, got {err:?}");
    };
    assert_eq!(fields, &vec!["Surname".to_string()]);
}

#[test]
fn banner_blank_and_summary_rows_are_removed() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["School Information", "", "", "", "", ""],
        vec!["Generated on 2024-01-01", "", "", "", "", ""],
        vec!["First Name*", "Surname*", "Gender*", "DateOfBirth*", "Postcode*", "Email*"],
        vec!["John", "Smith", "Male", "16/12/2001", "LS1 1AA", "john@example.com"],
        vec!["", "", "", "", "", ""],
        vec!["Jane", "Doe", "Female", "25/12/2001", "LS1 1AB", "jane@example.com"],
        vec!["Total", "2", "", "", "", ""],
    ]);
    let mut decisions = ScriptedDecisions::new([DecisionResponse::Accept, DecisionResponse::Accept]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let conversion = pipeline.run(&raw, &mut decisions).expect("conversion");

    assert_eq!(
        decisions.asked(),
        ["confirm_row_removal", "confirm_synthesized_column"]
    );
    assert_eq!(conversion.table.len(), 2);
    assert_eq!(
        &conversion.log.structural()[..3],
        &[
            StructuralChange::LeadingRowsRemoved { lines: vec![1, 2] },
            StructuralChange::TrailingRowsRemoved { lines: vec![7] },
            StructuralChange::BlankRowsRemoved { lines: vec![5] },
        ]
    );
    let skipped = conversion.report.rows_skipped;
    assert_eq!((skipped.leading, skipped.trailing, skipped.blank), (2, 1, 1));
    assert_eq!(conversion.report.rows_processed, 2);
}

#[test]
fn overflowing_medical_conditions_are_folded_back() {
    let standards = standards();
    let mut header = EXACT_HEADERS.to_vec();
    header.extend(["MedicalConditions", "Address1"]);
    let raw = RawTable::from_records(vec![
        header,
        vec![
            "Ann",
            "Lee",
            "Female",
            "13/02/2010",
            "SW1A 1AA",
            "ann@x.com",
            "No",
            "Asthma",
            " diabetes",
            "12 High St",
        ],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let conversion = pipeline.run(&raw, &mut AutoDecisions).expect("conversion");

    assert_eq!(conversion.report.rows_repaired, 1);
    assert_eq!(
        conversion.table.value(0, &key("medical_conditions")),
        Some("Asthma, diabetes")
    );
    assert_eq!(conversion.table.value(0, &key("address1")), Some("12 High St"));
    assert!(conversion.log.structural().contains(&StructuralChange::RowRepaired {
        line: 2,
        merged_cells: 2,
    }));
}

#[test]
fn unresolved_mandatory_cell_aborts_by_default() {
    let standards = standards();
    let raw = roster(&["05/06/2010"]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let err = pipeline.run(&raw, &mut AutoDecisions).expect_err("abort");
    assert_eq!(
        err,
        PipelineError::UnresolvableCell {
            line: 2,
            field: "date_of_birth".to_string(),
            reason: "\"05/06/2010\" is ambiguous: 5 June 2010 or 6 May 2010".to_string(),
        }
    );
}

#[test]
fn exhausted_script_aborts_at_the_first_question() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["First Name", "Surname", "Gender", "DOB", "Postcode", "Email"],
        vec!["Ann", "Lee", "Female", "13/02/2010", "SW1A 1AA", "ann@x.com"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let err = pipeline
        .run(&raw, &mut ScriptedDecisions::new([]))
        .expect_err("abort");
    assert_eq!(
        err,
        PipelineError::Aborted {
            stage: Stage::Mapping
        }
    );
    assert!(err.is_abort());
}

#[test]
fn missing_header_fails_without_an_operator() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["Some", "Random", "Text"],
        vec!["More", "Random", "Data"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let err = pipeline.run(&raw, &mut AutoDecisions).expect_err("structural");
    assert!(matches!(err, PipelineError::Structural { .. }));
}

#[test]
fn invalid_default_is_rejected_before_any_row_is_read() {
    let standards = standards();
    let mut defaults = DefaultOverrides::new();
    defaults
        .insert(&standards.schema, "email", "not-an-email")
        .expect("eligible");
    let pipeline = Pipeline::new(&standards, ConvertOptions::default().with_defaults(defaults));
    let mut decisions = ScriptedDecisions::new([]);
    let err = pipeline
        .run(&roster(&["13/02/2010"]), &mut decisions)
        .expect_err("invalid default");
    assert!(matches!(err, PipelineError::InvalidDefaultValue { .. }));
    assert!(decisions.asked().is_empty());
}

#[test]
fn converted_output_converts_to_itself() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        vec!["first name", "SURNAME", "Sex", "DOB", "Post Code", "E-mail"],
        vec!["ann", "LEE", "f", "02/13/2010", "sw1a1aa", " Ann@X.com "],
        vec!["bob", "ray", "M", "05/06/2010", "ls1 1aa", "bob@x.com"],
    ]);
    let options = ConvertOptions::default().with_date_policy(AmbiguousDatePolicy::DayFirst);
    let pipeline = Pipeline::new(&standards, options);
    let first = pipeline.run(&raw, &mut AutoDecisions).expect("first run");

    let mut records = vec![
        standards
            .schema
            .fields()
            .iter()
            .map(|field| field.header.clone())
            .collect::<Vec<_>>(),
    ];
    records.extend(first.records(&standards.schema));
    let second = pipeline
        .run(&RawTable::from_records(records), &mut AutoDecisions)
        .expect("second run");

    assert!(second.issues.is_empty());
    assert!(second.log.is_empty());
    assert_eq!(
        second.records(&standards.schema),
        first.records(&standards.schema)
    );
    assert_eq!(first.table.value(0, &key("email")), Some("ann@x.com"));
    assert_eq!(first.table.value(1, &key("date_of_birth")), Some("05/06/2010"));
}

#[test]
fn operator_entered_ambiguous_date_aborts_a_manual_rerun() {
    let standards = standards();
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let mut decisions = ScriptedDecisions::new([DecisionResponse::Value("05/06/2010".into())]);
    let first = pipeline
        .run(&roster(&["31/02/2010"]), &mut decisions)
        .expect("first run");
    assert_eq!(decisions.asked(), ["manual_value"]);
    assert_eq!(first.table.value(0, &key("date_of_birth")), Some("05/06/2010"));

    let mut records = vec![
        standards
            .schema
            .fields()
            .iter()
            .map(|field| field.header.clone())
            .collect::<Vec<_>>(),
    ];
    records.extend(first.records(&standards.schema));
    let err = pipeline
        .run(&RawTable::from_records(records), &mut AutoDecisions)
        .expect_err("ambiguous on rerun");
    let PipelineError::UnresolvableCell { field, reason, .. } = err else {
        panic!("expected an unresolvable cell, got {err:?}");
    };
    assert_eq!(field, "date_of_birth");
    assert!(reason.contains("is ambiguous"), "{reason}");
}

#[test]
fn keyword_named_pupil_is_kept_and_asked_for_an_email() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        EXACT_HEADERS.to_vec(),
        vec!["Ann", "Lee", "Female", "13/02/2010", "SW1A 1AA", "ann@x.com", "No"],
        vec!["Page", "Smith", "Female", "14/02/2010", "SW1A 1AA", "", "No"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let mut decisions = ScriptedDecisions::new([DecisionResponse::Value("page@x.com".into())]);
    let conversion = pipeline.run(&raw, &mut decisions).expect("conversion");

    assert_eq!(decisions.asked(), ["manual_value"]);
    assert_eq!(conversion.report.rows_output, 2);
    assert_eq!(conversion.table.value(1, &key("first_name")), Some("Page"));
    assert_eq!(conversion.table.value(1, &key("email")), Some("page@x.com"));
}

#[test]
fn every_applied_change_is_logged() {
    let standards = standards();
    let raw = RawTable::from_records(vec![
        EXACT_HEADERS.to_vec(),
        vec!["ann", " Lee", "m", "2010-02-13", "sw1a1aa", "ANN@X.COM", "n"],
    ]);
    let pipeline = Pipeline::new(&standards, ConvertOptions::default());
    let conversion = pipeline.run(&raw, &mut AutoDecisions).expect("conversion");

    assert_eq!(conversion.log.len(), conversion.issues.len());
    for entry in conversion.log.entries() {
        assert_eq!(conversion.table.value(0, &entry.field), Some(entry.new.as_str()));
        assert_ne!(entry.original, entry.new);
    }
}

proptest! {
    #[test]
    fn postcode_default_reaches_every_row(postcodes in prop::collection::vec("[A-Za-z0-9]{0,8}", 1..8)) {
        let standards = standards();
        let mut records = vec![vec![
            "First Name".to_string(),
            "Surname".to_string(),
            "Gender".to_string(),
            "DateOfBirth".to_string(),
            "Postcode".to_string(),
            "Email".to_string(),
            "ClassifiedAsDisabled".to_string(),
        ]];
        for postcode in &postcodes {
            records.push(
                ["Ann", "Lee", "Female", "13/02/2010", postcode.as_str(), "ann@x.com", "No"]
                    .map(str::to_string)
                    .to_vec(),
            );
        }
        let mut defaults = DefaultOverrides::new();
        defaults
            .insert(&standards.schema, "postcode", "ls11aa")
            .expect("eligible");
        let pipeline = Pipeline::new(&standards, ConvertOptions::default().with_defaults(defaults));
        let conversion = pipeline
            .run(&RawTable::from_records(records), &mut AutoDecisions)
            .expect("conversion");

        prop_assert_eq!(conversion.table.len(), postcodes.len());
        for row in 0..postcodes.len() {
            prop_assert_eq!(conversion.table.value(row, &key("postcode")), Some("LS1 1AA"));
        }
        prop_assert_eq!(conversion.report.override_applications, postcodes.len());
    }
}
