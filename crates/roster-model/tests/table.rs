use roster_model::{
    CanonicalCase, DefaultOverrides, FieldKey, FieldRule, MissingColumnPolicy, ModelError,
    RawTable, Row, Schema, SchemaField, Table,
};

fn field(key: &str, header: &str, required: bool, default_eligible: bool) -> SchemaField {
    SchemaField {
        key: FieldKey::new(key).expect("key"),
        header: header.to_string(),
        required,
        rule: FieldRule::Text,
        case: CanonicalCase::AsIs,
        on_missing: match (required, default_eligible) {
            (true, true) => MissingColumnPolicy::RequireDefault,
            (true, false) => MissingColumnPolicy::Fail,
            _ => MissingColumnPolicy::Blank,
        },
        default_eligible,
        absorbs_overflow: false,
    }
}

fn schema() -> Schema {
    Schema::new(
        "test",
        "1",
        vec![
            field("first_name", "First Name*", true, false),
            field("surname", "Surname*", true, false),
            field("postcode", "Postcode*", true, true),
            field("country", "Country", false, false),
        ],
    )
    .expect("schema")
}

fn key(value: &str) -> FieldKey {
    FieldKey::new(value).expect("key")
}

#[test]
fn constant_column_lands_in_schema_position() {
    let schema = schema();
    let mut table = Table::new(vec![key("first_name"), key("surname"), key("country")]);
    let mut row = Row::new(2);
    row.cells.insert(key("first_name"), "Ann".to_string());
    table.push_row(row);

    assert!(table.ensure_constant_column(&schema, &key("postcode"), "SW1A 1AA"));
    assert!(!table.ensure_constant_column(&schema, &key("postcode"), "X"));
    assert_eq!(
        table.columns(),
        &[key("first_name"), key("surname"), key("postcode"), key("country")]
    );
    assert_eq!(table.value(0, &key("postcode")), Some("SW1A 1AA"));
}

#[test]
fn records_fill_absent_columns_with_blanks() {
    let schema = schema();
    let mut table = Table::new(vec![key("surname")]);
    let mut row = Row::new(5);
    row.cells.insert(key("surname"), "Lee".to_string());
    table.push_row(row);
    assert_eq!(
        table.to_records(&schema),
        vec![vec![
            String::new(),
            "Lee".to_string(),
            String::new(),
            String::new()
        ]]
    );
}

#[test]
fn set_value_ignores_unknown_columns() {
    let mut table = Table::new(vec![key("surname")]);
    table.push_row(Row::new(2));
    assert_eq!(table.set_value(0, &key("country"), "UK".into()), None);
    assert_eq!(
        table.set_value(0, &key("surname"), "Lee".into()),
        Some(String::new())
    );
    assert_eq!(table.value(0, &key("surname")), Some("Lee"));
}

#[test]
fn raw_table_numbers_records_from_one() {
    let raw = RawTable::from_records([vec!["a", "b"], vec!["c"]]);
    assert_eq!(raw.rows[1].line, 2);
    assert_eq!(raw.width(), 2);
    assert_eq!(raw.rows[1].cell(1), "");
}

#[test]
fn defaults_only_accept_eligible_fields() {
    let schema = schema();
    let mut defaults = DefaultOverrides::new();
    defaults
        .insert(&schema, "postcode", "SW1A 1AA")
        .expect("eligible");
    assert_eq!(defaults.get(&key("postcode")), Some("SW1A 1AA"));
    assert_eq!(
        defaults.insert(&schema, "surname", "Lee"),
        Err(ModelError::DefaultNotEligible {
            field: "surname".to_string()
        })
    );
    assert!(matches!(
        defaults.insert(&schema, "nope", "x"),
        Err(ModelError::UnknownField { .. })
    ));
}
