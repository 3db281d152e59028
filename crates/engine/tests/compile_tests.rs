//! End-to-end compile tests against the in-memory workbook model.

use pretty_assertions::assert_eq;
use serde_json::json;
use tabform_config::TemplateOptions;
use tabform_core::{
    CellValue, Choices, Constraint, FieldSpec, FormatKind, RecordRow, Resource, Role, SchemaSet, TemplateBook,
};
use tabform_engine::layout::{CODE_ROW, DATA_FIRST_ROW, EXAMPLE_ROW, HEADING_ROW, STATUS_ROW};
use tabform_engine::{compile, plan_template, CompileError, ERROR_SHEET, REF_SHEET, REQUIRED_SHEET};

fn inventory() -> SchemaSet {
    SchemaSet::new(vec![
        FieldSpec::new("site", FormatKind::Text)
            .with_label("Site")
            .with_role(Role::PrimaryKey),
        FieldSpec::new("year", FormatKind::Integer)
            .with_label("Year")
            .with_role(Role::PrimaryKey)
            .with_constraint(Constraint::Minimum { value: "1900".into() }),
        FieldSpec::new("owner", FormatKind::Text)
            .with_label("Owner")
            .with_role(Role::Required),
        FieldSpec::new("fruit", FormatKind::Choice)
            .with_label("Fruit")
            .with_notes("What was harvested")
            .with_choices(Choices::new(vec![
                ("A".into(), "Apple".into()),
                ("B".into(), "Banana".into()),
            ])),
        FieldSpec::new("comment", FormatKind::Text),
    ])
}

fn resource() -> Resource {
    Resource::new("harvest", "Harvest Log")
}

fn options(rows: u32) -> TemplateOptions {
    TemplateOptions::default().with_default_rows(rows)
}

fn blank(schema: &SchemaSet) -> TemplateBook {
    compile(schema, &[], &resource(), &options(20)).unwrap()
}

#[test]
fn columns_line_up_across_sheets() {
    let schema = inventory();
    let book = blank(&schema);
    let data = book.sheet("HarvestLog").unwrap();
    let errors = book.sheet(ERROR_SHEET).unwrap();
    let required = book.sheet(REQUIRED_SHEET).unwrap();

    let plan = plan_template(&schema, &[], &resource(), &options(20)).unwrap();
    for column in &plan.layout.columns {
        assert_eq!(data.text(CODE_ROW, column.col), Some(column.id()));
        let letter = column.letter();
        let cell = format!("'HarvestLog'!{letter}{}", DATA_FIRST_ROW + 1);
        if let Some(formula) = errors.formula(DATA_FIRST_ROW, column.col) {
            assert!(formula.contains(&cell), "{formula} should test {cell}");
        }
        if let Some(formula) = required.formula(DATA_FIRST_ROW, column.col) {
            assert!(formula.contains(&cell), "{formula} should test {cell}");
        }
    }
    // every input column with rules got a formula on its own column
    assert!(errors.formula(DATA_FIRST_ROW, 3).is_some());
    assert!(required.formula(DATA_FIRST_ROW, 4).is_some());
    assert_eq!(errors.formula(DATA_FIRST_ROW, 6), None);
    assert_eq!(required.formula(DATA_FIRST_ROW, 6), None);
}

#[test]
fn primary_key_duplicates_reference_only_key_columns() {
    let book = blank(&inventory());
    let errors = book.sheet(ERROR_SHEET).unwrap();
    let n = DATA_FIRST_ROW + 3;
    let formula = errors.formula(n - 1, 2).unwrap();
    let dup = format!(
        "SUMPRODUCT(--(TRIM('HarvestLog'!C6:C{n})=TRIM('HarvestLog'!C{n})),--(TRIM('HarvestLog'!D6:D{n})=TRIM('HarvestLog'!D{n})))>1"
    );
    assert!(formula.contains(&dup), "{formula}");
    assert!(!formula.contains("'HarvestLog'!E"));
    assert!(errors.formula(n - 1, 3).unwrap().contains(&dup));
}

#[test]
fn code_row_is_deterministic() {
    let a = blank(&inventory());
    let b = blank(&inventory());
    let row = |book: &TemplateBook| -> Vec<Option<String>> {
        let data = book.data_sheet().unwrap();
        (0..8).map(|c| data.text(CODE_ROW, c).map(str::to_string)).collect()
    };
    assert_eq!(row(&a), row(&b));
    let data = a.data_sheet().unwrap();
    assert_eq!(data.text(CODE_ROW, 0), Some("xlf_v1"));
    assert_eq!(data.text(CODE_ROW, 1), Some("harvest"));
    assert!(data.is_row_hidden(CODE_ROW));
    assert_eq!(a, b);
}

#[test]
fn required_non_key_is_gated_by_has_data() {
    let book = blank(&inventory());
    let required = book.sheet(REQUIRED_SHEET).unwrap();
    assert_eq!(required.formula(6, 4), Some("=B7*('HarvestLog'!E7=\"\")"));
    assert_eq!(
        required.formula(6, 1),
        Some("=SUMPRODUCT(LEN('HarvestLog'!C7:G7))>0")
    );
    assert_eq!(
        required.formula(6, 0),
        Some("=IFERROR(MATCH(TRUE,INDEX(C7:G7<>0,),)+2,0)")
    );
    assert_eq!(
        required.formula(STATUS_ROW, 4),
        Some("=IFERROR(MATCH(TRUE,INDEX(E6:E25<>0,),)+5,0)")
    );
}

#[test]
fn choices_on_reference_sheet_and_dropdown() {
    let book = blank(&inventory());
    let reference = book.sheet(REF_SHEET).unwrap();
    let data = book.data_sheet().unwrap();

    // find the "Values" heading of the fruit block
    let heading = (0..80)
        .find(|&r| reference.text(r, 2) == Some("Values") && reference.text(r + 1, 2) == Some("A"))
        .expect("values heading");
    assert_eq!(reference.text(heading + 1, 2), Some("A"));
    assert_eq!(reference.text(heading + 1, 3), Some("Apple"));
    assert_eq!(reference.text(heading + 2, 2), Some("B"));
    assert_eq!(reference.text(heading + 2, 3), Some("Banana"));

    let first = heading + 2;
    let last = heading + 3;
    let validation = data.validations.iter().find(|v| v.range.start_col == 5).unwrap();
    assert_eq!(validation.source, format!("reference!$C${first}:$C${last}"));
    assert_eq!(validation.range.start_row, DATA_FIRST_ROW);
    assert_eq!(validation.range.end_row, DATA_FIRST_ROW + 19);
    let alert = validation.error.as_ref().unwrap();
    assert_eq!(alert.message, "Please enter one of the valid choices: A, B");
}

#[test]
fn reference_titles_link_back_to_headings() {
    let book = blank(&inventory());
    let reference = book.sheet(REF_SHEET).unwrap();
    let data = book.data_sheet().unwrap();

    let title = reference.merge_at(3, 2).unwrap();
    match &title.value {
        CellValue::Link { target, text } => {
            assert_eq!(target, "#'HarvestLog'!C2");
            assert_eq!(text, "Site (Primary Key)");
        }
        other => panic!("expected link, got {other:?}"),
    }
    assert_eq!(reference.merge_at(3, 0).unwrap().value, CellValue::Number(1.0));
    assert_eq!(reference.text(4, 2), Some("ID"));
    assert_eq!(reference.text(4, 3), Some("site"));

    match data.value(HEADING_ROW, 2) {
        Some(CellValue::Link { target, text }) => {
            assert!(target.starts_with("#reference!A4:D"), "{target}");
            assert_eq!(text, "Site");
        }
        other => panic!("expected link, got {other:?}"),
    }
}

#[test]
fn prefilled_records_add_row_id_column() {
    let records = RecordRow::list_from_json(r#"[{"_id": 7, "site": "x", "year": 2020}]"#).unwrap();
    let book = compile(&inventory(), &records, &resource(), &options(20)).unwrap();
    let data = book.data_sheet().unwrap();

    assert_eq!(data.text(CODE_ROW, 2), Some("_id"));
    assert_eq!(data.text(CODE_ROW, 3), Some("site"));
    assert_eq!(data.value(DATA_FIRST_ROW, 2), Some(&CellValue::Number(7.0)));
    assert_eq!(data.text(DATA_FIRST_ROW, 3), Some("x"));
    assert_eq!(data.value(DATA_FIRST_ROW, 4), Some(&CellValue::Number(2020.0)));
    // one row per record
    assert_eq!(data.row_height(DATA_FIRST_ROW + 1), None);

    // the row id column is never checked
    let errors = book.sheet(ERROR_SHEET).unwrap();
    assert_eq!(errors.formula(DATA_FIRST_ROW, 2), None);
    assert!(errors.formula(DATA_FIRST_ROW, 3).is_some());
}

#[test]
fn bad_record_value_names_field_and_row() {
    let records = vec![
        RecordRow::new().with("year", 2020),
        RecordRow::new().with("year", "soon"),
    ];
    let err = compile(&inventory(), &records, &resource(), &options(20)).unwrap_err();
    match err {
        CompileError::Coercion { field, row, .. } => {
            assert_eq!(field, "year");
            assert_eq!(row, 2);
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn example_row_hidden_without_example() {
    let book = blank(&inventory());
    assert!(book.data_sheet().unwrap().is_row_hidden(EXAMPLE_ROW));

    let opts = options(5).with_example(RecordRow::new().with("site", "North").with("year", 2021));
    let book = compile(&inventory(), &[], &resource(), &opts).unwrap();
    let data = book.data_sheet().unwrap();
    assert!(!data.is_row_hidden(EXAMPLE_ROW));
    assert_eq!(data.text(EXAMPLE_ROW, 2), Some("North"));
    assert_eq!(data.value(EXAMPLE_ROW, 3), Some(&CellValue::Number(2021.0)));
    assert_eq!(data.merge_at(EXAMPLE_ROW, 0).unwrap().value, CellValue::text("e.g."));
}

#[test]
fn data_sheet_navigation_and_highlights() {
    let book = blank(&inventory());
    let data = book.data_sheet().unwrap();
    assert_eq!(data.freeze, Some((EXAMPLE_ROW, 2)));
    assert_eq!(data.formula(DATA_FIRST_ROW, 1), Some("=IF(r1!B6,\"\",\"\u{25B6}\")"));
    let row_status = data.formula(DATA_FIRST_ROW, 0).unwrap();
    assert!(row_status.contains("e1!A6"), "{row_status}");
    let col_status = data.formula(STATUS_ROW, 2).unwrap();
    assert!(col_status.contains("e1!C4"), "{col_status}");
    assert_eq!(data.conditional.len(), 3);
    assert!(data.conditional.iter().all(|c| c.stop_if_true));
    let protection = data.protection.unwrap();
    assert!(protection.format_rows && protection.format_columns);
}

#[test]
fn full_text_choices_show_labels() {
    let opts = options(5).with_full_text_choices(true);
    let book = compile(&inventory(), &[], &resource(), &opts).unwrap();
    let reference = book.sheet(REF_SHEET).unwrap();
    let found = (0..80).any(|r| reference.text(r, 2) == Some("A: Apple"));
    assert!(found);
}

#[test]
fn unknown_formula_reference_fails_compile() {
    let schema = SchemaSet::new(vec![FieldSpec::new("a", FormatKind::Text)
        .with_constraint(Constraint::Formula {
            name: "check".into(),
            formula: "{missing}>1".into(),
        })]);
    let err = compile(&schema, &[], &resource(), &options(5)).unwrap_err();
    assert!(matches!(err, CompileError::Schema(_)), "{err}");
}

#[test]
fn json_schema_compiles() {
    let schema = SchemaSet::from_json(
        &json!({
            "fields": [
                {"id": "name", "type": "text", "tdpkreq": "pk", "info": {"label": "Name"}},
                {"id": "when", "type": "date", "tdpkreq": "req"}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let book = compile(&schema, &[], &resource(), &options(3)).unwrap();
    assert_eq!(book.sheets.len(), 4);
    assert!(book.sheet(ERROR_SHEET).unwrap().formula(DATA_FIRST_ROW, 3).is_some());
}

#[test]
fn text_field_with_choices_gets_dropdown_and_check() {
    let schema = SchemaSet::from_json(
        &json!({
            "fields": [
                {"id": "fruit", "choices": {"A": "Apple", "B": "Banana"}}
            ]
        })
        .to_string(),
    )
    .unwrap();
    assert_eq!(schema.fields[0].kind, FormatKind::Text);
    let book = blank(&schema);
    let data = book.data_sheet().unwrap();

    assert_eq!(data.validations.len(), 1);
    let validation = &data.validations[0];
    assert_eq!(validation.range.start_col, 2);
    assert_eq!(validation.source, "reference!$C$8:$C$9");

    let error = book.sheet(ERROR_SHEET).unwrap().formula(DATA_FIRST_ROW, 2).unwrap();
    assert_eq!(
        error,
        "=NOT('HarvestLog'!C6=\"\")*IFERROR(SUMPRODUCT(--EXACT(reference!$C$8:$C$9,TRIM('HarvestLog'!C6)))=0,TRUE)"
    );
}

#[test]
fn multi_choice_has_check_but_no_dropdown() {
    let schema = SchemaSet::new(vec![
        FieldSpec::new("tags", FormatKind::MultiChoice).with_choices(Choices::from_keys(["red", "blue"]))
    ]);
    let book = blank(&schema);
    assert!(book.data_sheet().unwrap().validations.is_empty());
    let error = book.sheet(ERROR_SHEET).unwrap().formula(DATA_FIRST_ROW, 2).unwrap();
    assert!(error.contains("FIND("), "{error}");
    assert!(!error.contains("SEARCH("), "{error}");
}

#[test]
fn wildcard_and_comparison_keys_are_matched_exactly() {
    let schema = SchemaSet::new(vec![FieldSpec::new("grade", FormatKind::Choice)
        .with_choices(Choices::from_keys(["A*", "<5", "~x"]))]);
    let book = blank(&schema);

    let reference = book.sheet(REF_SHEET).unwrap();
    let heading = (0..40)
        .find(|&r| reference.text(r, 2) == Some("Values"))
        .expect("values heading");
    assert_eq!(reference.text(heading + 1, 2), Some("A*"));
    assert_eq!(reference.text(heading + 2, 2), Some("<5"));
    assert_eq!(reference.text(heading + 3, 2), Some("~x"));

    // keys are compared with EXACT, so "*" typed into a cell is not a match for "A*"
    let error = book.sheet(ERROR_SHEET).unwrap().formula(DATA_FIRST_ROW + 3, 2).unwrap();
    assert!(error.contains("SUMPRODUCT(--EXACT(reference!$C$"), "{error}");
    assert!(error.contains("TRIM('HarvestLog'!C9)"), "{error}");
    assert!(!error.contains("COUNTIF("), "{error}");
}
