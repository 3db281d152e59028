//! Formula synthesis
//!
//! Every input field gets up to two per-row formulas: an error formula for the
//! hidden error sheet and a required formula for the hidden required sheet.
//! Both are assembled from fragments containing placeholders:
//!
//! | Placeholder         | Replaced with                                   |
//! |---------------------|-------------------------------------------------|
//! | `{_value_}`         | this field's cell on the data sheet, same row   |
//! | `{_choice_range_}`  | the field's choice keys on the reference sheet  |
//! | `{field_id}`        | another field's cell on the data sheet, same row|
//! | `{_num_}`           | the 1-based row number                          |
//!
//! `{{` and `}}` produce literal braces. A fragment is parsed once into
//! segments; rendering a row only splices in the row number.

use std::fmt;

use tabform_core::{quote_sheet, SchemaError, CHOICE_PREDICATE};
use tracing::debug;

use crate::layout::{Column, LayoutPlan, DATA_FIRST_ROW, PAD_COL};
use crate::reference::ReferencePlan;

const VALUE: &str = "_value_";
const CHOICE_RANGE: &str = "_choice_range_";
const ROW_NUMBER: &str = "_num_";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Row,
}

/// A formula with every placeholder resolved except the row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaTemplate {
    segments: Vec<Segment>,
}

/// What placeholders resolve to for one field.
pub struct Scope<'a> {
    /// Data sheet name, already quoted for formulas.
    pub data_sheet: String,
    pub plan: &'a LayoutPlan,
    pub column: &'a Column,
    pub choice_range: Option<&'a str>,
}

impl FormulaTemplate {
    pub fn parse(source: &str, scope: &Scope<'_>) -> Result<Self, SchemaError> {
        let field = &scope.column.field.id;
        let malformed = |reason: &str| SchemaError::MalformedFormula {
            field: field.clone(),
            formula: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(malformed("unterminated placeholder")),
                            Some(ch) => name.push(ch),
                        }
                    }
                    match name.as_str() {
                        ROW_NUMBER => {}
                        VALUE => text.push_str(&cell_prefix(&scope.data_sheet, scope.column)),
                        CHOICE_RANGE => {
                            let range = scope
                                .choice_range
                                .ok_or_else(|| SchemaError::NoChoices { field: field.clone() })?;
                            text.push_str(range);
                            continue;
                        }
                        id => {
                            let other = scope.plan.column(id).ok_or_else(|| SchemaError::UnknownReference {
                                field: field.clone(),
                                reference: id.to_string(),
                            })?;
                            text.push_str(&cell_prefix(&scope.data_sheet, other));
                        }
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Row);
                }
                '}' => return Err(malformed("unmatched '}'")),
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    /// Formula for a 1-based row number.
    pub fn render(&self, row: u32) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(s) => out.push_str(s),
                Segment::Row => out.push_str(&row.to_string()),
            }
        }
        out
    }
}

impl fmt::Display for FormulaTemplate {
    /// Shows the row number as `{n}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(s) => f.write_str(s)?,
                Segment::Row => f.write_str("{n}")?,
            }
        }
        Ok(())
    }
}

/// `'Sheet'!C` for a column; the row follows.
fn cell_prefix(data_sheet: &str, column: &Column) -> String {
    format!("{}!{}", data_sheet, column.letter())
}

/// Compiled formulas of one input column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFormulaSet {
    pub field_id: String,
    pub col: u16,
    pub error: Option<FormulaTemplate>,
    pub required: Option<FormulaTemplate>,
    pub choice_range: Option<String>,
}

/// Build the formula sets for every input column, in column order.
pub fn synthesize(
    plan: &LayoutPlan,
    data_sheet: &str,
    reference: &ReferencePlan,
) -> Result<Vec<ColumnFormulaSet>, SchemaError> {
    let data_sheet = quote_sheet(data_sheet);
    let duplicate_key = duplicate_key_predicate(plan, &data_sheet);
    let mut sets = Vec::new();

    for column in plan.input_columns() {
        let field = &column.field;
        let choice_range = reference.span(&field.id).and_then(|s| s.choice_range());
        let scope = Scope {
            data_sheet: data_sheet.clone(),
            plan,
            column,
            choice_range: choice_range.as_deref(),
        };

        let mut predicates: Vec<String> = Vec::new();
        if let Some(p) = field.kind.validity_predicate() {
            predicates.push(p.to_string());
        }
        // a choice list on any other kind still restricts the value to its keys
        if choice_range.is_some() && !field.kind.uses_choices() {
            predicates.push(CHOICE_PREDICATE.to_string());
        }
        for constraint in &field.constraints {
            if let Some(p) = constraint.predicate(field)? {
                predicates.push(p);
            }
        }
        if field.role.is_primary_key() {
            if let Some(p) = &duplicate_key {
                predicates.push(p.clone());
            }
        }
        let error = match predicates.len() {
            0 => None,
            1 => Some(error_source(&predicates[0])),
            _ => Some(error_source(&format!("OR({})", predicates.join(",")))),
        }
        .map(|source| FormulaTemplate::parse(&source, &scope))
        .transpose()?;

        let required = required_source(column)
            .map(|source| FormulaTemplate::parse(&source, &scope))
            .transpose()?;

        debug!(
            field = %field.id,
            error = error.is_some(),
            required = required.is_some(),
            "synthesized column formulas"
        );
        sets.push(ColumnFormulaSet {
            field_id: field.id.clone(),
            col: column.col,
            error,
            required,
            choice_range,
        });
    }
    Ok(sets)
}

/// Only a non-blank cell can be in error; a predicate that fails to
/// evaluate counts as an error.
fn error_source(predicate: &str) -> String {
    format!("=NOT({{{VALUE}}}=\"\")*IFERROR({predicate},TRUE)")
}

/// Required cells are only reported on rows that have some data, which
/// column B of the required sheet tracks.
fn required_source(column: &Column) -> Option<String> {
    let field = &column.field;
    let has_data = format!("{}{{{ROW_NUMBER}}}", tabform_core::col_letter(PAD_COL));
    let base = format!("={has_data}*({{{VALUE}}}=\"\")");
    match &field.required_formula {
        Some(condition) => Some(format!("{base}*({condition})")),
        None if field.role.is_required() => Some(base),
        None => None,
    }
}

/// A key value may not repeat one from an earlier row. Compares every
/// primary-key column from the first data row down to the current one.
fn duplicate_key_predicate(plan: &LayoutPlan, data_sheet: &str) -> Option<String> {
    let top = DATA_FIRST_ROW + 1;
    let terms: Vec<String> = plan
        .primary_key()
        .map(|c| {
            let col = c.letter();
            format!("--(TRIM({data_sheet}!{col}{top}:{col}{{{ROW_NUMBER}}})=TRIM({data_sheet}!{col}{{{ROW_NUMBER}}}))")
        })
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(format!("SUMPRODUCT({})>1", terms.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabform_core::{Choices, Constraint, FieldSpec, FormatKind, Role, SchemaSet};

    fn compile(fields: Vec<FieldSpec>) -> Result<Vec<ColumnFormulaSet>, SchemaError> {
        let plan = LayoutPlan::new(&SchemaSet::new(fields), &[], 10).unwrap();
        let reference = ReferencePlan::build(&plan, "data", "en", false);
        synthesize(&plan, "data", &reference)
    }

    fn scope_for<'a>(plan: &'a LayoutPlan, id: &str) -> Scope<'a> {
        Scope {
            data_sheet: "'data'".into(),
            plan,
            column: plan.column(id).unwrap(),
            choice_range: None,
        }
    }

    #[test]
    fn parse_and_render() {
        let plan = LayoutPlan::new(
            &SchemaSet::new(vec![
                FieldSpec::new("a", FormatKind::Text),
                FieldSpec::new("b", FormatKind::Integer),
            ]),
            &[],
            10,
        )
        .unwrap();
        let t = FormulaTemplate::parse("=IF({_value_}>{b},{_num_},\"{{x}}\")", &scope_for(&plan, "a")).unwrap();
        assert_eq!(t.render(6), "=IF('data'!C6>'data'!D6,6,\"{x}\")");
        assert_eq!(t.render(12), "=IF('data'!C12>'data'!D12,12,\"{x}\")");
        assert_eq!(t.to_string(), "=IF('data'!C{n}>'data'!D{n},{n},\"{x}\")");
    }

    #[test]
    fn unknown_reference_names_field() {
        let plan = LayoutPlan::new(&SchemaSet::new(vec![FieldSpec::new("a", FormatKind::Text)]), &[], 1).unwrap();
        let err = FormulaTemplate::parse("{nope}=1", &scope_for(&plan, "a")).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownReference {
                field: "a".into(),
                reference: "nope".into()
            }
        );
    }

    #[test]
    fn malformed_placeholders() {
        let plan = LayoutPlan::new(&SchemaSet::new(vec![FieldSpec::new("a", FormatKind::Text)]), &[], 1).unwrap();
        for source in ["{_value_", "x}", "{a{b}}"] {
            let err = FormulaTemplate::parse(source, &scope_for(&plan, "a")).unwrap_err();
            assert!(matches!(err, SchemaError::MalformedFormula { .. }), "{source}");
        }
        let err = FormulaTemplate::parse("{_choice_range_}", &scope_for(&plan, "a")).unwrap_err();
        assert_eq!(err, SchemaError::NoChoices { field: "a".into() });
    }

    #[test]
    fn text_field_without_rules_has_no_formulas() {
        let sets = compile(vec![FieldSpec::new("notes", FormatKind::Text)]).unwrap();
        assert_eq!(sets[0].error, None);
        assert_eq!(sets[0].required, None);
    }

    #[test]
    fn integer_with_bounds() {
        let sets = compile(vec![FieldSpec::new("qty", FormatKind::Integer)
            .with_constraint(Constraint::Minimum { value: "1".into() })
            .with_constraint(Constraint::Maximum { value: "99".into() })])
        .unwrap();
        assert_eq!(
            sets[0].error.as_ref().unwrap().render(6),
            "=NOT('data'!C6=\"\")*IFERROR(OR(NOT(IFERROR(INT('data'!C6)='data'!C6,FALSE)),'data'!C6<1,'data'!C6>99),TRUE)"
        );
    }

    #[test]
    fn required_is_gated_by_has_data() {
        let sets = compile(vec![
            FieldSpec::new("a", FormatKind::Text),
            FieldSpec::new("b", FormatKind::Text).with_role(Role::Required),
            FieldSpec::new("c", FormatKind::Text).with_required_formula("{a}=\"other\""),
        ])
        .unwrap();
        assert_eq!(sets[1].required.as_ref().unwrap().render(7), "=B7*('data'!D7=\"\")");
        assert_eq!(
            sets[2].required.as_ref().unwrap().render(7),
            "=B7*('data'!E7=\"\")*('data'!C7=\"other\")"
        );
    }

    #[test]
    fn composite_primary_key() {
        let sets = compile(vec![
            FieldSpec::new("year", FormatKind::Integer).with_role(Role::PrimaryKey),
            FieldSpec::new("name", FormatKind::Text),
            FieldSpec::new("site", FormatKind::Text).with_role(Role::PrimaryKey),
        ])
        .unwrap();
        let dup = "SUMPRODUCT(--(TRIM('data'!C6:C8)=TRIM('data'!C8)),--(TRIM('data'!E6:E8)=TRIM('data'!E8)))>1";
        let site = sets[2].error.as_ref().unwrap().render(8);
        assert_eq!(site, format!("=NOT('data'!E8=\"\")*IFERROR({dup},TRUE)"));
        assert!(sets[0].error.as_ref().unwrap().render(8).contains(dup));
        assert_eq!(sets[1].error, None);
        assert!(sets[0].required.is_some());
    }

    #[test]
    fn choice_uses_reference_range() {
        let sets = compile(vec![FieldSpec::new("fruit", FormatKind::Choice)
            .with_choices(Choices::new(vec![("A".into(), "Apple".into()), ("B".into(), "Banana".into())]))])
        .unwrap();
        assert_eq!(sets[0].choice_range.as_deref(), Some("reference!$C$8:$C$9"));
        assert_eq!(
            sets[0].error.as_ref().unwrap().render(6),
            "=NOT('data'!C6=\"\")*IFERROR(SUMPRODUCT(--EXACT(reference!$C$8:$C$9,TRIM('data'!C6)))=0,TRUE)"
        );
    }

    #[test]
    fn choices_on_text_field_check_membership() {
        let sets = compile(vec![FieldSpec::new("fruit", FormatKind::Text)
            .with_choices(Choices::new(vec![("A".into(), "Apple".into()), ("B".into(), "Banana".into())]))])
        .unwrap();
        assert_eq!(sets[0].choice_range.as_deref(), Some("reference!$C$8:$C$9"));
        assert_eq!(
            sets[0].error.as_ref().unwrap().render(6),
            "=NOT('data'!C6=\"\")*IFERROR(SUMPRODUCT(--EXACT(reference!$C$8:$C$9,TRIM('data'!C6)))=0,TRUE)"
        );
    }

    #[test]
    fn choices_on_integer_field_keep_number_check() {
        let sets = compile(vec![FieldSpec::new("grade", FormatKind::Integer)
            .with_choices(Choices::from_keys(["1", "2", "3"]))])
        .unwrap();
        let error = sets[0].error.as_ref().unwrap().render(6);
        assert!(error.contains("OR(NOT(IFERROR(INT('data'!C6)"), "{error}");
        assert!(error.contains("SUMPRODUCT(--EXACT(reference!$C$"), "{error}");
    }

    #[test]
    fn choice_checks_use_no_wildcard_functions() {
        // pasted values like "*" or "A?" must not match keys through wildcards
        let sets = compile(vec![
            FieldSpec::new("one", FormatKind::Choice).with_choices(Choices::from_keys(["A*", "B"])),
            FieldSpec::new("many", FormatKind::MultiChoice).with_choices(Choices::from_keys(["x", "y"])),
        ])
        .unwrap();
        for set in &sets {
            let error = set.error.as_ref().unwrap().render(6);
            for wildcard_fn in ["COUNTIF(", "SEARCH(", "MATCH("] {
                assert!(!error.contains(wildcard_fn), "{error}");
            }
        }
        assert!(sets[0].error.as_ref().unwrap().render(6).contains("EXACT("));
        assert!(sets[1].error.as_ref().unwrap().render(6).contains("FIND("));
    }

    #[test]
    fn bound_on_text_fails() {
        let err = compile(vec![FieldSpec::new("t", FormatKind::Text)
            .with_constraint(Constraint::Maximum { value: "z".into() })])
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedBound { .. }));
    }
}
