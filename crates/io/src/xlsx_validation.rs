//! XLSX data validation and conditional format export
//!
//! Maps the template model's dropdown lists and formula highlights onto
//! rust_xlsxwriter's `DataValidation` and `ConditionalFormatFormula`.
//!
//! ## Key gotchas
//! - List sources and rule formulas are stored without the leading `=`.
//! - Conditional formulas are relative to the top-left cell of their range.
//! - Highlights use differential formats, so the fill sets both foreground
//!   and background colors.

use rust_xlsxwriter::{
    ConditionalFormatFormula, DataValidation, DataValidationErrorStyle, Format, Formula, Worksheet, XlsxError,
};
use tabform_core::{ConditionalRule, ListValidation, TemplateSheet};

use crate::error::WriteError;
use crate::xlsx::{xlsx_error, Formats};

/// Convert a dropdown list to a rust_xlsxwriter DataValidation.
pub fn list_to_xlsx(validation: &ListValidation) -> Result<DataValidation, XlsxError> {
    let source = validation.source.strip_prefix('=').unwrap_or(&validation.source);
    let mut dv = DataValidation::new()
        .allow_list_formula(Formula::new(source))
        .ignore_blank(true);

    if let Some(alert) = &validation.error {
        dv = dv
            .set_error_title(&alert.title)?
            .set_error_message(&alert.message)?
            .set_error_style(DataValidationErrorStyle::Stop);
    }
    Ok(dv)
}

/// Convert a highlight rule to a formula conditional format.
pub fn rule_to_xlsx(rule: &ConditionalRule, format: &Format) -> ConditionalFormatFormula {
    let formula = rule.formula.strip_prefix('=').unwrap_or(&rule.formula);
    ConditionalFormatFormula::new()
        .set_rule(format!("={formula}").as_str())
        .set_format(format.clone())
        .set_stop_if_true(rule.stop_if_true)
}

/// Returns the number of validations written.
pub(crate) fn export_validations(sheet: &TemplateSheet, worksheet: &mut Worksheet) -> Result<usize, WriteError> {
    let name = sheet.name.as_str();
    for validation in &sheet.validations {
        let dv = list_to_xlsx(validation).map_err(|e| xlsx_error(name, "build validation", e))?;
        let r = &validation.range;
        worksheet
            .add_data_validation(r.start_row, r.start_col, r.end_row, r.end_col, &dv)
            .map_err(|e| xlsx_error(name, format!("add validation to {}", r.to_a1()), e))?;
    }
    Ok(sheet.validations.len())
}

/// Returns the number of conditional formats written.
pub(crate) fn export_conditional_formats(
    sheet: &TemplateSheet,
    worksheet: &mut Worksheet,
    formats: &Formats,
) -> Result<usize, WriteError> {
    let name = sheet.name.as_str();
    for rule in &sheet.conditional {
        let cf = rule_to_xlsx(rule, formats.highlight(name, rule.style)?);
        let r = &rule.range;
        worksheet
            .add_conditional_format(r.start_row, r.start_col, r.end_row, r.end_col, &cf)
            .map_err(|e| xlsx_error(name, format!("add conditional format to {}", r.to_a1()), e))?;
    }
    Ok(sheet.conditional.len())
}
