//! Hidden error and required sheets.
//!
//! Each formula cell mirrors the data cell at the same address and is
//! non-zero when that cell has a problem. Row 4 holds, per column, the first
//! problem row; column A holds, per row, the first problem column. The data
//! sheet's status cells and highlights read from these.

use tabform_core::{col_letter, quote_sheet, CellValue, Protection, TemplateSheet};
use tracing::debug;

use super::{Context, ERROR_SHEET, REQUIRED_SHEET};
use crate::formula::FormulaTemplate;
use crate::layout::{DATA_FIRST_ROW, FIRST_FIELD_COL, PAD_COL, STATUS_COL, STATUS_ROW};

pub fn populate_errors(ctx: &Context<'_>) -> TemplateSheet {
    let mut sheet = TemplateSheet::hidden(ERROR_SHEET);
    let columns = ctx.formulas.iter().filter_map(|f| f.error.as_ref().map(|t| (f.col, t)));
    let any = fill_columns(ctx, &mut sheet, columns);
    if any {
        fill_row_aggregates(ctx, &mut sheet);
    }
    sheet.protection = Some(Protection::default());
    debug!(any, "populated error sheet");
    sheet
}

pub fn populate_required(ctx: &Context<'_>) -> TemplateSheet {
    let mut sheet = TemplateSheet::hidden(REQUIRED_SHEET);
    let columns = ctx.formulas.iter().filter_map(|f| f.required.as_ref().map(|t| (f.col, t)));
    let any = fill_columns(ctx, &mut sheet, columns);
    if any {
        let data = quote_sheet(ctx.data_sheet);
        let first = col_letter(FIRST_FIELD_COL);
        let last = col_letter(ctx.plan.last_col());
        for row in ctx.plan.data_rows() {
            let n = row + 1;
            sheet.write(
                row,
                PAD_COL,
                CellValue::formula(format!("=SUMPRODUCT(LEN({data}!{first}{n}:{last}{n}))>0")),
            );
        }
        fill_row_aggregates(ctx, &mut sheet);
    }
    sheet.protection = Some(Protection::default());
    debug!(any, "populated required sheet");
    sheet
}

/// Write the per-row formulas and the column's first-problem cell. Returns
/// whether any column had a formula.
fn fill_columns<'t>(
    ctx: &Context<'_>,
    sheet: &mut TemplateSheet,
    columns: impl Iterator<Item = (u16, &'t FormulaTemplate)>,
) -> bool {
    let first = DATA_FIRST_ROW + 1;
    let last = ctx.plan.last_row() + 1;
    let mut any = false;
    for (col, template) in columns {
        any = true;
        for row in ctx.plan.data_rows() {
            sheet.write(row, col, CellValue::formula(template.render(row + 1)));
        }
        let c = col_letter(col);
        sheet.write(
            STATUS_ROW,
            col,
            CellValue::formula(format!(
                "=IFERROR(MATCH(TRUE,INDEX({c}{first}:{c}{last}<>0,),)+{offset},0)",
                offset = DATA_FIRST_ROW
            )),
        );
    }
    any
}

/// Column A: 1-based column number of the first problem in the row, or 0.
fn fill_row_aggregates(ctx: &Context<'_>, sheet: &mut TemplateSheet) {
    let first = col_letter(FIRST_FIELD_COL);
    let last = col_letter(ctx.plan.last_col());
    for row in ctx.plan.data_rows() {
        let n = row + 1;
        sheet.write(
            row,
            STATUS_COL,
            CellValue::formula(format!(
                "=IFERROR(MATCH(TRUE,INDEX({first}{n}:{last}{n}<>0,),)+{offset},0)",
                offset = FIRST_FIELD_COL
            )),
        );
    }
}
