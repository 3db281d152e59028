//! Data entry sheet.

use tabform_core::{
    col_letter, CellRange, CellValue, ConditionalRule, ErrorAlert, FieldSpec, FormatKind, ListValidation,
    Protection, StyleRegistry, TemplateSheet,
};
use tracing::debug;

use super::{Context, ERROR_SHEET, LINE_HEIGHT, REQUIRED_SHEET};
use crate::coerce::coerce;
use crate::error::CompileError;
use crate::layout::{
    Column, CODE_ROW, DATA_FIRST_ROW, EXAMPLE_ROW, FIRST_FIELD_COL, HEADER_ROW, HEADING_ROW, PAD_COL, STATUS_COL,
    STATUS_ROW, TEMPLATE_VERSION,
};
use crate::metrics::estimate_width;
use crate::reference::REF_SHEET;
use crate::styles::{data_column_style, example_cell_style, row_id_style};

const HEADER_HEIGHT: f64 = 27.0;
const HEADING_HEIGHT: f64 = 22.0;
const HEADING_MIN_WIDTH: f64 = 20.0;
const STATUS_HEIGHT: f64 = 6.0;
const STATUS_WIDTH: f64 = 1.0;
const PAD_WIDTH: f64 = 3.0;
/// Joined choice keys shorter than this are listed in the validation message.
const INLINE_CHOICES_MAX: usize = 40;

pub fn populate(ctx: &Context<'_>, styles: &mut StyleRegistry) -> Result<TemplateSheet, CompileError> {
    let plan = ctx.plan;
    let p = ctx.palette;
    let mut sheet = TemplateSheet::new(ctx.data_sheet);
    let last_row = plan.last_row();
    let last_col = plan.last_col();

    // banner and edge
    sheet.write_styled(HEADER_ROW, FIRST_FIELD_COL, CellValue::text(banner(ctx)), p.header);
    sheet.set_row_style(HEADER_ROW, p.header);
    sheet.set_row_height(HEADER_ROW, HEADER_HEIGHT);
    for row in HEADER_ROW..=STATUS_ROW {
        sheet.set_style(row, STATUS_COL, p.edge);
    }

    // code row read back by the upload decoder
    sheet.write(CODE_ROW, STATUS_COL, CellValue::text(TEMPLATE_VERSION));
    sheet.write(CODE_ROW, PAD_COL, CellValue::text(&ctx.resource.id));
    sheet.hide_row(CODE_ROW);

    let example_base = styles.get(p.example).cloned().unwrap_or_default();
    sheet.merge(
        CellRange::new(EXAMPLE_ROW, STATUS_COL, EXAMPLE_ROW, PAD_COL),
        CellValue::text("e.g."),
        p.example,
    );
    sheet.set_row_style(EXAMPLE_ROW, p.example);
    match &ctx.options.example {
        Some(_) => sheet.set_row_height(EXAMPLE_ROW, ctx.options.example_height),
        None => sheet.hide_row(EXAMPLE_ROW),
    }

    let mut heading_lines = 1;
    for column in &plan.columns {
        let field = &column.field;
        let heading = field.heading(ctx.lang());
        heading_lines = heading_lines.max(heading.matches('\n').count());

        let heading_value = match ctx.reference.span(&field.id) {
            Some(span) if !field.is_row_id() => CellValue::Link {
                target: span.link(),
                text: heading.clone(),
            },
            _ => CellValue::text(heading.clone()),
        };
        sheet.write_styled(HEADING_ROW, column.col, heading_value, p.column_heading);
        sheet.write(CODE_ROW, column.col, CellValue::text(&field.id));
        sheet.write_styled(STATUS_ROW, column.col, CellValue::formula(column_status(column)), p.column_heading);
        sheet.set_col_width(column.col, column_width(ctx, field, &heading));

        let example_style = example_cell_style(styles, &example_base, field.kind);
        match example_value(ctx, field)? {
            Some(value) => sheet.write_styled(EXAMPLE_ROW, column.col, value, example_style),
            None => sheet.set_style(EXAMPLE_ROW, column.col, example_style),
        }

        if field.is_row_id() {
            continue;
        }
        let data_style = data_column_style(styles, field.kind);
        for row in plan.data_rows() {
            sheet.set_style(row, column.col, data_style);
        }
        if let Some(validation) = choice_validation(ctx, column) {
            sheet.validations.push(validation);
        }
    }
    sheet.set_row_style(HEADING_ROW, p.column_heading);
    sheet.set_row_height(HEADING_ROW, HEADING_HEIGHT + LINE_HEIGHT * heading_lines as f64);
    sheet.set_row_style(STATUS_ROW, p.column_heading);
    sheet.set_row_height(STATUS_ROW, STATUS_HEIGHT);

    sheet.write_styled(
        DATA_FIRST_ROW,
        PAD_COL,
        CellValue::formula(format!(
            "=IF({REQUIRED_SHEET}!{pad}{row},\"\",\"\u{25B6}\")",
            pad = col_letter(PAD_COL),
            row = DATA_FIRST_ROW + 1
        )),
        p.type_here,
    );
    for row in plan.data_rows() {
        sheet.set_row_height(row, ctx.options.data_row_height);
        sheet.write(row, STATUS_COL, CellValue::formula(row_status(row + 1)));
    }

    fill_records(ctx, &mut sheet, styles)?;

    add_conditional_formats(ctx, &mut sheet, last_row, last_col);

    sheet.set_col_width(STATUS_COL, STATUS_WIDTH);
    sheet.set_col_width(PAD_COL, PAD_WIDTH);
    sheet.freeze = Some((EXAMPLE_ROW, FIRST_FIELD_COL));
    sheet.selection = Some((DATA_FIRST_ROW, FIRST_FIELD_COL));
    sheet.protection = Some(Protection {
        format_rows: true,
        format_columns: true,
    });

    debug!(
        sheet = %sheet.name,
        columns = plan.columns.len(),
        rows = plan.rows,
        validations = sheet.validations.len(),
        "populated data sheet"
    );
    Ok(sheet)
}

fn banner(ctx: &Context<'_>) -> String {
    let name = ctx.resource.name(ctx.lang());
    match &ctx.resource.url {
        Some(url) if name == ctx.resource.id => format!("{name} ({url})"),
        _ => name.to_string(),
    }
}

fn column_width(ctx: &Context<'_>, field: &FieldSpec, heading: &str) -> f64 {
    if let Some(width) = field.column_width {
        return width;
    }
    let width = estimate_width(heading).max(HEADING_MIN_WIDTH);
    let full_text = ctx.options.full_text_choices && field.kind == FormatKind::Choice;
    match ctx.reference.span(&field.id) {
        Some(span) if full_text => width.max(span.choice_width),
        _ => width,
    }
}

/// Jump to the first problem row in this column.
fn column_status(column: &Column) -> String {
    let c = column.letter();
    let r = STATUS_ROW + 1;
    format!(
        "=IF({e}!{c}{r}>0,HYPERLINK(\"#{c}\"&{e}!{c}{r},\"\"),IF({q}!{c}{r}>0,HYPERLINK(\"#{c}\"&{q}!{c}{r},\"\"),\"\"))",
        e = ERROR_SHEET,
        q = REQUIRED_SHEET,
    )
}

/// Jump to the first problem cell in this row (1-based row number).
fn row_status(n: u32) -> String {
    let a = col_letter(STATUS_COL);
    format!(
        "=IF({e}!{a}{n}>0,HYPERLINK(\"#\"&ADDRESS({n},{e}!{a}{n}),\"\"),IF({q}!{a}{n}>0,HYPERLINK(\"#\"&ADDRESS({n},{q}!{a}{n}),\"\"),\"\"))",
        e = ERROR_SHEET,
        q = REQUIRED_SHEET,
    )
}

fn example_value(ctx: &Context<'_>, field: &FieldSpec) -> Result<Option<CellValue>, CompileError> {
    let Some(value) = ctx.options.example.as_ref().and_then(|e| e.get(&field.id)) else {
        return Ok(None);
    };
    let cell = coerce(field, value).map_err(|expected| CompileError::Example {
        field: field.id.clone(),
        value: value.to_string(),
        expected,
    })?;
    // show the choice label too when the dropdown does
    if ctx.options.full_text_choices && field.kind == FormatKind::Choice {
        if let (CellValue::Text(key), Some(choices)) = (&cell, field.choice_list()) {
            if let Some(label) = choices.value(key) {
                return Ok(Some(CellValue::Text(format!("{key}: {label}"))));
            }
        }
    }
    Ok(Some(cell))
}

/// Dropdown for any field with a choice list. Multi-choice cells hold a
/// comma-separated list, which a list validation would reject.
fn choice_validation(ctx: &Context<'_>, column: &Column) -> Option<ListValidation> {
    if column.field.kind == FormatKind::MultiChoice {
        return None;
    }
    let span = ctx.reference.span(&column.field.id)?;
    let source = span.choice_range()?;
    let (first, last) = span.choice_row_numbers()?;
    let keys = column
        .field
        .choice_list()
        .map(|c| c.keys().collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    let message = if keys.chars().count() < INLINE_CHOICES_MAX {
        format!("Please enter one of the valid choices: {keys}")
    } else {
        format!("Please enter one of the valid choices shown on sheet \"{REF_SHEET}\" rows {first}-{last}")
    };
    Some(ListValidation {
        range: CellRange::new(DATA_FIRST_ROW, column.col, ctx.plan.last_row(), column.col),
        source,
        error: Some(ErrorAlert {
            title: "Invalid choice".to_string(),
            message,
        }),
    })
}

fn fill_records(ctx: &Context<'_>, sheet: &mut TemplateSheet, styles: &mut StyleRegistry) -> Result<(), CompileError> {
    if ctx.records.is_empty() {
        return Ok(());
    }
    let id_style = row_id_style(styles);
    for (i, record) in ctx.records.iter().enumerate() {
        let row = DATA_FIRST_ROW + i as u32;
        for column in &ctx.plan.columns {
            let field = &column.field;
            let Some(value) = record.get(&field.id) else {
                continue;
            };
            let cell = coerce(field, value).map_err(|expected| CompileError::Coercion {
                field: field.id.clone(),
                row: i + 1,
                value: value.to_string(),
                expected,
            })?;
            let style = if field.is_row_id() {
                id_style
            } else {
                data_column_style(styles, field.kind)
            };
            sheet.write_styled(row, column.col, cell, style);
        }
    }
    Ok(())
}

/// Row markers, error highlight and required highlight, driven by the
/// hidden sheets. Formulas are relative to each range's top-left cell.
fn add_conditional_formats(ctx: &Context<'_>, sheet: &mut TemplateSheet, last_row: u32, last_col: u16) {
    let p = ctx.palette;
    let a = col_letter(STATUS_COL);
    let c = col_letter(FIRST_FIELD_COL);
    let first = DATA_FIRST_ROW + 1;
    let status = STATUS_ROW + 1;

    sheet.conditional.push(ConditionalRule {
        range: CellRange::new(DATA_FIRST_ROW, STATUS_COL, last_row, STATUS_COL),
        formula: format!("AND({ERROR_SHEET}!{a}{first}=0,{REQUIRED_SHEET}!{a}{first}>0)"),
        style: p.required,
        stop_if_true: true,
    });
    sheet.conditional.push(ConditionalRule {
        range: CellRange::new(STATUS_ROW, STATUS_COL, last_row, last_col),
        formula: format!("AND(ISNUMBER({ERROR_SHEET}!{a}{status}),{ERROR_SHEET}!{a}{status}>0)"),
        style: p.error,
        stop_if_true: true,
    });
    sheet.conditional.push(ConditionalRule {
        range: CellRange::new(STATUS_ROW, FIRST_FIELD_COL, last_row, last_col),
        formula: format!(
            "AND(ISNUMBER({REQUIRED_SHEET}!{c}{status}),{ERROR_SHEET}!{c}{status}=0,{REQUIRED_SHEET}!{c}{status}>0)"
        ),
        style: p.required,
        stop_if_true: true,
    });
}
