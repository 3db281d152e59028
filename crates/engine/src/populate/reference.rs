//! Reference sheet.

use tabform_core::{CellRange, CellValue, Protection, TemplateSheet};

use super::{Context, LINE_HEIGHT};
use crate::metrics::wrap;
use crate::reference::{
    EntryKind, REF_KEY_COL, REF_KEY_WIDTH, REF_NUM_COL, REF_PAD_COL, REF_SHEET, REF_VALUE_COL, REF_VALUE_WIDTH,
};

const HEADER_HEIGHT: f64 = 27.0;
const TITLE_HEIGHT: f64 = 24.0;
const CHOICE_HEADING_HEIGHT: f64 = 24.0;

pub fn populate(ctx: &Context<'_>) -> TemplateSheet {
    let p = ctx.palette;
    let mut sheet = TemplateSheet::new(REF_SHEET);

    sheet.write_styled(0, REF_KEY_COL, CellValue::text(ctx.resource.name(ctx.lang())), p.header);
    sheet.write_styled(1, REF_KEY_COL, CellValue::text("Reference"), p.header2);
    sheet.set_row_style(0, p.header);
    sheet.set_row_style(1, p.header2);
    sheet.set_row_height(0, HEADER_HEIGHT);
    sheet.set_row_height(1, HEADER_HEIGHT);
    sheet.set_style(0, REF_NUM_COL, p.edge);
    sheet.set_style(1, REF_NUM_COL, p.edge);

    for entry in &ctx.reference.entries {
        let row = entry.row;
        sheet.set_row_style(row, p.paper);
        match entry.kind {
            EntryKind::Title => {
                let number = entry.number.unwrap_or_default();
                sheet.merge(
                    CellRange::new(row, REF_NUM_COL, row, REF_PAD_COL),
                    CellValue::Number(number as f64),
                    p.ref_number,
                );
                let text = entry.cells.first().map(|s| s.trim().to_string()).unwrap_or_default();
                let value = match &entry.link {
                    Some(target) => CellValue::Link {
                        target: target.clone(),
                        text,
                    },
                    None => CellValue::Text(text),
                };
                sheet.merge(CellRange::new(row, REF_KEY_COL, row, REF_VALUE_COL), value, p.ref_title);
                sheet.set_row_height(row, TITLE_HEIGHT);
            }
            EntryKind::Attribute => {
                write_pair(&mut sheet, row, &entry.cells, p.ref_attr, p.ref_value);
            }
            EntryKind::ChoiceHeading => {
                write_pair(&mut sheet, row, &entry.cells, p.ref_attr, p.ref_value);
                sheet.set_row_height(row, CHOICE_HEADING_HEIGHT);
            }
            EntryKind::ChoiceRow => {
                sheet.set_style(row, REF_PAD_COL, p.example);
                write_pair(&mut sheet, row, &entry.cells, p.example, p.example);
            }
        }
    }

    sheet.set_col_width(REF_NUM_COL, 1.0);
    sheet.set_col_width(REF_PAD_COL, 3.0);
    sheet.set_col_width(REF_KEY_COL, REF_KEY_WIDTH);
    sheet.set_col_width(REF_VALUE_COL, REF_VALUE_WIDTH);
    sheet.protection = Some(Protection::default());
    sheet
}

/// Key in column C, value (wrapped) in column D. Two-cell rows grow one line
/// height per wrapped line.
fn write_pair(
    sheet: &mut TemplateSheet,
    row: u32,
    cells: &[String],
    key_style: tabform_core::StyleId,
    value_style: tabform_core::StyleId,
) {
    match cells {
        [key, value] => {
            let value = wrap(value, REF_VALUE_WIDTH).trim().to_string();
            let lines = value.matches('\n').count() + 1;
            sheet.write_styled(row, REF_KEY_COL, CellValue::text(key.trim()), key_style);
            sheet.write_styled(row, REF_VALUE_COL, CellValue::Text(value), value_style);
            sheet.set_row_height(row, LINE_HEIGHT * lines as f64);
        }
        [key, ..] => {
            sheet.write_styled(row, REF_KEY_COL, CellValue::text(key.trim()), key_style);
            sheet.set_style(row, REF_VALUE_COL, value_style);
        }
        [] => {
            sheet.set_style(row, REF_KEY_COL, key_style);
            sheet.set_style(row, REF_VALUE_COL, value_style);
        }
    }
}
