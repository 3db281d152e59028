// XLSX template writer

use std::path::Path;
use std::time::Instant;

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatPattern, FormatUnderline, ProtectionOptions, Url, Workbook as XlsxWorkbook,
    Worksheet, XlsxError,
};
use tabform_core::{cell_ref, CellValue, StyleId, StyleRegistry, StyleSpec, TemplateBook, TemplateSheet, VAlign};
use tracing::{debug, info};

use crate::error::WriteError;
use crate::xlsx_validation::{export_conditional_formats, export_validations};

/// Counts from one write, for logging and the CLI summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub sheets: usize,
    /// Cells written with a value or a style, merges excluded
    pub cells: usize,
    pub formulas: usize,
    pub links: usize,
    pub merges: usize,
    pub validations: usize,
    pub conditional_formats: usize,
    pub write_duration_ms: u128,
}

impl WriteSummary {
    /// One-line summary, e.g. `4 sheets, 1200 cells, 300 formulas`
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} sheet{}", self.sheets, if self.sheets == 1 { "" } else { "s" }),
            format!("{} cells", self.cells),
        ];
        if self.formulas > 0 {
            parts.push(format!("{} formulas", self.formulas));
        }
        if self.validations > 0 {
            parts.push(format!("{} validations", self.validations));
        }
        parts.join(", ")
    }
}

/// Write a compiled template to `path`.
pub fn write_template(book: &TemplateBook, path: &Path) -> Result<WriteSummary, WriteError> {
    let start_time = Instant::now();
    let (mut workbook, mut summary) = build_workbook(book)?;
    workbook.save(path).map_err(WriteError::Save)?;
    summary.write_duration_ms = start_time.elapsed().as_millis();
    info!(path = %path.display(), duration_ms = summary.write_duration_ms as u64, "wrote template: {}", summary.summary());
    Ok(summary)
}

/// Serialize a compiled template to XLSX bytes.
pub fn template_to_buffer(book: &TemplateBook) -> Result<Vec<u8>, WriteError> {
    let (mut workbook, summary) = build_workbook(book)?;
    let bytes = workbook.save_to_buffer().map_err(WriteError::Save)?;
    info!(bytes = bytes.len(), "serialized template: {}", summary.summary());
    Ok(bytes)
}

fn build_workbook(book: &TemplateBook) -> Result<(XlsxWorkbook, WriteSummary), WriteError> {
    let formats = Formats::new(&book.styles);
    let mut workbook = XlsxWorkbook::new();
    let mut summary = WriteSummary::default();

    for sheet in &book.sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| xlsx_error(&sheet.name, "create sheet", e))?;
        export_sheet(sheet, worksheet, &formats, &mut summary)?;
        summary.sheets += 1;
    }
    Ok((workbook, summary))
}

pub(crate) fn xlsx_error(sheet: &str, action: impl Into<String>, source: XlsxError) -> WriteError {
    WriteError::Xlsx {
        sheet: sheet.to_string(),
        action: action.into(),
        source,
    }
}

fn export_sheet(
    sheet: &TemplateSheet,
    worksheet: &mut Worksheet,
    formats: &Formats,
    summary: &mut WriteSummary,
) -> Result<(), WriteError> {
    let name = sheet.name.as_str();

    apply_layout(sheet, worksheet, formats)?;

    // Merges first: merge_range() fills the range with blanks, then the
    // origin cell is overwritten with its typed value.
    for merge in &sheet.merges {
        let format = formats.cell(name, merge.style)?;
        let r = &merge.range;
        let text = match &merge.value {
            CellValue::Text(s) => s.as_str(),
            _ => "",
        };
        worksheet
            .merge_range(r.start_row, r.start_col, r.end_row, r.end_col, text, format)
            .map_err(|e| xlsx_error(name, format!("merge {}", r.to_a1()), e))?;
        if !matches!(merge.value, CellValue::Text(_) | CellValue::Blank) {
            write_value(worksheet, r.start_row, r.start_col, &merge.value, Some(format))
                .map_err(|e| xlsx_error(name, format!("write {}", cell_ref(r.start_row, r.start_col)), e))?;
            count_value(&merge.value, summary);
        }
        summary.merges += 1;
    }

    for (row, col, cell) in sheet.cells() {
        if sheet.merges.iter().any(|m| m.range.contains(row, col)) {
            continue;
        }
        let format = cell.style.map(|id| formats.cell(name, id)).transpose()?;
        if matches!(cell.value, CellValue::Blank) && format.is_none() {
            continue;
        }
        write_value(worksheet, row, col, &cell.value, format)
            .map_err(|e| xlsx_error(name, format!("write {}", cell_ref(row, col)), e))?;
        count_value(&cell.value, summary);
        summary.cells += 1;
    }

    summary.validations += export_validations(sheet, worksheet)?;
    summary.conditional_formats += export_conditional_formats(sheet, worksheet, formats)?;

    if let Some((row, col)) = sheet.freeze {
        worksheet
            .set_freeze_panes(row, col)
            .map_err(|e| xlsx_error(name, "set freeze panes", e))?;
    }
    if let Some((row, col)) = sheet.selection {
        worksheet
            .set_selection(row, col, row, col)
            .map_err(|e| xlsx_error(name, "set selection", e))?;
    }
    if let Some(protection) = sheet.protection {
        let mut options = ProtectionOptions::new();
        options.format_rows = protection.format_rows;
        options.format_columns = protection.format_columns;
        worksheet.protect_with_options(&options);
    }
    if sheet.hidden {
        worksheet.set_hidden(true);
    }

    debug!(sheet = name, hidden = sheet.hidden, "exported sheet");
    Ok(())
}

fn count_value(value: &CellValue, summary: &mut WriteSummary) {
    match value {
        CellValue::Formula(_) => summary.formulas += 1,
        CellValue::Link { .. } => summary.links += 1,
        _ => {}
    }
}

/// Write one typed value. Cells without a style fall back to the row or
/// column format Excel applies to empty cells.
fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Blank, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Blank, None) => {}
        (CellValue::Text(s), Some(format)) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        (CellValue::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (CellValue::Number(n), Some(format)) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (CellValue::Bool(b), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        (CellValue::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (CellValue::Formula(source), format) => {
            // rust_xlsxwriter takes the formula without its leading '='
            let formula = source.strip_prefix('=').unwrap_or(source);
            match format {
                Some(format) => worksheet.write_formula_with_format(row, col, formula, format)?,
                None => worksheet.write_formula(row, col, formula)?,
            };
        }
        (CellValue::Link { target, text }, format) => {
            let url = Url::new(internal_link(target)).set_text(text);
            match format {
                Some(format) => worksheet.write_url_with_format(row, col, url, format)?,
                None => worksheet.write_url(row, col, url)?,
            };
        }
    }
    Ok(())
}

/// `#'Sheet'!A1` becomes `internal:'Sheet'!A1`.
fn internal_link(target: &str) -> String {
    format!("internal:{}", target.strip_prefix('#').unwrap_or(target))
}

/// Column widths and formats, then row heights, formats and visibility
fn apply_layout(sheet: &TemplateSheet, worksheet: &mut Worksheet, formats: &Formats) -> Result<(), WriteError> {
    let name = sheet.name.as_str();
    for (col, width) in sheet.col_widths() {
        worksheet
            .set_column_width(col, width)
            .map_err(|e| xlsx_error(name, format!("set column {} width", col), e))?;
    }
    for (col, style) in sheet.col_styles() {
        worksheet
            .set_column_format(col, formats.cell(name, style)?)
            .map_err(|e| xlsx_error(name, format!("set column {} format", col), e))?;
    }
    for (row, style) in sheet.row_styles() {
        worksheet
            .set_row_format(row, formats.cell(name, style)?)
            .map_err(|e| xlsx_error(name, format!("set row {} format", row + 1), e))?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet
            .set_row_height(row, height)
            .map_err(|e| xlsx_error(name, format!("set row {} height", row + 1), e))?;
    }
    for row in sheet.hidden_rows() {
        worksheet
            .set_row_hidden(row)
            .map_err(|e| xlsx_error(name, format!("hide row {}", row + 1), e))?;
    }
    Ok(())
}

// =============================================================================
// Formats
// =============================================================================

/// One cell format and one highlight format per registered style, indexed by
/// [`StyleId`].
pub(crate) struct Formats {
    cells: Vec<Format>,
    highlights: Vec<Format>,
}

impl Formats {
    pub(crate) fn new(styles: &StyleRegistry) -> Self {
        let (cells, highlights) = styles
            .iter()
            .map(|(_, _, spec)| (build_format(spec), build_highlight(spec)))
            .unzip();
        Self { cells, highlights }
    }

    pub(crate) fn cell(&self, sheet: &str, id: StyleId) -> Result<&Format, WriteError> {
        self.cells.get(id.0).ok_or_else(|| unknown_style(sheet, id))
    }

    pub(crate) fn highlight(&self, sheet: &str, id: StyleId) -> Result<&Format, WriteError> {
        self.highlights.get(id.0).ok_or_else(|| unknown_style(sheet, id))
    }
}

fn unknown_style(sheet: &str, id: StyleId) -> WriteError {
    WriteError::UnknownStyle {
        sheet: sheet.to_string(),
        style: id.0,
    }
}

fn build_format(spec: &StyleSpec) -> Format {
    let mut format = build_font(Format::new(), spec);

    if let Some(rgb) = spec.fill {
        format = format
            .set_background_color(Color::RGB(rgb))
            .set_pattern(FormatPattern::Solid);
    }
    if spec.wrap {
        format = format.set_text_wrap();
    }
    format = match spec.valign {
        VAlign::Bottom => format,
        VAlign::Top => format.set_align(FormatAlign::Top),
        VAlign::Center => format.set_align(FormatAlign::VerticalCenter),
    };
    if let Some(code) = &spec.num_format {
        format = format.set_num_format(code);
    }
    if spec.unlocked {
        format = format.set_unlocked();
    }
    format
}

/// Differential format for conditional formatting: fill and font only.
fn build_highlight(spec: &StyleSpec) -> Format {
    let mut format = build_font(Format::new(), spec);
    if let Some(rgb) = spec.fill {
        let color = Color::RGB(rgb);
        format = format
            .set_foreground_color(color)
            .set_background_color(color)
            .set_pattern(FormatPattern::Solid);
    }
    format
}

fn build_font(mut format: Format, spec: &StyleSpec) -> Format {
    if spec.bold {
        format = format.set_bold();
    }
    if spec.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if let Some(size) = spec.font_size {
        format = format.set_font_size(f64::from(size));
    }
    if let Some(rgb) = spec.font_color {
        format = format.set_font_color(Color::RGB(rgb));
    }
    format
}
