//! Template workbook model
//!
//! The compiler fills a [`TemplateBook`] and the writer serializes it. Rows and
//! columns are 0-indexed here, matching the xlsx writer; A1 strings are only
//! produced for formulas and ranges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::style::{StyleId, StyleRegistry};

// ============================================================================
// References
// ============================================================================

/// Column letters for a 0-indexed column (0 -> A, 26 -> AA).
pub fn col_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32 + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// A1 reference for a 0-indexed cell (0, 0 -> A1).
pub fn cell_ref(row: u32, col: u16) -> String {
    format!("{}{}", col_letter(col), row + 1)
}

/// Sheet name as written inside formulas: `'name'`.
pub fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// A rectangular range of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u16,
    /// Inclusive.
    pub end_row: u32,
    /// Inclusive.
    pub end_col: u16,
}

impl CellRange {
    pub fn new(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
        }
    }

    pub fn single(row: u32, col: u16) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    /// `C6:C105`, or `C6` for a single cell.
    pub fn to_a1(&self) -> String {
        let start = cell_ref(self.start_row, self.start_col);
        if self.start_row == self.end_row && self.start_col == self.end_col {
            start
        } else {
            format!("{}:{}", start, cell_ref(self.end_row, self.end_col))
        }
    }

    /// `$C$6:$C$105`.
    pub fn to_absolute(&self) -> String {
        format!(
            "${}${}:${}${}",
            col_letter(self.start_col),
            self.start_row + 1,
            col_letter(self.end_col),
            self.end_row + 1
        )
    }
}

// ============================================================================
// Cells
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Style-only cell.
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula text including the leading `=`.
    Formula(String),
    /// In-workbook hyperlink, target like `#'reference'!A4:D9`.
    Link { target: String, text: String },
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn formula(s: impl Into<String>) -> Self {
        CellValue::Formula(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Link { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<StyleId>,
}

/// Merged range, written with the value of its top-left cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub range: CellRange,
    pub value: CellValue,
    pub style: StyleId,
}

/// Error alert shown when list validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAlert {
    pub title: String,
    pub message: String,
}

/// Dropdown list validation whose items come from a range formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListValidation {
    pub range: CellRange,
    /// Source without the leading `=`, e.g. `reference!$C$10:$C$12`.
    pub source: String,
    pub error: Option<ErrorAlert>,
}

/// Formula-driven conditional format. The formula is relative to the
/// top-left cell of `range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub range: CellRange,
    pub formula: String,
    pub style: StyleId,
    pub stop_if_true: bool,
}

/// Sheet protection. Cells are locked unless their style is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Protection {
    pub format_rows: bool,
    pub format_columns: bool,
}

// ============================================================================
// Sheets
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSheet {
    pub name: String,
    pub hidden: bool,
    cells: BTreeMap<(u32, u16), Cell>,
    pub merges: Vec<Merge>,
    pub validations: Vec<ListValidation>,
    pub conditional: Vec<ConditionalRule>,
    row_heights: BTreeMap<u32, f64>,
    hidden_rows: BTreeSet<u32>,
    row_styles: BTreeMap<u32, StyleId>,
    col_widths: BTreeMap<u16, f64>,
    col_styles: BTreeMap<u16, StyleId>,
    /// Top-left unfrozen cell.
    pub freeze: Option<(u32, u16)>,
    pub selection: Option<(u32, u16)>,
    pub protection: Option<Protection>,
}

impl TemplateSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::new(name)
        }
    }

    pub fn write(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.insert((row, col), Cell { value, style: None });
    }

    pub fn write_styled(&mut self, row: u32, col: u16, value: CellValue, style: StyleId) {
        self.cells.insert((row, col), Cell { value, style: Some(style) });
    }

    /// Style a cell, keeping its value if it has one.
    pub fn set_style(&mut self, row: u32, col: u16, style: StyleId) {
        self.cells
            .entry((row, col))
            .and_modify(|c| c.style = Some(style))
            .or_insert(Cell { value: CellValue::Blank, style: Some(style) });
    }

    pub fn merge(&mut self, range: CellRange, value: CellValue, style: StyleId) {
        self.merges.push(Merge { range, value, style });
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cell(row, col).map(|c| &c.value)
    }

    pub fn formula(&self, row: u32, col: u16) -> Option<&str> {
        self.value(row, col).and_then(CellValue::as_formula)
    }

    pub fn text(&self, row: u32, col: u16) -> Option<&str> {
        self.value(row, col).and_then(CellValue::as_text)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &Cell)> {
        self.cells.iter().map(|(&(r, c), cell)| (r, c, cell))
    }

    /// Merge whose range starts at `(row, col)`.
    pub fn merge_at(&self, row: u32, col: u16) -> Option<&Merge> {
        self.merges
            .iter()
            .find(|m| m.range.start_row == row && m.range.start_col == col)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(&r, &h)| (r, h))
    }

    pub fn hide_row(&mut self, row: u32) {
        self.hidden_rows.insert(row);
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    pub fn hidden_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.hidden_rows.iter().copied()
    }

    pub fn set_row_style(&mut self, row: u32, style: StyleId) {
        self.row_styles.insert(row, style);
    }

    pub fn row_styles(&self) -> impl Iterator<Item = (u32, StyleId)> + '_ {
        self.row_styles.iter().map(|(&r, &s)| (r, s))
    }

    pub fn set_col_width(&mut self, col: u16, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn col_width(&self, col: u16) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    pub fn col_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.col_widths.iter().map(|(&c, &w)| (c, w))
    }

    pub fn set_col_style(&mut self, col: u16, style: StyleId) {
        self.col_styles.insert(col, style);
    }

    pub fn col_style(&self, col: u16) -> Option<StyleId> {
        self.col_styles.get(&col).copied()
    }

    pub fn col_styles(&self) -> impl Iterator<Item = (u16, StyleId)> + '_ {
        self.col_styles.iter().map(|(&c, &s)| (c, s))
    }

    /// Last used row, counting cells and merges.
    pub fn last_row(&self) -> Option<u32> {
        let cells = self.cells.keys().map(|&(r, _)| r);
        let merges = self.merges.iter().map(|m| m.range.end_row);
        cells.chain(merges).max()
    }
}

// ============================================================================
// Workbook
// ============================================================================

/// Compiled template: data, reference, error and required sheets in that
/// order, plus the styles they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateBook {
    pub sheets: Vec<TemplateSheet>,
    pub styles: StyleRegistry,
}

impl TemplateBook {
    pub fn sheet(&self, name: &str) -> Option<&TemplateSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut TemplateSheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// The visible data-entry sheet.
    pub fn data_sheet(&self) -> Option<&TemplateSheet> {
        self.sheets.first()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
