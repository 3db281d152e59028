//! Column and row layout shared by the data, error and required sheets.
//!
//! ```text
//!        A        B      C         D  ...
//!   1  edge    edge     banner
//!   2  edge             heading   heading
//!   3  xlf_v1  res id   field id  field id     (hidden)
//!   4  edge             status    status
//!   5  e.g.             example   example
//!   6  status  marker   data      data
//! ```
//!
//! Every field owns the same column on all three grid sheets, so a formula on
//! the error sheet at `D9` always talks about the data cell at `D9`.

use tabform_core::{col_letter, FieldSpec, FormatKind, RecordRow, SchemaSet, ROW_ID_FIELD};

use crate::error::CompileError;

// 0-based rows
pub const HEADER_ROW: u32 = 0;
pub const HEADING_ROW: u32 = 1;
pub const CODE_ROW: u32 = 2;
pub const STATUS_ROW: u32 = 3;
pub const EXAMPLE_ROW: u32 = 4;
pub const DATA_FIRST_ROW: u32 = 5;

// 0-based columns
pub const STATUS_COL: u16 = 0;
pub const PAD_COL: u16 = 1;
pub const FIRST_FIELD_COL: u16 = 2;

/// Marker in the first cell of the code row.
pub const TEMPLATE_VERSION: &str = "xlf_v1";

/// Excel's last row and column, 0-based.
const MAX_ROW: u32 = 1_048_575;
const MAX_COL: u16 = 16_383;

/// One field placed in a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub col: u16,
    pub field: FieldSpec,
}

impl Column {
    /// 1-based column number.
    pub fn number(&self) -> u32 {
        self.col as u32 + 1
    }

    pub fn letter(&self) -> String {
        col_letter(self.col)
    }

    pub fn id(&self) -> &str {
        &self.field.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub columns: Vec<Column>,
    /// Number of data rows.
    pub rows: u32,
    /// Existing records are being edited, so the `_id` column is shown.
    pub with_row_id: bool,
}

impl LayoutPlan {
    /// Place the template fields from column C in schema order. With records
    /// the row count follows the records and `_id` leads the columns.
    pub fn new(schema: &SchemaSet, records: &[RecordRow], default_rows: u32) -> Result<Self, CompileError> {
        let with_row_id = !records.is_empty();
        let mut fields: Vec<FieldSpec> = schema.template_fields(with_row_id).cloned().collect();
        if with_row_id && !schema.has_row_id() {
            fields.insert(0, FieldSpec::new(ROW_ID_FIELD, FormatKind::Integer));
        }

        let last_col = FIRST_FIELD_COL as usize + fields.len().saturating_sub(1);
        if last_col > MAX_COL as usize {
            return Err(CompileError::TooManyFields { count: fields.len() });
        }
        let rows = if with_row_id { records.len() } else { default_rows as usize };
        if DATA_FIRST_ROW as usize + rows > MAX_ROW as usize + 1 {
            return Err(CompileError::TooManyRecords { count: rows });
        }

        let columns = fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| Column {
                col: FIRST_FIELD_COL + i as u16,
                field,
            })
            .collect();
        Ok(Self {
            columns,
            rows: rows.max(1) as u32,
            with_row_id,
        })
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field.id == id)
    }

    /// Columns that take input: everything except `_id`.
    pub fn input_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.field.is_row_id())
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.field.role.is_primary_key())
    }

    /// Last field column.
    pub fn last_col(&self) -> u16 {
        self.columns.last().map_or(FIRST_FIELD_COL, |c| c.col)
    }

    /// Last data row, 0-based.
    pub fn last_row(&self) -> u32 {
        DATA_FIRST_ROW + self.rows - 1
    }

    /// 0-based data rows.
    pub fn data_rows(&self) -> std::ops::RangeInclusive<u32> {
        DATA_FIRST_ROW..=self.last_row()
    }

    /// Field ids in column order, as written to the code row.
    pub fn ids(&self) -> Vec<&str> {
        self.columns.iter().map(Column::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabform_core::Role;

    fn schema() -> SchemaSet {
        SchemaSet::new(vec![
            FieldSpec::new("_id", FormatKind::Integer),
            FieldSpec::new("code", FormatKind::Text).with_role(Role::PrimaryKey),
            FieldSpec::new("name", FormatKind::Text),
        ])
    }

    #[test]
    fn blank_template_skips_row_id() {
        let plan = LayoutPlan::new(&schema(), &[], 2000).unwrap();
        assert_eq!(plan.ids(), vec!["code", "name"]);
        assert_eq!(plan.columns[0].col, 2);
        assert_eq!(plan.columns[0].letter(), "C");
        assert_eq!(plan.columns[1].number(), 4);
        assert_eq!(plan.rows, 2000);
        assert_eq!(plan.last_row(), 2004);
        assert!(!plan.with_row_id);
    }

    #[test]
    fn records_set_rows_and_row_id() {
        let records = vec![RecordRow::new().with("_id", 7), RecordRow::new().with("_id", 8)];
        let plan = LayoutPlan::new(&schema(), &records, 2000).unwrap();
        assert_eq!(plan.ids(), vec!["_id", "code", "name"]);
        assert_eq!(plan.rows, 2);
        assert_eq!(plan.input_columns().count(), 2);
        assert_eq!(plan.last_col(), 4);
    }

    #[test]
    fn row_id_added_when_schema_lacks_it() {
        let schema = SchemaSet::new(vec![FieldSpec::new("name", FormatKind::Text)]);
        let plan = LayoutPlan::new(&schema, &[RecordRow::new().with("name", "x")], 10).unwrap();
        assert_eq!(plan.ids(), vec!["_id", "name"]);
        assert_eq!(plan.column("name").map(|c| c.col), Some(3));
    }

    #[test]
    fn primary_key_columns() {
        let plan = LayoutPlan::new(&schema(), &[], 5).unwrap();
        let pk: Vec<u16> = plan.primary_key().map(|c| c.col).collect();
        assert_eq!(pk, vec![2]);
    }
}
