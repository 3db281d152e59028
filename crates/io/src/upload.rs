//! Upload reader
//!
//! Reads a filled-in template back. The hidden code row on the first sheet
//! says which resource and which columns the grid holds; it has to match the
//! current schema before any data row is trusted.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_from_rs, Data, Range, Reader, Xlsx};
use serde_json::Value;
use tabform_core::{parse_timestamp, FieldSpec, FormatKind, RecordRow, SchemaSet, WriteMode, ROW_ID_FIELD};
use tabform_engine::from_excel_serial;
use tabform_engine::layout::{CODE_ROW, DATA_FIRST_ROW, FIRST_FIELD_COL, PAD_COL, STATUS_COL, TEMPLATE_VERSION};
use tracing::{debug, info};

use crate::error::UploadError;

/// A cell as read from the upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Serial date number from a date-formatted cell
    DateTime(f64),
}

impl UploadValue {
    pub fn is_empty(&self) -> bool {
        match self {
            UploadValue::Empty => true,
            UploadValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for UploadValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => UploadValue::Empty,
            Data::String(s) => UploadValue::Text(s.clone()),
            Data::Float(n) => UploadValue::Number(*n),
            Data::Int(n) => UploadValue::Number(*n as f64),
            Data::Bool(b) => UploadValue::Bool(*b),
            Data::DateTime(dt) => UploadValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => UploadValue::Text(s.clone()),
            Data::Error(e) => UploadValue::Text(e.to_string()),
        }
    }
}

/// One non-blank data row.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedRow {
    /// Spreadsheet row number (1-based)
    pub number: u32,
    /// One value per code-row column
    pub cells: Vec<UploadValue>,
}

/// First sheet of an uploaded template.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSheet {
    pub sheet_name: String,
    /// Template version from A3
    pub version: String,
    /// Resource id from B3
    pub resource_id: String,
    /// Field ids from C3 onward, trailing blanks removed
    pub column_ids: Vec<String>,
    pub rows: Vec<UploadedRow>,
}

/// A record decoded from one data row.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedRecord {
    /// Spreadsheet row number, for error messages
    pub row: u32,
    pub record: RecordRow,
}

/// Records ready for the store, with the write mode the template implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub mode: WriteMode,
    pub records: Vec<UploadedRecord>,
}

/// Read the first sheet of an uploaded workbook (xlsx, xls, xlsb or ods).
pub fn read_upload(path: &Path) -> Result<UploadedSheet, UploadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| UploadError::Open(e.to_string()))?;
    read_first_sheet(&mut workbook)
}

/// Read the first sheet of an uploaded XLSX held in memory.
pub fn read_upload_bytes(bytes: &[u8]) -> Result<UploadedSheet, UploadError> {
    let mut workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(Cursor::new(bytes)).map_err(|e: calamine::XlsxError| UploadError::Open(e.to_string()))?;
    read_first_sheet(&mut workbook)
}

fn read_first_sheet<RS, R>(workbook: &mut R) -> Result<UploadedSheet, UploadError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let sheet_name = workbook.sheet_names().into_iter().next().ok_or(UploadError::NoSheets)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| UploadError::Open(format!("failed to read sheet '{}': {}", sheet_name, e)))?;
    let sheet = parse_sheet(sheet_name, &range);
    info!(
        sheet = %sheet.sheet_name,
        resource = %sheet.resource_id,
        columns = sheet.column_ids.len(),
        rows = sheet.rows.len(),
        "read upload"
    );
    Ok(sheet)
}

fn value_at(range: &Range<Data>, row: u32, col: u16) -> UploadValue {
    range
        .get_value((row, col as u32))
        .map(UploadValue::from)
        .unwrap_or(UploadValue::Empty)
}

fn code_text(range: &Range<Data>, col: u16) -> String {
    match value_at(range, CODE_ROW, col) {
        UploadValue::Text(s) => s.trim().to_string(),
        UploadValue::Number(n) | UploadValue::DateTime(n) => number_text(n),
        UploadValue::Bool(b) => b.to_string().to_uppercase(),
        UploadValue::Empty => String::new(),
    }
}

fn parse_sheet(sheet_name: String, range: &Range<Data>) -> UploadedSheet {
    let (end_row, end_col) = range.end().unwrap_or((0, 0));

    let mut column_ids: Vec<String> = (FIRST_FIELD_COL as u32..=end_col)
        .map(|col| code_text(range, col as u16))
        .collect();
    // styled but empty columns can extend the used range
    while column_ids.last().is_some_and(|id| id.is_empty()) {
        column_ids.pop();
    }

    let mut rows = Vec::new();
    for row in DATA_FIRST_ROW..=end_row {
        let cells: Vec<UploadValue> = (0..column_ids.len())
            .map(|i| value_at(range, row, FIRST_FIELD_COL + i as u16))
            .collect();
        if cells.iter().all(UploadValue::is_empty) {
            continue;
        }
        rows.push(UploadedRow { number: row + 1, cells });
    }

    UploadedSheet {
        sheet_name,
        version: code_text(range, STATUS_COL),
        resource_id: code_text(range, PAD_COL),
        column_ids,
        rows,
    }
}

impl UploadedSheet {
    /// Verify the code row against `resource_id` and `schema` and pick the
    /// write mode: a leading `_id` column means update, a primary key means
    /// upsert, anything else inserts.
    pub fn check(&self, resource_id: &str, schema: &SchemaSet) -> Result<WriteMode, UploadError> {
        if self.version.is_empty() {
            return Err(UploadError::NotATemplate);
        }
        if self.resource_id != resource_id {
            return Err(UploadError::WrongResource(self.resource_id.clone()));
        }
        let (update, ids) = self.split_row_id();
        let expected = schema.column_ids(false);
        if self.version != TEMPLATE_VERSION || ids != expected.as_slice() {
            return Err(UploadError::OutOfDate {
                expected,
                found: self.column_ids.clone(),
            });
        }
        let mode = if update {
            WriteMode::Update
        } else if schema.has_primary_key() {
            WriteMode::Upsert
        } else {
            WriteMode::Insert
        };
        debug!(%mode, "upload matches schema");
        Ok(mode)
    }

    /// Typed records, one per non-blank row, in sheet order.
    pub fn records(&self, schema: &SchemaSet) -> Result<Vec<UploadedRecord>, UploadError> {
        let row_id = FieldSpec::new(ROW_ID_FIELD, FormatKind::Integer);
        let fields = self
            .column_ids
            .iter()
            .map(|id| match schema.field(id) {
                Some(field) => Ok(field),
                None if id == ROW_ID_FIELD => Ok(&row_id),
                None => Err(UploadError::OutOfDate {
                    expected: schema.column_ids(false),
                    found: self.column_ids.clone(),
                }),
            })
            .collect::<Result<Vec<&FieldSpec>, UploadError>>()?;

        let mut records = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut record = RecordRow::new();
            for (field, value) in fields.iter().zip(&row.cells) {
                if value.is_empty() {
                    continue;
                }
                let json = decode_value(field, value).map_err(|message| UploadError::Value {
                    row: row.number,
                    field: field.id.clone(),
                    message,
                })?;
                record.insert(field.id.clone(), json);
            }
            records.push(UploadedRecord {
                row: row.number,
                record,
            });
        }
        if records.is_empty() {
            return Err(UploadError::Empty);
        }
        Ok(records)
    }

    /// [`check`](Self::check) then [`records`](Self::records).
    pub fn decode(&self, resource_id: &str, schema: &SchemaSet) -> Result<Upload, UploadError> {
        let mode = self.check(resource_id, schema)?;
        let records = self.records(schema)?;
        info!(%mode, records = records.len(), "decoded upload");
        Ok(Upload { mode, records })
    }

    fn split_row_id(&self) -> (bool, &[String]) {
        match self.column_ids.split_first() {
            Some((first, rest)) if first == ROW_ID_FIELD => (true, rest),
            _ => (false, &self.column_ids),
        }
    }
}

/// Integers print without a decimal point.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn plain_text(value: &UploadValue) -> String {
    match value {
        UploadValue::Empty => String::new(),
        UploadValue::Text(s) => s.trim().to_string(),
        UploadValue::Number(n) | UploadValue::DateTime(n) => number_text(*n),
        UploadValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
    }
}

fn decode_value(field: &FieldSpec, value: &UploadValue) -> Result<Value, String> {
    match field.kind {
        FormatKind::Text => Ok(Value::String(plain_text(value))),
        FormatKind::Integer | FormatKind::Numeric | FormatKind::Money => match value {
            UploadValue::Number(n) | UploadValue::DateTime(n) => Ok(number_json(*n)),
            UploadValue::Text(s) => s
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(number_json)
                .ok_or_else(|| format!("\"{}\" is not a number", s.trim())),
            other => Err(format!("\"{}\" is not a number", plain_text(other))),
        },
        FormatKind::Boolean => match value {
            UploadValue::Bool(b) => Ok(Value::Bool(*b)),
            UploadValue::Text(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            UploadValue::Text(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(format!("\"{}\" is not TRUE or FALSE", plain_text(other))),
        },
        FormatKind::Date => match value {
            UploadValue::Number(n) | UploadValue::DateTime(n) => from_excel_serial(*n)
                .map(|ts| Value::String(ts.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| format!("{} is not a date", number_text(*n))),
            UploadValue::Text(s) => parse_timestamp(s)
                .map(|ts| Value::String(ts.format("%Y-%m-%d").to_string()))
                .ok_or_else(|| format!("\"{}\" is not a date (YYYY-MM-DD)", s.trim())),
            other => Err(format!("\"{}\" is not a date", plain_text(other))),
        },
        FormatKind::Timestamp => match value {
            UploadValue::Number(n) | UploadValue::DateTime(n) => from_excel_serial(*n)
                .map(|ts| Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                .ok_or_else(|| format!("{} is not a timestamp", number_text(*n))),
            UploadValue::Text(s) => parse_timestamp(s)
                .map(|ts| Value::String(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                .ok_or_else(|| format!("\"{}\" is not a timestamp (YYYY-MM-DD hh:mm:ss)", s.trim())),
            other => Err(format!("\"{}\" is not a timestamp", plain_text(other))),
        },
        FormatKind::Choice => Ok(Value::String(choice_key(field, &plain_text(value)))),
        FormatKind::MultiChoice => {
            let text = plain_text(value);
            let keys = text
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| Value::String(k.to_string()))
                .collect();
            Ok(Value::Array(keys))
        }
    }
}

/// Reduce a full-text `key: value` choice to its key.
fn choice_key(field: &FieldSpec, text: &str) -> String {
    let Some(choices) = field.choice_list() else {
        return text.to_string();
    };
    if choices.value(text).is_some() {
        return text.to_string();
    }
    match text.split_once(':') {
        Some((key, _)) if choices.value(key.trim()).is_some() => key.trim().to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabform_core::{Choices, Role};

    fn schema() -> SchemaSet {
        SchemaSet::new(vec![
            FieldSpec::new("code", FormatKind::Text).with_role(Role::PrimaryKey),
            FieldSpec::new("when", FormatKind::Date),
            FieldSpec::new("tags", FormatKind::MultiChoice).with_choices(Choices::from_keys(["a", "b", "c"])),
        ])
    }

    fn sheet(ids: &[&str]) -> UploadedSheet {
        UploadedSheet {
            sheet_name: "data".into(),
            version: TEMPLATE_VERSION.into(),
            resource_id: "res-1".into(),
            column_ids: ids.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn check_picks_write_mode() {
        let s = schema();
        assert_eq!(sheet(&["code", "when", "tags"]).check("res-1", &s).unwrap(), WriteMode::Upsert);
        assert_eq!(
            sheet(&["_id", "code", "when", "tags"]).check("res-1", &s).unwrap(),
            WriteMode::Update
        );
        let plain = SchemaSet::new(vec![FieldSpec::new("note", FormatKind::Text)]);
        assert_eq!(sheet(&["note"]).check("res-1", &plain).unwrap(), WriteMode::Insert);
    }

    #[test]
    fn check_rejects_plain_workbook() {
        let mut plain = sheet(&["code", "when", "tags"]);
        plain.version.clear();
        plain.resource_id.clear();
        assert!(matches!(plain.check("res-1", &schema()), Err(UploadError::NotATemplate)));
    }

    #[test]
    fn check_rejects_other_resource() {
        let err = sheet(&["code", "when", "tags"]).check("res-2", &schema()).unwrap_err();
        assert_eq!(err.to_string(), "This template is for a different resource: res-1");
    }

    #[test]
    fn check_rejects_schema_drift() {
        let err = sheet(&["code", "tags", "when"]).check("res-1", &schema()).unwrap_err();
        assert!(matches!(err, UploadError::OutOfDate { .. }));
        assert!(err.to_string().starts_with("This template is out of date."));

        let mut old = sheet(&["code", "when", "tags"]);
        old.version = "xlf_v0".into();
        assert!(matches!(old.check("res-1", &schema()), Err(UploadError::OutOfDate { .. })));
    }

    #[test]
    fn records_are_typed() {
        let mut s = sheet(&["_id", "code", "when", "tags"]);
        s.rows = vec![UploadedRow {
            number: 6,
            cells: vec![
                UploadValue::Number(7.0),
                UploadValue::Text(" A-1 ".into()),
                UploadValue::DateTime(43831.0),
                UploadValue::Text("a, c,".into()),
            ],
        }];
        let records = s.records(&schema()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row, 6);
        let r = &records[0].record;
        assert_eq!(r.get("_id"), Some(&json!(7)));
        assert_eq!(r.get("code"), Some(&json!("A-1")));
        assert_eq!(r.get("when"), Some(&json!("2020-01-01")));
        assert_eq!(r.get("tags"), Some(&json!(["a", "c"])));
    }

    #[test]
    fn bad_value_reports_row() {
        let s = SchemaSet::new(vec![FieldSpec::new("n", FormatKind::Integer)]);
        let mut upload = sheet(&["n"]);
        upload.rows = vec![UploadedRow {
            number: 9,
            cells: vec![UploadValue::Text("lots".into())],
        }];
        let err = upload.records(&s).unwrap_err();
        assert_eq!(err.to_string(), "Data row 9: field 'n': \"lots\" is not a number");
    }

    #[test]
    fn no_rows_is_empty_upload() {
        let err = sheet(&["code", "when", "tags"]).records(&schema()).unwrap_err();
        assert_eq!(err.to_string(), "The template uploaded is empty");
    }

    #[test]
    fn full_text_choice_reduced_to_key() {
        let field = FieldSpec::new("fruit", FormatKind::Choice).with_choices(Choices::new(vec![
            ("A".into(), "Apple".into()),
            ("B".into(), "Banana".into()),
        ]));
        assert_eq!(choice_key(&field, "A: Apple"), "A");
        assert_eq!(choice_key(&field, "B"), "B");
        assert_eq!(choice_key(&field, "Z: Zucchini"), "Z: Zucchini");
    }

    #[test]
    fn numbers_print_like_the_sheet() {
        assert_eq!(number_text(42.0), "42");
        assert_eq!(number_text(2.5), "2.5");
        assert_eq!(number_json(3.0), json!(3));
    }
}
