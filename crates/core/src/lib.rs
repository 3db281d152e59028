//! Core types for tabform: schema fields, records and the template workbook model.

pub mod book;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;
pub mod style;

pub use book::{
    cell_ref, col_letter, quote_sheet, Cell, CellRange, CellValue, ConditionalRule, ErrorAlert,
    ListValidation, Merge, Protection, TemplateBook, TemplateSheet,
};
pub use error::SchemaError;
pub use field::{
    parse_timestamp, Choices, Constraint, FieldSpec, FormatKind, Role, TextAttr, CHOICE_PREDICATE, ROW_ID_FIELD,
};
pub use record::{RecordRow, WriteMode};
pub use schema::{Resource, SchemaSet};
pub use style::{StyleId, StyleRegistry, StyleSpec, VAlign};
