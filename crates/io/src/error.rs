use rust_xlsxwriter::XlsxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to {action} on sheet '{sheet}': {source}")]
    Xlsx {
        sheet: String,
        action: String,
        #[source]
        source: XlsxError,
    },
    #[error("failed to save XLSX file: {0}")]
    Save(#[source] XlsxError),
    #[error("sheet '{sheet}' uses style #{style}, which is not registered")]
    UnknownStyle { sheet: String, style: usize },
}

/// Why an uploaded workbook was rejected.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not read the uploaded file: {0}")]
    Open(String),
    #[error("the uploaded file contains no sheets")]
    NoSheets,
    #[error("the uploaded file is not a template (missing template version in A3)")]
    NotATemplate,
    #[error("This template is for a different resource: {0}")]
    WrongResource(String),
    #[error(
        "This template is out of date. Please try copying your data into the latest version of the template and uploading again."
    )]
    OutOfDate {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("The template uploaded is empty")]
    Empty,
    /// A value that cannot be read for its field. `row` is the spreadsheet
    /// row number.
    #[error("Data row {row}: field '{field}': {message}")]
    Value { row: u32, field: String, message: String },
}
