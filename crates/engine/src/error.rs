use tabform_config::OptionsError;
use tabform_core::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// A pre-filled record value does not fit its field's format.
    #[error("record {row}, field '{field}': cannot use {value} as {expected}")]
    Coercion {
        field: String,
        /// 1-based record number.
        row: usize,
        value: String,
        expected: &'static str,
    },
    #[error("example value for field '{field}': cannot use {value} as {expected}")]
    Example {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("too many fields: {count} columns do not fit in a sheet")]
    TooManyFields { count: usize },
    #[error("too many records: {count} rows do not fit in a sheet")]
    TooManyRecords { count: usize },
}
