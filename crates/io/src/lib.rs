// File I/O operations

pub mod error;
pub mod upload;
pub mod xlsx;
pub mod xlsx_validation;

pub use error::{UploadError, WriteError};
pub use upload::{read_upload, read_upload_bytes, Upload, UploadValue, UploadedRecord, UploadedRow, UploadedSheet};
pub use xlsx::{template_to_buffer, write_template, WriteSummary};
