//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts that build or check templates rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | input            | Schema, records and options files        |
//! | 10-19   | template         | Compiling and writing the workbook       |
//! | 20-29   | check            | Reading back an uploaded workbook        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Schema file is not valid JSON or breaks a schema rule.
pub const EXIT_SCHEMA: u8 = 3;

/// Records file is not a JSON array of objects.
pub const EXIT_RECORDS: u8 = 4;

/// Options file failed to parse or holds an out-of-range value.
pub const EXIT_OPTIONS: u8 = 5;

// =============================================================================
// Template (10-19)
// =============================================================================

/// Compile failed: bad formula, record value or example value.
pub const EXIT_COMPILE: u8 = 10;

/// The workbook could not be written.
pub const EXIT_WRITE: u8 = 11;

// =============================================================================
// Check (20-29)
// =============================================================================

/// The upload is not a readable workbook.
pub const EXIT_UPLOAD_OPEN: u8 = 20;

/// The template belongs to another resource.
pub const EXIT_UPLOAD_RESOURCE: u8 = 21;

/// The template was built from an older schema.
pub const EXIT_UPLOAD_OUT_OF_DATE: u8 = 22;

/// The upload holds no data rows.
pub const EXIT_UPLOAD_EMPTY: u8 = 23;

/// A cell value does not fit its field.
pub const EXIT_UPLOAD_VALUE: u8 = 24;
