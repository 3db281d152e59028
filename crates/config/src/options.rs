//! Template compile options
//!
//! Loaded from TOML or JSON. Every key is optional:
//!
//! ```toml
//! language = "fr"
//! default_rows = 500
//! full_text_choices = false
//!
//! [example]
//! name = "Chinook salmon"
//! count = 12
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabform_core::RecordRow;

use crate::error::OptionsError;
use crate::styles::StyleConfig;

/// Largest data region that still leaves room for the fixed rows in one sheet.
pub const MAX_ROWS: u32 = 1_048_570;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateOptions {
    /// Language for labels, notes and the resource name.
    pub language: String,
    /// Data rows in a blank template. Pre-filled templates get one row per record.
    pub default_rows: u32,
    /// Show choices as `key: value` in the dropdown instead of bare keys.
    pub full_text_choices: bool,
    /// Example row values by field id. The example row is hidden when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<RecordRow>,
    pub example_height: f64,
    pub data_row_height: f64,
    pub styles: StyleConfig,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            default_rows: 2000,
            full_text_choices: false,
            example: None,
            example_height: 15.0,
            data_row_height: 24.0,
            styles: StyleConfig::default(),
        }
    }
}

impl TemplateOptions {
    pub fn from_toml(input: &str) -> Result<Self, OptionsError> {
        let options: TemplateOptions = toml::from_str(input).map_err(|e| OptionsError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json(input: &str) -> Result<Self, OptionsError> {
        let options: TemplateOptions =
            serde_json::from_str(input).map_err(|e| OptionsError::Parse {
                format: "JSON",
                message: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let input = std::fs::read_to_string(path).map_err(|e| OptionsError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&input)
        } else {
            Self::from_toml(&input)
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.language.trim().is_empty() {
            return Err(OptionsError::Invalid("language must not be empty".into()));
        }
        if self.default_rows == 0 || self.default_rows > MAX_ROWS {
            return Err(OptionsError::Invalid(format!(
                "default_rows must be between 1 and {MAX_ROWS}, got {}",
                self.default_rows
            )));
        }
        for (name, height) in [
            ("example_height", self.example_height),
            ("data_row_height", self.data_row_height),
        ] {
            if !(height > 0.0 && height <= 409.0) {
                return Err(OptionsError::Invalid(format!(
                    "{name} must be between 0 and 409 points, got {height}"
                )));
            }
        }
        self.styles.validate()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_default_rows(mut self, rows: u32) -> Self {
        self.default_rows = rows;
        self
    }

    pub fn with_example(mut self, example: RecordRow) -> Self {
        self.example = Some(example);
        self
    }

    pub fn with_full_text_choices(mut self, on: bool) -> Self {
        self.full_text_choices = on;
        self
    }
}
