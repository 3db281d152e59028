use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file '{path}': {message}")]
    Io { path: String, message: String },
    #[error("invalid {format} options: {message}")]
    Parse { format: &'static str, message: String },
    #[error("style '{style}': invalid color '{value}' (expected RRGGBB hex)")]
    Color { style: String, value: String },
    #[error("invalid options: {0}")]
    Invalid(String),
}
