// Configuration loading

pub mod error;
pub mod options;
pub mod styles;

pub use error::OptionsError;
pub use options::{TemplateOptions, MAX_ROWS};
pub use styles::{hex_to_rgb, StyleConfig, StyleOverride};
