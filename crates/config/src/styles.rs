//! Style overrides
//!
//! Each override only touches the attributes it sets; the template's default
//! palette fills in everything else.
//!
//! ```toml
//! [styles.header]
//! fill = "#1F4E79"
//! font_color = "FFFFFF"
//!
//! [styles.error]
//! fill = "FF0000"
//! ```

use serde::{Deserialize, Serialize};
use tabform_core::StyleSpec;

use crate::error::OptionsError;

/// Overrides for one named style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

impl StyleOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the set attributes on top of `base`. `name` is only used in errors.
    pub fn apply(&self, name: &str, mut base: StyleSpec) -> Result<StyleSpec, OptionsError> {
        if let Some(fill) = &self.fill {
            base.fill = Some(parse_color(name, fill)?);
        }
        if let Some(color) = &self.font_color {
            base.font_color = Some(parse_color(name, color)?);
        }
        if let Some(bold) = self.bold {
            base.bold = bold;
        }
        if let Some(size) = self.font_size {
            base.font_size = Some(size);
        }
        if let Some(underline) = self.underline {
            base.underline = underline;
        }
        if let Some(wrap) = self.wrap {
            base.wrap = wrap;
        }
        Ok(base)
    }
}

/// Overrides for the user-facing styles of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Dark band along the sheet edges.
    pub edge: StyleOverride,
    /// Banner with the resource name.
    pub header: StyleOverride,
    pub column_heading: StyleOverride,
    pub example: StyleOverride,
    /// Highlight for invalid cells.
    pub error: StyleOverride,
    /// Highlight for missing required values.
    pub required: StyleOverride,
}

impl StyleConfig {
    pub fn entries(&self) -> [(&'static str, &StyleOverride); 6] {
        [
            ("edge", &self.edge),
            ("header", &self.header),
            ("column_heading", &self.column_heading),
            ("example", &self.example),
            ("error", &self.error),
            ("required", &self.required),
        ]
    }

    pub fn get(&self, name: &str) -> Option<&StyleOverride> {
        self.entries().into_iter().find(|(n, _)| *n == name).map(|(_, o)| o)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        for (name, o) in self.entries() {
            o.apply(name, StyleSpec::default())?;
        }
        Ok(())
    }
}

/// Parse `RRGGBB` or `#RRGGBB` to `0xRRGGBB`.
pub fn hex_to_rgb(hex: &str) -> Option<u32> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn parse_color(style: &str, value: &str) -> Result<u32, OptionsError> {
    hex_to_rgb(value).ok_or_else(|| OptionsError::Color {
        style: style.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(hex_to_rgb("#336B87"), Some(0x336B87));
        assert_eq!(hex_to_rgb("c00000"), Some(0xC00000));
        assert_eq!(hex_to_rgb("fff"), None);
        assert_eq!(hex_to_rgb("+12345"), None);
    }

    #[test]
    fn override_only_touches_set_fields() {
        let base = StyleSpec::new().fill(0x90AFC5).bold().font_size(16);
        let o = StyleOverride {
            fill: Some("#000000".into()),
            bold: Some(false),
            ..Default::default()
        };
        let styled = o.apply("header", base).unwrap();
        assert_eq!(styled.fill, Some(0));
        assert!(!styled.bold);
        assert_eq!(styled.font_size, Some(16));
    }

    #[test]
    fn bad_color_names_the_style() {
        let o = StyleOverride {
            font_color: Some("blue".into()),
            ..Default::default()
        };
        let err = o.apply("error", StyleSpec::default()).unwrap_err();
        assert_eq!(err.to_string(), "style 'error': invalid color 'blue' (expected RRGGBB hex)");
    }
}
