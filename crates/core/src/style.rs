//! Cell styles
//!
//! Styles are registered by name once per compile and referenced from cells,
//! rows, columns and conditional rules by [`StyleId`]. The writer turns each
//! registered style into one spreadsheet format.

use serde::{Deserialize, Serialize};

/// Vertical alignment of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VAlign {
    #[default]
    Bottom,
    Top,
    Center,
}

/// Visual attributes of a cell. Colors are `0xRRGGBB`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleSpec {
    pub fill: Option<u32>,
    pub font_color: Option<u32>,
    pub bold: bool,
    pub font_size: Option<u16>,
    pub underline: bool,
    pub wrap: bool,
    pub valign: VAlign,
    pub num_format: Option<String>,
    /// Editable when the sheet is protected.
    pub unlocked: bool,
}

impl StyleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(mut self, rgb: u32) -> Self {
        self.fill = Some(rgb);
        self
    }

    pub fn font_color(mut self, rgb: u32) -> Self {
        self.font_color = Some(rgb);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn font_size(mut self, size: u16) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap = true;
        self
    }

    pub fn top(mut self) -> Self {
        self.valign = VAlign::Top;
        self
    }

    pub fn center(mut self) -> Self {
        self.valign = VAlign::Center;
        self
    }

    pub fn num_format(mut self, code: impl Into<String>) -> Self {
        self.num_format = Some(code.into());
        self
    }

    pub fn unlocked(mut self) -> Self {
        self.unlocked = true;
        self
    }
}

/// Handle to a style registered in a [`StyleRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StyleId(pub usize);

/// Named styles of one template, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleRegistry {
    styles: Vec<(String, StyleSpec)>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under `name`. A name registered earlier keeps its
    /// first spec and returns the existing id.
    pub fn register(&mut self, name: impl Into<String>, spec: StyleSpec) -> StyleId {
        let name = name.into();
        if let Some(id) = self.id(&name) {
            return id;
        }
        self.styles.push((name, spec));
        StyleId(self.styles.len() - 1)
    }

    pub fn id(&self, name: &str) -> Option<StyleId> {
        self.styles.iter().position(|(n, _)| n == name).map(StyleId)
    }

    pub fn get(&self, id: StyleId) -> Option<&StyleSpec> {
        self.styles.get(id.0).map(|(_, s)| s)
    }

    pub fn name(&self, id: StyleId) -> Option<&str> {
        self.styles.get(id.0).map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &str, &StyleSpec)> {
        self.styles
            .iter()
            .enumerate()
            .map(|(i, (n, s))| (StyleId(i), n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
