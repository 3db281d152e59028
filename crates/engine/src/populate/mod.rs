//! Sheet populators. Each one turns the compile plan into one [`TemplateSheet`].
//!
//! [`TemplateSheet`]: tabform_core::TemplateSheet

pub mod checks;
pub mod data;
pub mod reference;

use tabform_config::TemplateOptions;
use tabform_core::{RecordRow, Resource};

use crate::formula::ColumnFormulaSet;
use crate::layout::LayoutPlan;
use crate::reference::ReferencePlan;
use crate::styles::Palette;

pub const ERROR_SHEET: &str = "e1";
pub const REQUIRED_SHEET: &str = "r1";

/// Row height of one extra line of text.
pub const LINE_HEIGHT: f64 = 15.0;

/// Everything a populator reads.
pub struct Context<'a> {
    pub plan: &'a LayoutPlan,
    pub formulas: &'a [ColumnFormulaSet],
    pub reference: &'a ReferencePlan,
    pub resource: &'a Resource,
    pub options: &'a TemplateOptions,
    pub records: &'a [RecordRow],
    pub data_sheet: &'a str,
    pub palette: Palette,
}

impl Context<'_> {
    pub fn lang(&self) -> &str {
        &self.options.language
    }
}
