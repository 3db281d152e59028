//! Template compiler.
//!
//! Turns a [`SchemaSet`](tabform_core::SchemaSet) into a
//! [`TemplateBook`](tabform_core::TemplateBook): a data sheet whose cells
//! check themselves through formulas on two hidden sheets, plus a reference
//! sheet documenting every field.

pub mod coerce;
pub mod compile;
pub mod error;
pub mod formula;
pub mod layout;
pub mod metrics;
pub mod populate;
pub mod reference;
pub mod styles;

pub use coerce::{excel_serial, from_excel_serial};
pub use compile::{compile, plan_template, TemplatePlan};
pub use error::CompileError;
pub use formula::{synthesize, ColumnFormulaSet, FormulaTemplate};
pub use layout::{Column, LayoutPlan, TEMPLATE_VERSION};
pub use populate::{ERROR_SHEET, REQUIRED_SHEET};
pub use reference::{EntryKind, FieldSpan, ReferenceEntry, ReferencePlan, REF_SHEET};
