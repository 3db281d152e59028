//! Workbook assembly: layout, formulas, then the four sheets.

use tabform_config::TemplateOptions;
use tabform_core::{RecordRow, Resource, SchemaSet, StyleRegistry, TemplateBook};
use tracing::{debug, info, info_span};

use crate::error::CompileError;
use crate::formula::{synthesize, ColumnFormulaSet};
use crate::layout::LayoutPlan;
use crate::populate::{checks, data, reference, Context};
use crate::reference::ReferencePlan;
use crate::styles::Palette;

/// Everything decided before any cell is written.
#[derive(Debug, Clone)]
pub struct TemplatePlan {
    pub layout: LayoutPlan,
    pub data_sheet: String,
    pub reference: ReferencePlan,
    pub formulas: Vec<ColumnFormulaSet>,
}

impl TemplatePlan {
    pub fn formulas(&self, field_id: &str) -> Option<&ColumnFormulaSet> {
        self.formulas.iter().find(|f| f.field_id == field_id)
    }
}

/// Validate the inputs and compute layout, reference spans and formulas.
pub fn plan_template(
    schema: &SchemaSet,
    records: &[RecordRow],
    resource: &Resource,
    options: &TemplateOptions,
) -> Result<TemplatePlan, CompileError> {
    schema.validate()?;
    options.validate()?;

    let layout = LayoutPlan::new(schema, records, options.default_rows)?;
    let data_sheet = resource.sheet_name(&options.language);
    let reference = ReferencePlan::build(&layout, &data_sheet, &options.language, options.full_text_choices);
    let formulas = synthesize(&layout, &data_sheet, &reference)?;
    debug!(
        columns = layout.columns.len(),
        rows = layout.rows,
        reference_rows = reference.entries.len(),
        "planned template"
    );
    Ok(TemplatePlan {
        layout,
        data_sheet,
        reference,
        formulas,
    })
}

/// Compile a schema into a workbook model. Pass an empty `records` slice for
/// a blank template.
pub fn compile(
    schema: &SchemaSet,
    records: &[RecordRow],
    resource: &Resource,
    options: &TemplateOptions,
) -> Result<TemplateBook, CompileError> {
    let _span = info_span!("compile", resource = %resource.id).entered();

    let plan = plan_template(schema, records, resource, options)?;
    let mut styles = StyleRegistry::new();
    let palette = Palette::register(&mut styles, &options.styles)?;

    let ctx = Context {
        plan: &plan.layout,
        formulas: &plan.formulas,
        reference: &plan.reference,
        resource,
        options,
        records,
        data_sheet: &plan.data_sheet,
        palette,
    };

    let data = data::populate(&ctx, &mut styles)?;
    let reference = reference::populate(&ctx);
    let errors = checks::populate_errors(&ctx);
    let required = checks::populate_required(&ctx);

    info!(
        sheet = %plan.data_sheet,
        fields = plan.layout.columns.len(),
        rows = plan.layout.rows,
        records = records.len(),
        styles = styles.len(),
        "compiled template"
    );
    Ok(TemplateBook {
        sheets: vec![data, reference, errors, required],
        styles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabform_core::{FieldSpec, FormatKind, Role};

    fn schema() -> SchemaSet {
        SchemaSet::new(vec![
            FieldSpec::new("code", FormatKind::Text).with_role(Role::PrimaryKey),
            FieldSpec::new("count", FormatKind::Integer),
        ])
    }

    #[test]
    fn sheet_order() {
        let book = compile(&schema(), &[], &Resource::new("stock", "Stock Levels"), &TemplateOptions::default())
            .unwrap();
        assert_eq!(book.sheet_names(), vec!["StockLevels", "reference", "e1", "r1"]);
        assert!(!book.sheets[0].hidden);
        assert!(!book.sheets[1].hidden);
        assert!(book.sheets[2].hidden);
        assert!(book.sheets[3].hidden);
    }

    #[test]
    fn plan_has_formulas_per_input_column() {
        let plan = plan_template(&schema(), &[], &Resource::new("stock", "Stock"), &TemplateOptions::default())
            .unwrap();
        assert_eq!(plan.formulas.len(), 2);
        assert!(plan.formulas("code").unwrap().required.is_some());
        assert!(plan.formulas("count").unwrap().required.is_none());
        assert!(plan.formulas("count").unwrap().error.is_some());
    }

    #[test]
    fn invalid_options_fail_before_layout() {
        let options = TemplateOptions::default().with_default_rows(0);
        let err = compile(&schema(), &[], &Resource::new("stock", "Stock"), &options).unwrap_err();
        assert!(matches!(err, CompileError::Options(_)));
    }
}
