//! Default palette and per-compile style registration.

use tabform_config::{OptionsError, StyleConfig};
use tabform_core::{FormatKind, StyleId, StyleRegistry, StyleSpec};

const EDGE: u32 = 0x336B87;
const HEADING: u32 = 0x90AFC5;
const EXAMPLE: u32 = 0xDDD9C4;
const ERROR: u32 = 0xC00000;
const WHITE: u32 = 0xFFFFFF;
const GREY: u32 = 0x666666;

/// Ids of the named styles every template uses.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub edge: StyleId,
    pub header: StyleId,
    pub header2: StyleId,
    pub column_heading: StyleId,
    pub example: StyleId,
    pub error: StyleId,
    pub required: StyleId,
    pub type_here: StyleId,
    pub ref_number: StyleId,
    pub ref_title: StyleId,
    pub ref_attr: StyleId,
    pub ref_value: StyleId,
    pub paper: StyleId,
}

impl Palette {
    /// Register the palette, applying user overrides. The required highlight
    /// starts from the edge style so both read as one band.
    pub fn register(reg: &mut StyleRegistry, overrides: &StyleConfig) -> Result<Self, OptionsError> {
        let edge_spec = overrides
            .edge
            .apply("edge", StyleSpec::new().fill(EDGE).font_color(WHITE))?;
        let required_spec = overrides.required.apply("required", edge_spec.clone())?;
        let header_spec = overrides
            .header
            .apply("header", StyleSpec::new().fill(HEADING).bold().font_size(16))?;
        let heading_spec = overrides.column_heading.apply(
            "column_heading",
            StyleSpec::new().fill(HEADING).wrap().font_color(0x000000).underline(),
        )?;
        let example_spec = overrides
            .example
            .apply("example", StyleSpec::new().fill(EXAMPLE).wrap().top())?;
        let error_spec = overrides
            .error
            .apply("error", StyleSpec::new().fill(ERROR).font_color(WHITE))?;

        Ok(Self {
            edge: reg.register("xlf_edge", edge_spec),
            header: reg.register("xlf_header", header_spec),
            header2: reg.register("xlf_header2", StyleSpec::new().fill(HEADING).center()),
            column_heading: reg.register("xlf_cheading", heading_spec),
            example: reg.register("xlf_example", example_spec),
            error: reg.register("xlf_error", error_spec),
            required: reg.register("xlf_required", required_spec),
            type_here: reg.register("xlf_type_here", StyleSpec::new().bold().font_size(16)),
            ref_number: reg.register("xlf_ref_number", StyleSpec::new()),
            ref_title: reg.register("xlf_ref_title", StyleSpec::new().fill(WHITE).underline()),
            ref_attr: reg.register("xlf_ref_attr", StyleSpec::new().fill(WHITE).font_color(GREY).top()),
            ref_value: reg.register("xlf_ref_value", StyleSpec::new().wrap().top()),
            paper: reg.register("xlf_paper", StyleSpec::new().fill(WHITE)),
        })
    }
}

/// Editable style of a data column: the kind's number format, wrapped, unlocked.
pub fn data_column_style(reg: &mut StyleRegistry, kind: FormatKind) -> StyleId {
    let format = kind.number_format();
    reg.register(
        format!("xlf_data:{format}"),
        StyleSpec::new().num_format(format).wrap().unlocked(),
    )
}

/// Example cell style of a column: example palette with the kind's number format.
pub fn example_cell_style(reg: &mut StyleRegistry, base: &StyleSpec, kind: FormatKind) -> StyleId {
    let format = kind.number_format();
    reg.register(format!("xlf_example:{format}"), base.clone().num_format(format))
}

/// Locked column holding existing row ids.
pub fn row_id_style(reg: &mut StyleRegistry) -> StyleId {
    reg.register("xlf_row_id", StyleSpec::new().num_format("0"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabform_config::StyleOverride;

    #[test]
    fn defaults() {
        let mut reg = StyleRegistry::new();
        let p = Palette::register(&mut reg, &StyleConfig::default()).unwrap();
        let edge = reg.get(p.edge).unwrap();
        assert_eq!(edge.fill, Some(0x336B87));
        assert_eq!(edge.font_color, Some(0xFFFFFF));
        assert_eq!(reg.get(p.required).unwrap(), edge);
        assert_eq!(reg.get(p.error).unwrap().fill, Some(0xC00000));
        assert!(reg.get(p.header).unwrap().bold);
    }

    #[test]
    fn required_inherits_edge_override() {
        let overrides = StyleConfig {
            edge: StyleOverride {
                fill: Some("000080".into()),
                ..Default::default()
            },
            required: StyleOverride {
                font_color: Some("FFFF00".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut reg = StyleRegistry::new();
        let p = Palette::register(&mut reg, &overrides).unwrap();
        let required = reg.get(p.required).unwrap();
        assert_eq!(required.fill, Some(0x000080));
        assert_eq!(required.font_color, Some(0xFFFF00));
    }

    #[test]
    fn column_styles_shared_by_format() {
        let mut reg = StyleRegistry::new();
        let a = data_column_style(&mut reg, FormatKind::Text);
        let b = data_column_style(&mut reg, FormatKind::Choice);
        let c = data_column_style(&mut reg, FormatKind::Date);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(reg.get(c).unwrap().unlocked);
        assert_eq!(reg.get(c).unwrap().num_format.as_deref(), Some("yyyy-mm-dd"));
    }
}
