//! Reference sheet entries.
//!
//! The reference sheet documents every input field in column order: a
//! numbered title linking back to the data heading, attribute rows, then the
//! choice list when the field has one. The rows are planned before any sheet
//! is populated because the data sheet links into them and choice formulas
//! read from them.

use tabform_core::{quote_sheet, CellRange, Constraint, FieldSpec, FormatKind, TextAttr};

use crate::layout::{LayoutPlan, HEADING_ROW};
use crate::metrics::estimate_width_from_length;

pub const REF_SHEET: &str = "reference";
/// First title row, 0-based (row 4). A blank row precedes every field block.
pub const REF_FIRST_ROW: u32 = 3;
pub const REF_NUM_COL: u16 = 0;
pub const REF_PAD_COL: u16 = 1;
pub const REF_KEY_COL: u16 = 2;
pub const REF_VALUE_COL: u16 = 3;
pub const REF_KEY_WIDTH: f64 = 18.0;
pub const REF_VALUE_WIDTH: f64 = 114.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Title,
    Attribute,
    ChoiceHeading,
    ChoiceRow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntry {
    pub kind: EntryKind,
    /// 0-based row on the reference sheet.
    pub row: u32,
    /// Values from column C onwards.
    pub cells: Vec<String>,
    /// Titles link back to the field's heading on the data sheet.
    pub link: Option<String>,
    /// Field number shown beside a title, from 1.
    pub number: Option<u32>,
}

/// Reference rows of one field, inclusive and 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpan {
    pub field_id: String,
    pub first_row: u32,
    pub last_row: u32,
    pub choice_rows: Option<(u32, u32)>,
    /// Estimated width of the widest choice label.
    pub choice_width: f64,
}

impl FieldSpan {
    /// Columns A through D of the field block.
    pub fn range(&self) -> CellRange {
        CellRange::new(self.first_row, REF_NUM_COL, self.last_row, REF_VALUE_COL)
    }

    /// Hyperlink target for the data heading, e.g. `#reference!A4:D9`.
    pub fn link(&self) -> String {
        format!("#{}!{}", REF_SHEET, self.range().to_a1())
    }

    /// Range holding the choice keys, e.g. `reference!$C$10:$C$12`.
    pub fn choice_range(&self) -> Option<String> {
        self.choice_rows.map(|(first, last)| {
            format!(
                "{}!{}",
                REF_SHEET,
                CellRange::new(first, REF_KEY_COL, last, REF_KEY_COL).to_absolute()
            )
        })
    }

    /// 1-based choice rows, as shown to users.
    pub fn choice_row_numbers(&self) -> Option<(u32, u32)> {
        self.choice_rows.map(|(first, last)| (first + 1, last + 1))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferencePlan {
    pub entries: Vec<ReferenceEntry>,
    pub spans: Vec<FieldSpan>,
}

impl ReferencePlan {
    pub fn build(plan: &LayoutPlan, data_sheet: &str, lang: &str, full_text_choices: bool) -> Self {
        let mut builder = Builder {
            entries: Vec::new(),
            next_row: REF_FIRST_ROW - 1,
        };
        let mut spans = Vec::new();

        for (number, column) in plan.input_columns().enumerate() {
            let field = &column.field;
            // blank separator
            builder.next_row += 1;
            let first_row = builder.next_row;

            let link = format!("#{}!{}{}", quote_sheet(data_sheet), column.letter(), HEADING_ROW + 1);
            builder.push(EntryKind::Title, vec![title(field, lang)], Some(link), Some(number as u32 + 1));
            builder.attr("ID", &field.id);
            let notes = field.text(TextAttr::Notes, lang);
            if !notes.trim().is_empty() {
                builder.attr("Description", notes);
            }
            builder.attr("Format", field.kind.label());
            for constraint in &field.constraints {
                match constraint {
                    Constraint::Minimum { value } => builder.attr("Minimum", value),
                    Constraint::Maximum { value } => builder.attr("Maximum", value),
                    Constraint::Pattern { value } => builder.attr("Pattern", value),
                    Constraint::Formula { .. } => {}
                }
            }

            let mut choice_rows = None;
            let mut choice_width = 0.0;
            if let Some(choices) = field.choice_list() {
                builder.push(EntryKind::ChoiceHeading, vec!["Values".to_string()], None, None);
                let full_text = full_text_choices && field.kind == FormatKind::Choice;
                let first = builder.next_row;
                let mut longest = 0;
                for (key, value) in choices.iter() {
                    let cells = if full_text {
                        vec![format!("{key}: {value}")]
                    } else if key == value || value.is_empty() {
                        vec![key.to_string()]
                    } else {
                        vec![key.to_string(), value.to_string()]
                    };
                    longest = longest.max(cells[0].chars().count());
                    builder.push(EntryKind::ChoiceRow, cells, None, None);
                }
                choice_rows = Some((first, builder.next_row - 1));
                choice_width = estimate_width_from_length(longest);
            }

            spans.push(FieldSpan {
                field_id: field.id.clone(),
                first_row,
                last_row: builder.next_row - 1,
                choice_rows,
                choice_width,
            });
        }

        Self {
            entries: builder.entries,
            spans,
        }
    }

    pub fn span(&self, field_id: &str) -> Option<&FieldSpan> {
        self.spans.iter().find(|s| s.field_id == field_id)
    }
}

struct Builder {
    entries: Vec<ReferenceEntry>,
    next_row: u32,
}

impl Builder {
    fn push(&mut self, kind: EntryKind, cells: Vec<String>, link: Option<String>, number: Option<u32>) {
        self.entries.push(ReferenceEntry {
            kind,
            row: self.next_row,
            cells,
            link,
            number,
        });
        self.next_row += 1;
    }

    fn attr(&mut self, key: &str, value: &str) {
        self.push(EntryKind::Attribute, vec![key.to_string(), value.to_string()], None, None);
    }
}

fn title(field: &FieldSpec, lang: &str) -> String {
    let heading = field.heading(lang);
    if field.role.is_primary_key() {
        format!("{heading} (Primary Key)")
    } else if field.role.is_required() {
        format!("{heading} (Required)")
    } else {
        heading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabform_core::{Choices, Role, SchemaSet};

    fn plan(fields: Vec<FieldSpec>) -> LayoutPlan {
        LayoutPlan::new(&SchemaSet::new(fields), &[], 10).unwrap()
    }

    #[test]
    fn field_block_rows() {
        let p = plan(vec![
            FieldSpec::new("name", FormatKind::Text)
                .with_label("Name")
                .with_notes("Common name")
                .with_role(Role::Required),
            FieldSpec::new("count", FormatKind::Integer)
                .with_constraint(Constraint::Minimum { value: "0".into() }),
        ]);
        let r = ReferencePlan::build(&p, "Fish", "en", false);

        // name: title row 4, ID, Description, Format
        let name = r.span("name").unwrap();
        assert_eq!((name.first_row, name.last_row), (3, 6));
        assert_eq!(name.link(), "#reference!A4:D7");
        // blank row 8, count: title row 9, ID, Format, Minimum
        let count = r.span("count").unwrap();
        assert_eq!((count.first_row, count.last_row), (8, 11));

        let title = &r.entries[0];
        assert_eq!(title.kind, EntryKind::Title);
        assert_eq!(title.cells, vec!["Name (Required)"]);
        assert_eq!(title.link.as_deref(), Some("#'Fish'!C2"));
        assert_eq!(title.number, Some(1));

        let keys: Vec<&str> = r
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Attribute)
            .map(|e| e.cells[0].as_str())
            .collect();
        assert_eq!(keys, vec!["ID", "Description", "Format", "ID", "Format", "Minimum"]);
        assert_eq!(r.entries.last().unwrap().cells, vec!["Minimum", "0"]);
    }

    #[test]
    fn choice_rows_and_range() {
        let p = plan(vec![FieldSpec::new("fruit", FormatKind::Choice).with_choices(Choices::new(vec![
            ("A".into(), "Apple".into()),
            ("B".into(), "Banana".into()),
            ("C".into(), "C".into()),
        ]))]);
        let r = ReferencePlan::build(&p, "data", "en", false);
        let span = r.span("fruit").unwrap();
        // title 4, ID 5, Format 6, Values 7, choices 8..10
        assert_eq!(span.choice_rows, Some((7, 9)));
        assert_eq!(span.choice_row_numbers(), Some((8, 10)));
        assert_eq!(span.choice_range().as_deref(), Some("reference!$C$8:$C$10"));

        let rows: Vec<Vec<String>> = r
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::ChoiceRow)
            .map(|e| e.cells.clone())
            .collect();
        assert_eq!(rows, vec![vec!["A".to_string(), "Apple".to_string()], vec!["B".into(), "Banana".into()], vec!["C".into()]]);
    }

    #[test]
    fn full_text_choices() {
        let p = plan(vec![FieldSpec::new("fruit", FormatKind::Choice)
            .with_choices(Choices::new(vec![("A".into(), "Apple".into())]))]);
        let r = ReferencePlan::build(&p, "data", "en", true);
        let last = r.entries.last().unwrap();
        assert_eq!(last.cells, vec!["A: Apple"]);
        assert!((r.span("fruit").unwrap().choice_width - 10.4).abs() < 1e-9);
    }

    #[test]
    fn numbers_follow_input_columns() {
        let p = plan(vec![
            FieldSpec::new("a", FormatKind::Text).with_role(Role::PrimaryKey),
            FieldSpec::new("b", FormatKind::Text),
        ]);
        let r = ReferencePlan::build(&p, "data", "en", false);
        let titles: Vec<(u32, &str)> = r
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Title)
            .map(|e| (e.number.unwrap(), e.cells[0].as_str()))
            .collect();
        assert_eq!(titles, vec![(1, "a (Primary Key)"), (2, "b")]);
    }
}
