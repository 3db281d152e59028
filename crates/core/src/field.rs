//! Schema fields
//!
//! A field is one column of the target table: a stable identifier, localized
//! label/notes, a format kind, constraints, a role and an optional choice list.
//!
//! ## Format kinds
//!
//! The set of kinds is closed. Each kind supplies the spreadsheet number format
//! for its column, an optional validity predicate written as a formula fragment,
//! and the literal syntax used when a minimum/maximum bound is compared against
//! the cell. Fragments use `{_value_}` for the field's own cell and
//! `{_choice_range_}` for the range holding its choice keys.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Identifier of the internal row-id column, present only when editing existing records.
pub const ROW_ID_FIELD: &str = "_id";

/// Whether a field must be filled in, and whether it is part of the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    #[serde(alias = "")]
    None,
    #[serde(alias = "req")]
    Required,
    /// Implies required, and rows may not repeat the key combination.
    #[serde(alias = "pk")]
    PrimaryKey,
}

impl Role {
    pub fn is_required(self) -> bool {
        matches!(self, Role::Required | Role::PrimaryKey)
    }

    pub fn is_primary_key(self) -> bool {
        self == Role::PrimaryKey
    }
}

/// True when the trimmed value is not exactly one of the choice keys.
/// EXACT and FIND take no wildcards, unlike COUNTIF criteria and SEARCH.
pub const CHOICE_PREDICATE: &str = "SUMPRODUCT(--EXACT({_choice_range_},TRIM({_value_})))=0";

/// Column type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Text,
    #[serde(alias = "int", alias = "bigint")]
    Integer,
    #[serde(alias = "number", alias = "float")]
    Numeric,
    Money,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    Timestamp,
    /// One key from the choice list.
    Choice,
    /// Comma-separated keys from the choice list.
    #[serde(alias = "choices")]
    MultiChoice,
}

impl FormatKind {
    /// Short machine name, as written in schema files.
    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Text => "text",
            FormatKind::Integer => "integer",
            FormatKind::Numeric => "numeric",
            FormatKind::Money => "money",
            FormatKind::Boolean => "boolean",
            FormatKind::Date => "date",
            FormatKind::Timestamp => "timestamp",
            FormatKind::Choice => "choice",
            FormatKind::MultiChoice => "multi_choice",
        }
    }

    /// Human-readable label shown on the reference sheet.
    pub fn label(self) -> &'static str {
        match self {
            FormatKind::Text => "Text",
            FormatKind::Integer => "Integer",
            FormatKind::Numeric => "Numeric",
            FormatKind::Money => "Money",
            FormatKind::Boolean => "Yes/No (TRUE or FALSE)",
            FormatKind::Date => "Date (YYYY-MM-DD)",
            FormatKind::Timestamp => "Date and Time (YYYY-MM-DD hh:mm:ss)",
            FormatKind::Choice => "Choice",
            FormatKind::MultiChoice => "Choices (separated by commas)",
        }
    }

    /// Number format code applied to the column's data cells.
    pub fn number_format(self) -> &'static str {
        match self {
            FormatKind::Text | FormatKind::Choice | FormatKind::MultiChoice => "@",
            FormatKind::Integer => "#,##0",
            FormatKind::Numeric | FormatKind::Boolean => "General",
            FormatKind::Money => "$#,##0.00",
            FormatKind::Date => "yyyy-mm-dd",
            FormatKind::Timestamp => "yyyy-mm-dd hh:mm:ss",
        }
    }

    /// Formula fragment that is true when a non-empty cell is not a valid value.
    pub fn validity_predicate(self) -> Option<&'static str> {
        match self {
            FormatKind::Text => None,
            FormatKind::Integer => Some("NOT(IFERROR(INT({_value_})={_value_},FALSE))"),
            FormatKind::Numeric | FormatKind::Money | FormatKind::Date | FormatKind::Timestamp => {
                Some("NOT(ISNUMBER({_value_}))")
            }
            FormatKind::Boolean => Some("NOT(ISLOGICAL({_value_}))"),
            FormatKind::Choice => Some(CHOICE_PREDICATE),
            // item count (commas + 1) must equal the number of choice keys found as whole items
            FormatKind::MultiChoice => Some(
                "(LEN({_value_})-LEN(SUBSTITUTE({_value_},\",\",\"\"))+1)\
                 <>SUMPRODUCT(--ISNUMBER(FIND(\",\"&SUBSTITUTE({_choice_range_},\" \",\"\")&\",\",\
                 \",\"&SUBSTITUTE({_value_},\" \",\"\")&\",\")))",
            ),
        }
    }

    /// Formula literal for a minimum/maximum bound, or `None` when this kind
    /// has no ordering or the bound does not parse.
    pub fn bound_literal(self, bound: &str) -> Option<String> {
        let bound = bound.trim();
        match self {
            FormatKind::Integer | FormatKind::Numeric | FormatKind::Money => {
                let n: f64 = bound.parse().ok()?;
                n.is_finite().then(|| n.to_string())
            }
            FormatKind::Date => {
                let d = NaiveDate::parse_from_str(bound, "%Y-%m-%d").ok()?;
                Some(format!("DATE({},{},{})", d.year(), d.month(), d.day()))
            }
            FormatKind::Timestamp => {
                let ts = parse_timestamp(bound)?;
                Some(format!(
                    "(DATE({},{},{})+TIME({},{},{}))",
                    ts.year(),
                    ts.month(),
                    ts.day(),
                    ts.hour(),
                    ts.minute(),
                    ts.second()
                ))
            }
            _ => None,
        }
    }

    pub fn uses_choices(self) -> bool {
        matches!(self, FormatKind::Choice | FormatKind::MultiChoice)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, FormatKind::Integer | FormatKind::Numeric | FormatKind::Money)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a timestamp as written in schemas and records.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, the `T` separated form, an optional
/// trailing ` UTC`/`Z`, and a bare date (midnight).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let text = text
        .strip_suffix(" UTC")
        .or_else(|| text.strip_suffix('Z'))
        .unwrap_or(text);
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A named restriction on a field's values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Constraint {
    Minimum {
        #[serde(deserialize_with = "bound_text")]
        value: String,
    },
    Maximum {
        #[serde(deserialize_with = "bound_text")]
        value: String,
    },
    /// Documented on the reference sheet only; spreadsheet formulas have no regex.
    Pattern { value: String },
    /// Custom fragment, true when the value is invalid. May reference other
    /// fields of the same row as `{field_id}`.
    Formula { name: String, formula: String },
}

impl Constraint {
    /// Formula fragment that is true when the constraint is violated.
    pub fn predicate(&self, field: &FieldSpec) -> Result<Option<String>, SchemaError> {
        let (op, bound) = match self {
            Constraint::Minimum { value } => ("<", value),
            Constraint::Maximum { value } => (">", value),
            Constraint::Pattern { .. } => return Ok(None),
            Constraint::Formula { formula, .. } => return Ok(Some(formula.clone())),
        };
        let literal = field.kind.bound_literal(bound).ok_or_else(|| SchemaError::UnsupportedBound {
            field: field.id.clone(),
            kind: field.kind.name().to_string(),
            bound: bound.clone(),
        })?;
        Ok(Some(format!("{{_value_}}{op}{literal}")))
    }
}

fn bound_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string or number bound, got {other}"))),
    }
}

/// Ordered (key, value) choices. Document order is kept when read from a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices(Vec<(String, String)>);

impl Choices {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// Choices whose value is the key itself.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            keys.into_iter()
                .map(|k| {
                    let k = k.into();
                    (k.clone(), k)
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Choices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Choices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChoicesVisitor;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Item {
            Pair(String, String),
            Key(String),
        }

        impl<'de> Visitor<'de> for ChoicesVisitor {
            type Value = Choices;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of key to value, or a list of keys / [key, value] pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Choices, A::Error> {
                let mut pairs = Vec::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    pairs.push((k, v));
                }
                Ok(Choices(pairs))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Choices, A::Error> {
                let mut pairs = Vec::new();
                while let Some(item) = access.next_element::<Item>()? {
                    pairs.push(match item {
                        Item::Pair(k, v) => (k, v),
                        Item::Key(k) => (k.clone(), k),
                    });
                }
                Ok(Choices(pairs))
            }
        }

        deserializer.deserialize_any(ChoicesVisitor)
    }
}

/// Localized text attributes of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAttr {
    Label,
    Notes,
}

impl TextAttr {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAttr::Label => "label",
            TextAttr::Notes => "notes",
        }
    }
}

/// One column of the target table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    /// Label and notes, keyed `label`, `label_fr`, `notes`, ...
    #[serde(default)]
    pub info: BTreeMap<String, String>,
    #[serde(default, rename = "type")]
    pub kind: FormatKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, alias = "tdpkreq")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
    /// Fixed column width; estimated from the heading when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_width: Option<f64>,
    /// Extra condition for the field to be required, e.g. `{kind}="other"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_formula: Option<String>,
}

impl FieldSpec {
    pub fn new(id: impl Into<String>, kind: FormatKind) -> Self {
        Self {
            id: id.into(),
            info: BTreeMap::new(),
            kind,
            constraints: Vec::new(),
            role: Role::None,
            choices: None,
            column_width: None,
            required_formula: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.info.insert("label".to_string(), label.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.info.insert("notes".to_string(), notes.into());
        self
    }

    /// Set a translated attribute, e.g. `with_text(TextAttr::Label, "fr", "Nom")`.
    pub fn with_text(mut self, attr: TextAttr, lang: &str, text: impl Into<String>) -> Self {
        self.info.insert(format!("{}_{}", attr.as_str(), lang), text.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_column_width(mut self, width: f64) -> Self {
        self.column_width = Some(width);
        self
    }

    pub fn with_required_formula(mut self, formula: impl Into<String>) -> Self {
        self.required_formula = Some(formula.into());
        self
    }

    /// Text for `attr` in `lang`, falling back to the untranslated attribute, then "".
    pub fn text(&self, attr: TextAttr, lang: &str) -> &str {
        self.info
            .get(&format!("{}_{}", attr.as_str(), lang))
            .or_else(|| self.info.get(attr.as_str()))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Column heading: the trimmed label, or the identifier when unlabeled.
    pub fn heading(&self, lang: &str) -> String {
        let label = self.text(TextAttr::Label, lang).trim();
        if label.is_empty() {
            self.id.clone()
        } else {
            label.to_string()
        }
    }

    pub fn is_row_id(&self) -> bool {
        self.id == ROW_ID_FIELD
    }

    /// Choice list, only for kinds that use one.
    pub fn choice_list(&self) -> Option<&Choices> {
        self.choices.as_ref().filter(|c| !c.is_empty())
    }
}
