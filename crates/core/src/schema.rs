//! Schema set and resource metadata.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::field::{FieldSpec, ROW_ID_FIELD};

/// Ordered fields of one table. Field order is column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSet {
    pub fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaDoc {
    Wrapped { fields: Vec<FieldSpec> },
    Bare(Vec<FieldSpec>),
}

impl SchemaSet {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Parse a schema from JSON, either `{"fields": [...]}` or a bare array,
    /// then validate it.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDoc =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        let fields = match doc {
            SchemaDoc::Wrapped { fields } | SchemaDoc::Bare(fields) => fields,
        };
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    /// Check identifier rules and that choice kinds carry choices.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.iter().all(FieldSpec::is_row_id) {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !valid_id(&field.id) {
                return Err(SchemaError::InvalidId(field.id.clone()));
            }
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateId(field.id.clone()));
            }
            if field.kind.uses_choices() && field.choice_list().is_none() {
                return Err(SchemaError::MissingChoices {
                    field: field.id.clone(),
                    kind: field.kind.name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Fields that become template columns. `_id` is only shown when
    /// existing records are being edited.
    pub fn template_fields(&self, with_row_id: bool) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| with_row_id || !f.is_row_id())
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.role.is_primary_key())
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key().next().is_some()
    }

    pub fn has_row_id(&self) -> bool {
        self.fields.iter().any(FieldSpec::is_row_id)
    }

    /// Identifiers in column order, as written to the hidden code row.
    pub fn column_ids(&self, with_row_id: bool) -> Vec<String> {
        let mut ids: Vec<String> = self.template_fields(with_row_id).map(|f| f.id.clone()).collect();
        if with_row_id && !self.has_row_id() {
            ids.insert(0, ROW_ID_FIELD.to_string());
        }
        ids
    }
}

fn valid_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(['{', '}', '\n', '\r'])
}

/// The table a template is generated for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    /// Display name keyed by language; `""` holds the untranslated name.
    #[serde(default, deserialize_with = "localized_name")]
    pub name: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn localized_name<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Name {
        Plain(String),
        Translated(BTreeMap<String, String>),
    }
    Ok(match Name::deserialize(deserializer)? {
        Name::Plain(s) => BTreeMap::from([(String::new(), s)]),
        Name::Translated(map) => map,
    })
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: BTreeMap::from([(String::new(), name.into())]),
            url: None,
        }
    }

    /// Name in `lang`, then untranslated, then any translation, then the id.
    pub fn name(&self, lang: &str) -> &str {
        self.name
            .get(lang)
            .or_else(|| self.name.get(""))
            .or_else(|| self.name.values().next())
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// Data sheet name: ASCII letters and digits of the name, at most 31 characters.
    pub fn sheet_name(&self, lang: &str) -> String {
        let name: String = self
            .name(lang)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(31)
            .collect();
        if name.is_empty() || is_reserved_sheet_name(&name) {
            "data".to_string()
        } else {
            name
        }
    }
}

fn is_reserved_sheet_name(name: &str) -> bool {
    ["reference", "e1", "r1", "history"]
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}
