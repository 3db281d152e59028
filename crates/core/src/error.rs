use thiserror::Error;

/// Problems with a schema that make a template impossible to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema has no fields at all.
    #[error("schema has no fields")]
    Empty,
    /// Field identifier is empty or contains characters reserved for placeholders.
    #[error("invalid field identifier '{0}'")]
    InvalidId(String),
    /// Two fields share one identifier.
    #[error("duplicate field identifier '{0}'")]
    DuplicateId(String),
    /// A formula references a field that is not part of the schema.
    #[error("field '{field}': formula references unknown field '{reference}'")]
    UnknownReference { field: String, reference: String },
    /// A formula fragment could not be parsed (unbalanced braces).
    #[error("field '{field}': malformed formula '{formula}': {reason}")]
    MalformedFormula { field: String, formula: String, reason: String },
    /// `{_choice_range_}` used on a field without a choice list.
    #[error("field '{field}': formula uses the choice range but the field has no choices")]
    NoChoices { field: String },
    /// A choice field was declared without any choices.
    #[error("field '{field}': format '{kind}' requires a choice list")]
    MissingChoices { field: String, kind: String },
    /// A minimum/maximum bound the field's format cannot express.
    #[error("field '{field}': format '{kind}' cannot check bound '{bound}'")]
    UnsupportedBound { field: String, kind: String, bound: String },
    /// Schema document could not be parsed.
    #[error("schema parse error: {0}")]
    Parse(String),
}
