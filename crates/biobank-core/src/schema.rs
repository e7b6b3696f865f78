//! Declarative schemas for raw server records.
//!
//! Every entity factory validates the untyped JSON it receives against a
//! [`Schema`] before building typed values from it. A schema lists fields
//! with a [`FieldType`] and whether they are required; nested objects are
//! described by [`FieldType::Ref`], resolved against a set of additional
//! schemas passed alongside the root one.
//!
//! Validation is pure: the candidate value is never mutated, and the
//! outcome is a [`Validation`] carrying a human-readable reason on failure.

use chrono::DateTime;
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Type expected for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    Boolean,
    /// An RFC 3339 string.
    Timestamp,
    /// Any JSON object, contents unchecked.
    Object,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
    Array(Box<FieldType>),
    /// An object validated against the additional schema with this id.
    Ref(String),
    Any,
}

impl FieldType {
    pub fn array_of(item: FieldType) -> Self {
        Self::Array(Box::new(item))
    }

    pub fn reference(schema_id: impl Into<String>) -> Self {
        Self::Ref(schema_id.into())
    }

    pub fn one_of(values: &[&str]) -> Self {
        Self::Enum(values.iter().map(|v| (*v).to_string()).collect())
    }

    fn name(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Number => "number".into(),
            Self::Integer => "integer".into(),
            Self::Boolean => "boolean".into(),
            Self::Timestamp => "timestamp".into(),
            Self::Object => "object".into(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
            Self::Array(item) => format!("array of {}", item.name()),
            Self::Ref(id) => id.clone(),
            Self::Any => "any".into(),
        }
    }
}

/// Specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    /// The key must be present.
    pub required: bool,
    /// `null` is accepted in place of a value.
    pub nullable: bool,
}

impl FieldSpec {
    /// A field that must be present and non-null.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            nullable: false,
        }
    }

    /// A field that may be absent or `null`.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            nullable: true,
        }
    }

    /// Marks a required field as accepting `null`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A named set of field specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: String,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Adds the fields every server-backed record carries.
    #[must_use]
    pub fn with_record_fields(self) -> Self {
        self.field(FieldSpec::required("id", FieldType::String).nullable())
            .field(FieldSpec::required("version", FieldType::Integer))
            .field(FieldSpec::required("timeAdded", FieldType::Timestamp))
            .field(FieldSpec::optional("timeModified", FieldType::Timestamp))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub message: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }

    /// Converts a failed validation into [`DomainError::Validation`].
    pub fn into_result(self) -> DomainResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(DomainError::Validation(
                self.message.unwrap_or_else(|| "validation failed".into()),
            ))
        }
    }
}

/// Validates `value` against `schema`, resolving references in `additional`.
pub fn validate(schema: &Schema, additional: &[Schema], value: &Value) -> Validation {
    match check_object(schema, additional, value, "") {
        Ok(()) => Validation::ok(),
        Err(message) => {
            tracing::warn!(schema = %schema.id, %message, "record failed schema validation");
            Validation::fail(message)
        }
    }
}

fn check_object(
    schema: &Schema,
    additional: &[Schema],
    value: &Value,
    path: &str,
) -> Result<(), String> {
    let Some(object) = value.as_object() else {
        return Err(format!(
            "Invalid type at {}: expected object {}",
            display_path(path),
            schema.id
        ));
    };

    for spec in &schema.fields {
        let field_path = format!("{}/{}", path, spec.name);
        match object.get(&spec.name) {
            None if spec.required => {
                return Err(format!("Missing required property: {}", field_path));
            }
            None => {}
            Some(Value::Null) if spec.nullable => {}
            Some(Value::Null) => {
                return Err(format!("Invalid type at {}: null not allowed", field_path));
            }
            Some(field_value) => {
                check_value(&spec.field_type, additional, field_value, &field_path)?;
            }
        }
    }

    Ok(())
}

fn check_value(
    field_type: &FieldType,
    additional: &[Schema],
    value: &Value,
    path: &str,
) -> Result<(), String> {
    let mismatch = || {
        Err(format!(
            "Invalid type at {}: expected {}",
            path,
            field_type.name()
        ))
    };

    match field_type {
        FieldType::Any => Ok(()),
        FieldType::String if value.is_string() => Ok(()),
        FieldType::Number if value.is_number() => Ok(()),
        FieldType::Integer if value.is_i64() || value.is_u64() => Ok(()),
        FieldType::Boolean if value.is_boolean() => Ok(()),
        FieldType::Object if value.is_object() => Ok(()),
        FieldType::Timestamp => match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => Ok(()),
            _ => mismatch(),
        },
        FieldType::Enum(values) => match value.as_str() {
            Some(s) if values.iter().any(|v| v == s) => Ok(()),
            Some(s) => Err(format!(
                "Invalid value at {}: {} is not one of [{}]",
                path,
                s,
                values.join(", ")
            )),
            None => mismatch(),
        },
        FieldType::Array(item) => {
            let Some(items) = value.as_array() else {
                return mismatch();
            };
            for (i, element) in items.iter().enumerate() {
                check_value(item, additional, element, &format!("{}/{}", path, i))?;
            }
            Ok(())
        }
        FieldType::Ref(id) => {
            let nested = additional
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| format!("Unknown schema reference at {}: {}", path, id))?;
            check_object(nested, additional, value, path)
        }
        _ => mismatch(),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}
