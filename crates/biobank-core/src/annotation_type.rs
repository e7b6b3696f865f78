//! Administrator-defined custom field definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::schema::{self, FieldSpec, FieldType, Schema};

/// The kind of value an annotation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationValueType {
    Text,
    Number,
    #[serde(rename = "datetime")]
    DateTime,
    Select,
}

impl AnnotationValueType {
    pub const ALL: [Self; 4] = [Self::Text, Self::Number, Self::DateTime, Self::Select];

    /// The identifier used on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::DateTime => "datetime",
            Self::Select => "select",
        }
    }
}

impl fmt::Display for AnnotationValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationValueType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidAnnotationType(format!("value type is invalid: {s}")))
    }
}

/// Describes one custom field: its value kind, whether it is required and,
/// for selects, the allowed options.
///
/// Immutable once constructed. Annotations refer to it through an
/// `Arc<AnnotationType>` and never own it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationType {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    value_type: AnnotationValueType,
    #[serde(default)]
    max_value_count: Option<i64>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    required: Option<bool>,
}

impl AnnotationType {
    /// Schema for the wire form of an annotation type.
    pub fn schema() -> Schema {
        let value_types: Vec<&str> = AnnotationValueType::ALL.iter().map(|t| t.as_str()).collect();
        Schema::new("annotationType")
            .field(FieldSpec::required("id", FieldType::String))
            .field(FieldSpec::required("name", FieldType::String))
            .field(FieldSpec::optional("description", FieldType::String))
            .field(FieldSpec::required("valueType", FieldType::one_of(&value_types)))
            .field(FieldSpec::optional("maxValueCount", FieldType::Integer))
            .field(FieldSpec::optional("options", FieldType::array_of(FieldType::String)))
            .field(FieldSpec::optional("required", FieldType::Boolean))
    }

    /// Builds an annotation type from a raw server record.
    pub fn create(value: &Value) -> DomainResult<Self> {
        schema::validate(&Self::schema(), &[], value).into_result()?;
        let annotation_type: Self = serde_json::from_value(value.clone())
            .map_err(|e| DomainError::Validation(e.to_string()))?;
        annotation_type.checked()
    }

    /// Starts a programmatic definition.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> AnnotationTypeBuilder {
        AnnotationTypeBuilder {
            id: id.into(),
            name: name.into(),
            description: None,
            value_type: AnnotationValueType::Text,
            max_value_count: None,
            options: Vec::new(),
            required: None,
        }
    }

    fn checked(self) -> DomainResult<Self> {
        if self.value_type == AnnotationValueType::Select {
            match self.max_value_count {
                Some(n) if n >= 1 => {}
                other => {
                    return Err(DomainError::InvalidAnnotationType(format!(
                        "max value count is invalid: {}",
                        other.map_or_else(|| "undefined".to_string(), |n| n.to_string())
                    )));
                }
            }
            if self.options.is_empty() {
                return Err(DomainError::InvalidAnnotationType(
                    "select annotation type has no options".into(),
                ));
            }
        }
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value_type(&self) -> AnnotationValueType {
        self.value_type
    }

    /// Only meaningful for select types.
    pub fn max_value_count(&self) -> Option<i64> {
        self.max_value_count
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// `None` when the owning configuration leaves it to the caller.
    pub fn required(&self) -> Option<bool> {
        self.required
    }

    pub fn is_value_type_text(&self) -> bool {
        self.value_type == AnnotationValueType::Text
    }

    pub fn is_value_type_number(&self) -> bool {
        self.value_type == AnnotationValueType::Number
    }

    pub fn is_value_type_date_time(&self) -> bool {
        self.value_type == AnnotationValueType::DateTime
    }

    pub fn is_value_type_select(&self) -> bool {
        self.value_type == AnnotationValueType::Select
    }

    pub fn is_single_select(&self) -> bool {
        self.is_value_type_select() && self.max_value_count == Some(1)
    }

    pub fn is_multiple_select(&self) -> bool {
        self.is_value_type_select() && self.max_value_count.is_some_and(|n| n > 1)
    }
}

/// Builder for [`AnnotationType`]; `build` applies the same checks as
/// [`AnnotationType::create`].
#[derive(Debug, Clone)]
pub struct AnnotationTypeBuilder {
    id: String,
    name: String,
    description: Option<String>,
    value_type: AnnotationValueType,
    max_value_count: Option<i64>,
    options: Vec<String>,
    required: Option<bool>,
}

impl AnnotationTypeBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn value_type(mut self, value_type: AnnotationValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Makes this a select with the given option set.
    #[must_use]
    pub fn select<S: Into<String>>(
        mut self,
        max_value_count: i64,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        self.value_type = AnnotationValueType::Select;
        self.max_value_count = Some(max_value_count);
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn build(self) -> DomainResult<AnnotationType> {
        AnnotationType {
            id: self.id,
            name: self.name,
            description: self.description,
            value_type: self.value_type,
            max_value_count: self.max_value_count,
            options: self.options,
            required: self.required,
        }
        .checked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_from_wire() {
        let at = AnnotationType::create(&json!({
            "id": "at1",
            "name": "Colour",
            "valueType": "select",
            "maxValueCount": 2,
            "options": ["Red", "Green"],
            "required": true
        }))
        .unwrap();

        assert_eq!(at.id(), "at1");
        assert_eq!(at.name(), "Colour");
        assert!(at.is_value_type_select());
        assert!(at.is_multiple_select());
        assert!(!at.is_single_select());
        assert_eq!(at.options(), ["Red", "Green"]);
        assert_eq!(at.required(), Some(true));
    }

    #[test]
    fn required_may_be_undefined() {
        let at = AnnotationType::create(&json!({
            "id": "at2",
            "name": "Notes",
            "valueType": "text"
        }))
        .unwrap();
        assert_eq!(at.required(), None);
        assert!(at.is_value_type_text());
        assert!(!at.is_multiple_select());
    }

    #[test]
    fn rejects_unknown_value_type() {
        let err = AnnotationType::create(&json!({
            "id": "at3",
            "name": "Blob",
            "valueType": "binary"
        }))
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("binary is not one of")));

        assert!("binary".parse::<AnnotationValueType>().is_err());
        assert_eq!(
            "datetime".parse::<AnnotationValueType>().unwrap(),
            AnnotationValueType::DateTime
        );
    }

    #[test]
    fn rejects_select_with_bad_max_value_count() {
        for count in [0, -1] {
            let err = AnnotationType::builder("at4", "Pick")
                .select(count, ["A"])
                .build()
                .unwrap_err();
            assert_eq!(
                err,
                DomainError::InvalidAnnotationType(format!("max value count is invalid: {count}"))
            );
        }

        let err = AnnotationType::create(&json!({
            "id": "at4",
            "name": "Pick",
            "valueType": "select",
            "options": ["A"]
        }))
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidAnnotationType(msg) if msg.contains("undefined")));
    }

    #[test]
    fn rejects_select_without_options() {
        let err = AnnotationType::builder("at5", "Pick")
            .select(1, Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidAnnotationType(_)));
    }

    #[test]
    fn non_select_types_ignore_options() {
        let at = AnnotationType::builder("at6", "Weight")
            .value_type(AnnotationValueType::Number)
            .build()
            .unwrap();
        assert!(at.is_value_type_number());
        assert!(!at.is_single_select());
        assert_eq!(at.max_value_count(), None);
    }

    #[test]
    fn value_type_wire_names() {
        assert_eq!(
            serde_json::to_value(AnnotationValueType::DateTime).unwrap(),
            json!("datetime")
        );
        assert_eq!(AnnotationValueType::Select.to_string(), "select");
    }
}
