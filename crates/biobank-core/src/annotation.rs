//! Annotation values and their wire/form conversions.
//!
//! On the wire an annotation is an [`AnnotationRecord`]: a type id plus one
//! of `stringValue`, `numberValue` or `selectedValues`. In memory it is an
//! [`Annotation`] holding an [`AnnotationValue`] variant chosen by the
//! annotation type, in the shape a form edits: a date and a time held
//! apart, a checkbox list for multiple selects.

use std::sync::Arc;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotation_type::{AnnotationType, AnnotationValueType};
use crate::error::{DomainError, DomainResult};
use crate::schema::{self, FieldSpec, FieldType, Schema};

/// Format used by [`Annotation::get_value`] for date-time annotations.
pub const DATE_TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One selected option as sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedValue {
    pub annotation_type_id: String,
    pub value: String,
}

/// Wire form of an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub annotation_type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<String>,
    #[serde(default)]
    pub selected_values: Vec<SelectedValue>,
}

impl AnnotationRecord {
    pub fn schema() -> Schema {
        Schema::new("annotation")
            .field(FieldSpec::required("annotationTypeId", FieldType::String))
            .field(FieldSpec::optional("stringValue", FieldType::String))
            .field(FieldSpec::optional("numberValue", FieldType::String))
            .field(FieldSpec::optional(
                "selectedValues",
                FieldType::array_of(FieldType::reference("selectedValue")),
            ))
    }

    /// Schemas referenced by [`AnnotationRecord::schema`], for use as
    /// additional schemas by parent records.
    pub fn schemas() -> Vec<Schema> {
        vec![
            Self::schema(),
            Schema::new("selectedValue")
                .field(FieldSpec::required("annotationTypeId", FieldType::String))
                .field(FieldSpec::required("value", FieldType::String)),
        ]
    }

    /// Validates and decodes a raw record.
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        let schemas = Self::schemas();
        schema::validate(&schemas[0], &schemas, value).into_result()?;
        serde_json::from_value(value.clone()).map_err(|e| DomainError::Validation(e.to_string()))
    }
}

/// One entry of a multiple-select checkbox list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub name: String,
    pub checked: bool,
}

/// A date-time annotation as edited: date and time are entered separately.
///
/// The UTC offset parsed from the wire is kept so that serializing an
/// unedited value reproduces the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub offset: FixedOffset,
    /// The wire value wrote a zero offset as `Z`.
    pub zulu: bool,
}

impl Default for DateTimeValue {
    fn default() -> Self {
        Self {
            date: None,
            time: None,
            offset: Utc.fix(),
            zulu: false,
        }
    }
}

impl DateTimeValue {
    fn parse(s: &str) -> DomainResult<Self> {
        let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| DomainError::InvalidValue {
            field: "stringValue".into(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            date: Some(parsed.date_naive()),
            time: Some(parsed.time()),
            offset: *parsed.offset(),
            zulu: s.ends_with(['Z', 'z']),
        })
    }

    /// RFC 3339 with seconds, `None` while either part is missing.
    fn to_wire(self) -> Option<String> {
        self.merged()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, self.zulu))
    }

    /// Merges the date and time into one timestamp with seconds and
    /// sub-seconds cleared. `None` while either part is missing.
    pub fn merged(&self) -> Option<DateTime<FixedOffset>> {
        let (date, time) = (self.date?, self.time?);
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)?;
        NaiveDateTime::new(date, time)
            .and_local_timezone(self.offset)
            .single()
    }
}

/// The form-editable value of an annotation, one variant per value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Text(Option<String>),
    Number(Option<f64>),
    DateTime(DateTimeValue),
    SingleSelect(Option<String>),
    MultipleSelect(Vec<SelectOption>),
}

impl AnnotationValue {
    /// The empty value for `annotation_type`.
    fn empty(annotation_type: &AnnotationType) -> Self {
        match annotation_type.value_type() {
            AnnotationValueType::Text => Self::Text(None),
            AnnotationValueType::Number => Self::Number(None),
            AnnotationValueType::DateTime => Self::DateTime(DateTimeValue::default()),
            AnnotationValueType::Select if annotation_type.is_multiple_select() => {
                Self::MultipleSelect(
                    annotation_type
                        .options()
                        .iter()
                        .map(|name| SelectOption {
                            name: name.clone(),
                            checked: false,
                        })
                        .collect(),
                )
            }
            AnnotationValueType::Select => Self::SingleSelect(None),
        }
    }

    fn from_record(record: &AnnotationRecord, annotation_type: &AnnotationType) -> DomainResult<Self> {
        let value = match Self::empty(annotation_type) {
            Self::Text(_) => Self::Text(record.string_value.clone()),
            Self::Number(_) => Self::Number(
                record
                    .number_value
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| {
                        s.trim().parse::<f64>().map_err(|e| DomainError::InvalidValue {
                            field: "numberValue".into(),
                            reason: format!("{s}: {e}"),
                        })
                    })
                    .transpose()?,
            ),
            Self::DateTime(empty) => match record.string_value.as_deref().filter(|s| !s.is_empty()) {
                Some(s) => Self::DateTime(DateTimeValue::parse(s)?),
                None => Self::DateTime(empty),
            },
            Self::SingleSelect(_) => {
                Self::SingleSelect(record.selected_values.first().map(|sv| sv.value.clone()))
            }
            Self::MultipleSelect(mut options) => {
                for stray in record
                    .selected_values
                    .iter()
                    .filter(|sv| !options.iter().any(|o| o.name == sv.value))
                {
                    tracing::warn!(
                        annotation_type = %annotation_type.id(),
                        value = %stray.value,
                        "selected value is not an option, dropped"
                    );
                }
                for option in &mut options {
                    option.checked = record
                        .selected_values
                        .iter()
                        .any(|sv| sv.value == option.name);
                }
                Self::MultipleSelect(options)
            }
        };
        Ok(value)
    }
}

/// A value bound to an [`AnnotationType`] for one parent record.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    annotation_type: Option<Arc<AnnotationType>>,
    /// Resolved from the type, else from `required_override`.
    required: Option<bool>,
    /// As given by the caller; reapplied when the type changes.
    required_override: Option<bool>,
    value: AnnotationValue,
}

impl Annotation {
    /// Builds an annotation from its wire record (or an empty one when
    /// `record` is `None`).
    ///
    /// `required` comes from the annotation type when it defines it;
    /// otherwise `required_override` must be supplied.
    pub fn create(
        record: Option<&AnnotationRecord>,
        annotation_type: Arc<AnnotationType>,
        required_override: Option<bool>,
    ) -> DomainResult<Self> {
        let required = annotation_type
            .required()
            .or(required_override)
            .ok_or(DomainError::RequiredNotAssigned)?;

        let value = match record {
            Some(record) if record.annotation_type_id != annotation_type.id() => {
                return Err(DomainError::Validation(format!(
                    "annotation type id mismatch: expected {}, got {}",
                    annotation_type.id(),
                    record.annotation_type_id
                )));
            }
            Some(record) => AnnotationValue::from_record(record, &annotation_type)?,
            None => AnnotationValue::empty(&annotation_type),
        };

        Ok(Self {
            annotation_type: Some(annotation_type),
            required: Some(required),
            required_override,
            value,
        })
    }

    /// Validates a raw JSON record and builds the annotation from it.
    pub fn from_json(
        value: &Value,
        annotation_type: Arc<AnnotationType>,
        required_override: Option<bool>,
    ) -> DomainResult<Self> {
        let record = AnnotationRecord::from_json(value)?;
        Self::create(Some(&record), annotation_type, required_override)
    }

    /// An annotation whose type will be chosen later, e.g. while a form
    /// is still being filled in.
    pub fn unbound(required_override: Option<bool>) -> Self {
        Self {
            annotation_type: None,
            required: required_override,
            required_override,
            value: AnnotationValue::Text(None),
        }
    }

    /// Binds this annotation to `annotation_type`, discarding any value.
    pub fn set_annotation_type(&mut self, annotation_type: Arc<AnnotationType>) -> DomainResult<()> {
        *self = Self::create(None, annotation_type, self.required_override)?;
        Ok(())
    }

    fn bound_type(&self) -> DomainResult<&AnnotationType> {
        self.annotation_type
            .as_deref()
            .ok_or(DomainError::AnnotationTypeNotAssigned)
    }

    pub fn annotation_type(&self) -> Option<&Arc<AnnotationType>> {
        self.annotation_type.as_ref()
    }

    pub fn annotation_type_id(&self) -> DomainResult<&str> {
        Ok(self.bound_type()?.id())
    }

    pub fn value_type(&self) -> DomainResult<AnnotationValueType> {
        Ok(self.bound_type()?.value_type())
    }

    /// The annotation type's name, used as the form label.
    pub fn label(&self) -> DomainResult<&str> {
        Ok(self.bound_type()?.name())
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn value(&self) -> &AnnotationValue {
        &self.value
    }

    pub fn set_string_value(&mut self, value: impl Into<String>) -> DomainResult<()> {
        match &mut self.value {
            AnnotationValue::Text(v) => {
                *v = Some(value.into());
                Ok(())
            }
            _ => Err(self.wrong_kind("text")),
        }
    }

    pub fn set_number_value(&mut self, value: f64) -> DomainResult<()> {
        match &mut self.value {
            AnnotationValue::Number(v) => {
                *v = Some(value);
                Ok(())
            }
            _ => Err(self.wrong_kind("number")),
        }
    }

    pub fn set_date(&mut self, date: NaiveDate) -> DomainResult<()> {
        match &mut self.value {
            AnnotationValue::DateTime(v) => {
                v.date = Some(date);
                Ok(())
            }
            _ => Err(self.wrong_kind("date-time")),
        }
    }

    pub fn set_time(&mut self, time: NaiveTime) -> DomainResult<()> {
        match &mut self.value {
            AnnotationValue::DateTime(v) => {
                v.time = Some(time);
                Ok(())
            }
            _ => Err(self.wrong_kind("date-time")),
        }
    }

    /// Sets date, time and offset from one timestamp.
    pub fn set_date_time(&mut self, value: DateTime<FixedOffset>) -> DomainResult<()> {
        match &mut self.value {
            AnnotationValue::DateTime(v) => {
                *v = DateTimeValue {
                    date: Some(value.date_naive()),
                    time: Some(value.time()),
                    offset: *value.offset(),
                    zulu: false,
                };
                Ok(())
            }
            _ => Err(self.wrong_kind("date-time")),
        }
    }

    /// Chooses the option of a single select, or clears it with `None`.
    pub fn select(&mut self, option: Option<&str>) -> DomainResult<()> {
        if !matches!(self.value, AnnotationValue::SingleSelect(_)) {
            return Err(self.wrong_kind("single select"));
        }
        self.check_option(option)?;
        self.value = AnnotationValue::SingleSelect(option.map(str::to_string));
        Ok(())
    }

    /// Checks or unchecks one option of a multiple select.
    pub fn set_checked(&mut self, option: &str, checked: bool) -> DomainResult<()> {
        if !matches!(self.value, AnnotationValue::MultipleSelect(_)) {
            return Err(DomainError::NotMultipleSelect);
        }
        self.check_option(Some(option))?;
        if let AnnotationValue::MultipleSelect(options) = &mut self.value {
            for o in options.iter_mut().filter(|o| o.name == option) {
                o.checked = checked;
            }
        }
        Ok(())
    }

    fn check_option(&self, option: Option<&str>) -> DomainResult<()> {
        let annotation_type = self.bound_type()?;
        match option {
            Some(o) if !annotation_type.options().iter().any(|known| known == o) => {
                Err(DomainError::InvalidValue {
                    field: annotation_type.name().to_string(),
                    reason: format!("{o} is not an option"),
                })
            }
            _ => Ok(()),
        }
    }

    fn wrong_kind(&self, expected: &str) -> DomainError {
        DomainError::InvalidValue {
            field: self
                .annotation_type
                .as_deref()
                .map_or_else(|| "annotation".to_string(), |t| t.name().to_string()),
            reason: format!("not a {expected} annotation"),
        }
    }

    /// True when at least one option of a multiple select is checked.
    pub fn some_selected(&self) -> DomainResult<bool> {
        match &self.value {
            AnnotationValue::MultipleSelect(options) => Ok(options.iter().any(|o| o.checked)),
            _ => Err(DomainError::NotMultipleSelect),
        }
    }

    /// The value as displayed to users.
    pub fn get_value(&self) -> DomainResult<String> {
        self.bound_type()?;
        let display = match &self.value {
            AnnotationValue::Text(v) => v.clone().unwrap_or_default(),
            AnnotationValue::Number(v) => v.map(|n| n.to_string()).unwrap_or_default(),
            AnnotationValue::DateTime(v) => v
                .merged()
                .map(|dt| dt.format(DATE_TIME_DISPLAY_FORMAT).to_string())
                .unwrap_or_default(),
            AnnotationValue::SingleSelect(v) => v.clone().unwrap_or_default(),
            AnnotationValue::MultipleSelect(options) => options
                .iter()
                .filter(|o| o.checked)
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        };
        Ok(display)
    }

    /// The wire form to submit to the server.
    pub fn server_annotation(&self) -> DomainResult<AnnotationRecord> {
        let annotation_type_id = self.annotation_type_id()?.to_string();
        let mut record = AnnotationRecord {
            annotation_type_id: annotation_type_id.clone(),
            ..AnnotationRecord::default()
        };
        let selected = |value: &str| SelectedValue {
            annotation_type_id: annotation_type_id.clone(),
            value: value.to_string(),
        };

        match &self.value {
            AnnotationValue::Text(v) => record.string_value = v.clone(),
            AnnotationValue::Number(v) => record.number_value = v.map(|n| n.to_string()),
            AnnotationValue::DateTime(v) => record.string_value = v.to_wire(),
            AnnotationValue::SingleSelect(v) => {
                record.selected_values = v.iter().map(|s| selected(s.as_str())).collect();
            }
            AnnotationValue::MultipleSelect(options) => {
                record.selected_values = options
                    .iter()
                    .filter(|o| o.checked)
                    .map(|o| selected(&o.name))
                    .collect();
            }
        }
        Ok(record)
    }

    /// A required annotation is valid only when it holds a value; strings
    /// must be non-empty after trimming.
    pub fn is_valid(&self) -> bool {
        if !self.is_required() {
            return true;
        }
        if self.annotation_type.is_none() {
            return false;
        }
        match &self.value {
            AnnotationValue::Text(v) | AnnotationValue::SingleSelect(v) => {
                v.as_deref().is_some_and(|s| !s.trim().is_empty())
            }
            AnnotationValue::Number(v) => v.is_some(),
            AnnotationValue::DateTime(v) => v.merged().is_some(),
            AnnotationValue::MultipleSelect(options) => options.iter().any(|o| o.checked),
        }
    }
}
