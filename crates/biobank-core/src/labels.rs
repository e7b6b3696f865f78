//! Human-readable labels for enumerated wire ids.

use std::marker::PhantomData;

use crate::annotation_type::AnnotationValueType;
use crate::error::{DomainError, DomainResult};
use crate::paged_list::ALL_STATUSES;

/// An enumeration with a wire id and a display label per variant.
pub trait Labelled: Copy + 'static {
    /// Every variant, in display order.
    const ALL: &'static [Self];

    /// Field name used in error messages.
    const KIND: &'static str;

    fn id(&self) -> &'static str;

    fn label(&self) -> &'static str;
}

/// Maps wire ids of one [`Labelled`] enumeration to labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelService<T> {
    _kind: PhantomData<T>,
}

impl<T: Labelled> LabelService<T> {
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }

    pub fn parse(&self, id: &str) -> DomainResult<T> {
        T::ALL
            .iter()
            .copied()
            .find(|v| v.id() == id)
            .ok_or_else(|| DomainError::InvalidValue {
                field: T::KIND.to_string(),
                reason: format!("unknown id: {id}"),
            })
    }

    pub fn label(&self, id: &str) -> DomainResult<&'static str> {
        self.parse(id).map(|v| v.label())
    }

    /// `(id, label)` pairs for a status filter, led by `("all", "All")`.
    pub fn status_options(&self) -> Vec<(&'static str, &'static str)> {
        std::iter::once((ALL_STATUSES, "All"))
            .chain(T::ALL.iter().map(|v| (v.id(), v.label())))
            .collect()
    }
}

impl Labelled for AnnotationValueType {
    const ALL: &'static [Self] = &AnnotationValueType::ALL;
    const KIND: &'static str = "valueType";

    fn id(&self) -> &'static str {
        self.as_str()
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::DateTime => "Date and time",
            Self::Select => "Select",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_labels() {
        let labels = LabelService::<AnnotationValueType>::new();
        assert_eq!(labels.label("datetime").unwrap(), "Date and time");
        assert_eq!(labels.parse("select").unwrap(), AnnotationValueType::Select);
    }

    #[test]
    fn unknown_id() {
        let err = LabelService::<AnnotationValueType>::new().label("colour").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for valueType: unknown id: colour");
    }

    #[test]
    fn status_options_lead_with_all() {
        let options = LabelService::<AnnotationValueType>::new().status_options();
        assert_eq!(options[0], ("all", "All"));
        assert_eq!(options.len(), 5);
        assert_eq!(options[1], ("text", "Text"));
    }
}
