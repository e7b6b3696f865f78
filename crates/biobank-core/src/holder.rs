//! Annotation sets embedded in parent entities.

use std::sync::Arc;

use serde_json::Value;

use crate::annotation::{Annotation, AnnotationRecord};
use crate::annotation_type::AnnotationType;
use crate::error::{DomainError, DomainResult};

/// The annotation types a parent entity is configured with.
///
/// Types are shared: cloning the set clones `Arc`s, not definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTypes {
    types: Vec<Arc<AnnotationType>>,
    default_required: Option<bool>,
    ignore_unknown: bool,
}

impl AnnotationTypes {
    /// A set with no types; parents built with it carry no annotations.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(types: impl IntoIterator<Item = AnnotationType>) -> Self {
        Self {
            types: types.into_iter().map(Arc::new).collect(),
            ..Self::default()
        }
    }

    pub fn from_shared(types: Vec<Arc<AnnotationType>>) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    /// `required` used for types that leave it undefined.
    #[must_use]
    pub fn with_default_required(mut self, required: bool) -> Self {
        self.default_required = Some(required);
        self
    }

    /// Wire annotations of unconfigured types are dropped with a warning
    /// instead of failing the build. For readers that do not know the
    /// owning configuration.
    #[must_use]
    pub fn ignoring_unknown(mut self) -> Self {
        self.ignore_unknown = true;
        self
    }

    pub fn get(&self, annotation_type_id: &str) -> Option<&Arc<AnnotationType>> {
        self.types.iter().find(|t| t.id() == annotation_type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AnnotationType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A parent's annotations: one per configured type, in configured order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    types: AnnotationTypes,
    annotations: Vec<Annotation>,
}

impl AnnotationSet {
    /// Builds one annotation per type, filled from the matching record.
    pub fn build(types: &AnnotationTypes, records: &[AnnotationRecord]) -> DomainResult<Self> {
        for stray in records.iter().filter(|r| types.get(&r.annotation_type_id).is_none()) {
            if !types.ignore_unknown {
                return Err(DomainError::UnknownAnnotationType(
                    stray.annotation_type_id.clone(),
                ));
            }
            tracing::warn!(
                annotation_type = %stray.annotation_type_id,
                "annotation of unconfigured type dropped"
            );
        }

        let annotations = types
            .iter()
            .map(|annotation_type| {
                let record = records
                    .iter()
                    .find(|r| r.annotation_type_id == annotation_type.id());
                Annotation::create(record, annotation_type.clone(), types.default_required)
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            types: types.clone(),
            annotations,
        })
    }

    /// Reads the optional `annotations` array of an already validated parent record.
    pub fn from_json(parent: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let records: Vec<AnnotationRecord> = match parent.get("annotations") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| DomainError::Validation(e.to_string()))?,
        };
        Self::build(types, &records)
    }

    pub fn types(&self) -> &AnnotationTypes {
        &self.types
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// Implemented by entities that embed an [`AnnotationSet`].
pub trait AnnotationHolder {
    fn annotation_set(&self) -> &AnnotationSet;

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet;

    fn annotations(&self) -> &[Annotation] {
        &self.annotation_set().annotations
    }

    fn annotation(&self, annotation_type_id: &str) -> Option<&Annotation> {
        self.annotations()
            .iter()
            .find(|a| a.annotation_type_id() == Ok(annotation_type_id))
    }

    fn annotation_mut(&mut self, annotation_type_id: &str) -> Option<&mut Annotation> {
        self.annotation_set_mut()
            .annotations
            .iter_mut()
            .find(|a| a.annotation_type_id() == Ok(annotation_type_id))
    }

    /// True when every annotation satisfies its required flag.
    fn annotations_valid(&self) -> bool {
        self.annotations().iter().all(Annotation::is_valid)
    }

    /// Wire form of every annotation, in configured order.
    fn server_annotations(&self) -> DomainResult<Vec<AnnotationRecord>> {
        self.annotations()
            .iter()
            .map(Annotation::server_annotation)
            .collect()
    }
}
