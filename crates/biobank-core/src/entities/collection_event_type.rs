//! Collection event types: the per-study definition of a visit, including
//! the annotation types its events carry.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::annotation_type::AnnotationType;
use crate::error::{DomainResult, Result};
use crate::holder::AnnotationTypes;
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::decode;

pub const BASE_PATH: &str = "studies/cetypes";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEventType {
    pub study_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub recurring: bool,
    #[serde(skip)]
    annotation_types: Vec<Arc<AnnotationType>>,
}

impl CollectionEventType {
    pub fn annotation_type_list(&self) -> &[Arc<AnnotationType>] {
        &self.annotation_types
    }

    /// The annotation types events of this type are built with.
    pub fn annotation_types(&self) -> AnnotationTypes {
        AnnotationTypes::from_shared(self.annotation_types.clone())
    }
}

impl RecordPayload for CollectionEventType {
    fn schema() -> Schema {
        Schema::new("collectionEventType")
            .field(FieldSpec::required("studyId", FieldType::String))
            .field(FieldSpec::required("name", FieldType::String))
            .field(FieldSpec::optional("description", FieldType::String))
            .field(FieldSpec::required("recurring", FieldType::Boolean))
            .field(FieldSpec::optional(
                "annotationTypes",
                FieldType::array_of(FieldType::reference("annotationType")),
            ))
    }

    fn additional_schemas() -> Vec<Schema> {
        vec![AnnotationType::schema()]
    }

    fn from_json(value: &Value, _types: &AnnotationTypes) -> DomainResult<Self> {
        let mut event_type: Self = decode(value)?;
        event_type.annotation_types = value["annotationTypes"]
            .as_array()
            .map(|types| {
                types
                    .iter()
                    .map(|t| AnnotationType::create(t).map(Arc::new))
                    .collect::<DomainResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(event_type)
    }
}

impl VersionedRecord<CollectionEventType> {
    pub async fn get<R: RestClient>(rest: &R, id: &str) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), &AnnotationTypes::none()).await
    }
}
