//! Study participants.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::annotation::{Annotation, AnnotationRecord};
use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::{annotations_field, decode};

pub const BASE_PATH: &str = "participants";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub study_id: String,
    pub unique_id: String,
    #[serde(skip)]
    annotations: AnnotationSet,
}

impl RecordPayload for Participant {
    fn schema() -> Schema {
        Schema::new("participant")
            .field(FieldSpec::required("studyId", FieldType::String))
            .field(FieldSpec::required("uniqueId", FieldType::String))
            .field(annotations_field())
    }

    fn additional_schemas() -> Vec<Schema> {
        AnnotationRecord::schemas()
    }

    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let mut participant: Self = decode(value)?;
        participant.annotations = AnnotationSet::from_json(value, types)?;
        Ok(participant)
    }

    fn context(&self) -> AnnotationTypes {
        self.annotations.types().clone()
    }
}

impl AnnotationHolder for Participant {
    fn annotation_set(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }
}

impl VersionedRecord<Participant> {
    pub async fn get<R: RestClient>(rest: &R, id: &str, types: &AnnotationTypes) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), types).await
    }

    pub async fn update_unique_id<R: RestClient>(&self, rest: &R, unique_id: &str) -> Result<Self> {
        if unique_id.trim().is_empty() {
            return Err(DomainError::InvalidValue {
                field: "uniqueId".into(),
                reason: "must not be empty".into(),
            }
            .into());
        }
        let path = rest::path([BASE_PATH, self.persisted_id()?, "uniqueId"]);
        self.update(rest, &path, json!({ "uniqueId": unique_id })).await
    }

    /// Submits one annotation's current value.
    pub async fn add_annotation<R: RestClient>(&self, rest: &R, annotation: &Annotation) -> Result<Self> {
        super::add_annotation(self, rest, BASE_PATH, annotation).await
    }
}
