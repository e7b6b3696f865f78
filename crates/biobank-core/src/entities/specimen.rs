//! Specimens collected during a collection event.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::annotation::AnnotationRecord;
use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::labels::Labelled;
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::{annotations_field, decode};

pub const BASE_PATH: &str = "participants/cevents/spcs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecimenState {
    Usable,
    Unusable,
}

impl Labelled for SpecimenState {
    const ALL: &'static [Self] = &[Self::Usable, Self::Unusable];
    const KIND: &'static str = "specimenState";

    fn id(&self) -> &'static str {
        match self {
            Self::Usable => "usable",
            Self::Unusable => "unusable",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Usable => "Usable",
            Self::Unusable => "Unusable",
        }
    }
}

impl fmt::Display for SpecimenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specimen {
    pub inventory_id: String,
    pub specimen_description_id: String,
    pub origin_location_id: String,
    pub location_id: String,
    pub time_created: DateTime<Utc>,
    pub amount: f64,
    pub state: SpecimenState,
    #[serde(skip)]
    annotations: AnnotationSet,
}

/// A specimen not yet known to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpecimen {
    pub inventory_id: String,
    pub specimen_description_id: String,
    pub location_id: String,
    #[serde(serialize_with = "rfc3339_secs")]
    pub time_created: DateTime<Utc>,
    pub amount: f64,
}

fn rfc3339_secs<S: serde::Serializer>(time: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn check_amount(amount: f64) -> DomainResult<()> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(DomainError::InvalidValue {
            field: "amount".into(),
            reason: format!("must be greater than zero: {amount}"),
        });
    }
    Ok(())
}

impl Specimen {
    pub fn is_usable(&self) -> bool {
        self.state == SpecimenState::Usable
    }

    pub fn check_make_usable(&self) -> DomainResult<()> {
        if self.state != SpecimenState::Unusable {
            return Err(DomainError::InvalidState(format!(
                "specimen state is not unusable: {}",
                self.state
            )));
        }
        Ok(())
    }

    pub fn check_make_unusable(&self) -> DomainResult<()> {
        if self.state != SpecimenState::Usable {
            return Err(DomainError::InvalidState(format!(
                "specimen state is not usable: {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl RecordPayload for Specimen {
    fn schema() -> Schema {
        Schema::new("specimen")
            .field(FieldSpec::required("inventoryId", FieldType::String))
            .field(FieldSpec::required("specimenDescriptionId", FieldType::String))
            .field(FieldSpec::required("originLocationId", FieldType::String))
            .field(FieldSpec::required("locationId", FieldType::String))
            .field(FieldSpec::required("timeCreated", FieldType::Timestamp))
            .field(FieldSpec::required("amount", FieldType::Number))
            .field(FieldSpec::required("state", FieldType::one_of(&["usable", "unusable"])))
            .field(annotations_field())
    }

    fn additional_schemas() -> Vec<Schema> {
        AnnotationRecord::schemas()
    }

    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let mut specimen: Self = decode(value)?;
        check_amount(specimen.amount)?;
        specimen.annotations = AnnotationSet::from_json(value, types)?;
        Ok(specimen)
    }

    fn context(&self) -> AnnotationTypes {
        self.annotations.types().clone()
    }
}

impl AnnotationHolder for Specimen {
    fn annotation_set(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }
}

impl VersionedRecord<Specimen> {
    pub async fn get<R: RestClient>(rest: &R, id: &str, types: &AnnotationTypes) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), types).await
    }

    /// Adds a batch of specimens to a collection event and returns them
    /// as stored.
    pub async fn add_to_event<R: RestClient>(
        rest: &R,
        collection_event_id: &str,
        specimens: &[NewSpecimen],
        types: &AnnotationTypes,
    ) -> Result<Vec<Self>> {
        if specimens.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "specimenData".into(),
                reason: "no specimens to add".into(),
            }
            .into());
        }
        for specimen in specimens {
            check_amount(specimen.amount)?;
        }

        let body = json!({
            "collectionEventId": collection_event_id,
            "specimenData": specimens,
        });
        let reply = rest
            .post(&rest::path([BASE_PATH, collection_event_id]), &body)
            .await?;

        let items = reply.as_array().ok_or_else(|| {
            DomainError::Validation("Invalid type at /: expected array of specimen".into())
        })?;
        Ok(items
            .iter()
            .map(|item| Self::create(item, types))
            .collect::<DomainResult<Vec<_>>>()?)
    }

    pub async fn update_amount<R: RestClient>(&self, rest: &R, amount: f64) -> Result<Self> {
        check_amount(amount)?;
        let path = rest::path([BASE_PATH, self.persisted_id()?, "amount"]);
        self.update(rest, &path, json!({ "amount": amount })).await
    }

    pub async fn update_location<R: RestClient>(&self, rest: &R, location_id: &str) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, "location"]);
        self.update(rest, &path, json!({ "locationId": location_id })).await
    }

    pub async fn make_usable<R: RestClient>(&self, rest: &R) -> Result<Self> {
        self.entity.check_make_usable()?;
        let path = rest::path([BASE_PATH, self.persisted_id()?, "usable"]);
        self.update(rest, &path, json!({})).await
    }

    pub async fn make_unusable<R: RestClient>(&self, rest: &R) -> Result<Self> {
        self.entity.check_make_unusable()?;
        let path = rest::path([BASE_PATH, self.persisted_id()?, "unusable"]);
        self.update(rest, &path, json!({})).await
    }
}
