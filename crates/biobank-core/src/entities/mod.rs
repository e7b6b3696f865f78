//! Concrete server-backed entities.
//!
//! Each payload type implements [`RecordPayload`] and is used wrapped in a
//! [`VersionedRecord`]. Entity operations are inherent methods on
//! `VersionedRecord<Payload>`; every one of them checks its preconditions
//! locally, then sends an update command and returns the record rebuilt
//! from the server's reply.

pub mod collection_event;
pub mod collection_event_type;
pub mod membership;
pub mod participant;
pub mod specimen;
pub mod user;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::annotation::Annotation;
use crate::error::{DomainError, DomainResult, Result};
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType};
use crate::versioned::{RecordPayload, VersionedRecord};

pub use collection_event::CollectionEvent;
pub use collection_event_type::CollectionEventType;
pub use membership::{EntityInfo, EntitySet, Membership};
pub use participant::Participant;
pub use specimen::{NewSpecimen, Specimen, SpecimenState};
pub use user::{User, UserState};

/// Decodes a validated record into a payload struct.
pub(crate) fn decode<T: DeserializeOwned>(value: &Value) -> DomainResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| DomainError::Validation(e.to_string()))
}

/// The optional `annotations` array carried by annotation holders.
pub(crate) fn annotations_field() -> FieldSpec {
    FieldSpec::optional(
        "annotations",
        FieldType::array_of(FieldType::reference("annotation")),
    )
}

/// PUTs one annotation's wire form to `<base>/<id>/annot`.
pub(crate) async fn add_annotation<T, R>(
    record: &VersionedRecord<T>,
    rest: &R,
    base: &str,
    annotation: &Annotation,
) -> Result<VersionedRecord<T>>
where
    T: RecordPayload,
    R: RestClient,
{
    if !annotation.is_valid() {
        return Err(DomainError::InvalidValue {
            field: annotation.label()?.to_string(),
            reason: "a value is required".into(),
        }
        .into());
    }
    let wire = serde_json::to_value(annotation.server_annotation()?).map_err(|e| {
        DomainError::InvalidValue {
            field: "annotation".into(),
            reason: e.to_string(),
        }
    })?;
    let id = record.persisted_id()?;
    record.update(rest, &rest::path([base, id, "annot"]), wire).await
}

/// DELETEs `<base>/<id>/annot/<annotationTypeId>/<version>`.
pub(crate) async fn remove_annotation<T, R>(
    record: &VersionedRecord<T>,
    rest: &R,
    base: &str,
    annotation_type_id: &str,
) -> Result<VersionedRecord<T>>
where
    T: RecordPayload,
    R: RestClient,
{
    let id = record.persisted_id()?;
    let version = record.version.to_string();
    let reply = rest
        .delete(&rest::path([base, id, "annot", annotation_type_id, version.as_str()]))
        .await?;
    Ok(VersionedRecord::create(&reply, &record.entity.context())?)
}
