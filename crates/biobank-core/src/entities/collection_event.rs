//! Collection events: one participant visit, typed by a
//! [`CollectionEventType`](super::CollectionEventType).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::annotation::{Annotation, AnnotationRecord};
use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::{CollectionEventType, annotations_field, decode};

pub const BASE_PATH: &str = "participants/cevents";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    pub participant_id: String,
    pub collection_event_type_id: String,
    pub visit_number: u32,
    pub time_completed: DateTime<Utc>,
    #[serde(skip)]
    annotations: AnnotationSet,
}

fn check_visit_number(visit_number: u32) -> DomainResult<()> {
    if visit_number < 1 {
        return Err(DomainError::InvalidValue {
            field: "visitNumber".into(),
            reason: format!("must be 1 or greater: {visit_number}"),
        });
    }
    Ok(())
}

impl RecordPayload for CollectionEvent {
    fn schema() -> Schema {
        Schema::new("collectionEvent")
            .field(FieldSpec::required("participantId", FieldType::String))
            .field(FieldSpec::required("collectionEventTypeId", FieldType::String))
            .field(FieldSpec::required("visitNumber", FieldType::Integer))
            .field(FieldSpec::required("timeCompleted", FieldType::Timestamp))
            .field(annotations_field())
    }

    fn additional_schemas() -> Vec<Schema> {
        AnnotationRecord::schemas()
    }

    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let mut event: Self = decode(value)?;
        check_visit_number(event.visit_number)?;
        event.annotations = AnnotationSet::from_json(value, types)?;
        Ok(event)
    }

    fn context(&self) -> AnnotationTypes {
        self.annotations.types().clone()
    }
}

impl AnnotationHolder for CollectionEvent {
    fn annotation_set(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }
}

impl VersionedRecord<CollectionEvent> {
    /// `types` are the annotation types of the event's collection event type.
    pub async fn get<R: RestClient>(rest: &R, id: &str, types: &AnnotationTypes) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), types).await
    }

    /// Fetches an event together with its type, building the event's
    /// annotations from the type's annotation types.
    pub async fn get_with_type<R: RestClient>(
        rest: &R,
        id: &str,
    ) -> Result<(Self, VersionedRecord<CollectionEventType>)> {
        let raw = rest.get(&rest::path([BASE_PATH, id]), &[]).await?;
        let event_type_id = raw
            .get("collectionEventTypeId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DomainError::Validation("Missing required property: /collectionEventTypeId".into())
            })?;
        let event_type = VersionedRecord::<CollectionEventType>::get(rest, event_type_id).await?;
        let event = Self::create(&raw, &event_type.entity.annotation_types())?;
        Ok((event, event_type))
    }

    /// Records a new visit for `participant_id`.
    pub async fn add_for_participant<R: RestClient>(
        rest: &R,
        participant_id: &str,
        collection_event_type_id: &str,
        visit_number: u32,
        time_completed: DateTime<Utc>,
        types: &AnnotationTypes,
    ) -> Result<Self> {
        check_visit_number(visit_number)?;
        let fields = json!({
            "participantId": participant_id,
            "collectionEventTypeId": collection_event_type_id,
            "visitNumber": visit_number,
            "timeCompleted": time_completed.to_rfc3339_opts(SecondsFormat::Secs, true),
            "annotations": [],
        });
        Self::add(rest, &rest::path([BASE_PATH, participant_id]), fields, types).await
    }

    pub async fn update_visit_number<R: RestClient>(&self, rest: &R, visit_number: u32) -> Result<Self> {
        check_visit_number(visit_number)?;
        let path = rest::path([BASE_PATH, self.persisted_id()?, "visitNumber"]);
        self.update(rest, &path, json!({ "visitNumber": visit_number })).await
    }

    pub async fn update_time_completed<R: RestClient>(
        &self,
        rest: &R,
        time_completed: DateTime<Utc>,
    ) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, "timeCompleted"]);
        let fields = json!({
            "timeCompleted": time_completed.to_rfc3339_opts(SecondsFormat::Secs, true)
        });
        self.update(rest, &path, fields).await
    }

    pub async fn add_annotation<R: RestClient>(&self, rest: &R, annotation: &Annotation) -> Result<Self> {
        super::add_annotation(self, rest, BASE_PATH, annotation).await
    }

    pub async fn remove_annotation<R: RestClient>(&self, rest: &R, annotation_type_id: &str) -> Result<Self> {
        if self.annotation(annotation_type_id).is_none() {
            return Err(DomainError::UnknownAnnotationType(annotation_type_id.to_string()).into());
        }
        super::remove_annotation(self, rest, BASE_PATH, annotation_type_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation_type::{AnnotationType, AnnotationValueType};
    use crate::error::Error;
    use crate::testing::{Factory, FakeRestClient, Method};
    use chrono::TimeZone;

    fn select_types(factory: &mut Factory) -> AnnotationTypes {
        let mut select = factory.annotation_type(AnnotationValueType::Select);
        select["maxValueCount"] = 2.into();
        select["options"] = json!(["A", "B", "C"]);
        AnnotationTypes::new([AnnotationType::create(&select).unwrap()]).with_default_required(false)
    }

    fn build_event(factory: &mut Factory, types: &AnnotationTypes) -> (Value, VersionedRecord<CollectionEvent>) {
        let value = factory.collection_event("participant-1", "cet-1");
        let record = VersionedRecord::create(&value, types).unwrap();
        (value, record)
    }

    #[test]
    fn zero_visit_number_rejected_on_construction() {
        let mut factory = Factory::new();
        let mut value = factory.collection_event("p", "t");
        value["visitNumber"] = 0.into();

        let err = VersionedRecord::<CollectionEvent>::create(&value, &AnnotationTypes::none()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidValue { field, .. } if field == "visitNumber"));
    }

    #[tokio::test]
    async fn update_visit_number() {
        let mut factory = Factory::new();
        let types = AnnotationTypes::none();
        let (value, event) = build_event(&mut factory, &types);
        let rest = FakeRestClient::new();

        assert!(event.update_visit_number(&rest, 0).await.is_err());
        assert!(rest.requests().is_empty());

        let mut reply = value.clone();
        reply["visitNumber"] = 4.into();
        reply["version"] = 1.into();
        rest.reply(reply);

        let updated = event.update_visit_number(&rest, 4).await.unwrap();
        assert_eq!(updated.entity.visit_number, 4);
        assert_eq!(
            rest.last_request().unwrap().body,
            Some(json!({ "visitNumber": 4, "id": value["id"], "expectedVersion": 0 }))
        );
    }

    #[tokio::test]
    async fn update_time_completed_sends_utc_timestamp() {
        let mut factory = Factory::new();
        let types = AnnotationTypes::none();
        let (value, event) = build_event(&mut factory, &types);
        let rest = FakeRestClient::new();
        let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        let mut reply = value.clone();
        reply["timeCompleted"] = "2024-05-06T07:08:09Z".into();
        rest.reply(reply);

        let updated = event.update_time_completed(&rest, when).await.unwrap();
        assert_eq!(updated.entity.time_completed, when);
        assert_eq!(
            rest.last_request().unwrap().body.unwrap()["timeCompleted"],
            "2024-05-06T07:08:09Z"
        );
    }

    #[tokio::test]
    async fn multiple_select_annotation_serialises_in_option_order() {
        let mut factory = Factory::new();
        let types = select_types(&mut factory);
        let (value, mut event) = build_event(&mut factory, &types);
        let type_id = types.iter().next().unwrap().id().to_string();

        let annotation = event.annotation_mut(&type_id).unwrap();
        annotation.set_checked("C", true).unwrap();
        annotation.set_checked("A", true).unwrap();

        let mut reply = value.clone();
        reply["annotations"] = json!([{
            "annotationTypeId": type_id,
            "selectedValues": [
                { "annotationTypeId": type_id, "value": "A" },
                { "annotationTypeId": type_id, "value": "C" }
            ]
        }]);
        let rest = FakeRestClient::new();
        rest.reply(reply);

        let annotation = event.annotation(&type_id).unwrap().clone();
        let updated = event.add_annotation(&rest, &annotation).await.unwrap();
        assert_eq!(updated.annotation(&type_id).unwrap().get_value().unwrap(), "A, C");

        let request = rest.last_request().unwrap();
        assert_eq!(request.path, format!("participants/cevents/{}/annot", value["id"].as_str().unwrap()));
        let values: Vec<&str> = request.body.as_ref().unwrap()["selectedValues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["value"].as_str().unwrap())
            .collect();
        assert_eq!(values, ["A", "C"]);
    }

    #[tokio::test]
    async fn remove_annotation_puts_type_and_version_in_path() {
        let mut factory = Factory::new();
        let types = select_types(&mut factory);
        let (value, event) = build_event(&mut factory, &types);
        let type_id = types.iter().next().unwrap().id().to_string();
        let rest = FakeRestClient::new();

        let err = event.remove_annotation(&rest, "nope").await.unwrap_err();
        assert_eq!(err, Error::from(DomainError::UnknownAnnotationType("nope".into())));

        rest.reply(value.clone());
        event.remove_annotation(&rest, &type_id).await.unwrap();

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, Method::Delete);
        assert_eq!(
            request.path,
            format!("participants/cevents/{}/annot/{type_id}/0", value["id"].as_str().unwrap())
        );
    }

    #[tokio::test]
    async fn add_for_participant_posts_new_event() {
        let mut factory = Factory::new();
        let value = factory.collection_event("participant-9", "cet-1");
        let rest = FakeRestClient::new();
        rest.reply(value);

        let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let event = VersionedRecord::<CollectionEvent>::add_for_participant(
            &rest,
            "participant-9",
            "cet-1",
            1,
            when,
            &AnnotationTypes::none(),
        )
        .await
        .unwrap();

        assert_eq!(event.entity.participant_id, "participant-9");
        let request = rest.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "participants/cevents/participant-9");
    }

    #[tokio::test]
    async fn get_with_type_binds_annotations() {
        let mut factory = Factory::new();
        let mut text = factory.annotation_type(AnnotationValueType::Text);
        text["required"] = true.into();
        let type_id = text["id"].as_str().unwrap().to_string();
        let event_type = factory.collection_event_type(&[text]);
        let event_type_id = event_type["id"].as_str().unwrap().to_string();

        let mut event = factory.collection_event("participant-1", &event_type_id);
        event["annotations"] = json!([
            { "annotationTypeId": type_id, "stringValue": "fasting", "selectedValues": [] }
        ]);
        let event_id = event["id"].as_str().unwrap().to_string();

        let rest = FakeRestClient::new();
        rest.reply(event);
        rest.reply(event_type);

        let (event, event_type) = VersionedRecord::<CollectionEvent>::get_with_type(&rest, &event_id)
            .await
            .unwrap();
        assert_eq!(event_type.id.as_deref(), Some(event_type_id.as_str()));
        assert_eq!(event.annotation(&type_id).unwrap().get_value().unwrap(), "fasting");
        assert!(event.annotations_valid());

        let paths: Vec<String> = rest.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            [format!("participants/cevents/{event_id}"), format!("studies/cetypes/{event_type_id}")]
        );
    }
}
