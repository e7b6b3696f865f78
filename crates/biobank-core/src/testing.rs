//! Test support: a wire-record factory and a recording REST client.
//!
//! Compiled for this crate's own tests and for downstream crates that
//! enable the `test-util` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};
use uuid::Uuid;

use crate::annotation_type::{AnnotationType, AnnotationValueType};
use crate::error::{DomainResult, RestError};
use crate::holder::AnnotationTypes;
use crate::rest::{RestClient, RestResult};

/// Sequential names per prefix: `user_1`, `user_2`, `study_1`, ...
#[derive(Debug, Default)]
pub struct NameCounter {
    counts: HashMap<String, u32>,
}

impl NameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let count = self.counts.entry(prefix.to_string()).or_insert(0);
        *count += 1;
        format!("{prefix}_{count}")
    }
}

/// Builds wire-shaped JSON for every entity kind.
#[derive(Debug, Default)]
pub struct Factory {
    names: NameCounter,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(names: NameCounter) -> Self {
        Self { names }
    }

    pub fn names(&mut self) -> &mut NameCounter {
        &mut self.names
    }

    pub fn id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn record(fields: Value) -> Value {
        let mut record = json!({
            "id": Self::id(),
            "version": 0,
            "timeAdded": "2024-01-01T00:00:00Z",
            "timeModified": null,
        });
        if let (Some(record), Value::Object(fields)) = (record.as_object_mut(), fields) {
            record.extend(fields);
        }
        record
    }

    /// Selects get a single-select option list; `required` is `false`.
    pub fn annotation_type(&mut self, value_type: AnnotationValueType) -> Value {
        let name = self.names.next("annotationType");
        let (max_value_count, options) = if value_type == AnnotationValueType::Select {
            (json!(1), json!(["option_1", "option_2", "option_3"]))
        } else {
            (Value::Null, json!([]))
        };
        json!({
            "id": Self::id(),
            "name": name,
            "description": null,
            "valueType": value_type.as_str(),
            "maxValueCount": max_value_count,
            "options": options,
            "required": false,
        })
    }

    pub fn collection_event_type(&mut self, annotation_types: &[Value]) -> Value {
        Self::record(json!({
            "studyId": Self::id(),
            "name": self.names.next("collectionEventType"),
            "description": null,
            "recurring": true,
            "annotationTypes": annotation_types,
        }))
    }

    pub fn participant(&mut self) -> Value {
        Self::record(json!({
            "studyId": Self::id(),
            "uniqueId": self.names.next("participant"),
            "annotations": [],
        }))
    }

    pub fn collection_event(&mut self, participant_id: &str, collection_event_type_id: &str) -> Value {
        Self::record(json!({
            "participantId": participant_id,
            "collectionEventTypeId": collection_event_type_id,
            "visitNumber": 1,
            "timeCompleted": "2024-01-01T12:00:00Z",
            "annotations": [],
        }))
    }

    pub fn specimen(&mut self) -> Value {
        let location_id = Self::id();
        Self::record(json!({
            "inventoryId": self.names.next("specimen"),
            "specimenDescriptionId": Self::id(),
            "originLocationId": location_id,
            "locationId": location_id,
            "timeCreated": "2024-01-01T12:30:00Z",
            "amount": 1.0,
            "state": "usable",
        }))
    }

    pub fn user(&mut self, state: &str) -> Value {
        let name = self.names.next("user");
        Self::record(json!({
            "name": name,
            "email": format!("{name}@example.com"),
            "avatarUrl": null,
            "state": state,
        }))
    }

    /// No users, no studies, every centre.
    pub fn membership(&mut self) -> Value {
        Self::record(json!({
            "name": self.names.next("membership"),
            "description": null,
            "userIds": [],
            "studyData": { "allEntities": false, "entityData": [] },
            "centreData": { "allEntities": true, "entityData": [] },
        }))
    }

    /// Optional text annotation types with fixed ids, as a parent's configuration.
    pub fn text_annotation_types(&mut self, ids: &[&str]) -> DomainResult<AnnotationTypes> {
        ids.iter()
            .map(|id| {
                let mut value = self.annotation_type(AnnotationValueType::Text);
                value["id"] = (*id).into();
                AnnotationType::create(&value)
            })
            .collect::<DomainResult<Vec<_>>>()
            .map(AnnotationTypes::new)
    }

    /// A text annotation in wire form.
    pub fn text_annotation(annotation_type_id: &str, value: &str) -> Value {
        json!({
            "annotationTypeId": annotation_type_id,
            "stringValue": value,
            "selectedValues": [],
        })
    }

    /// `record` with its `annotations` array replaced.
    pub fn with_annotations(mut record: Value, annotations: Vec<Value>) -> Value {
        record["annotations"] = Value::Array(annotations);
        record
    }

    /// A single page holding every item.
    pub fn paged(items: Vec<Value>) -> Value {
        let total = items.len();
        json!({
            "items": items,
            "page": 1,
            "limit": 10,
            "offset": 0,
            "total": total,
            "maxPages": total.div_ceil(10).max(1),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A [`RestClient`] that records requests and answers from a queue.
///
/// Replies are consumed in order; an empty queue answers with a
/// transport error.
#[derive(Debug, Default)]
pub struct FakeRestClient {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<VecDeque<RestResult<Value>>>,
}

impl FakeRestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, value: Value) {
        self.queue(Ok(value));
    }

    pub fn fail(&self, error: RestError) {
        self.queue(Err(error));
    }

    fn queue(&self, reply: RestResult<Value>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }

    fn answer(&self, method: Method, path: &str, query: &[(&str, String)], body: Option<&Value>) -> RestResult<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method,
                path: path.to_string(),
                query: query.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect(),
                body: body.cloned(),
            });
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(RestError::Transport(format!("no reply queued for {method:?} {path}"))))
    }
}

impl RestClient for FakeRestClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> RestResult<Value> {
        self.answer(Method::Get, path, query, None)
    }

    async fn post(&self, path: &str, body: &Value) -> RestResult<Value> {
        self.answer(Method::Post, path, &[], Some(body))
    }

    async fn put(&self, path: &str, body: &Value) -> RestResult<Value> {
        self.answer(Method::Put, path, &[], Some(body))
    }

    async fn delete(&self, path: &str) -> RestResult<Value> {
        self.answer(Method::Delete, path, &[], None)
    }
}
