//! Server-backed records with optimistic concurrency.
//!
//! [`VersionedRecord<T>`] carries the identity, version and timestamps
//! every server record has, and wraps an entity payload `T`. Records are
//! only ever built from schema-validated JSON through
//! [`VersionedRecord::create`]; updates send the current version as
//! `expectedVersion` and return a fresh record built from the reply.

use std::future::Future;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::paged_list::{ItemSource, ListQuery, PagedResult};
use crate::rest::{self, RestClient};
use crate::schema::{self, Schema, Validation};

/// An entity payload that can be carried by a [`VersionedRecord`].
pub trait RecordPayload: Sized {
    /// Fields specific to this entity kind.
    fn schema() -> Schema;

    /// Schemas referenced from [`RecordPayload::schema`].
    fn additional_schemas() -> Vec<Schema> {
        Vec::new()
    }

    /// Builds the payload from an already validated record.
    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self>;

    /// Annotation types needed to rebuild this payload from a reply.
    fn context(&self) -> AnnotationTypes {
        AnnotationTypes::none()
    }
}

/// Validates `obj` against `schema` plus the fields every record carries.
pub fn is_valid(schema: &Schema, additional: &[Schema], obj: &Value) -> Validation {
    let mut full = schema.clone();
    for spec in Schema::new(schema.id.clone()).with_record_fields().fields {
        if !full.has_field(&spec.name) {
            full.fields.push(spec);
        }
    }
    schema::validate(&full, additional, obj)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFields {
    id: Option<String>,
    version: u64,
    time_added: DateTime<Utc>,
    #[serde(default)]
    time_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord<T> {
    /// `None` until the server has stored the record.
    pub id: Option<String>,
    pub version: u64,
    pub time_added: DateTime<Utc>,
    pub time_modified: Option<DateTime<Utc>>,
    pub entity: T,
}

impl<T: RecordPayload> VersionedRecord<T> {
    /// Validates a raw record and builds it.
    pub fn create(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let schema = T::schema();
        is_valid(&schema, &T::additional_schemas(), value).into_result()?;

        let fields: RecordFields = serde_json::from_value(value.clone())
            .map_err(|e| DomainError::Validation(e.to_string()))?;
        let entity = T::from_json(value, types)?;

        tracing::debug!(
            schema = %schema.id,
            id = ?fields.id,
            version = fields.version,
            "record constructed"
        );

        Ok(Self {
            id: fields.id,
            version: fields.version,
            time_added: fields.time_added,
            time_modified: fields.time_modified,
            entity,
        })
    }

    /// The persisted id, or an error for records the server has not stored.
    pub fn persisted_id(&self) -> DomainResult<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| DomainError::InvalidState("record has not been persisted".into()))
    }

    /// `fields` plus `id` and `expectedVersion`.
    pub fn update_command(&self, fields: Value) -> DomainResult<Value> {
        let id = self.persisted_id()?;
        let mut command = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DomainError::InvalidValue {
                    field: "update".into(),
                    reason: format!("expected an object, got {other}"),
                });
            }
        };
        command.insert("id".into(), Value::from(id));
        command.insert("expectedVersion".into(), Value::from(self.version));
        Ok(Value::Object(command))
    }

    /// PUTs an update command to `path` and returns the record from the reply.
    ///
    /// `self` is left untouched; callers replace their copy with the result.
    pub async fn update<R: RestClient>(&self, rest: &R, path: &str, fields: Value) -> Result<Self> {
        let command = self.update_command(fields)?;
        tracing::debug!(path, expected_version = self.version, "submitting update");

        let reply = rest.put(path, &command).await.inspect_err(|e| {
            if e.is_version_conflict() {
                tracing::warn!(path, expected_version = self.version, "version conflict");
            }
        })?;
        Ok(Self::create(&reply, &self.entity.context())?)
    }

    /// GETs one record.
    pub async fn fetch<R: RestClient>(rest: &R, path: &str, types: &AnnotationTypes) -> Result<Self> {
        let reply = rest.get(path, &[]).await?;
        Ok(Self::create(&reply, types)?)
    }

    /// POSTs a new record and returns it as stored by the server.
    pub async fn add<R: RestClient>(
        rest: &R,
        path: &str,
        fields: Value,
        types: &AnnotationTypes,
    ) -> Result<Self> {
        tracing::debug!(path, "adding record");
        let reply = rest.post(path, &fields).await?;
        Ok(Self::create(&reply, types)?)
    }

    /// DELETEs `<path>/<id>/<version>`.
    pub async fn remove<R: RestClient>(&self, rest: &R, path: &str) -> Result<()> {
        let id = self.persisted_id()?;
        let version = self.version.to_string();
        rest.delete(&rest::path([path, id, version.as_str()])).await?;
        Ok(())
    }

    /// GETs one page of records.
    pub async fn list<R: RestClient>(
        rest: &R,
        path: &str,
        query: &ListQuery,
        types: &AnnotationTypes,
    ) -> Result<PagedResult<Self>> {
        let reply = rest.get(path, &query.to_query_pairs()).await?;
        Ok(PagedResult::from_json(&reply, |item| Self::create(item, types))?)
    }
}

impl<T: AnnotationHolder> AnnotationHolder for VersionedRecord<T> {
    fn annotation_set(&self) -> &AnnotationSet {
        self.entity.annotation_set()
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        self.entity.annotation_set_mut()
    }
}

/// Feeds a [`crate::paged_list::PagedList`] from a REST list endpoint.
pub struct RecordSource<'a, R, T> {
    rest: &'a R,
    path: String,
    types: AnnotationTypes,
    _payload: PhantomData<T>,
}

impl<'a, R: RestClient, T: RecordPayload> RecordSource<'a, R, T> {
    pub fn new(rest: &'a R, path: impl Into<String>, types: AnnotationTypes) -> Self {
        Self {
            rest,
            path: path.into(),
            types,
            _payload: PhantomData,
        }
    }
}

impl<R: RestClient, T: RecordPayload> ItemSource for RecordSource<'_, R, T> {
    type Item = VersionedRecord<T>;

    fn get_items(&self, query: &ListQuery) -> impl Future<Output = Result<PagedResult<Self::Item>>> {
        VersionedRecord::list(self.rest, &self.path, query, &self.types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RestError, VERSION_CONFLICT_PATTERN};
    use crate::paged_list::{DisplayState, PagedList};
    use crate::schema::{FieldSpec, FieldType};
    use crate::testing::{FakeRestClient, Method};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        label: String,
    }

    impl RecordPayload for Tag {
        fn schema() -> Schema {
            Schema::new("tag").field(FieldSpec::required("label", FieldType::String))
        }

        fn from_json(value: &Value, _types: &AnnotationTypes) -> DomainResult<Self> {
            Ok(Self {
                label: value["label"].as_str().unwrap_or_default().to_string(),
            })
        }
    }

    fn tag_json(version: u64, label: &str) -> Value {
        json!({
            "id": "tag-1",
            "version": version,
            "timeAdded": "2024-01-02T03:04:05Z",
            "timeModified": null,
            "label": label
        })
    }

    fn tag(version: u64, label: &str) -> VersionedRecord<Tag> {
        VersionedRecord::create(&tag_json(version, label), &AnnotationTypes::none()).unwrap()
    }

    #[test]
    fn create_reads_record_fields() {
        let record = tag(3, "frozen");
        assert_eq!(record.id.as_deref(), Some("tag-1"));
        assert_eq!(record.version, 3);
        assert_eq!(record.time_added.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert_eq!(record.time_modified, None);
        assert_eq!(record.entity.label, "frozen");
    }

    #[test]
    fn create_rejects_missing_base_fields() {
        let mut value = tag_json(0, "x");
        value.as_object_mut().unwrap().remove("timeAdded");

        let err = VersionedRecord::<Tag>::create(&value, &AnnotationTypes::none()).unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("Missing required property: /timeAdded".into())
        );
    }

    #[test]
    fn update_command_carries_expected_version() {
        let command = tag(3, "x").update_command(json!({ "label": "y" })).unwrap();
        assert_eq!(
            command,
            json!({ "label": "y", "id": "tag-1", "expectedVersion": 3 })
        );
    }

    #[test]
    fn unpersisted_record_cannot_be_updated() {
        let mut value = tag_json(0, "x");
        value["id"] = Value::Null;
        let record = VersionedRecord::<Tag>::create(&value, &AnnotationTypes::none()).unwrap();

        assert!(matches!(
            record.update_command(json!({})),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn update_returns_new_record_and_leaves_original() {
        let rest = FakeRestClient::new();
        rest.reply(tag_json(4, "thawed"));

        let original = tag(3, "frozen");
        let updated = original
            .update(&rest, "tags/tag-1/label", json!({ "label": "thawed" }))
            .await
            .unwrap();

        assert_eq!(updated.version, 4);
        assert_eq!(updated.entity.label, "thawed");
        assert_eq!(original.version, 3);
        assert_eq!(original.entity.label, "frozen");

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "tags/tag-1/label");
        assert_eq!(request.body.unwrap()["expectedVersion"], 3);
    }

    #[tokio::test]
    async fn version_conflict_is_distinguishable() {
        let rest = FakeRestClient::new();
        rest.fail(RestError::Server {
            status: 400,
            message: format!("InvalidVersion: {VERSION_CONFLICT_PATTERN}"),
        });
        rest.fail(RestError::Server {
            status: 404,
            message: "tag not found".into(),
        });

        let record = tag(3, "x");
        let conflict = record.update(&rest, "tags/tag-1", json!({})).await.unwrap_err();
        let other = record.update(&rest, "tags/tag-1", json!({})).await.unwrap_err();

        assert!(conflict.is_version_conflict());
        assert!(!other.is_version_conflict());
        assert!(matches!(other, Error::Rest(RestError::Server { status: 404, .. })));
    }

    #[tokio::test]
    async fn invalid_reply_is_a_validation_error() {
        let rest = FakeRestClient::new();
        rest.reply(json!({ "id": "tag-1" }));

        let err = tag(0, "x").update(&rest, "tags/tag-1", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn remove_puts_version_in_path() {
        let rest = FakeRestClient::new();
        rest.reply(Value::Null);

        tag(5, "x").remove(&rest, "tags").await.unwrap();

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.path, "tags/tag-1/5");
    }

    #[tokio::test]
    async fn fetch_and_add() {
        let rest = FakeRestClient::new();
        rest.reply(tag_json(0, "new"));
        rest.reply(tag_json(1, "fetched"));

        let added = VersionedRecord::<Tag>::add(&rest, "tags", json!({ "label": "new" }), &AnnotationTypes::none())
            .await
            .unwrap();
        let fetched = VersionedRecord::<Tag>::fetch(&rest, "tags/tag-1", &AnnotationTypes::none())
            .await
            .unwrap();

        assert_eq!(added.entity.label, "new");
        assert_eq!(fetched.version, 1);

        let requests = rest.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].body, Some(json!({ "label": "new" })));
        assert_eq!(requests[1].method, Method::Get);
    }

    #[tokio::test]
    async fn list_through_paged_list() {
        let rest = FakeRestClient::new();
        rest.reply(json!({
            "items": [tag_json(0, "a"), tag_json(0, "b")],
            "page": 1,
            "limit": 10,
            "offset": 0,
            "total": 2,
            "maxPages": 1
        }));

        let source = RecordSource::<_, Tag>::new(&rest, "tags/search", AnnotationTypes::none());
        let mut list = PagedList::new(source, ListQuery::default());
        assert_eq!(list.reload().await.unwrap(), DisplayState::HaveResults);
        assert_eq!(list.items()[1].entity.label, "b");

        let request = rest.last_request().unwrap();
        assert_eq!(request.path, "tags/search");
        assert!(request.query.contains(&("limit".to_string(), "10".to_string())));
    }
}
