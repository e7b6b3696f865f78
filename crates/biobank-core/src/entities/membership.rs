//! Memberships: which users may access which studies and centres.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::annotation::AnnotationRecord;
use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::{annotations_field, decode};

pub const BASE_PATH: &str = "access/memberships";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    pub name: String,
}

/// Either every entity of a kind, or an explicit list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySet {
    pub all_entities: bool,
    #[serde(default)]
    pub entity_data: Vec<EntityInfo>,
}

impl EntitySet {
    pub fn schema(id: &str) -> Schema {
        Schema::new(id)
            .field(FieldSpec::required("allEntities", FieldType::Boolean))
            .field(FieldSpec::required(
                "entityData",
                FieldType::array_of(FieldType::reference("entityInfo")),
            ))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entity_data.iter().any(|e| e.id == id)
    }

    /// True for an explicit member or when the set covers all entities.
    pub fn includes(&self, id: &str) -> bool {
        self.all_entities || self.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_ids: Vec<String>,
    pub study_data: EntitySet,
    pub centre_data: EntitySet,
    #[serde(skip)]
    annotations: AnnotationSet,
}

impl Membership {
    pub fn is_member_of_all_studies(&self) -> bool {
        self.study_data.all_entities
    }

    pub fn is_member_of_study(&self, study_id: &str) -> bool {
        self.study_data.includes(study_id)
    }

    pub fn is_member_of_all_centres(&self) -> bool {
        self.centre_data.all_entities
    }

    pub fn is_member_of_centre(&self, centre_id: &str) -> bool {
        self.centre_data.includes(centre_id)
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }
}

fn already(what: &str, id: &str) -> DomainError {
    DomainError::InvalidState(format!("{what} already in membership: {id}"))
}

fn absent(what: &str, id: &str) -> DomainError {
    DomainError::InvalidState(format!("{what} not in membership: {id}"))
}

impl RecordPayload for Membership {
    fn schema() -> Schema {
        Schema::new("membership")
            .field(FieldSpec::required("name", FieldType::String))
            .field(FieldSpec::optional("description", FieldType::String))
            .field(FieldSpec::required("userIds", FieldType::array_of(FieldType::String)))
            .field(FieldSpec::required("studyData", FieldType::reference("studyData")))
            .field(FieldSpec::required("centreData", FieldType::reference("centreData")))
            .field(annotations_field())
    }

    fn additional_schemas() -> Vec<Schema> {
        let mut schemas = AnnotationRecord::schemas();
        schemas.push(EntitySet::schema("studyData"));
        schemas.push(EntitySet::schema("centreData"));
        schemas.push(
            Schema::new("entityInfo")
                .field(FieldSpec::required("id", FieldType::String))
                .field(FieldSpec::required("name", FieldType::String)),
        );
        schemas
    }

    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let mut membership: Self = decode(value)?;
        membership.annotations = AnnotationSet::from_json(value, types)?;
        Ok(membership)
    }

    fn context(&self) -> AnnotationTypes {
        self.annotations.types().clone()
    }
}

impl AnnotationHolder for Membership {
    fn annotation_set(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }
}

impl VersionedRecord<Membership> {
    pub async fn get<R: RestClient>(rest: &R, id: &str, types: &AnnotationTypes) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), types).await
    }

    async fn put_field<R: RestClient>(&self, rest: &R, field: &str, body: Value) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, field]);
        self.update(rest, &path, body).await
    }

    /// DELETEs `<base>/<id>/<field>/<version>/<member>`; the reply is the
    /// updated membership.
    async fn delete_member<R: RestClient>(&self, rest: &R, field: &str, member_id: &str) -> Result<Self> {
        let version = self.version.to_string();
        let path = rest::path([BASE_PATH, self.persisted_id()?, field, version.as_str(), member_id]);
        let reply = rest.delete(&path).await?;
        Ok(Self::create(&reply, &self.entity.context())?)
    }

    pub async fn update_name<R: RestClient>(&self, rest: &R, name: &str) -> Result<Self> {
        self.put_field(rest, "name", json!({ "name": name })).await
    }

    pub async fn update_description<R: RestClient>(&self, rest: &R, description: Option<&str>) -> Result<Self> {
        self.put_field(rest, "description", json!({ "description": description }))
            .await
    }

    pub async fn add_user<R: RestClient>(&self, rest: &R, user_id: &str) -> Result<Self> {
        if self.entity.has_user(user_id) {
            return Err(already("user", user_id).into());
        }
        self.put_field(rest, "user", json!({ "userId": user_id })).await
    }

    pub async fn remove_user<R: RestClient>(&self, rest: &R, user_id: &str) -> Result<Self> {
        if !self.entity.has_user(user_id) {
            return Err(absent("user", user_id).into());
        }
        self.delete_member(rest, "user", user_id).await
    }

    pub async fn add_study<R: RestClient>(&self, rest: &R, study_id: &str) -> Result<Self> {
        if self.entity.study_data.contains(study_id) {
            return Err(already("study", study_id).into());
        }
        self.put_field(rest, "study", json!({ "studyId": study_id })).await
    }

    pub async fn remove_study<R: RestClient>(&self, rest: &R, study_id: &str) -> Result<Self> {
        if !self.entity.study_data.contains(study_id) {
            return Err(absent("study", study_id).into());
        }
        self.delete_member(rest, "study", study_id).await
    }

    pub async fn all_studies<R: RestClient>(&self, rest: &R) -> Result<Self> {
        if self.entity.is_member_of_all_studies() {
            return Err(already("all studies", self.persisted_id()?).into());
        }
        self.put_field(rest, "allStudies", json!({})).await
    }

    pub async fn add_centre<R: RestClient>(&self, rest: &R, centre_id: &str) -> Result<Self> {
        if self.entity.centre_data.contains(centre_id) {
            return Err(already("centre", centre_id).into());
        }
        self.put_field(rest, "centre", json!({ "centreId": centre_id })).await
    }

    pub async fn remove_centre<R: RestClient>(&self, rest: &R, centre_id: &str) -> Result<Self> {
        if !self.entity.centre_data.contains(centre_id) {
            return Err(absent("centre", centre_id).into());
        }
        self.delete_member(rest, "centre", centre_id).await
    }

    pub async fn all_centres<R: RestClient>(&self, rest: &R) -> Result<Self> {
        if self.entity.is_member_of_all_centres() {
            return Err(already("all centres", self.persisted_id()?).into());
        }
        self.put_field(rest, "allCentres", json!({})).await
    }
}
