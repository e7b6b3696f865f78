//! Users of the system and their registration state machine.
//!
//! A user registers, is activated by an administrator, and may be locked
//! and unlocked afterwards:
//!
//! ```text
//! Registered --activate--> Active
//! Registered --lock------> Locked
//! Active     --lock------> Locked
//! Locked     --unlock----> Active
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::annotation::AnnotationRecord;
use crate::error::{DomainError, DomainResult, Result};
use crate::holder::{AnnotationHolder, AnnotationSet, AnnotationTypes};
use crate::labels::Labelled;
use crate::paged_list::{ListQuery, PagedResult};
use crate::rest::{self, RestClient};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::versioned::{RecordPayload, VersionedRecord};

use super::{annotations_field, decode};

pub const BASE_PATH: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Registered,
    Active,
    Locked,
}

impl Labelled for UserState {
    const ALL: &'static [Self] = &[Self::Registered, Self::Active, Self::Locked];
    const KIND: &'static str = "userState";

    fn id(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Locked => "locked",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Registered => "Registered",
            Self::Active => "Active",
            Self::Locked => "Locked",
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub state: UserState,
    #[serde(skip)]
    annotations: AnnotationSet,
}

impl User {
    pub fn is_registered(&self) -> bool {
        self.state == UserState::Registered
    }

    pub fn is_active(&self) -> bool {
        self.state == UserState::Active
    }

    pub fn is_locked(&self) -> bool {
        self.state == UserState::Locked
    }

    pub fn check_activate(&self) -> DomainResult<()> {
        if !self.is_registered() {
            return Err(DomainError::InvalidState(format!(
                "user state is not registered: {}",
                self.state
            )));
        }
        Ok(())
    }

    pub fn check_lock(&self) -> DomainResult<()> {
        if !(self.is_registered() || self.is_active()) {
            return Err(DomainError::InvalidState(format!(
                "user state is not registered or active: {}",
                self.state
            )));
        }
        Ok(())
    }

    pub fn check_unlock(&self) -> DomainResult<()> {
        if !self.is_locked() {
            return Err(DomainError::InvalidState(format!(
                "user state is not locked: {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl RecordPayload for User {
    fn schema() -> Schema {
        Schema::new("user")
            .field(FieldSpec::required("name", FieldType::String))
            .field(FieldSpec::required("email", FieldType::String))
            .field(FieldSpec::optional("avatarUrl", FieldType::String))
            .field(FieldSpec::required(
                "state",
                FieldType::one_of(&["registered", "active", "locked"]),
            ))
            .field(annotations_field())
    }

    fn additional_schemas() -> Vec<Schema> {
        AnnotationRecord::schemas()
    }

    fn from_json(value: &Value, types: &AnnotationTypes) -> DomainResult<Self> {
        let mut user: Self = decode(value)?;
        user.annotations = AnnotationSet::from_json(value, types)?;
        Ok(user)
    }

    fn context(&self) -> AnnotationTypes {
        self.annotations.types().clone()
    }
}

impl AnnotationHolder for User {
    fn annotation_set(&self) -> &AnnotationSet {
        &self.annotations
    }

    fn annotation_set_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }
}

impl VersionedRecord<User> {
    pub async fn get<R: RestClient>(rest: &R, id: &str, types: &AnnotationTypes) -> Result<Self> {
        Self::fetch(rest, &rest::path([BASE_PATH, id]), types).await
    }

    pub async fn search<R: RestClient>(
        rest: &R,
        query: &ListQuery,
        types: &AnnotationTypes,
    ) -> Result<PagedResult<Self>> {
        Self::list(rest, &rest::path([BASE_PATH, "search"]), query, types).await
    }

    async fn transition<R: RestClient>(&self, rest: &R, action: &str) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, action]);
        self.update(rest, &path, json!({})).await
    }

    pub async fn activate<R: RestClient>(&self, rest: &R) -> Result<Self> {
        self.entity.check_activate()?;
        self.transition(rest, "activate").await
    }

    pub async fn lock<R: RestClient>(&self, rest: &R) -> Result<Self> {
        self.entity.check_lock()?;
        self.transition(rest, "lock").await
    }

    pub async fn unlock<R: RestClient>(&self, rest: &R) -> Result<Self> {
        self.entity.check_unlock()?;
        self.transition(rest, "unlock").await
    }

    pub async fn update_name<R: RestClient>(&self, rest: &R, name: &str) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, "name"]);
        self.update(rest, &path, json!({ "name": name })).await
    }

    pub async fn update_email<R: RestClient>(&self, rest: &R, email: &str) -> Result<Self> {
        if !email.contains('@') {
            return Err(DomainError::InvalidValue {
                field: "email".into(),
                reason: format!("not an email address: {email}"),
            }
            .into());
        }
        let path = rest::path([BASE_PATH, self.persisted_id()?, "email"]);
        self.update(rest, &path, json!({ "email": email })).await
    }

    /// `None` removes the avatar.
    pub async fn update_avatar_url<R: RestClient>(&self, rest: &R, avatar_url: Option<&str>) -> Result<Self> {
        let path = rest::path([BASE_PATH, self.persisted_id()?, "avatarUrl"]);
        self.update(rest, &path, json!({ "avatarUrl": avatar_url })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelService;
    use crate::error::Error;
    use crate::testing::{Factory, FakeRestClient, Method};

    fn user(factory: &mut Factory, state: &str) -> (Value, VersionedRecord<User>) {
        let value = factory.user(state);
        let record = VersionedRecord::create(&value, &AnnotationTypes::none()).unwrap();
        (value, record)
    }

    fn with_state(value: &Value, state: &str, version: u64) -> Value {
        let mut reply = value.clone();
        reply["state"] = state.into();
        reply["version"] = version.into();
        reply
    }

    #[tokio::test]
    async fn active_user_cannot_be_activated_but_can_be_locked() {
        let mut factory = Factory::new();
        let (value, active) = user(&mut factory, "active");
        let rest = FakeRestClient::new();

        let err = active.activate(&rest).await.unwrap_err();
        assert_eq!(err.to_string(), "user state is not registered: Active");
        assert!(rest.requests().is_empty());

        rest.reply(with_state(&value, "locked", 1));
        let locked = active.lock(&rest).await.unwrap();
        assert_eq!(locked.entity.state, UserState::Locked);

        let request = rest.last_request().unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, format!("users/{}/lock", value["id"].as_str().unwrap()));
        assert_eq!(request.body.unwrap()["expectedVersion"], 0);
    }

    #[tokio::test]
    async fn locked_user_can_be_unlocked_not_locked() {
        let mut factory = Factory::new();
        let (value, locked) = user(&mut factory, "locked");
        let rest = FakeRestClient::new();

        let err = locked.lock(&rest).await.unwrap_err();
        assert_eq!(err.to_string(), "user state is not registered or active: Locked");

        rest.reply(with_state(&value, "active", 1));
        let unlocked = locked.unlock(&rest).await.unwrap();
        assert!(unlocked.entity.is_active());

        let err = unlocked.unlock(&rest).await.unwrap_err();
        assert_eq!(err.to_string(), "user state is not locked: Active");
    }

    #[tokio::test]
    async fn registered_user_activates() {
        let mut factory = Factory::new();
        let (value, registered) = user(&mut factory, "registered");
        let rest = FakeRestClient::new();
        assert!(registered.entity.check_lock().is_ok());

        rest.reply(with_state(&value, "active", 1));
        let active = registered.activate(&rest).await.unwrap();
        assert_eq!(active.version, 1);
        assert_eq!(registered.version, 0);
    }

    #[tokio::test]
    async fn profile_updates() {
        let mut factory = Factory::new();
        let (value, active) = user(&mut factory, "active");
        let rest = FakeRestClient::new();

        assert!(active.update_email(&rest, "nobody").await.is_err());

        rest.reply(value.clone());
        rest.reply(value.clone());
        rest.reply(value.clone());
        active.update_name(&rest, "Ada").await.unwrap();
        active.update_email(&rest, "ada@example.com").await.unwrap();
        active.update_avatar_url(&rest, None).await.unwrap();

        let requests = rest.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].body.as_ref().unwrap()["name"], "Ada");
        assert!(requests[1].path.ends_with("/email"));
        assert!(requests[2].body.as_ref().unwrap()["avatarUrl"].is_null());
    }

    #[tokio::test]
    async fn search_sends_paging_query() {
        let mut factory = Factory::new();
        let rest = FakeRestClient::new();
        rest.reply(Factory::paged(vec![factory.user("active"), factory.user("locked")]));

        let query = ListQuery {
            status: "active".into(),
            ..ListQuery::default()
        };
        let page = VersionedRecord::<User>::search(&rest, &query, &AnnotationTypes::none())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 2);

        let request = rest.last_request().unwrap();
        assert_eq!(request.path, "users/search");
        assert!(request.query.contains(&("status".to_string(), "active".to_string())));
    }

    #[tokio::test]
    async fn annotations_bound_to_configured_types() {
        let mut factory = Factory::new();
        let types = factory.text_annotation_types(&["at1", "at2"]).unwrap();
        let value = Factory::with_annotations(
            factory.user("active"),
            vec![Factory::text_annotation("at1", "night shift")],
        );
        let rest = FakeRestClient::new();
        rest.reply(value.clone());

        let user = VersionedRecord::<User>::get(&rest, "u1", &types).await.unwrap();
        assert_eq!(user.annotations().len(), 2);
        assert_eq!(user.annotation("at1").unwrap().get_value().unwrap(), "night shift");
        assert_eq!(user.annotation("at2").unwrap().get_value().unwrap(), "");

        let records = user.server_annotations().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].string_value.as_deref(), Some("night shift"));

        rest.reply(with_state(&value, "locked", 1));
        let locked = user.lock(&rest).await.unwrap();
        assert_eq!(locked.annotation("at1").unwrap().get_value().unwrap(), "night shift");

        rest.reply(Factory::paged(vec![value.clone()]));
        let page = VersionedRecord::<User>::search(&rest, &ListQuery::default(), &types)
            .await
            .unwrap();
        assert_eq!(page.items[0].annotations().len(), 2);
    }

    #[tokio::test]
    async fn stray_annotation_type_rejected() {
        let mut factory = Factory::new();
        let types = factory.text_annotation_types(&["at1"]).unwrap();
        let rest = FakeRestClient::new();
        rest.reply(Factory::with_annotations(
            factory.user("active"),
            vec![Factory::text_annotation("at9", "x")],
        ));

        let err = VersionedRecord::<User>::get(&rest, "u1", &types).await.unwrap_err();
        assert_eq!(err, Error::from(DomainError::UnknownAnnotationType("at9".into())));
    }

    #[test]
    fn invalid_state_rejected_by_schema() {
        let mut factory = Factory::new();
        let value = factory.user("suspended");
        let err = VersionedRecord::<User>::create(&value, &AnnotationTypes::none()).unwrap_err();
        assert!(err.to_string().contains("suspended is not one of"));
    }

    #[test]
    fn state_labels() {
        let labels = LabelService::<UserState>::new();
        assert_eq!(labels.label("registered").unwrap(), "Registered");
        assert_eq!(labels.status_options().len(), 4);
    }
}
