//! Drives the real HTTP client against a stand-in backend.

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use biobank_client::{ClientConfig, HttpRestClient};
use biobank_core::testing::Factory;
use biobank_core::{AnnotationTypes, ListQuery, RestClient, RestError, User, UserState, VersionedRecord};
use serde_json::{Value, json};

const TOKEN: &str = "test-token";

fn user_json(id: &str, state: &str, version: u64) -> Value {
    let mut user = Factory::new().user(state);
    user["id"] = id.into();
    user["version"] = version.into();
    user
}

fn success(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "success", "data": data })))
}

fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "status": "error", "message": message })))
}

async fn get_user(headers: HeaderMap, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if bearer != Some(format!("Bearer {TOKEN}")) {
        return failure(StatusCode::UNAUTHORIZED, "invalid token");
    }
    success(user_json(&id, "active", 0))
}

async fn lock_user(Path(id): Path<String>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["expectedVersion"] != 0 {
        return failure(
            StatusCode::BAD_REQUEST,
            "InvalidVersion: user version mismatch: expected version doesn't match current version",
        );
    }
    success(user_json(&id, "locked", 1))
}

async fn search_users(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let limit: u64 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
    let state = params.get("status").cloned().unwrap_or_default();
    success(json!({
        "items": [user_json("u1", &state, 0)],
        "page": page,
        "limit": limit,
        "offset": (page - 1) * limit,
        "total": 1,
        "maxPages": 1,
    }))
}

async fn remove_thing(Path((_id, _version)): Path<(String, u64)>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

fn router() -> Router {
    Router::new()
        .route("/api/users/search", get(search_users))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/lock", put(lock_user))
        .route("/api/things/{id}/{version}", delete(remove_thing))
        .route("/api/broken", get(broken))
}

async fn spawn_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().expect("Get test app address");
    tokio::spawn(async move { axum::serve(listener, router()).await.expect("start axum server") });
    format!("http://{addr}/api")
}

fn client(base_url: &str, token: Option<&str>) -> HttpRestClient {
    let config = ClientConfig::default()
        .with_base_url(base_url)
        .with_token(token.map(str::to_string));
    HttpRestClient::new(&config).unwrap()
}

#[tokio::test]
async fn fetch_and_lock_user() {
    let base = spawn_backend().await;
    let rest = client(&base, Some(TOKEN));

    let user = VersionedRecord::<User>::get(&rest, "u1", &AnnotationTypes::none())
        .await
        .unwrap();
    assert_eq!(user.id.as_deref(), Some("u1"));
    assert_eq!(user.entity.state, UserState::Active);

    let locked = user.lock(&rest).await.unwrap();
    assert_eq!(locked.entity.state, UserState::Locked);
    assert_eq!(locked.version, 1);
}

#[tokio::test]
async fn stale_version_is_reported_as_conflict() {
    let base = spawn_backend().await;
    let rest = client(&base, Some(TOKEN));

    let stale = VersionedRecord::<User>::create(&user_json("u1", "active", 5), &AnnotationTypes::none()).unwrap();
    let err = stale.lock(&rest).await.unwrap_err();

    assert!(err.is_version_conflict());
}

#[tokio::test]
async fn missing_token_is_a_server_error() {
    let base = spawn_backend().await;
    let rest = client(&base, None);

    let err = rest.get("users/u1", &[]).await.unwrap_err();
    assert_eq!(
        err,
        RestError::Server {
            status: 401,
            message: "invalid token".into()
        }
    );
    assert!(!err.is_version_conflict());
}

#[tokio::test]
async fn search_sends_query_parameters() {
    let base = spawn_backend().await;
    let rest = client(&base, Some(TOKEN));

    let query = ListQuery {
        status: "locked".into(),
        page: 2,
        page_size: 5,
        ..ListQuery::default()
    };
    let page = VersionedRecord::<User>::search(&rest, &query, &AnnotationTypes::none())
        .await
        .unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.limit, 5);
    assert_eq!(page.offset, 5);
    assert_eq!(page.items[0].entity.state, UserState::Locked);
}

#[tokio::test]
async fn empty_body_and_plain_text_errors() {
    let base = spawn_backend().await;
    let rest = client(&base, Some(TOKEN));

    assert_eq!(rest.delete("things/t1/3").await.unwrap(), Value::Null);

    let err = rest.get("broken", &[]).await.unwrap_err();
    assert_eq!(
        err,
        RestError::Server {
            status: 500,
            message: "database unavailable".into()
        }
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let rest = client(&format!("http://{addr}/api"), None);
    let err = rest.get("users/u1", &[]).await.unwrap_err();
    assert!(matches!(err, RestError::Transport(_)));
}
