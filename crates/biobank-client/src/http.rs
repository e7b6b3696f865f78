//! `reqwest` implementation of [`RestClient`].

use biobank_core::rest::{RestClient, RestResult};
use biobank_core::RestError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Talks JSON to the biobank backend.
#[derive(Debug, Clone)]
pub struct HttpRestClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRestClient {
    /// Build a client, configured with a Bearer token when one is set.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);

        if let Some(token) = &config.token {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> RestResult<Value> {
        tracing::debug!(%method, path, "sending request");

        let response = request
            .send()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = server_message(&body);
            tracing::warn!(%method, path, status = status.as_u16(), %message, "request failed");
            return Err(RestError::Server {
                status: status.as_u16(),
                message,
            });
        }

        parse_reply(status.as_u16(), &body)
    }
}

/// Extracts the server's explanation from an error body.
fn server_message(body: &str) -> String {
    // Try to parse as JSON error
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = ["message", "error"]
            .iter()
            .find_map(|key| json.get(*key).and_then(Value::as_str))
        {
            return message.to_string();
        }
    }
    body.to_string()
}

/// Decodes a success body, unwrapping `{ "status": "success", "data": ... }`.
fn parse_reply(status: u16, body: &str) -> RestResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let json: Value = serde_json::from_str(body)
        .map_err(|e| RestError::Transport(format!("invalid JSON reply: {e}")))?;

    match json.get("status").and_then(Value::as_str) {
        Some("success") => Ok(json.get("data").cloned().unwrap_or(Value::Null)),
        Some("error") => Err(RestError::Server {
            status,
            message: server_message(body),
        }),
        _ => Ok(json),
    }
}

impl RestClient for HttpRestClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> RestResult<Value> {
        let request = self.request(Method::GET, path).query(query);
        self.send(Method::GET, path, request).await
    }

    async fn post(&self, path: &str, body: &Value) -> RestResult<Value> {
        let request = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, request).await
    }

    async fn put(&self, path: &str, body: &Value) -> RestResult<Value> {
        let request = self.request(Method::PUT, path).json(body);
        self.send(Method::PUT, path, request).await
    }

    async fn delete(&self, path: &str) -> RestResult<Value> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_paths_onto_base() {
        let config = ClientConfig::default().with_base_url("http://localhost:9000/api/");
        let client = HttpRestClient::new(&config).unwrap();

        assert_eq!(client.base_url(), "http://localhost:9000/api");
        assert_eq!(client.url("/users/42"), "http://localhost:9000/api/users/42");
    }

    #[test]
    fn rejects_token_with_newline() {
        let config = ClientConfig::default().with_token(Some("bad\ntoken".into()));
        assert!(matches!(
            HttpRestClient::new(&config),
            Err(ClientError::InvalidToken(_))
        ));
    }

    #[test]
    fn server_message_prefers_json_fields() {
        assert_eq!(server_message(r#"{"status":"error","message":"nope"}"#), "nope");
        assert_eq!(server_message(r#"{"error":"denied"}"#), "denied");
        assert_eq!(server_message("plain text"), "plain text");
    }

    #[test]
    fn parse_reply_unwraps_envelope() {
        assert_eq!(
            parse_reply(200, r#"{"status":"success","data":{"id":"1"}}"#).unwrap(),
            json!({ "id": "1" })
        );
        assert_eq!(parse_reply(200, r#"{"id":"2"}"#).unwrap(), json!({ "id": "2" }));
        assert_eq!(parse_reply(204, "").unwrap(), Value::Null);
        assert!(matches!(
            parse_reply(200, r#"{"status":"error","message":"bad"}"#),
            Err(RestError::Server { status: 200, .. })
        ));
        assert!(matches!(parse_reply(200, "<html>"), Err(RestError::Transport(_))));
    }
}
