//! The REST collaborator seam.
//!
//! The domain model never speaks HTTP. Entity operations hand a relative
//! path, a verb and a JSON body to a [`RestClient`] and receive the JSON
//! reply. `biobank-client` provides the HTTP implementation.

use std::future::Future;

use serde_json::Value;

use crate::error::RestError;

/// Result type alias for REST calls.
pub type RestResult<T> = Result<T, RestError>;

/// Minimal verb set used by the entity classes.
///
/// Paths are relative (`users/42`); implementations resolve them against
/// their own base URL. Query pairs are encoded by the implementation.
pub trait RestClient {
    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = RestResult<Value>> + Send;

    fn post(&self, path: &str, body: &Value) -> impl Future<Output = RestResult<Value>> + Send;

    fn put(&self, path: &str, body: &Value) -> impl Future<Output = RestResult<Value>> + Send;

    fn delete(&self, path: &str) -> impl Future<Output = RestResult<Value>> + Send;
}

/// Joins path segments with `/`, skipping empty ones.
pub fn path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| s.as_ref().trim_matches('/').to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_joins_segments() {
        assert_eq!(path(["users", "42", "name"]), "users/42/name");
        assert_eq!(path(["/users/", "", "42"]), "users/42");
    }
}
