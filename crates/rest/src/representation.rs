//! Rendering reply data for a negotiated mimetype.

use crate::body::ResponseBody;
use crate::config::ApiConfig;
use crate::error::BoxError;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Turns reply data into a response body for one mimetype.
///
/// Closures with the same signature are representations too.
#[cfg_attr(test, mockall::automock)]
pub trait Representation: Send + Sync {
    fn render(
        &self,
        data: &Value,
        status: StatusCode,
        headers: HeaderMap,
        config: &ApiConfig,
    ) -> Result<Response<ResponseBody>, BoxError>;
}

impl<F> Representation for F
where
    F: Fn(&Value, StatusCode, HeaderMap, &ApiConfig) -> Result<Response<ResponseBody>, BoxError> + Send + Sync,
{
    fn render(
        &self,
        data: &Value,
        status: StatusCode,
        headers: HeaderMap,
        config: &ApiConfig,
    ) -> Result<Response<ResponseBody>, BoxError> {
        (self)(data, status, headers, config)
    }
}

/// Mimetype to representation table; insertion order is the priority order.
#[derive(Clone, Default)]
pub struct Representations {
    inner: IndexMap<String, Arc<dyn Representation>>,
}

impl fmt::Debug for Representations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.keys()).finish()
    }
}

impl Representations {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default table, rendering `application/json` only.
    pub fn json() -> Self {
        let mut representations = Self::new();
        representations.insert("application/json", output_json);
        representations
    }

    /// Adds a representation, replacing one registered for the same mimetype in place.
    pub fn insert(&mut self, mediatype: impl Into<String>, representation: impl Representation + 'static) {
        self.inner.insert(mediatype.into(), Arc::new(representation));
    }

    pub fn get(&self, mediatype: &str) -> Option<&dyn Representation> {
        self.inner.get(mediatype).map(AsRef::as_ref)
    }

    pub fn mediatypes(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    pub fn first(&self) -> Option<(&str, &dyn Representation)> {
        self.inner.first().map(|(mediatype, representation)| (mediatype.as_str(), representation.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Renders data as JSON with a trailing newline.
///
/// Honors the configured indent (4 in debug mode when unset) and key sorting.
pub fn output_json(
    data: &Value,
    status: StatusCode,
    headers: HeaderMap,
    config: &ApiConfig,
) -> Result<Response<ResponseBody>, BoxError> {
    let sorted;
    let data = if config.json_sort_keys {
        sorted = sort_keys(data);
        &sorted
    } else {
        data
    };

    let mut bytes = match config.effective_json_indent() {
        Some(indent) => {
            let indent = " ".repeat(indent);
            let mut buffer = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(indent.as_bytes()));
            data.serialize(&mut serializer)?;
            buffer
        }
        None => serde_json::to_vec(data)?,
    };
    bytes.push(b'\n');

    let mut response = Response::new(ResponseBody::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Renders data as its plain text form; strings are written without quotes.
pub(crate) fn output_text(data: &Value, status: StatusCode, headers: HeaderMap) -> Response<ResponseBody> {
    let text = match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut response = Response::new(ResponseBody::from(text));
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::LOCATION;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_of(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_output_json_compact() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/todos/1"));

        let response = output_json(&json!({"b": 1, "a": 2}), StatusCode::CREATED, headers, &ApiConfig::default()).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/todos/1");
        assert_eq!(body_of(response).await, "{\"b\":1,\"a\":2}\n");
    }

    #[tokio::test]
    async fn test_output_json_sorted_and_indented() {
        let config = ApiConfig::default().json_indent(2).json_sort_keys(true);
        let response = output_json(&json!({"b": 1, "a": 2}), StatusCode::OK, HeaderMap::new(), &config).unwrap();
        assert_eq!(body_of(response).await, "{\n  \"a\": 2,\n  \"b\": 1\n}\n");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut representations = Representations::json();
        representations.insert("text/csv", output_json);
        representations.insert("application/json", output_json);
        assert_eq!(representations.mediatypes(), vec!["application/json", "text/csv"]);
        assert_eq!(representations.first().map(|(mediatype, _)| mediatype), Some("application/json"));
    }

    #[test]
    fn test_mocked_representation_is_called() {
        let mut mock = MockRepresentation::new();
        mock.expect_render()
            .times(1)
            .returning(|_, status, _, _| Ok(crate::responder::text_response(status, ResponseBody::from("mocked"))));

        let mut representations = Representations::new();
        representations.insert("text/x-mock", mock);

        let representation = representations.get("text/x-mock").unwrap();
        let response = representation.render(&json!(null), StatusCode::ACCEPTED, HeaderMap::new(), &ApiConfig::default());
        assert_eq!(response.unwrap().status(), StatusCode::ACCEPTED);
    }
}
