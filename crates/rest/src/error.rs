//! Error types shared by the host layer and the REST extension.
//!
//! Handlers, extractors and the router all report failures as [`BoxError`]. Errors
//! that already know which HTTP status they map to are expressed as [`HttpError`],
//! usually built through [`abort`].

use http::header::ALLOW;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value, json};
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// The error type that travels through handlers and the error-handler chain.
pub type BoxError = Box<dyn Error + Send + Sync>;

pub(crate) const VALIDATION_FAILED: &str = "Input payload validation failed";

/// An error which carries the HTTP status it should be answered with.
///
/// `data`, when present, replaces the error body the API would otherwise build.
#[derive(Debug, Clone)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
    data: Option<Value>,
    headers: HeaderMap,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, message: None, data: None, headers: HeaderMap::new() }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The explicit message, or the canonical reason phrase of the status.
    pub fn reason(&self) -> &str {
        self.message.as_deref().or_else(|| self.status.canonical_reason()).unwrap_or("Unknown Error")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_message(message)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND).with_message(format!("Requested URL {path} not found"))
    }

    pub fn method_not_allowed(method: &Method, path: &str, allowed: &[Method]) -> Self {
        let error = Self::new(StatusCode::METHOD_NOT_ALLOWED)
            .with_message(format!("Method {method} not allowed for URL {path}"));

        let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        match HeaderValue::from_str(&allow) {
            Ok(value) if !allow.is_empty() => error.with_header(ALLOW, value),
            _ => error,
        }
    }

    pub fn not_acceptable() -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE).with_message("Not Acceptable")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// A 400 whose body lists the offending fields.
    pub fn validation(errors: Map<String, Value>) -> Self {
        Self::bad_request(VALIDATION_FAILED).with_data(json!({
            "errors": errors,
            "message": VALIDATION_FAILED,
        }))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl Error for HttpError {}

/// Abort the current request with the given status and message.
///
/// Return it from a handler with `Err(abort(..))?` or `return Err(abort(..).into())`.
pub fn abort(status: StatusCode, message: impl Into<String>) -> HttpError {
    HttpError::new(status).with_message(message)
}

/// Failures raised while interpreting user declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// Input data does not satisfy a declared model or argument.
    #[error("{0}")]
    Validation(String),

    /// Declarations contradict each other, e.g. an unregistered model.
    #[error("{0}")]
    Specs(String),

    /// A payload failed model validation, keyed by dotted field path.
    #[error("Input payload validation failed")]
    Invalid(Map<String, Value>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_falls_back_to_canonical() {
        assert_eq!(HttpError::new(StatusCode::NOT_FOUND).reason(), "Not Found");
        assert_eq!(abort(StatusCode::NOT_FOUND, "Todo 1 doesn't exist").reason(), "Todo 1 doesn't exist");
        assert_eq!(HttpError::internal().to_string(), "Internal Server Error");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let error = HttpError::method_not_allowed(&Method::POST, "/todos", &[Method::GET, Method::HEAD]);
        assert_eq!(error.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error.headers().get(ALLOW).unwrap(), "GET, HEAD");
        assert_eq!(error.reason(), "Method POST not allowed for URL /todos");
    }

    #[test]
    fn test_validation_error_body() {
        let mut errors = Map::new();
        errors.insert("task".into(), Value::from("'task' is a required property"));
        let error = HttpError::validation(errors);

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.data().unwrap()["message"], VALIDATION_FAILED);
        assert_eq!(error.data().unwrap()["errors"]["task"], "'task' is a required property");
    }
}
