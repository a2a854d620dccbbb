//! What a resource method returns before content negotiation.

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::extract::Json;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// The outcome of a resource method.
///
/// `Data` is rendered through the representation chosen for the request; `Response` is sent
/// as is.
#[derive(Debug)]
pub enum Reply {
    Data { data: Value, status: Option<StatusCode>, headers: HeaderMap },
    Response(Response<ResponseBody>),
}

impl Reply {
    pub fn data(data: impl Into<Value>) -> Self {
        Reply::Data { data: data.into(), status: None, headers: HeaderMap::new() }
    }

    /// A bodiless response sent as is, e.g. `204 No Content`.
    pub fn empty(status: StatusCode) -> Self {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = status;
        Reply::Response(response)
    }

    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            Reply::Data { data, headers, .. } => Reply::Data { data, status: Some(status), headers },
            Reply::Response(mut response) => {
                *response.status_mut() = status;
                Reply::Response(response)
            }
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers_mut().insert(name, value);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let target = self.headers_mut();
        for (name, value) in &headers {
            target.insert(name, value.clone());
        }
        self
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        match self {
            Reply::Data { headers, .. } => headers,
            Reply::Response(response) => response.headers_mut(),
        }
    }
}

/// Conversion of handler return values into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, BoxError>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(self)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::data(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::data(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::data(self))
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::data(Value::Null))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::data(serde_json::to_value(self.0)?))
    }
}

impl IntoReply for Response<ResponseBody> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Response(self))
    }
}

impl<T: IntoReply> IntoReply for (T, StatusCode) {
    fn into_reply(self) -> Result<Reply, BoxError> {
        let (inner, status) = self;
        Ok(inner.into_reply()?.with_status(status))
    }
}

impl<T: IntoReply> IntoReply for (T, StatusCode, HeaderMap) {
    fn into_reply(self) -> Result<Reply, BoxError> {
        let (inner, status, headers) = self;
        Ok(inner.into_reply()?.with_status(status).with_headers(headers))
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Reply, BoxError> {
        self.map_err(Into::into)?.into_reply()
    }
}

impl<T: IntoReply> IntoReply for Box<T> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        (*self).into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HttpError, abort};
    use http::header::LOCATION;
    use serde_json::json;

    #[test]
    fn test_tuple_sets_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("/todos/3"));

        match (json!({"id": 3}), StatusCode::CREATED, headers).into_reply().unwrap() {
            Reply::Data { data, status, headers } => {
                assert_eq!(data, json!({"id": 3}));
                assert_eq!(status, Some(StatusCode::CREATED));
                assert_eq!(headers.get(LOCATION).unwrap(), "/todos/3");
            }
            Reply::Response(_) => panic!("expected data"),
        }
    }

    #[test]
    fn test_err_propagates() {
        let result: Result<Value, HttpError> = Err(abort(StatusCode::NOT_FOUND, "Todo 7 doesn't exist"));
        let error = result.into_reply().unwrap_err();
        let http_error = error.downcast_ref::<HttpError>().unwrap();
        assert_eq!(http_error.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unit_is_null() {
        assert!(matches!(().into_reply().unwrap(), Reply::Data { data: Value::Null, status: None, .. }));
    }
}
