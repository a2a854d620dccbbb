//! Response handling module that converts handler results into HTTP responses.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses. It includes implementations for common types
//! like Result, Option, String, etc.
//!
//! Plain routes use [`Responder`] directly. Resource methods return
//! [`IntoReply`](crate::reply::IntoReply) values instead, so the API can negotiate the
//! representation.

use crate::RequestContext;
use crate::body::ResponseBody;
use crate::error::HttpError;
use crate::extract::Json;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::error;

/// A trait for types that can be converted into HTTP responses.
///
/// Types implementing this trait can be returned directly from request handlers
/// and will be automatically converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

/// Implementation for Result allows handlers to return Result types directly.
/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

/// Pre-built responses pass through, with their body converted.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (*self).response_to(req)
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        text_response(StatusCode::OK, ResponseBody::from(self))
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        text_response(StatusCode::OK, ResponseBody::from(self))
    }
}

/// Serializes the value as `application/json`; a value that fails to serialize becomes a 500.
impl<T: Serialize> Responder for Json<T> {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => {
                let mut response = Response::new(ResponseBody::from(bytes));
                response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(e) => {
                error!(cause = %e, "serialize json response error");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, ResponseBody::from("Internal Server Error"))
            }
        }
    }
}

/// Renders the error as plain text, keeping its status and headers.
impl Responder for HttpError {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        let mut response = text_response(self.status(), ResponseBody::from(self.reason().to_string()));
        for (name, value) in self.headers() {
            response.headers_mut().insert(name, value.clone());
        }
        response
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match self {}
    }
}

pub(crate) fn text_response(status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use http::Request;
    use http::header::ALLOW;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_of(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_string_and_status() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let response = ("created".to_string(), StatusCode::CREATED).response_to(&req);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(body_of(response).await, "created");
    }

    #[tokio::test]
    async fn test_json_responder() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let response = Json(json!({"id": 1})).response_to(&req);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_of(response).await, r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_http_error_responder() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let error = HttpError::method_not_allowed(&http::Method::PUT, "/", &[http::Method::GET]);
        let response = error.response_to(&req);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
        assert_eq!(body_of(response).await, "Method PUT not allowed for URL /");
    }
}
