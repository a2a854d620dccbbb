use crate::RequestContext;
use crate::body::OptionReqBody;
use crate::error::{BoxError, HttpError};
use crate::extract::from_request::FromRequest;
use crate::extract::{Form, Json, Payload};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[async_trait]
impl FromRequest for Bytes {
    async fn from_request<'server, 'req>(
        _req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        body.bytes().await
    }
}

#[async_trait]
impl FromRequest for String {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let bytes = Bytes::from_request(req, body).await?;
        String::from_utf8(bytes.into()).map_err(|_utf8_error| HttpError::bad_request("request body is not utf8").into())
    }
}

#[async_trait]
impl<T> FromRequest for Json<T>
where
    T: DeserializeOwned + Send,
{
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let bytes = Bytes::from_request(req, body).await?;
        serde_json::from_slice::<T>(&bytes)
            .map(Json)
            .map_err(|e| HttpError::bad_request(format!("Failed to decode JSON object: {e}")).into())
    }
}

#[async_trait]
impl<T> FromRequest for Form<T>
where
    T: DeserializeOwned + Send,
{
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let bytes = Bytes::from_request(req, body).await?;
        serde_urlencoded::from_bytes::<T>(&bytes)
            .map(Form)
            .map_err(|e| HttpError::bad_request(format!("Failed to decode form body: {e}")).into())
    }
}

#[async_trait]
impl FromRequest for Payload {
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let bytes = Bytes::from_request(req, body).await?;
        parse_payload(&bytes).map(Payload)
    }
}

/// Parses a JSON body, treating an empty body as `null`.
pub(crate) fn parse_payload(bytes: &[u8]) -> Result<Value, BoxError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| HttpError::bad_request(format!("Failed to decode JSON object: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use http::{Request, StatusCode};
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Todo {
        task: String,
    }

    #[tokio::test]
    async fn test_json_and_payload_share_body() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);
        let body = OptionReqBody::from_bytes(r#"{"task": "build"}"#);

        let Json(todo) = Json::<Todo>::from_request(&req, body.clone()).await.unwrap();
        let Payload(payload) = Payload::from_request(&req, body).await.unwrap();

        assert_eq!(todo.task, "build");
        assert_eq!(payload["task"], "build");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let error = Json::<Todo>::from_request(&req, OptionReqBody::from_bytes("{")).await.unwrap_err();
        assert_eq!(error.downcast_ref::<HttpError>().unwrap().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_form_body() {
        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let Form(todo) = Form::<Todo>::from_request(&req, OptionReqBody::from_bytes("task=read+docs")).await.unwrap();
        assert_eq!(todo.task, "read docs");
    }

    #[test]
    fn test_empty_payload_is_null() {
        assert_eq!(parse_payload(b"").unwrap(), Value::Null);
        assert_eq!(parse_payload(b" \n").unwrap(), Value::Null);
    }
}
