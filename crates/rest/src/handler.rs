//! Handler traits and the adapter turning async functions into handlers.
//!
//! Two kinds of handlers exist:
//! - [`RequestHandler`] answers a routed request with a full HTTP response.
//! - [`MethodHandler`] answers one HTTP method of a REST resource with a [`Reply`], which the
//!   owning API later negotiates into a response.
//!
//! [`handler_fn`] wraps an async function whose arguments implement [`FromRequest`] into
//! either kind, depending on what the function returns.

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::extract::FromRequest;
use crate::fn_trait::FnTrait;
use crate::reply::{IntoReply, Reply};
use crate::responder::Responder;
use crate::{OptionReqBody, RequestContext};
use async_trait::async_trait;
use http::Response;
use std::marker::PhantomData;
use std::sync::Arc;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError>;
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Box<T> {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        (**self).invoke(req, req_body).await
    }
}

#[async_trait]
impl<T: RequestHandler + ?Sized> RequestHandler for Arc<T> {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        (**self).invoke(req, req_body).await
    }
}

/// Handles one HTTP method of a resource.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Reply, BoxError>;
}

pub type BoxedMethodHandler = Box<dyn MethodHandler>;

#[async_trait]
impl<T: MethodHandler + ?Sized> MethodHandler for Box<T> {
    async fn handle<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Reply, BoxError> {
        (**self).handle(req, req_body).await
    }
}

#[async_trait]
impl<T: MethodHandler + ?Sized> MethodHandler for Arc<T> {
    async fn handle<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Reply, BoxError> {
        (**self).handle(req, req_body).await
    }
}

/// a `FnTrait` holder which represents any async Fn
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Args> RequestHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: Responder,
    Args: FromRequest,
{
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let args = Args::from_request(&req, req_body).await?;
        let responder = self.f.call(args).await;
        Ok(responder.response_to(&req))
    }
}

#[async_trait]
impl<F, Args> MethodHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: IntoReply,
    Args: FromRequest,
{
    async fn handle<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Reply, BoxError> {
        let args = Args::from_request(&req, req_body).await?;
        self.f.call(args).await.into_reply()
    }
}

#[cfg(test)]
mod test {
    use crate::extract::Json;
    use crate::fn_trait::FnTrait;
    use crate::handler::{FnHandler, MethodHandler, RequestHandler, handler_fn};
    use crate::reply::Reply;
    use crate::{OptionReqBody, PathParams, RequestContext};
    use http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    fn assert_is_fn_handler<H: FnTrait<Args>, Args>(_handler: &FnHandler<H, Args>) {
        // no op
    }

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn assert_is_method_handler<T: MethodHandler>(_handler: &T) {
        // no op
    }

    #[test]
    fn assert_fn_is_http_handler_1() {
        async fn get(_header: Method) {}

        let http_handler = FnHandler::new(get);
        assert_is_fn_handler(&http_handler);
        assert_is_handler(&http_handler);
    }

    #[test]
    fn assert_fn_is_method_handler() {
        async fn get(_method: Method, Json(body): Json<Value>) -> Value {
            body
        }

        let method_handler = handler_fn(get);
        assert_is_fn_handler(&method_handler);
        assert_is_method_handler(&method_handler);
    }

    #[tokio::test]
    async fn test_invoke_fn_handler() {
        async fn echo(body: String) -> String {
            format!("echo: {body}")
        }

        let (header, ()) = Request::builder().method(Method::POST).body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let response = RequestHandler::invoke(&handler_fn(echo), req, OptionReqBody::from_bytes("hi")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "echo: hi");
    }

    #[tokio::test]
    async fn test_handle_returns_reply_data() {
        async fn get() -> (Value, StatusCode) {
            (json!({"task": "write"}), StatusCode::CREATED)
        }

        let (header, ()) = Request::builder().body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        match handler_fn(get).handle(req, OptionReqBody::empty()).await.unwrap() {
            Reply::Data { data, status, .. } => {
                assert_eq!(data["task"], "write");
                assert_eq!(status, Some(StatusCode::CREATED));
            }
            Reply::Response(_) => panic!("expected data"),
        }
    }
}
