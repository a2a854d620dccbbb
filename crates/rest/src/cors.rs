//! Cross origin resource sharing for resource methods.

use crate::RequestContext;
use crate::body::{OptionReqBody, ResponseBody};
use crate::decorator::Decorator;
use crate::error::BoxError;
use crate::handler::{BoxedMethodHandler, MethodHandler};
use crate::reply::Reply;
use async_trait::async_trait;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response};
use std::sync::Arc;
use std::time::Duration;

const STANDARD_METHODS: [&str; 7] = ["GET", "POST", "PUT", "HEAD", "OPTIONS", "PATCH", "DELETE"];

/// A method decorator adding the `Access-Control-*` headers.
///
/// ```
/// use micro_rest::{CrossDomain, Resource, handler_fn};
///
/// async fn list_todos() -> &'static str {
///     "[]"
/// }
///
/// let resource = Resource::builder("TodoList")
///     .get(handler_fn(list_todos))
///     .method_decorator(CrossDomain::new(["https://todo.example"]).headers(["content-type"]))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct CrossDomain {
    origin: String,
    methods: Option<String>,
    headers: Option<String>,
    expose_headers: Option<String>,
    max_age: Duration,
    attach_to_all: bool,
    automatic_options: bool,
    credentials: bool,
}

impl CrossDomain {
    pub fn new<S: AsRef<str>>(origins: impl IntoIterator<Item = S>) -> Self {
        Self {
            origin: join(origins, false),
            methods: None,
            headers: None,
            expose_headers: None,
            max_age: Duration::from_secs(21600),
            attach_to_all: true,
            automatic_options: true,
            credentials: false,
        }
    }

    pub fn any_origin() -> Self {
        Self::new(["*"])
    }

    /// The allowed methods; `OPTIONS` is always added.
    #[must_use]
    pub fn methods<S: AsRef<str>>(mut self, methods: impl IntoIterator<Item = S>) -> Self {
        let mut methods = methods.into_iter().map(|method| method.as_ref().to_uppercase()).collect::<Vec<_>>();
        methods.sort();
        if !methods.iter().any(|method| method == Method::OPTIONS.as_str()) {
            methods.push(Method::OPTIONS.to_string());
        }
        self.methods = Some(methods.join(", "));
        self
    }

    #[must_use]
    pub fn headers<S: AsRef<str>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers = Some(join(headers, true));
        self
    }

    #[must_use]
    pub fn expose_headers<S: AsRef<str>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.expose_headers = Some(join(headers, true));
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Only answers preflight requests with the headers when disabled.
    #[must_use]
    pub fn attach_to_all(mut self, attach_to_all: bool) -> Self {
        self.attach_to_all = attach_to_all;
        self
    }

    /// Answers `OPTIONS` without calling the handler.
    #[must_use]
    pub fn automatic_options(mut self, automatic_options: bool) -> Self {
        self.automatic_options = automatic_options;
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: bool) -> Self {
        self.credentials = credentials;
        self
    }

    fn apply(&self, headers: &mut HeaderMap) {
        let methods = self.methods.clone().unwrap_or_else(|| STANDARD_METHODS.join(", "));
        let mut set = |name: HeaderName, value: &str| {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        };

        set(ACCESS_CONTROL_ALLOW_ORIGIN, &self.origin);
        set(ACCESS_CONTROL_ALLOW_METHODS, &methods);
        set(ACCESS_CONTROL_MAX_AGE, &self.max_age.as_secs().to_string());
        if self.credentials {
            set(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if let Some(allowed) = &self.headers {
            set(ACCESS_CONTROL_ALLOW_HEADERS, allowed);
        }
        if let Some(exposed) = &self.expose_headers {
            set(ACCESS_CONTROL_EXPOSE_HEADERS, exposed);
        }
    }
}

fn join<S: AsRef<str>>(values: impl IntoIterator<Item = S>, uppercase: bool) -> String {
    values
        .into_iter()
        .map(|value| if uppercase { value.as_ref().to_uppercase() } else { value.as_ref().to_string() })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Decorator<BoxedMethodHandler> for CrossDomain {
    type Out = BoxedMethodHandler;

    fn decorate(&self, raw: BoxedMethodHandler) -> Self::Out {
        Box::new(CorsHandler { inner: raw, cors: Arc::new(self.clone()) })
    }
}

struct CorsHandler {
    inner: BoxedMethodHandler,
    cors: Arc<CrossDomain>,
}

#[async_trait]
impl MethodHandler for CorsHandler {
    async fn handle<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Reply, BoxError> {
        let preflight = req.method() == Method::OPTIONS;
        let mut reply = if preflight && self.cors.automatic_options {
            Reply::Response(Response::new(ResponseBody::empty()))
        } else {
            self.inner.handle(req, req_body).await?
        };

        if self.cors.attach_to_all || preflight {
            self.cors.apply(reply.headers_mut());
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use crate::handler::handler_fn;
    use http::Request;
    use serde_json::{Value, json};

    async fn list_todos() -> Value {
        json!([])
    }

    async fn handle(cors: &CrossDomain, method: Method) -> Reply {
        let handler = cors.decorate(Box::new(handler_fn(list_todos)));
        let (header, ()) = Request::builder().method(method).uri("/todos").body(()).unwrap().into_parts();
        let params = PathParams::empty();
        handler.handle(RequestContext::new(&header, &params), OptionReqBody::empty()).await.unwrap()
    }

    #[tokio::test]
    async fn test_headers_on_data_reply() {
        let cors = CrossDomain::new(["https://a.example", "https://b.example"])
            .methods(["get", "post"])
            .headers(["content-type", "x-fields"])
            .credentials(true);
        let mut reply = handle(&cors, Method::GET).await;

        let headers = reply.headers_mut();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.example, https://b.example");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "CONTENT-TYPE, X-FIELDS");
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "21600");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(matches!(reply, Reply::Data { .. }));
    }

    #[tokio::test]
    async fn test_automatic_options() {
        let mut reply = handle(&CrossDomain::any_origin(), Method::OPTIONS).await;
        assert_eq!(reply.headers_mut()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, PUT, HEAD, OPTIONS, PATCH, DELETE");
        assert!(matches!(reply, Reply::Response(_)));
    }

    #[tokio::test]
    async fn test_attach_to_preflight_only() {
        let cors = CrossDomain::any_origin().attach_to_all(false);
        let mut reply = handle(&cors, Method::GET).await;
        assert!(reply.headers_mut().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let mut reply = handle(&cors, Method::OPTIONS).await;
        assert_eq!(reply.headers_mut()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
