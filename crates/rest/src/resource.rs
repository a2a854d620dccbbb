//! Resources: one handler per HTTP method behind a single URL.

use crate::RequestContext;
use crate::api::ApiState;
use crate::body::{OptionReqBody, ResponseBody};
use crate::decorator::{Decorator, MethodDecorator};
use crate::doc::{Doc, Expect};
use crate::error::{BoxError, HttpError, RestError};
use crate::extract::parse_payload;
use crate::handler::{BoxedMethodHandler, MethodHandler, RequestHandler};
use crate::mask::Mask;
use crate::marshal::{MarshalError, marshal_with_envelope};
use crate::mimetype::{accept_mimetypes, best_match};
use crate::reply::Reply;
use crate::reqparse::ParsedArgs;
use crate::representation::{Representation, Representations};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderValue, Method, Response, StatusCode};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

struct MethodEntry {
    handler: BoxedMethodHandler,
    doc: Doc,
}

/// A set of method handlers served at one or more URLs.
///
/// ```
/// use micro_rest::{Doc, Resource, handler_fn};
/// use serde_json::{Value, json};
///
/// async fn list_todos() -> Value {
///     json!([{"task": "build an API"}])
/// }
///
/// let resource = Resource::builder("TodoList")
///     .get_with(handler_fn(list_todos), Doc::new().description("List all todos"))
///     .build();
/// assert_eq!(resource.methods(), &[http::Method::GET]);
/// ```
pub struct Resource {
    name: String,
    doc: Doc,
    methods: Vec<Method>,
    handlers: IndexMap<Method, MethodEntry>,
    representations: Option<Representations>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("representations", &self.representations)
            .finish_non_exhaustive()
    }
}

impl Resource {
    pub fn builder(name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            name: name.into(),
            doc: Doc::default(),
            handlers: vec![],
            decorators: vec![],
            representations: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource level doc.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    /// The methods with a handler, sorted by name.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The methods registered with the router: `OPTIONS` always, `HEAD` along with `GET`.
    pub fn route_methods(&self) -> Vec<Method> {
        let mut methods = self.methods.clone();
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        if !methods.contains(&Method::OPTIONS) {
            methods.push(Method::OPTIONS);
        }
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// The merged doc of a method, if the resource handles it.
    pub fn method_doc(&self, method: &Method) -> Option<&Doc> {
        self.handlers.get(method).map(|entry| &entry.doc)
    }

    fn lookup(&self, method: &Method) -> Option<&MethodEntry> {
        self.handlers.get(method).or_else(|| {
            if *method == Method::HEAD || *method == Method::OPTIONS { self.handlers.get(&Method::GET) } else { None }
        })
    }
}

pub struct ResourceBuilder {
    name: String,
    doc: Doc,
    handlers: Vec<(Method, BoxedMethodHandler, Doc)>,
    decorators: Vec<Box<MethodDecorator>>,
    representations: Option<Representations>,
}

impl fmt::Debug for ResourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBuilder").field("name", &self.name).finish_non_exhaustive()
    }
}

macro_rules! method_setters {
    ($($method:ident, $method_with:ident => $http_method:expr);* $(;)?) => {
        $(
            #[must_use]
            pub fn $method<H: MethodHandler + 'static>(self, handler: H) -> Self {
                self.handler($http_method, handler, Doc::default())
            }

            #[must_use]
            pub fn $method_with<H: MethodHandler + 'static>(self, handler: H, doc: Doc) -> Self {
                self.handler($http_method, handler, doc)
            }
        )*
    };
}

impl ResourceBuilder {
    method_setters! {
        get, get_with => Method::GET;
        post, post_with => Method::POST;
        put, put_with => Method::PUT;
        patch, patch_with => Method::PATCH;
        delete, delete_with => Method::DELETE;
        head, head_with => Method::HEAD;
        options, options_with => Method::OPTIONS;
    }

    /// Documents every method of the resource.
    #[must_use]
    pub fn doc(mut self, doc: Doc) -> Self {
        self.doc = doc;
        self
    }

    /// Registers the handler of a method, replacing an earlier one.
    #[must_use]
    pub fn handler<H: MethodHandler + 'static>(mut self, method: Method, handler: H, doc: Doc) -> Self {
        self.handlers.retain(|(existing, _, _)| *existing != method);
        self.handlers.push((method, Box::new(handler), doc));
        self
    }

    /// Wraps every method handler; the first decorator added is the innermost.
    #[must_use]
    pub fn method_decorator<D>(mut self, decorator: D) -> Self
    where
        D: Decorator<BoxedMethodHandler, Out = BoxedMethodHandler> + Send + Sync + 'static,
    {
        self.decorators.push(Box::new(decorator));
        self
    }

    /// Renders this resource's data with its own representations when the client accepts one.
    #[must_use]
    pub fn representation(mut self, mediatype: impl Into<String>, representation: impl Representation + 'static) -> Self {
        self.representations.get_or_insert_with(Representations::new).insert(mediatype, representation);
        self
    }

    pub fn build(self) -> Resource {
        let ResourceBuilder { name, doc, handlers, decorators, representations } = self;

        let mut handlers = handlers
            .into_iter()
            .map(|(method, handler, method_doc)| {
                let handler = decorators.iter().fold(handler, |handler, decorator| decorator.decorate(handler));
                (method, MethodEntry { handler, doc: doc.merge(&method_doc) })
            })
            .collect::<IndexMap<_, _>>();
        handlers.sort_by(|a, _, b, _| a.as_str().cmp(b.as_str()));

        let methods = handlers.keys().cloned().collect();
        Resource { name, doc, methods, handlers, representations }
    }
}

/// A resource bound to an API, ready to serve requests.
pub(crate) struct ResourceView {
    resource: Arc<Resource>,
    namespace_validate: Option<bool>,
    api: Arc<ApiState>,
}

impl ResourceView {
    pub(crate) fn new(resource: Arc<Resource>, namespace_validate: Option<bool>, api: Arc<ApiState>) -> Self {
        Self { resource, namespace_validate, api }
    }

    async fn validate_payload(&self, doc: &Doc, body: &OptionReqBody) -> Result<(), BoxError> {
        let validate = doc.validation().or(self.namespace_validate).or(self.api.validate()).unwrap_or(self.api.config().validate);
        if !validate {
            return Ok(());
        }

        let check_formats = self.api.format_checker();
        for expect in doc.expectations() {
            let (model, collection) = match expect {
                Expect::Model(model) => (model, false),
                Expect::List(model) => (model, true),
                Expect::Parser(_) => continue,
            };
            let data = parse_payload(&body.bytes().await?)?;
            let objects = match data {
                Value::Array(items) if collection => items,
                other => vec![other],
            };
            for object in &objects {
                model.validate(object, check_formats).map_err(|e| match e {
                    RestError::Invalid(errors) => HttpError::validation(errors),
                    other => {
                        error!(resource = self.resource.name.as_str(), "payload validation unavailable: {other}");
                        HttpError::internal()
                    }
                })?;
            }
        }
        Ok(())
    }

    async fn parse_arguments(&self, doc: &Doc, req: &RequestContext<'_, '_>, body: &OptionReqBody) -> Result<Option<Extensions>, BoxError> {
        let mut parsed: Option<Map<String, Value>> = None;
        for expect in doc.expectations() {
            if let Expect::Parser(parser) = expect {
                let args = parser.parse_request(req, body).await?;
                parsed.get_or_insert_with(Map::new).extend(args.into_inner());
            }
        }
        Ok(parsed.map(|parsed| {
            let mut extensions = Extensions::new();
            extensions.insert(ParsedArgs::from(parsed));
            extensions
        }))
    }

    fn marshal(&self, doc: &Doc, req: &RequestContext<'_, '_>, reply: Reply) -> Result<Reply, BoxError> {
        let Some(marshalling) = doc.marshalling() else {
            return Ok(reply);
        };
        let Reply::Data { data, status, headers } = reply else {
            return Ok(reply);
        };

        let header_mask = req.headers().get(self.api.config().mask_header.as_str()).and_then(|value| value.to_str().ok());
        let mask = match header_mask.or(marshalling.mask.as_deref()).or(marshalling.model.mask()) {
            Some(mask) => Some(Mask::parse(mask)?),
            None => None,
        };

        let data = marshal_with_envelope(&data, &marshalling.model, mask.as_ref(), marshalling.skip_none, marshalling.envelope.as_deref())
            .map_err(MarshalError::into_source)?;
        Ok(Reply::Data { data, status: status.or(Some(marshalling.code)), headers })
    }
}

#[async_trait]
impl RequestHandler for ResourceView {
    async fn invoke<'server, 'req>(
        &self,
        req: RequestContext<'server, 'req>,
        req_body: OptionReqBody,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let Some(entry) = self.resource.lookup(req.method()) else {
            return Err(HttpError::method_not_allowed(req.method(), req.uri().path(), &self.resource.route_methods()).into());
        };

        self.validate_payload(&entry.doc, &req_body).await?;

        let extensions = self.parse_arguments(&entry.doc, &req, &req_body).await?;
        let reply = match &extensions {
            Some(extensions) => entry.handler.handle(req.with_extensions(extensions), req_body).await?,
            None => entry.handler.handle(req, req_body).await?,
        };
        let reply = self.marshal(&entry.doc, &req, reply)?;

        let (data, status, headers) = match reply {
            Reply::Response(response) => return Ok(response),
            Reply::Data { data, status, headers } => (data, status.unwrap_or(StatusCode::OK), headers),
        };

        if let Some(representations) = &self.resource.representations {
            let accept = accept_mimetypes(req.headers());
            if let Some(mediatype) = best_match(&accept, &representations.mediatypes(), None) {
                if let Some(representation) = representations.get(&mediatype) {
                    debug!(resource = self.resource.name(), %mediatype, "rendering with resource representation");
                    let mut response = representation.render(&data, status, headers, self.api.config())?;
                    if let Ok(value) = HeaderValue::from_str(&mediatype) {
                        response.headers_mut().insert(CONTENT_TYPE, value);
                    }
                    return Ok(response);
                }
            }
        }

        self.api.make_response(&req, &data, status, headers, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use serde_json::json;

    async fn get_todo() -> Value {
        json!({"task": "build"})
    }

    async fn delete_todo() -> (Value, StatusCode) {
        (Value::Null, StatusCode::NO_CONTENT)
    }

    #[test]
    fn test_methods_are_sorted_and_route_methods_complete() {
        let resource = Resource::builder("Todo").get(handler_fn(get_todo)).delete(handler_fn(delete_todo)).build();
        assert_eq!(resource.methods(), &[Method::DELETE, Method::GET]);
        assert_eq!(resource.route_methods(), vec![Method::DELETE, Method::GET, Method::HEAD, Method::OPTIONS]);
    }

    #[test]
    fn test_head_and_options_fall_back_to_get() {
        let resource = Resource::builder("Todo").get(handler_fn(get_todo)).build();
        assert!(resource.lookup(&Method::HEAD).is_some());
        assert!(resource.lookup(&Method::OPTIONS).is_some());
        assert!(resource.lookup(&Method::POST).is_none());

        let resource = Resource::builder("Todo").delete(handler_fn(delete_todo)).build();
        assert!(resource.lookup(&Method::HEAD).is_none());
    }

    #[test]
    fn test_method_docs_merge_resource_doc() {
        let resource = Resource::builder("Todo")
            .doc(Doc::new().param("todo_id", "The task identifier"))
            .get_with(handler_fn(get_todo), Doc::new().summary("Fetch a todo"))
            .build();
        let doc = resource.method_doc(&Method::GET).unwrap();
        assert_eq!(doc.summary.as_deref(), Some("Fetch a todo"));
        assert!(doc.params.contains_key("todo_id"));
    }
}
