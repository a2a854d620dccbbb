//! Path routing built on `matchit`.
//!
//! Several [`RouterItem`]s may share one path; the first whose filter accepts the request
//! handles it. Items remember the methods they accept and, optionally, an endpoint name, which
//! lets error handling answer 405 with an `Allow` header and tell which API owns a request.

pub mod filter;

use crate::handler::RequestHandler;
use crate::PathParams;

use crate::decorator::Decorator;
use filter::{AllFilter, Filter};
use http::Method;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

type RouterFilter = dyn Filter + Send + Sync + 'static;
type InnerRouter<T> = matchit::Router<T>;
type GlobalDecorator = dyn Fn(Box<dyn RequestHandler>) -> Box<dyn RequestHandler> + Send + Sync;

/// Main router structure that handles HTTP request routing
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
}

/// A router item containing a filter and handler
pub struct RouterItem {
    filter: Box<RouterFilter>,
    handler: Box<dyn RequestHandler>,
    endpoint: Option<String>,
    methods: Vec<Method>,
}

/// Result of matching a route, containing matched items and path parameters
pub struct RouteResult<'router, 'req> {
    router_items: &'router [RouterItem],
    params: PathParams<'router, 'req>,
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route '{path}': {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches a path against the router's routes
    pub fn at<'router, 'req>(&'router self, path: &'req str) -> RouteResult<'router, 'req> {
        self.inner_router
            .at(path)
            .map(|matched| RouteResult { router_items: matched.value.as_slice(), params: matched.params.into() })
            .map_err(|e| debug!("match '{}' error: {}", path, e))
            .unwrap_or(RouteResult::empty())
    }
}

impl RouterItem {
    /// Gets the filter for this router item
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    /// Gets the request handler for this router item
    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The methods this item was registered for
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl<'router, 'req> RouteResult<'router, 'req> {
    fn empty() -> Self {
        Self { router_items: &[], params: PathParams::empty() }
    }

    /// Returns true if no routes were matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router_items.is_empty()
    }

    /// Gets the path parameters from the matched route
    pub fn params(&self) -> &PathParams<'router, 'req> {
        &self.params
    }

    /// Gets the matched router items
    pub fn router_items(&self) -> &'router [RouterItem] {
        self.router_items
    }
}

/// Collects routes, keeping registration order per path
pub struct RouterBuilder {
    data: IndexMap<String, Vec<RouterItemBuilder>>,
    decorators: Vec<Box<GlobalDecorator>>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { data: IndexMap::new(), decorators: vec![] }
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.add_route(route, item_builder);
        self
    }

    pub fn add_route(&mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> &mut Self {
        self.data.entry(route.into()).or_default().push(item_builder);
        self
    }

    /// Wraps every handler of the router, in the order decorators were added
    #[must_use]
    pub fn with_global_decorator<D>(mut self, decorator: D) -> Self
    where
        D: Decorator<Box<dyn RequestHandler>> + Send + Sync + 'static,
        D::Out: RequestHandler + 'static,
    {
        self.decorators.push(Box::new(move |handler: Box<dyn RequestHandler>| -> Box<dyn RequestHandler> {
            Box::new(decorator.decorate(handler))
        }));
        self
    }

    /// Builds the router from the accumulated routes and wrappers
    pub fn build(self) -> Result<Router, RouterError> {
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            let router_items = items
                .into_iter()
                .map(RouterItemBuilder::build)
                .map(|item| {
                    let handler = self.decorators.iter().fold(item.handler, |handler, decorate| decorate(handler));
                    RouterItem { handler, ..item }
                })
                .collect::<Vec<_>>();

            inner_router
                .insert(path.clone(), router_items)
                .map_err(|source| RouterError::InvalidRoute { path, source })?;
        }

        Ok(Router { inner_router })
    }
}

macro_rules! method_router_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Routes HTTP ", stringify!($upper_case_method), " requests to the handler.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouterItemBuilder {
            route_methods([Method::$upper_case_method], handler)
        }
    };
}

method_router_filter!(get, GET);
method_router_filter!(post, POST);
method_router_filter!(put, PUT);
method_router_filter!(delete, DELETE);
method_router_filter!(head, HEAD);
method_router_filter!(options, OPTIONS);
method_router_filter!(patch, PATCH);

/// Routes requests with any of the given methods to the handler.
pub fn route_methods<H: RequestHandler + 'static>(
    methods: impl IntoIterator<Item = Method>,
    handler: H,
) -> RouterItemBuilder {
    let methods = methods.into_iter().collect::<Vec<_>>();
    let mut filters = filter::all_filter();
    filters.and(filter::methods(methods.clone()));
    RouterItemBuilder { filters, handler: Box::new(handler), endpoint: None, methods }
}

pub struct RouterItemBuilder {
    filters: AllFilter,
    handler: Box<dyn RequestHandler>,
    endpoint: Option<String>,
    methods: Vec<Method>,
}

impl RouterItemBuilder {
    /// An item accepting every method; narrow it with [`with`](Self::with)
    pub fn new<H: RequestHandler + 'static>(handler: H) -> Self {
        Self { filters: filter::all_filter(), handler: Box::new(handler), endpoint: None, methods: vec![] }
    }

    #[must_use]
    pub fn with<F: Filter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    /// Names the item, so error handling can tell who registered it
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn build(self) -> RouterItem {
        RouterItem { filter: Box::new(self.filters), handler: self.handler, endpoint: self.endpoint, methods: self.methods }
    }
}

#[cfg(test)]
mod tests {
    use super::filter::header;
    use super::{get, post, route_methods, Router};
    use crate::{handler_fn, PathParams, RequestContext};
    use http::{Method, Request};

    async fn simple_get_1(_method: Method) -> String {
        "hello world".into()
    }

    async fn simple_get_2(_method: Method) -> String {
        "hello world".into()
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(handler_fn(simple_get_1)).endpoint("index"))
            .route(
                "/",
                post(handler_fn(simple_get_1))
                    .with(header(http::header::CONTENT_TYPE, mime::APPLICATION_WWW_FORM_URLENCODED.as_ref()).unwrap()),
            )
            .route("/", post(handler_fn(simple_get_1)))
            .route("/todos/{todo_id}", route_methods([Method::GET, Method::PUT], handler_fn(simple_get_2)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_route_get() {
        let router = router();
        let route_result = router.at("/");

        assert_eq!(route_result.params().len(), 0);

        let items = route_result.router_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].endpoint(), Some("index"));

        let (header, ()) = Request::builder().method(Method::GET).body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req_ctx = RequestContext::new(&header, &params);

        assert!(items[0].filter().matches(&req_ctx));
        assert!(!items[1].filter().matches(&req_ctx));
        assert!(!items[2].filter().matches(&req_ctx));
    }

    #[test]
    fn test_route_post_with_content_type() {
        let router = router();
        let items = router.at("/").router_items();

        let (header, ()) = Request::builder()
            .method(Method::POST)
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(())
            .unwrap()
            .into_parts();
        let params = PathParams::empty();
        let req_ctx = RequestContext::new(&header, &params);

        assert!(!items[0].filter().matches(&req_ctx));
        assert!(items[1].filter().matches(&req_ctx));
        assert!(items[2].filter().matches(&req_ctx));
    }

    #[test]
    fn test_route_with_params() {
        let router = router();
        let route_result = router.at("/todos/3");

        assert_eq!(route_result.params().get("todo_id"), Some("3"));
        assert_eq!(route_result.router_items()[0].methods(), &[Method::GET, Method::PUT]);
        assert!(router.at("/missing").is_empty());
    }

    #[test]
    fn test_conflicting_routes_fail_to_build() {
        let result = Router::builder()
            .route("/todos/{id}", get(handler_fn(simple_get_1)))
            .route("/todos/{todo_id}", get(handler_fn(simple_get_2)))
            .build();
        assert!(result.is_err());
    }
}
