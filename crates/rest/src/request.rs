//! Request handling module that provides access to HTTP request information and path parameters.
//!
//! This module contains the core types for working with HTTP requests:
//! - `RequestContext`: Provides access to request headers, path parameters and the matched route
//! - `PathParams`: Handles URL path parameters extracted from request paths
//! - `RouteInfo`: Describes which router items live at the requested path

use crate::router::RouterItem;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use matchit::Params;

/// The head of an HTTP request.
pub type RequestHeader = http::request::Parts;

/// Represents the context of an HTTP request, providing access to both the request headers
/// and any path parameters extracted from the URL.
///
/// The lifetime parameters ensure that the request context does not outlive the server
/// or the request data it references.
#[derive(Clone, Copy)]
pub struct RequestContext<'server: 'req, 'req> {
    request_header: &'req RequestHeader,
    path_params: &'req PathParams<'server, 'req>,
    route: RouteInfo<'server>,
    extensions: Option<&'req Extensions>,
}

impl<'server, 'req> RequestContext<'server, 'req> {
    /// Creates a new RequestContext with the given request header and path parameters
    pub fn new(request_header: &'req RequestHeader, path_params: &'req PathParams<'server, 'req>) -> Self {
        Self { request_header, path_params, route: RouteInfo::empty(), extensions: None }
    }

    /// Attaches the routing outcome to this context
    #[must_use]
    pub fn with_route(mut self, route: RouteInfo<'server>) -> Self {
        self.route = route;
        self
    }

    /// Returns a context that additionally exposes the given per-request extensions
    pub fn with_extensions<'a>(&self, extensions: &'a Extensions) -> RequestContext<'server, 'a>
    where
        'req: 'a,
    {
        RequestContext {
            request_header: self.request_header,
            path_params: self.path_params,
            route: self.route,
            extensions: Some(extensions),
        }
    }

    /// Returns a reference to the underlying RequestHeader
    pub fn request_header(&self) -> &RequestHeader {
        self.request_header
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.request_header.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.request_header.uri
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.request_header.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.request_header.headers
    }

    /// Returns a reference to the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams<'server, 'req> {
        self.path_params
    }

    /// Returns what the router found for the requested path
    pub fn route(&self) -> RouteInfo<'server> {
        self.route
    }

    /// The endpoint name of the router item that accepted this request, if any
    pub fn endpoint(&self) -> Option<&'server str> {
        self.route.endpoint
    }

    /// Looks up a per-request extension value
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.and_then(|extensions| extensions.get::<T>())
    }
}

/// The routing outcome for one request.
///
/// `items` holds every router item registered at the matched path (empty when the path is
/// unknown), `endpoint` the name of the item whose filter accepted the request.
#[derive(Clone, Copy)]
pub struct RouteInfo<'server> {
    items: &'server [RouterItem],
    endpoint: Option<&'server str>,
}

impl<'server> RouteInfo<'server> {
    pub fn new(items: &'server [RouterItem], endpoint: Option<&'server str>) -> Self {
        Self { items, endpoint }
    }

    pub fn empty() -> Self {
        Self { items: &[], endpoint: None }
    }

    /// Returns true when no route is registered at the requested path
    pub fn is_unmatched(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &'server [RouterItem] {
        self.items
    }

    pub fn endpoint(&self) -> Option<&'server str> {
        self.endpoint
    }

    /// Endpoint names of every item at the requested path
    pub fn endpoints(&self) -> impl Iterator<Item = &'server str> + 'server {
        self.items.iter().filter_map(RouterItem::endpoint)
    }

    /// Methods accepted at the requested path, in registration order without duplicates
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = vec![];
        for method in self.items.iter().flat_map(RouterItem::methods) {
            if !methods.contains(method) {
                methods.push(method.clone());
            }
        }
        methods
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the URL path that can be extracted and accessed
/// by name. For example, in the path "/users/{id}", "id" is a path parameter.
#[derive(Debug, Clone)]
pub struct PathParams<'server, 'req> {
    kind: PathParamsKind<'server, 'req>,
}

/// Internal enum to represent either empty parameters or actual parameters
#[derive(Debug, Clone)]
enum PathParamsKind<'server, 'req> {
    None,
    Params(Params<'server, 'req>),
}

impl<'server, 'req> PathParams<'server, 'req> {
    /// Creates a new PathParams instance from the given Params
    /// If the params are empty, returns an empty PathParams instance
    #[inline]
    fn new(params: Params<'server, 'req>) -> Self {
        if params.is_empty() { Self::empty() } else { Self { kind: PathParamsKind::Params(params) } }
    }

    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { kind: PathParamsKind::None }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            PathParamsKind::None => true,
            PathParamsKind::Params(params) => params.is_empty(),
        }
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            PathParamsKind::None => 0,
            PathParamsKind::Params(params) => params.len(),
        }
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&'req str> {
        match &self.kind {
            PathParamsKind::Params(params) => params.get(key),
            PathParamsKind::None => None,
        }
    }

    /// Iterates over `(name, value)` pairs in path order
    pub fn iter(&self) -> Vec<(&'server str, &'req str)> {
        match &self.kind {
            PathParamsKind::Params(params) => params.iter().collect(),
            PathParamsKind::None => vec![],
        }
    }
}

// Implementation of From trait to convert from Params to PathParams
impl<'server, 'req> From<Params<'server, 'req>> for PathParams<'server, 'req> {
    fn from(params: Params<'server, 'req>) -> Self {
        PathParams::new(params)
    }
}
