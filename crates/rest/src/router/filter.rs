//! Request filters deciding which router item at a path accepts a request.
//!
//! Filters are composed with [`AllFilter`] and [`AnyFilter`]; a router item registered through the
//! method helpers of the router carries a [`MethodFilter`] for its methods.
//!
//! # Examples
//!
//! ```
//! use micro_rest::router::filter::{all_filter, header, method};
//! use http::Method;
//!
//! let mut combined = all_filter();
//! combined.and(method(Method::GET)).and(header("Authorization", "Bearer token").unwrap());
//! ```

use crate::RequestContext;
use http::{HeaderName, HeaderValue, Method};

/// Core trait for request filtering.
///
/// The `Filter` trait requires `Send + Sync`, ensuring that filters
/// can be safely used in a multi-threaded environment.
pub trait Filter: Send + Sync {
    /// Returns `true` if the request should be handled by the filtered item.
    fn matches(&self, req: &RequestContext) -> bool;
}

/// A filter that wraps a closure.
struct FnFilter<F: Fn(&RequestContext) -> bool>(F);

impl<F: Fn(&RequestContext) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &RequestContext) -> bool {
        (self.0)(req)
    }
}

/// Creates a new filter from a closure.
///
/// ```
/// use micro_rest::router::filter::fn_filter;
///
/// let api_only = fn_filter(|req| req.uri().path().starts_with("/api"));
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// Compose filters with AND logic.
///
/// An empty filter chain returns true by default.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the AND chain.
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// Compose filters with OR logic.
///
/// An empty filter chain returns true by default.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the OR chain.
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// A filter that accepts a set of HTTP methods.
pub struct MethodFilter(Vec<Method>);

impl MethodFilter {
    pub fn methods(&self) -> &[Method] {
        &self.0
    }
}

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.0.contains(req.method())
    }
}

/// Creates a filter that matches one HTTP method.
#[inline]
pub fn method(method: Method) -> MethodFilter {
    MethodFilter(vec![method])
}

/// Creates a filter that matches any of the given HTTP methods.
pub fn methods(methods: impl IntoIterator<Item = Method>) -> MethodFilter {
    MethodFilter(methods.into_iter().collect())
}

/// Creates a filter that matches a specific header name and value.
pub fn header<K, V>(header_name: K, header_value: V) -> Result<HeaderFilter, http::Error>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = <HeaderName as TryFrom<K>>::try_from(header_name).map_err(Into::into)?;
    let value = <HeaderValue as TryFrom<V>>::try_from(header_value).map_err(Into::into)?;
    Ok(HeaderFilter(name, value))
}

/// A filter that matches HTTP headers.
pub struct HeaderFilter(HeaderName, HeaderValue);

impl Filter for HeaderFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        req.headers().get(&self.0).is_some_and(|value| self.1.eq(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use http::Request;

    #[test]
    fn test_method_and_header() {
        let (header_parts, ()) = Request::builder()
            .method(Method::POST)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(())
            .unwrap()
            .into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header_parts, &params);

        let mut json_post = all_filter();
        json_post.and(methods([Method::PUT, Method::POST])).and(header("content-type", "application/json").unwrap());
        assert!(json_post.matches(&req));

        assert!(!method(Method::GET).matches(&req));
        assert!(all_filter().matches(&req));
        assert!(!header("x-missing", "1").unwrap().matches(&req));

        let mut get_or_post = any_filter();
        get_or_post.or(method(Method::GET)).or(method(Method::POST));
        assert!(get_or_post.matches(&req));
        assert!(any_filter().matches(&req));
    }

    #[test]
    fn test_invalid_header_name() {
        assert!(header("bad header", "1").is_err());
    }
}
