//! URL extraction functionality
//!
//! This module provides extraction of typed data from the query string and from the path
//! parameters of the matched route.
//!
//! # Example
//! ```no_run
//! # use serde::Deserialize;
//! # use micro_rest::extract::{Path, Query};
//!
//! #[derive(Deserialize)]
//! struct Params {
//!     name: String,
//!     age: u32,
//! }
//!
//! async fn handler(Path(todo_id): Path<u32>, Query(params): Query<Params>) {
//!     println!("Todo {todo_id}, Name: {}, Age: {}", params.name, params.age);
//! }
//! ```

use crate::error::{BoxError, HttpError};
use crate::extract::{FromRequest, Path, Query};
use crate::{OptionReqBody, RequestContext};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Deserializes the query string with serde_qs; a missing query string is treated as empty.
#[async_trait]
impl<T> FromRequest for Query<T>
where
    T: DeserializeOwned + Send,
{
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let query = req.uri().query().unwrap_or_default();
        serde_qs::from_str::<T>(query)
            .map(Query)
            .map_err(|e| HttpError::bad_request(format!("invalid query string: {e}")).into())
    }
}

#[async_trait]
impl<T> FromRequest for Path<T>
where
    T: DeserializeOwned + Send,
{
    async fn from_request<'server, 'req>(
        req: &RequestContext<'server, 'req>,
        _body: OptionReqBody,
    ) -> Result<Self, BoxError> {
        let pairs = req.path_params().iter();
        let encoded = pairs.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("&");

        // a struct named after the parameters, or the lone parameter's value
        let by_name = serde_urlencoded::from_str::<T>(&encoded);
        let value = match by_name {
            Ok(value) => Ok(value),
            Err(e) if pairs.len() == 1 => serde_urlencoded::from_str::<Vec<(String, T)>>(&encoded)
                .map_err(|_single_error| e)
                .and_then(|mut values| values.pop().map(|(_, value)| value).ok_or_else(|| {
                    serde::de::Error::custom("missing path parameter")
                })),
            Err(e) => Err(e),
        };

        value.map(Path).map_err(|e| HttpError::bad_request(format!("invalid path parameter: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathParams;
    use http::Request;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Paging {
        page: u32,
        per_page: Option<u32>,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct TodoPath {
        list: String,
        todo_id: u32,
    }

    fn matched<'a>(router: &'a matchit::Router<()>, path: &'a str) -> PathParams<'a, 'a> {
        router.at(path).unwrap().params.into()
    }

    #[tokio::test]
    async fn test_query() {
        let (header, ()) = Request::builder().uri("/todos?page=2").body(()).unwrap().into_parts();
        let params = PathParams::empty();
        let req = RequestContext::new(&header, &params);

        let Query(paging) = Query::<Paging>::from_request(&req, OptionReqBody::empty()).await.unwrap();
        assert_eq!(paging, Paging { page: 2, per_page: None });
    }

    #[tokio::test]
    async fn test_single_path_value() {
        let mut router = matchit::Router::new();
        router.insert("/todos/{todo_id}", ()).unwrap();
        let params = matched(&router, "/todos/42");

        let (header, ()) = Request::builder().uri("/todos/42").body(()).unwrap().into_parts();
        let req = RequestContext::new(&header, &params);

        let Path(todo_id) = Path::<u32>::from_request(&req, OptionReqBody::empty()).await.unwrap();
        assert_eq!(todo_id, 42);
    }

    #[tokio::test]
    async fn test_struct_path_values() {
        let mut router = matchit::Router::new();
        router.insert("/lists/{list}/todos/{todo_id}", ()).unwrap();
        let params = matched(&router, "/lists/home/todos/7");

        let (header, ()) = Request::builder().uri("/lists/home/todos/7").body(()).unwrap().into_parts();
        let req = RequestContext::new(&header, &params);

        let Path(path) = Path::<TodoPath>::from_request(&req, OptionReqBody::empty()).await.unwrap();
        assert_eq!(path, TodoPath { list: "home".into(), todo_id: 7 });
    }

    #[tokio::test]
    async fn test_bad_path_value() {
        let mut router = matchit::Router::new();
        router.insert("/todos/{todo_id}", ()).unwrap();
        let params = matched(&router, "/todos/abc");

        let (header, ()) = Request::builder().uri("/todos/abc").body(()).unwrap().into_parts();
        let req = RequestContext::new(&header, &params);

        assert!(Path::<u32>::from_request(&req, OptionReqBody::empty()).await.is_err());
    }
}
