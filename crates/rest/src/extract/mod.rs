//! Typed extraction of handler arguments from the incoming request.
//!
//! Every argument of a handler function implements [`FromRequest`]. Extraction failures are
//! reported as [`HttpError`](crate::HttpError)s with status 400, so they are answered through
//! the usual error handling.

mod extract_body;
mod extract_header;
mod extract_tuple;
mod extract_url;
mod from_request;

pub use from_request::FromRequest;

pub(crate) use extract_body::parse_payload;

/// Represented as form data
///
/// when `post` as a `application/x-www-form-urlencoded`, we can using this struct to inject data,
/// note: the struct must impl [`serde::Deserialize`] and [`Send`]
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_rest::extract::Form;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Form(params) : Form<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Form<T>(pub T);

/// Represented as json data
///
/// when `post` as a `application/json`, we can using this struct to inject data,
/// note: the struct must impl [`serde::Deserialize`] and [`Send`]
///
/// `Json` is also a return type: plain routes answer with an `application/json` body, and
/// resource methods hand the serialized value to content negotiation.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_rest::extract::Json;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Json(params) : Json<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Represented as url query data
///
/// when request with url query, we can using this struct to inject data,
/// note: the struct must impl [`serde::Deserialize`] and [`Send`]
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_rest::extract::Query;
/// # #[allow(dead_code)]
/// #[derive(Deserialize, Debug)]
/// struct Params {
///     name: String,
///     zip: String,
/// }
///
/// pub async fn handle(Query(params) : Query<Params>) -> String {
///     format!("received params: {:?}", params)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

/// Represented as the path parameters of the matched route
///
/// `T` is either a struct whose fields are named after the parameters, or a single value when
/// the route has exactly one parameter.
///
/// # Example
/// ```
/// # use micro_rest::extract::Path;
/// pub async fn handle(Path(todo_id) : Path<u32>) -> String {
///     format!("todo {todo_id}")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

/// The request body parsed as untyped JSON, `null` when the body is empty.
#[derive(Debug, Clone)]
pub struct Payload(pub serde_json::Value);
