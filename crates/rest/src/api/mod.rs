//! The API plugin: namespaces of resources, their swagger document and the documentation UI,
//! mounted on a server in one step.
//!
//! ```no_run
//! use micro_rest::{Api, Doc, Namespace, Resource, Server, handler_fn};
//! use serde_json::{Value, json};
//!
//! async fn list_todos() -> Value {
//!     json!([{"task": "build an API"}])
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let todos = Namespace::new("todos")
//!         .description("TODO operations")
//!         .route("/", Resource::builder("TodoList").get_with(handler_fn(list_todos), Doc::new().summary("List all todos")).build());
//!     let api = Api::new().title("TodoMVC API").version("1.0").add_namespace(todos);
//!
//!     let server = Server::builder().address("127.0.0.1:8080").plugin(api).build().unwrap();
//!     server.start().await;
//! }
//! ```

pub(crate) mod error_handler;
mod views;

use crate::RequestContext;
use crate::body::{OptionReqBody, ResponseBody};
use crate::config::ApiConfig;
use crate::decorator::{Decorator, ViewDecorator};
use crate::error::{BoxError, HttpError};
use crate::extract::parse_payload;
use crate::handler::RequestHandler;
use crate::mimetype::{accept_mimetypes, best_match, mediatypes};
use crate::model::Model;
use crate::namespace::{Namespace, ResourceRoute};
use crate::plugin::{Plugin, Registration};
use crate::reply::Reply;
use crate::representation::{Representation, Representations, output_text};
use crate::resource::{Resource, ResourceView};
use crate::router::{get, route_methods};
use crate::static_files::StaticFiles;
use crate::swagger::Swagger;
use crate::utils::{camel_to_dash, default_id, fill_rule_params, to_router_path};
use arc_swap::ArcSwapOption;
use error_handler::{ApiErrorHandler, FallbackErrorHandler, TypedErrorHandler, mask_error_handler, typed_error_handler};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info, warn};
use views::{DocView, RootView, SpecsView};

static NEXT_UID: AtomicUsize = AtomicUsize::new(1);

/// Builds an operation id from a resource name and a method name.
pub type OperationIdFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Metadata of the swagger `info` object.
#[derive(Debug, Clone)]
pub(crate) struct ApiInfo {
    pub(crate) title: String,
    pub(crate) version: String,
    pub(crate) description: Option<String>,
    pub(crate) terms_url: Option<String>,
    pub(crate) license: Option<String>,
    pub(crate) license_url: Option<String>,
    pub(crate) contact: Option<String>,
    pub(crate) contact_url: Option<String>,
    pub(crate) contact_email: Option<String>,
}

/// A resource as mounted by the API.
#[derive(Debug)]
pub(crate) struct MountedRoute {
    pub(crate) resource: Arc<Resource>,
    pub(crate) endpoint: String,
    /// Namespace path plus resource url, without the API prefix.
    pub(crate) urls: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct MountedNamespace {
    pub(crate) namespace: Namespace,
    pub(crate) routes: Vec<MountedRoute>,
}

/// Everything an API needs once mounted; shared by its views and its error handler.
pub(crate) struct ApiState {
    pub(crate) uid: usize,
    pub(crate) info: ApiInfo,
    pub(crate) prefix: String,
    pub(crate) doc_path: Option<String>,
    pub(crate) config: ApiConfig,
    pub(crate) representations: Representations,
    pub(crate) default_mediatype: Option<String>,
    pub(crate) validate: Option<bool>,
    pub(crate) format_checker: bool,
    pub(crate) authorizations: Option<Value>,
    pub(crate) security: Option<Value>,
    pub(crate) tags: Vec<Value>,
    pub(crate) default_id: OperationIdFn,
    pub(crate) catch_all_404s: bool,
    pub(crate) serve_challenge_on_401: bool,
    pub(crate) error_handlers: Vec<TypedErrorHandler>,
    pub(crate) default_error_handler: Option<FallbackErrorHandler>,
    pub(crate) additional_css: Option<String>,
    pub(crate) serve_static: bool,
    pub(crate) namespaces: Vec<MountedNamespace>,
    pub(crate) models: IndexMap<String, Model>,
    endpoints: HashSet<String>,
    /// Every rule the API serves, prefix included.
    pub(crate) rules: Vec<String>,
    endpoint_rules: IndexMap<String, Vec<String>>,
    schema: ArcSwapOption<Value>,
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("uid", &self.uid)
            .field("title", &self.info.title)
            .field("prefix", &self.prefix)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl ApiState {
    pub(crate) fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub(crate) fn validate(&self) -> Option<bool> {
        self.validate
    }

    pub(crate) fn format_checker(&self) -> bool {
        self.format_checker
    }

    pub(crate) fn owns_endpoint(&self, endpoint: &str) -> bool {
        self.endpoints.contains(endpoint)
    }

    pub(crate) fn base_path(&self) -> &str {
        if self.prefix.is_empty() { "/" } else { &self.prefix }
    }

    pub(crate) fn specs_url(&self) -> String {
        format!("{}/swagger.json", self.prefix)
    }

    /// The first url of an endpoint, its parameters filled from `params`.
    pub(crate) fn url_for(&self, endpoint: &str, params: &[(&str, &str)]) -> Option<String> {
        let rule = self.endpoint_rules.get(endpoint)?.first()?;
        let path = fill_rule_params(rule, |name| params.iter().find(|(key, _)| *key == name).map(|(_, value)| *value))?;
        Some(if path.is_empty() { "/".to_string() } else { path })
    }

    /// Negotiates the representation of `data` and renders it.
    ///
    /// `fallback` replaces the default mediatype; no acceptable mediatype fails with 406.
    pub(crate) fn make_response(
        &self,
        req: &RequestContext,
        data: &Value,
        status: StatusCode,
        headers: HeaderMap,
        fallback: Option<&str>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let default = fallback.or(self.default_mediatype.as_deref());
        let accept = accept_mimetypes(req.headers());
        let Some(mediatype) = best_match(&accept, &self.representations.mediatypes(), default) else {
            return Err(HttpError::not_acceptable().into());
        };

        if let Some(representation) = self.representations.get(&mediatype) {
            let mut response = representation.render(data, status, headers, &self.config)?;
            if let Ok(value) = HeaderValue::from_str(&mediatype) {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            Ok(response)
        } else if mediatype == "text/plain" {
            Ok(output_text(data, status, headers))
        } else {
            Err(HttpError::internal().with_message(format!("No representation for {mediatype}")).into())
        }
    }

    /// The swagger document, built once and kept until the cache is cleared.
    ///
    /// A failure is logged and answered with an error payload, which is not cached.
    pub(crate) fn schema(&self) -> Arc<Value> {
        if let Some(schema) = self.schema.load_full() {
            return schema;
        }
        match Swagger::new(self).as_dict() {
            Ok(schema) => {
                let schema = Arc::new(schema);
                self.schema.store(Some(Arc::clone(&schema)));
                schema
            }
            Err(e) => {
                error!(cause = %e, "Unable to render schema");
                Arc::new(json!({"error": "Unable to render schema"}))
            }
        }
    }

    pub(crate) fn clear_schema_cache(&self) {
        self.schema.store(None);
    }
}

/// Access to an API after it has been mounted on a server.
///
/// Obtained with [`Api::handle`] before the API is handed to the server builder.
#[derive(Debug, Clone, Default)]
pub struct ApiHandle {
    state: Arc<OnceCell<Arc<ApiState>>>,
}

impl ApiHandle {
    pub fn is_registered(&self) -> bool {
        self.state.get().is_some()
    }

    /// Builds the url of an endpoint, `params` naming the rule placeholders.
    pub fn url_for(&self, endpoint: &str, params: &[(&str, &str)]) -> Option<String> {
        self.state.get()?.url_for(endpoint, params)
    }

    /// The names of the endpoints the API serves.
    pub fn endpoints(&self) -> Vec<String> {
        self.state.get().map(|state| state.endpoints.iter().cloned().collect()).unwrap_or_default()
    }

    /// The swagger document, or `None` before registration.
    pub fn schema(&self) -> Option<Arc<Value>> {
        self.state.get().map(|state| state.schema())
    }

    /// Forces the next swagger request to rebuild the document.
    pub fn clear_schema_cache(&self) {
        if let Some(state) = self.state.get() {
            state.clear_schema_cache();
        }
    }
}

/// A REST API mounted on a server as a [`Plugin`].
pub struct Api {
    uid: usize,
    info: ApiInfo,
    authorizations: Option<Value>,
    security: Option<Value>,
    doc: Option<String>,
    documentation: Option<Box<dyn RequestHandler>>,
    default_id: OperationIdFn,
    namespaces: Vec<(Namespace, Option<String>)>,
    validate: Option<bool>,
    tags: Vec<Value>,
    prefix: String,
    default_mediatype: Option<String>,
    decorators: Vec<Arc<ViewDecorator>>,
    catch_all_404s: bool,
    serve_challenge_on_401: bool,
    format_checker: bool,
    additional_css: Option<String>,
    static_dir: Option<PathBuf>,
    config: ApiConfig,
    representations: Representations,
    error_handlers: Vec<TypedErrorHandler>,
    default_error_handler: Option<FallbackErrorHandler>,
    handle: ApiHandle,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("uid", &self.uid)
            .field("info", &self.info)
            .field("prefix", &self.prefix)
            .field("doc", &self.doc)
            .field("namespaces", &self.namespaces)
            .field("representations", &self.representations)
            .finish_non_exhaustive()
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}

impl Api {
    pub fn new() -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            info: ApiInfo {
                title: "API".into(),
                version: "1.0".into(),
                description: None,
                terms_url: None,
                license: None,
                license_url: None,
                contact: None,
                contact_url: None,
                contact_email: None,
            },
            authorizations: None,
            security: None,
            doc: Some("/".into()),
            documentation: None,
            default_id: Arc::new(default_id),
            namespaces: vec![(Namespace::new("default").description("Default namespace").path("/"), None)],
            validate: None,
            tags: vec![],
            prefix: String::new(),
            default_mediatype: Some("application/json".into()),
            decorators: vec![],
            catch_all_404s: false,
            serve_challenge_on_401: false,
            format_checker: false,
            additional_css: None,
            static_dir: None,
            config: ApiConfig::default(),
            representations: Representations::json(),
            error_handlers: vec![],
            default_error_handler: None,
            handle: ApiHandle::default(),
        }
    }

    /// The process-wide unique id of this API, part of its endpoint names.
    pub fn uid(&self) -> usize {
        self.uid
    }

    pub fn handle(&self) -> ApiHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.info.title = title.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.info.version = version.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn terms_url(mut self, url: impl Into<String>) -> Self {
        self.info.terms_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.info.license = Some(license.into());
        self
    }

    #[must_use]
    pub fn license_url(mut self, url: impl Into<String>) -> Self {
        self.info.license_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.info.contact = Some(contact.into());
        self
    }

    #[must_use]
    pub fn contact_url(mut self, url: impl Into<String>) -> Self {
        self.info.contact_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn contact_email(mut self, email: impl Into<String>) -> Self {
        self.info.contact_email = Some(email.into());
        self
    }

    /// Swagger security definitions, e.g. `{"apikey": {"type": "apiKey", ...}}`.
    #[must_use]
    pub fn authorizations(mut self, authorizations: Value) -> Self {
        self.authorizations = Some(authorizations);
        self
    }

    /// Security requirements applied to every operation: a name, a list or an object.
    #[must_use]
    pub fn security(mut self, security: Value) -> Self {
        self.security = Some(security);
        self
    }

    /// Serves the documentation UI at `path` instead of `/`.
    #[must_use]
    pub fn doc(mut self, path: impl Into<String>) -> Self {
        self.doc = Some(path.into());
        self
    }

    #[must_use]
    pub fn disable_doc(mut self) -> Self {
        self.doc = None;
        self
    }

    /// Replaces the documentation page with a custom view.
    #[must_use]
    pub fn documentation<H: RequestHandler + 'static>(mut self, view: H) -> Self {
        self.documentation = Some(Box::new(view));
        self
    }

    /// Generates the operation id from the resource name and the method.
    #[must_use]
    pub fn default_id<F>(mut self, default_id: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.default_id = Arc::new(default_id);
        self
    }

    /// Renames the default namespace.
    #[must_use]
    pub fn default_namespace(mut self, name: impl Into<String>) -> Self {
        self.update_default_namespace(|namespace| namespace.rename(name));
        self
    }

    /// Relabels the default namespace.
    #[must_use]
    pub fn default_label(mut self, label: impl Into<String>) -> Self {
        self.update_default_namespace(|namespace| namespace.description(label));
        self
    }

    fn update_default_namespace(&mut self, update: impl FnOnce(Namespace) -> Namespace) {
        let (namespace, path) = self.namespaces.remove(0);
        self.namespaces.insert(0, (update(namespace), path));
    }

    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Adds a swagger tag: a name or a `{"name", "description"}` object.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<Value>) -> Self {
        let tag = match tag.into() {
            Value::String(name) => json!({"name": name}),
            other => other,
        };
        self.tags.push(tag);
        self
    }

    /// Mounts the whole API under `prefix`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// The mediatype used when the client accepts anything; `None` answers 406 instead.
    #[must_use]
    pub fn default_mediatype(mut self, mediatype: Option<&str>) -> Self {
        self.default_mediatype = mediatype.map(str::to_string);
        self
    }

    /// Wraps every resource view of the API, outside the namespace decorators.
    #[must_use]
    pub fn decorator<D>(mut self, decorator: D) -> Self
    where
        D: Decorator<Box<dyn RequestHandler>, Out = Box<dyn RequestHandler>> + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Answers every unmatched url with the API error format.
    #[must_use]
    pub fn catch_all_404s(mut self) -> Self {
        self.catch_all_404s = true;
        self
    }

    /// Adds a basic auth challenge to 401 responses.
    #[must_use]
    pub fn serve_challenge_on_401(mut self) -> Self {
        self.serve_challenge_on_401 = true;
        self
    }

    /// Also validates `format` keywords of the expected models.
    #[must_use]
    pub fn format_checker(mut self) -> Self {
        self.format_checker = true;
        self
    }

    /// A stylesheet url added to the documentation page.
    #[must_use]
    pub fn additional_css(mut self, url: impl Into<String>) -> Self {
        self.additional_css = Some(url.into());
        self
    }

    /// Serves the swagger UI assets from `dir` under `/swaggerui` instead of a CDN.
    #[must_use]
    pub fn swagger_static(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds or replaces the representation of a mediatype.
    #[must_use]
    pub fn representation(mut self, mediatype: impl Into<String>, representation: impl Representation + 'static) -> Self {
        self.representations.insert(mediatype, representation);
        self
    }

    /// Answers errors of type `E`; a data reply without status is sent as 500.
    #[must_use]
    pub fn error_handler<E, F>(mut self, handler: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&E) -> Reply + Send + Sync + 'static,
    {
        self.error_handlers.push(typed_error_handler::<E, _>(handler));
        self
    }

    /// Answers the non HTTP errors no typed handler claimed.
    #[must_use]
    pub fn default_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&(dyn Error + Send + Sync + 'static)) -> Reply + Send + Sync + 'static,
    {
        self.default_error_handler = Some(Arc::new(handler));
        self
    }

    /// Mounts a namespace at its own path.
    #[must_use]
    pub fn add_namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push((namespace, None));
        self
    }

    /// Mounts a namespace at `path`, overriding its own.
    #[must_use]
    pub fn add_namespace_at(mut self, namespace: Namespace, path: impl Into<String>) -> Self {
        self.namespaces.push((namespace, Some(path.into())));
        self
    }

    /// Serves a resource from the default namespace.
    #[must_use]
    pub fn route(mut self, url: impl Into<String>, resource: Resource) -> Self {
        let url = url.into();
        self.update_default_namespace(|namespace| namespace.route(url, resource));
        self
    }

    /// Registers a model in the default namespace.
    #[must_use]
    pub fn model(mut self, model: &Model) -> Self {
        self.update_default_namespace(|namespace| namespace.model(model));
        self
    }

    /// `{prefix}/swagger.json`.
    pub fn specs_url(&self) -> String {
        format!("{}/swagger.json", self.prefix)
    }

    /// The swagger `basePath`: the prefix, or `/`.
    pub fn base_path(&self) -> &str {
        if self.prefix.is_empty() { "/" } else { &self.prefix }
    }

    /// The mediatypes a request accepts, best first.
    pub fn mediatypes(req: &RequestContext) -> Vec<String> {
        mediatypes(req.headers())
    }

    /// The parsed JSON body of a request.
    pub async fn payload(body: &OptionReqBody) -> Result<Value, BoxError> {
        parse_payload(&body.bytes().await?)
    }

    /// `{uid}_{resource}`, prefixed with the namespace outside the default one, numbered on
    /// collisions.
    fn default_endpoint(&self, resource: &str, namespace: Option<&str>, taken: &HashSet<String>) -> String {
        let mut endpoint = format!("{}_{}", self.uid, camel_to_dash(resource));
        if let Some(namespace) = namespace {
            endpoint = format!("{namespace}_{endpoint}");
        }
        let base = endpoint.clone();
        let mut suffix = 2;
        while taken.contains(&endpoint) {
            endpoint = format!("{base}_{suffix}");
            suffix += 1;
        }
        endpoint
    }

    fn mount_namespace(
        &self,
        namespace: &Namespace,
        path: Option<&str>,
        is_default: bool,
        endpoints: &mut HashSet<String>,
        endpoint_rules: &mut IndexMap<String, Vec<String>>,
    ) -> Vec<MountedRoute> {
        let ns_path = path.map_or_else(|| namespace.path_prefix(), |path| path.trim_end_matches('/').to_string());
        namespace
            .resources()
            .iter()
            .map(|ResourceRoute { resource, urls, endpoint }| {
                let endpoint = endpoint.clone().unwrap_or_else(|| {
                    self.default_endpoint(resource.name(), (!is_default).then(|| namespace.name()), endpoints)
                });
                endpoints.insert(endpoint.clone());

                let urls = urls.iter().map(|url| format!("{ns_path}{url}")).collect::<Vec<_>>();
                let rules = endpoint_rules.entry(endpoint.clone()).or_default();
                rules.extend(urls.iter().map(|url| format!("{}{url}", self.prefix)));

                MountedRoute { resource: Arc::clone(resource), endpoint, urls }
            })
            .collect()
    }
}

fn router_path(rule: &str) -> String {
    let path = to_router_path(rule);
    if path.is_empty() { "/".to_string() } else { path }
}

impl Plugin for Api {
    fn register(mut self, registration: &mut Registration) {
        let uid = self.uid;
        let specs_endpoint = format!("{uid}_specs");
        let mut endpoints = HashSet::from([specs_endpoint.clone()]);
        let mut endpoint_rules = IndexMap::from([(specs_endpoint.clone(), vec![self.specs_url()])]);

        let namespaces = std::mem::take(&mut self.namespaces);
        let mut mounted = Vec::with_capacity(namespaces.len());
        let mut models = IndexMap::new();
        let mut error_handlers = std::mem::take(&mut self.error_handlers);
        for (index, (namespace, path)) in namespaces.into_iter().enumerate() {
            let routes = self.mount_namespace(&namespace, path.as_deref(), index == 0, &mut endpoints, &mut endpoint_rules);
            for (name, model) in namespace.models() {
                models.entry(name.clone()).or_insert_with(|| model.clone());
            }
            error_handlers.extend(namespace.error_handlers().iter().cloned());
            mounted.push(MountedNamespace { namespace, routes });
        }
        error_handlers.push(mask_error_handler());

        let doc_endpoint = format!("{uid}_doc");
        let root_endpoint = format!("{uid}_root");
        if let Some(doc_path) = &self.doc {
            endpoints.insert(doc_endpoint.clone());
            endpoint_rules.insert(doc_endpoint.clone(), vec![doc_path.clone()]);
        }
        endpoints.insert(root_endpoint.clone());

        let rules = endpoint_rules.values().flatten().cloned().collect();

        let Api {
            info,
            authorizations,
            security,
            doc,
            documentation,
            default_id,
            validate,
            tags,
            prefix,
            default_mediatype,
            decorators,
            catch_all_404s,
            serve_challenge_on_401,
            format_checker,
            additional_css,
            static_dir,
            config,
            representations,
            default_error_handler,
            handle,
            ..
        } = self;

        let state = Arc::new(ApiState {
            uid,
            info,
            prefix,
            doc_path: doc,
            config,
            representations,
            default_mediatype,
            validate,
            format_checker,
            authorizations,
            security,
            tags,
            default_id,
            catch_all_404s,
            serve_challenge_on_401,
            error_handlers,
            default_error_handler,
            additional_css,
            serve_static: static_dir.is_some(),
            namespaces: mounted,
            models,
            endpoints,
            rules,
            endpoint_rules,
            schema: ArcSwapOption::empty(),
        });

        let mut root_taken = false;
        let root_path = state.base_path().to_string();
        for mounted in &state.namespaces {
            for route in &mounted.routes {
                let view: Box<dyn RequestHandler> =
                    Box::new(ResourceView::new(Arc::clone(&route.resource), mounted.namespace.validation(), Arc::clone(&state)));
                let view = mounted.namespace.decorators().iter().fold(view, |view, decorator| decorator.decorate(view));
                let view: Arc<dyn RequestHandler> = Arc::from(decorators.iter().fold(view, |view, decorator| decorator.decorate(view)));

                for url in &route.urls {
                    let path = router_path(&format!("{}{url}", state.prefix));
                    root_taken |= path == root_path;
                    debug!(endpoint = %route.endpoint, %path, "registering resource");
                    registration.route(path, route_methods(route.resource.route_methods(), Arc::clone(&view)).endpoint(route.endpoint.clone()));
                }
            }
        }

        registration.route(router_path(&state.specs_url()), get(SpecsView::new(Arc::clone(&state))).endpoint(specs_endpoint));

        if let Some(doc_path) = &state.doc_path {
            let view: Box<dyn RequestHandler> = match documentation {
                Some(view) => view,
                None => Box::new(DocView::new(Arc::clone(&state))),
            };
            root_taken |= *doc_path == root_path;
            registration.route(router_path(doc_path), get(view).endpoint(doc_endpoint));
        }

        if !root_taken {
            registration.route(root_path, get(RootView).endpoint(root_endpoint));
        }

        if let Some(dir) = static_dir {
            debug!(dir = %dir.display(), "serving swagger ui assets");
            registration.route("/swaggerui/{*path}", get(StaticFiles::new(dir)));
        }

        let handler_state = Arc::clone(&state);
        registration.wrap_error_handler(move |original| Box::new(ApiErrorHandler::new(original, handler_state)));

        info!(uid, title = %state.info.title, base_path = state.base_path(), rules = state.rules.len(), "api registered");
        if handle.state.set(state).is_err() {
            warn!(uid, "api handle was already bound");
        }
    }
}
