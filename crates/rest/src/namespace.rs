//! Namespaces group resources under a common path and a swagger tag.

use crate::api::error_handler::{TypedErrorHandler, typed_error_handler};
use crate::decorator::{Decorator, ViewDecorator};
use crate::handler::RequestHandler;
use crate::model::Model;
use crate::reply::Reply;
use crate::resource::Resource;
use indexmap::IndexMap;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A resource bound to one or more urls of a namespace.
#[derive(Debug, Clone)]
pub struct ResourceRoute {
    pub(crate) resource: Arc<Resource>,
    pub(crate) urls: Vec<String>,
    pub(crate) endpoint: Option<String>,
}

impl ResourceRoute {
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

pub struct Namespace {
    name: String,
    description: Option<String>,
    path: Option<String>,
    resources: Vec<ResourceRoute>,
    models: IndexMap<String, Model>,
    decorators: Vec<Arc<ViewDecorator>>,
    error_handlers: Vec<TypedErrorHandler>,
    validate: Option<bool>,
    authorizations: Option<Value>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("path", &self.path_prefix())
            .field("resources", &self.resources)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            path: None,
            resources: vec![],
            models: IndexMap::new(),
            decorators: vec![],
            error_handlers: vec![],
            validate: None,
            authorizations: None,
        }
    }

    #[must_use]
    pub(crate) fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mounts the namespace somewhere other than `/{name}`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Serves `resource` at `url`, relative to the namespace path.
    ///
    /// Urls use `<name>` or `<converter:name>` placeholders.
    #[must_use]
    pub fn route(self, url: impl Into<String>, resource: Resource) -> Self {
        self.route_urls([url.into()], resource, None)
    }

    /// Serves `resource` at several urls under an explicit endpoint name when given.
    #[must_use]
    pub fn route_urls<S: Into<String>>(
        mut self,
        urls: impl IntoIterator<Item = S>,
        resource: Resource,
        endpoint: Option<&str>,
    ) -> Self {
        self.resources.push(ResourceRoute {
            resource: Arc::new(resource),
            urls: urls.into_iter().map(Into::into).collect(),
            endpoint: endpoint.map(str::to_string),
        });
        self
    }

    /// Registers a model for the swagger definitions, with the models it references.
    #[must_use]
    pub fn model(mut self, model: &Model) -> Self {
        for dependency in model.dependencies() {
            self.models.entry(dependency.name().to_string()).or_insert(dependency);
        }
        self
    }

    /// Wraps every resource view of this namespace.
    #[must_use]
    pub fn decorator<D>(mut self, decorator: D) -> Self
    where
        D: Decorator<Box<dyn RequestHandler>, Out = Box<dyn RequestHandler>> + Send + Sync + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Answers errors of type `E` raised by this namespace's resources.
    ///
    /// A data reply without status is sent as 500.
    #[must_use]
    pub fn error_handler<E, F>(mut self, handler: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&E) -> Reply + Send + Sync + 'static,
    {
        self.error_handlers.push(typed_error_handler::<E, _>(handler));
        self
    }

    /// Payload validation default for the resources of this namespace.
    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Security definitions merged into the API ones.
    #[must_use]
    pub fn authorizations(mut self, authorizations: Value) -> Self {
        self.authorizations = Some(authorizations);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The mount path without trailing slash; `/{name}` unless set.
    pub fn path_prefix(&self) -> String {
        let path = self.path.clone().unwrap_or_else(|| format!("/{}", self.name));
        path.trim_end_matches('/').to_string()
    }

    pub fn resources(&self) -> &[ResourceRoute] {
        &self.resources
    }

    pub fn models(&self) -> &IndexMap<String, Model> {
        &self.models
    }

    pub(crate) fn decorators(&self) -> &[Arc<ViewDecorator>] {
        &self.decorators
    }

    pub(crate) fn error_handlers(&self) -> &[TypedErrorHandler] {
        &self.error_handlers
    }

    pub(crate) fn validation(&self) -> Option<bool> {
        self.validate
    }

    pub(crate) fn authorization_definitions(&self) -> Option<&Value> {
        self.authorizations.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;
    use crate::handler::handler_fn;

    async fn get_todo() -> Value {
        Value::Null
    }

    #[test]
    fn test_path_defaults_to_name() {
        assert_eq!(Namespace::new("todos").path_prefix(), "/todos");
        assert_eq!(Namespace::new("todos").path("/api/todos/").path_prefix(), "/api/todos");
        assert_eq!(Namespace::new("default").path("/").path_prefix(), "");
    }

    #[test]
    fn test_model_registers_dependencies() {
        let owner = Model::builder("Owner").field("name", Field::string()).build();
        let todo = Model::builder("Todo").field("owner", Field::nested(&owner)).build();
        let ns = Namespace::new("todos").model(&todo);
        assert_eq!(ns.models().keys().collect::<Vec<_>>(), vec!["Todo", "Owner"]);
    }

    #[test]
    fn test_route_urls() {
        let ns = Namespace::new("todos")
            .route("/", Resource::builder("TodoList").get(handler_fn(get_todo)).build())
            .route_urls(["/<int:id>", "/by-id/<int:id>"], Resource::builder("Todo").get(handler_fn(get_todo)).build(), Some("todo"));
        assert_eq!(ns.resources().len(), 2);
        assert_eq!(ns.resources()[1].urls(), &["/<int:id>".to_string(), "/by-id/<int:id>".to_string()]);
        assert_eq!(ns.resources()[1].endpoint.as_deref(), Some("todo"));
    }
}
