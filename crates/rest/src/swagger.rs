//! Swagger 2.0 document generation.
//!
//! The document is derived from the mounted namespaces only: every visible operation of every
//! resource, and the definitions of the models those operations reach.

use crate::api::{ApiState, MountedNamespace, MountedRoute};
use crate::doc::{Doc, Expect, ResponseDoc};
use crate::error::RestError;
use crate::model::Model;
use crate::utils::{merge, not_none, rule_params, to_router_path};
use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};

const DEFAULT_RESPONSE_DESCRIPTION: &str = "Success";
const FORM_CONSUMES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

/// The swagger type of a rule converter.
fn path_type(converter: &str) -> &'static str {
    match converter {
        "int" => "integer",
        "float" => "number",
        _ => "string",
    }
}

/// `{name: []}` entries from a security declaration: a name, a list of them, or an object.
fn security_requirements(value: &Value) -> Value {
    match value {
        Value::String(name) => json!([{ name.as_str(): [] }]),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(name) => json!({ name.as_str(): [] }),
                    other => other.clone(),
                })
                .collect(),
        ),
        Value::Object(_) => json!([value]),
        _ => Value::Null,
    }
}

fn schema_ref(model: &Model, as_list: bool) -> Value {
    let reference = json!({"$ref": model.reference()});
    if as_list { json!({"type": "array", "items": reference}) } else { reference }
}

/// Builds the swagger document of a mounted API.
pub(crate) struct Swagger<'a> {
    api: &'a ApiState,
    registered: IndexMap<String, Model>,
}

impl<'a> Swagger<'a> {
    pub(crate) fn new(api: &'a ApiState) -> Self {
        Self { api, registered: IndexMap::new() }
    }

    /// The whole document; fails when an operation references an unregistered model.
    pub(crate) fn as_dict(mut self) -> Result<Value, RestError> {
        let api = self.api;

        let mut paths = Map::new();
        for mounted in &api.namespaces {
            for route in &mounted.routes {
                if route.resource.doc().is_hidden() {
                    continue;
                }
                for url in &route.urls {
                    let path = to_router_path(url);
                    let path = if path.is_empty() { "/".to_string() } else { path };
                    let item = self.serialize_resource(mounted, route, url)?;
                    paths.insert(path, item);
                }
            }
        }

        let mut document = Map::new();
        document.insert("swagger".into(), json!("2.0"));
        document.insert("basePath".into(), json!(api.base_path()));
        document.insert("paths".into(), Value::Object(paths));
        document.insert("info".into(), self.info());
        document.insert("produces".into(), json!(api.representations.mediatypes()));
        document.insert("consumes".into(), json!(["application/json"]));
        document.insert("securityDefinitions".into(), self.security_definitions());
        document.insert("security".into(), api.security.as_ref().map_or(Value::Null, security_requirements));
        document.insert("tags".into(), Value::Array(self.tags()));
        document.insert("definitions".into(), self.definitions());
        document.insert("host".into(), json!(api.config.server_name));
        Ok(Value::Object(not_none(document)))
    }

    fn info(&self) -> Value {
        let info = &self.api.info;
        let mut map = Map::new();
        map.insert("title".into(), json!(info.title));
        map.insert("version".into(), json!(info.version));
        map.insert("description".into(), json!(info.description));
        map.insert("termsOfService".into(), json!(info.terms_url));

        let contact = not_none(
            [("name", &info.contact), ("email", &info.contact_email), ("url", &info.contact_url)]
                .into_iter()
                .map(|(key, value)| (key.to_string(), json!(value)))
                .collect(),
        );
        if !contact.is_empty() {
            map.insert("contact".into(), Value::Object(contact));
        }
        if let Some(license) = &info.license {
            let license = not_none([("name".to_string(), json!(license)), ("url".to_string(), json!(info.license_url))].into_iter().collect());
            map.insert("license".into(), Value::Object(license));
        }
        Value::Object(not_none(map))
    }

    fn security_definitions(&self) -> Value {
        let namespaces = self.api.namespaces.iter().filter_map(|mounted| mounted.namespace.authorization_definitions());
        let merged = namespaces.fold(self.api.authorizations.clone(), |acc, definitions| match acc {
            Some(acc) => Some(merge(&acc, definitions)),
            None => Some(definitions.clone()),
        });
        merged.unwrap_or(Value::Null)
    }

    /// The API tags, then one per namespace with visible resources.
    fn tags(&self) -> Vec<Value> {
        let mut tags = self.api.tags.clone();
        for mounted in &self.api.namespaces {
            let namespace = &mounted.namespace;
            if mounted.routes.iter().all(|route| route.resource.doc().is_hidden()) {
                continue;
            }
            let existing = tags.iter_mut().find(|tag| tag["name"] == namespace.name());
            match (existing, namespace.description_text()) {
                (Some(tag), Some(description)) => tag["description"] = json!(description),
                (Some(_), None) => {}
                (None, description) => {
                    let mut tag = Map::new();
                    tag.insert("name".into(), json!(namespace.name()));
                    tag.insert("description".into(), json!(description));
                    tags.push(Value::Object(not_none(tag)));
                }
            }
        }
        tags
    }

    fn definitions(&self) -> Value {
        if self.registered.is_empty() {
            return Value::Null;
        }
        Value::Object(self.registered.iter().map(|(name, model)| (name.clone(), model.schema())).collect())
    }

    /// Records a model and everything it references for the definitions.
    fn register_model(&mut self, model: &Model) -> Result<(), RestError> {
        if self.registered.contains_key(model.name()) {
            return Ok(());
        }
        let Some(registered) = self.api.models.get(model.name()) else {
            return Err(RestError::Specs(format!("Model {} not registered", model.name())));
        };
        self.registered.insert(model.name().to_string(), registered.clone());
        for dependency in registered.dependencies().iter().skip(1) {
            self.register_model(dependency)?;
        }
        Ok(())
    }

    fn serialize_resource(&mut self, mounted: &MountedNamespace, route: &MountedRoute, url: &str) -> Result<Value, RestError> {
        let resource = &route.resource;
        let url_params = rule_params(url);

        let mut item = Map::new();
        let path_params = parameters_for(&resource.doc().params, &url_params);
        if !path_params.is_empty() {
            item.insert("parameters".into(), Value::Array(path_params));
        }

        for method in resource.methods() {
            let Some(doc) = resource.method_doc(method) else {
                continue;
            };
            if doc.is_hidden() {
                continue;
            }
            let own_params = doc
                .params
                .iter()
                .filter(|(name, spec)| resource.doc().params.get(*name) != Some(*spec))
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect::<IndexMap<_, _>>();
            let operation = self.serialize_operation(mounted, resource.name(), method.as_str(), doc, &own_params, &url_params)?;
            item.insert(method.as_str().to_lowercase(), operation);
        }
        Ok(Value::Object(item))
    }

    fn serialize_operation(
        &mut self,
        mounted: &MountedNamespace,
        resource: &str,
        method: &str,
        doc: &Doc,
        own_params: &IndexMap<String, Value>,
        url_params: &[(String, String)],
    ) -> Result<Value, RestError> {
        let mut params = parameters_for(own_params, &[])
            .into_iter()
            .filter(|param| !url_params.iter().any(|(name, _)| param["name"] == name.as_str()))
            .collect::<Vec<_>>();
        params.extend(self.expected_params(doc)?);
        if let Some(mask_param) = self.mask_param(doc) {
            params.push(mask_param);
        }

        let consumes = params.iter().any(|param| param["in"] == "formData").then(|| json!(FORM_CONSUMES));
        let operation_id = doc.id.clone().unwrap_or_else(|| (self.api.default_id)(resource, method));

        let mut operation = Map::new();
        operation.insert("responses".into(), self.responses_for(doc)?);
        operation.insert("summary".into(), json!(doc.summary));
        operation.insert("description".into(), json!(doc.description));
        operation.insert("operationId".into(), json!(operation_id));
        operation.insert("parameters".into(), if params.is_empty() { Value::Null } else { Value::Array(params) });
        operation.insert("security".into(), doc.security.as_ref().map_or(Value::Null, security_requirements));
        operation.insert("tags".into(), json!([mounted.namespace.name()]));
        operation.insert("deprecated".into(), if doc.deprecated { json!(true) } else { Value::Null });
        operation.insert("produces".into(), if doc.produces.is_empty() { Value::Null } else { json!(doc.produces) });
        operation.insert("consumes".into(), consumes.unwrap_or(Value::Null));
        operation.extend(doc.vendor.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(Value::Object(not_none(operation)))
    }

    fn expected_params(&mut self, doc: &Doc) -> Result<Vec<Value>, RestError> {
        let mut params = vec![];
        for expect in doc.expectations() {
            match expect {
                Expect::Model(model) | Expect::List(model) => {
                    self.register_model(model)?;
                    let as_list = matches!(expect, Expect::List(_));
                    params.push(json!({"name": "payload", "in": "body", "required": true, "schema": schema_ref(model, as_list)}));
                }
                Expect::Parser(parser) => params.extend(parser.swagger_params()?),
            }
        }
        Ok(params)
    }

    /// The fields mask header, documented on marshalled operations.
    fn mask_param(&self, doc: &Doc) -> Option<Value> {
        let marshalling = doc.marshalling()?;
        if !self.api.config.mask_swagger {
            return None;
        }
        let mut param = json!({
            "name": self.api.config.mask_header,
            "in": "header",
            "type": "string",
            "format": "mask",
            "description": "An optional fields mask",
        });
        if let Some(mask) = marshalling.mask.as_deref().or(marshalling.model.mask()) {
            param["default"] = json!(mask);
        }
        Some(param)
    }

    fn responses_for(&mut self, doc: &Doc) -> Result<Value, RestError> {
        let mut responses = Map::new();
        for (code, response) in &doc.responses {
            responses.insert(code.clone(), self.serialize_response(response)?);
        }

        if let Some(marshalling) = doc.marshalling() {
            self.register_model(&marshalling.model)?;
            let code = marshalling.code.as_u16().to_string();
            let entry = responses.entry(code).or_insert_with(|| {
                let description = marshalling.description.as_deref().unwrap_or(DEFAULT_RESPONSE_DESCRIPTION);
                json!({"description": description})
            });
            entry["schema"] = schema_ref(&marshalling.model, marshalling.as_list);
        }

        if responses.is_empty() {
            responses.insert(StatusCode::OK.as_u16().to_string(), json!({"description": DEFAULT_RESPONSE_DESCRIPTION}));
        }
        Ok(Value::Object(responses))
    }

    fn serialize_response(&mut self, response: &ResponseDoc) -> Result<Value, RestError> {
        let mut serialized = Map::new();
        serialized.insert("description".into(), json!(response.description));
        if let Some(model) = &response.model {
            self.register_model(model)?;
            serialized.insert("schema".into(), schema_ref(model, response.as_list));
        }
        if !response.headers.is_empty() {
            serialized.insert("headers".into(), Value::Object(response.headers.clone()));
        }
        Ok(Value::Object(serialized))
    }
}

/// Swagger parameters from documented params and the placeholders of the url.
///
/// Url placeholders are path parameters; other params default to optional query strings.
fn parameters_for(params: &IndexMap<String, Value>, url_params: &[(String, String)]) -> Vec<Value> {
    let mut merged = IndexMap::new();
    for (name, converter) in url_params {
        merged.insert(name.clone(), json!({"name": name, "in": "path", "required": true, "type": path_type(converter)}));
    }
    for (name, spec) in params {
        let entry = merged.entry(name.clone()).or_insert_with(|| json!({"name": name}));
        if let (Value::Object(target), Value::Object(spec)) = (entry, spec) {
            target.extend(spec.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
    }

    merged
        .into_values()
        .map(|mut param| {
            if let Value::Object(map) = &mut param {
                map.entry("in").or_insert_with(|| json!("query"));
                if !map.contains_key("schema") {
                    map.entry("type").or_insert_with(|| json!("string"));
                }
            }
            param
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_for_merges_path_params() {
        let mut params = IndexMap::new();
        params.insert("todo_id".to_string(), json!({"description": "The task identifier"}));
        params.insert("page".to_string(), json!({"description": "Page", "type": "integer"}));

        let url_params = vec![("todo_id".to_string(), "int".to_string())];
        assert_eq!(
            parameters_for(&params, &url_params),
            vec![
                json!({"name": "todo_id", "in": "path", "required": true, "type": "integer", "description": "The task identifier"}),
                json!({"name": "page", "description": "Page", "type": "integer", "in": "query"}),
            ]
        );
    }

    #[test]
    fn test_security_requirements() {
        assert_eq!(security_requirements(&json!("apikey")), json!([{"apikey": []}]));
        assert_eq!(security_requirements(&json!(["apikey", {"oauth2": ["read"]}])), json!([{"apikey": []}, {"oauth2": ["read"]}]));
        assert_eq!(security_requirements(&json!([])), json!([]));
    }

    #[test]
    fn test_path_type() {
        assert_eq!(path_type("int"), "integer");
        assert_eq!(path_type("float"), "number");
        assert_eq!(path_type("path"), "string");
    }
}
