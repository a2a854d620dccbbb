//! Per-operation documentation and behavior declarations.
//!
//! A [`Doc`] attached to a resource documents every method of it; one attached to a single
//! method refines that method. Besides swagger metadata it declares payload expectations
//! (validated before the handler) and the output model (applied after it).

use crate::model::Model;
use crate::reqparse::RequestParser;
use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Something the operation expects as input.
#[derive(Debug, Clone)]
pub enum Expect {
    /// A JSON object matching the model.
    Model(Model),
    /// A JSON list of objects matching the model.
    List(Model),
    /// Arguments read by a request parser.
    Parser(Arc<RequestParser>),
}

impl Expect {
    pub fn model(&self) -> Option<&Model> {
        match self {
            Expect::Model(model) | Expect::List(model) => Some(model),
            Expect::Parser(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseDoc {
    pub description: String,
    pub model: Option<Model>,
    pub as_list: bool,
    pub headers: Map<String, Value>,
}

/// How the handler's data is shaped before negotiation.
#[derive(Debug, Clone)]
pub struct Marshalling {
    pub model: Model,
    pub as_list: bool,
    pub code: StatusCode,
    pub description: Option<String>,
    pub envelope: Option<String>,
    /// Default mask when the request carries none.
    pub mask: Option<String>,
    pub skip_none: bool,
}

impl Marshalling {
    pub fn new(model: &Model) -> Self {
        Self {
            model: model.clone(),
            as_list: false,
            code: StatusCode::OK,
            description: None,
            envelope: None,
            mask: None,
            skip_none: false,
        }
    }

    #[must_use]
    pub fn list(mut self) -> Self {
        self.as_list = true;
        self
    }

    #[must_use]
    pub fn code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn envelope(mut self, envelope: impl Into<String>) -> Self {
        self.envelope = Some(envelope.into());
        self
    }

    #[must_use]
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    #[must_use]
    pub fn skip_none(mut self) -> Self {
        self.skip_none = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Doc {
    pub(crate) id: Option<String>,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) params: IndexMap<String, Value>,
    pub(crate) responses: IndexMap<String, ResponseDoc>,
    pub(crate) expect: Vec<Expect>,
    pub(crate) validate: Option<bool>,
    pub(crate) marshal: Option<Marshalling>,
    pub(crate) deprecated: bool,
    pub(crate) hidden: bool,
    pub(crate) security: Option<Value>,
    pub(crate) produces: Vec<String>,
    pub(crate) vendor: Map<String, Value>,
}

impl Doc {
    pub fn new() -> Self {
        Self::default()
    }

    /// The operation id; defaults to `{method}_{resource}`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Documents a parameter; path parameters keep their location, others default to query.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.params.insert(name.into(), json!({"description": description.into()}));
        self
    }

    /// Documents a parameter with a full swagger parameter object (`in`, `type`, ...).
    #[must_use]
    pub fn param_with(mut self, name: impl Into<String>, spec: Value) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    /// Documents a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.params.insert(name.into(), json!({"description": description.into(), "in": "header", "type": "string"}));
        self
    }

    #[must_use]
    pub fn response(mut self, code: u16, description: impl Into<String>) -> Self {
        self.responses.insert(code.to_string(), ResponseDoc { description: description.into(), ..ResponseDoc::default() });
        self
    }

    #[must_use]
    pub fn response_with(mut self, code: u16, description: impl Into<String>, model: &Model) -> Self {
        self.responses.insert(
            code.to_string(),
            ResponseDoc { description: description.into(), model: Some(model.clone()), ..ResponseDoc::default() },
        );
        self
    }

    /// Documents a response under an arbitrary key such as `default`.
    #[must_use]
    pub fn response_doc(mut self, code: impl Into<String>, response: ResponseDoc) -> Self {
        self.responses.insert(code.into(), response);
        self
    }

    #[must_use]
    pub fn expect(mut self, model: &Model) -> Self {
        self.expect.push(Expect::Model(model.clone()));
        self
    }

    #[must_use]
    pub fn expect_list(mut self, model: &Model) -> Self {
        self.expect.push(Expect::List(model.clone()));
        self
    }

    #[must_use]
    pub fn expect_parser(mut self, parser: RequestParser) -> Self {
        self.expect.push(Expect::Parser(Arc::new(parser)));
        self
    }

    /// Enables or disables payload validation for this operation.
    #[must_use]
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    #[must_use]
    pub fn marshal_with(self, model: &Model) -> Self {
        self.marshal(Marshalling::new(model))
    }

    #[must_use]
    pub fn marshal_list_with(self, model: &Model) -> Self {
        self.marshal(Marshalling::new(model).list())
    }

    #[must_use]
    pub fn marshal(mut self, marshalling: Marshalling) -> Self {
        self.marshal = Some(marshalling);
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Leaves the operation out of the swagger document.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Security requirements; `json!([])` disables the API level ones.
    #[must_use]
    pub fn security(mut self, security: Value) -> Self {
        self.security = Some(security);
        self
    }

    #[must_use]
    pub fn produces<S: Into<String>>(mut self, mediatypes: impl IntoIterator<Item = S>) -> Self {
        self.produces = mediatypes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a vendor extension; the `x-` prefix is added when missing.
    #[must_use]
    pub fn vendor(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let key = if key.starts_with("x-") { key } else { format!("x-{key}") };
        self.vendor.insert(key, value.into());
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn marshalling(&self) -> Option<&Marshalling> {
        self.marshal.as_ref()
    }

    pub fn expectations(&self) -> &[Expect] {
        &self.expect
    }

    pub fn validation(&self) -> Option<bool> {
        self.validate
    }

    /// Combines a resource level doc with a method level one; `method` wins on conflicts.
    pub fn merge(&self, method: &Doc) -> Doc {
        let mut merged = self.clone();
        merged.id = method.id.clone().or(merged.id);
        merged.summary = method.summary.clone().or(merged.summary);
        merged.description = method.description.clone().or(merged.description);
        merged.params.extend(method.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.responses.extend(method.responses.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.expect.extend(method.expect.iter().cloned());
        merged.validate = method.validate.or(merged.validate);
        merged.marshal = method.marshal.clone().or(merged.marshal);
        merged.deprecated |= method.deprecated;
        merged.hidden |= method.hidden;
        merged.security = method.security.clone().or(merged.security);
        if !method.produces.is_empty() {
            merged.produces.clone_from(&method.produces);
        }
        merged.vendor.extend(method.vendor.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Models this operation references, for the swagger definitions.
    pub(crate) fn models(&self) -> Vec<&Model> {
        let expected = self.expect.iter().filter_map(Expect::model);
        let responses = self.responses.values().filter_map(|response| response.model.as_ref());
        let marshalled = self.marshal.iter().map(|marshal| &marshal.model);
        expected.chain(responses).chain(marshalled).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Field;

    #[test]
    fn test_merge_method_wins() {
        let model = Model::builder("Todo").field("task", Field::string()).build();
        let resource = Doc::new()
            .description("resource")
            .param("todo_id", "The todo identifier")
            .response(404, "Todo not found")
            .validate(false);
        let method = Doc::new().description("method").response(200, "Success").expect(&model).validate(true).vendor("rate-limit", 10);

        let merged = resource.merge(&method);
        assert_eq!(merged.description.as_deref(), Some("method"));
        assert_eq!(merged.params.keys().collect::<Vec<_>>(), vec!["todo_id"]);
        assert_eq!(merged.responses.keys().collect::<Vec<_>>(), vec!["404", "200"]);
        assert_eq!(merged.validation(), Some(true));
        assert_eq!(merged.vendor.get("x-rate-limit"), Some(&json!(10)));
        assert_eq!(merged.models().len(), 1);
    }

    #[test]
    fn test_marshalling_defaults() {
        let model = Model::builder("Todo").build();
        let doc = Doc::new().marshal_list_with(&model);
        let marshalling = doc.marshalling().unwrap();
        assert!(marshalling.as_list);
        assert_eq!(marshalling.code, StatusCode::OK);
        assert!(!marshalling.skip_none);
    }
}
